//! Round-trip integration tests.
//!
//! Extract, optionally edit, create again, and compare with the original.
//!
//! This file focuses on:
//! - Unedited trees reproducing their payloads
//! - New files added between extract and create
//! - Compressed containers on both sides
//! - Files-mode trees surviving extract → create
//! - Extract → create → extract giving the same tree, whatever the codings
//!   and path conflicts in the capture

mod common;

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use common::{Fixture, read_warc, response, write_file, write_warc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tempfile::TempDir;
use walkdir::WalkDir;
use waczfold::warc::{RecordType, names};
use waczfold::{CreateOptions, ExtractOptions, create_archive, extract_archive};

#[test]
fn test_unedited_tree_reproduces_payloads() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("site.warc");
    common::example_site(&input);
    let tree = temp.path().join("tree");
    extract_archive(&input, &tree, &ExtractOptions::default()).unwrap();

    let output = temp.path().join("again.warc");
    let result = create_archive(&tree, &output, &CreateOptions::default()).unwrap();
    assert_eq!(result.records_written, 4);
    assert_eq!(result.records_substituted, 2);
    assert_eq!(result.records_synthesized, 0);

    let before = read_warc(&input);
    let after = read_warc(&output);
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.record_type, b.record_type);
        assert_eq!(a.url, b.url);
        assert_eq!(a.payload, b.payload);
    }
}

#[test]
fn test_new_file_is_appended() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("site.warc");
    common::example_site(&input);
    let tree = temp.path().join("tree");
    extract_archive(&input, &tree, &ExtractOptions::default()).unwrap();
    write_file(&tree, "http:/example.com/about/__index__.html", b"<p>about</p>");

    let output = temp.path().join("again.warc.gz");
    let result = create_archive(&tree, &output, &CreateOptions::default()).unwrap();
    assert_eq!(result.records_synthesized, 1);

    let records = read_warc(&output);
    assert_eq!(records.len(), 5);
    let last = records.last().unwrap();
    assert_eq!(last.url.as_deref(), Some("http://example.com/about/"));
    assert_eq!(last.payload, b"<p>about</p>");

    // The new record extracts back to the file it came from
    let again = temp.path().join("again");
    extract_archive(&output, &again, &ExtractOptions::default()).unwrap();
    assert_eq!(
        fs::read(again.join("http:/example.com/about/__index__.html")).unwrap(),
        b"<p>about</p>"
    );
}

#[test]
fn test_gzip_container_roundtrip() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("crawl.warc.gz");
    write_warc(
        &input,
        &[
            Fixture::Info,
            response("https://example.org/", "text/html; charset=utf-8", b"<html></html>"),
            response("https://example.org/logo.png", "image/png", b"\x89PNG\r\n\x1a\n"),
        ],
    );
    let tree = temp.path().join("crawl");
    extract_archive(&input, &tree, &ExtractOptions::default()).unwrap();
    assert!(tree.join("crawl.warc").is_file());
    assert!(tree.join("https:/example.org/__index__.html").is_file());

    let output = temp.path().join("crawl2.warc.gz");
    create_archive(&tree, &output, &CreateOptions::default()).unwrap();
    assert_eq!(&fs::read(&output).unwrap()[..2], &[0x1f, 0x8b]);

    let records = read_warc(&output);
    assert_eq!(
        common::payload_for(&records, "https://example.org/logo.png"),
        b"\x89PNG\r\n\x1a\n"
    );
}

#[test]
fn test_files_mode_roundtrip() {
    let temp = TempDir::new().unwrap();
    let site = temp.path().join("site");
    write_file(&site, "index.html", b"<h1>home</h1>");
    write_file(&site, "main/index.js", b"export default 1;");

    let warc = temp.path().join("site.warc");
    create_archive(&site, &warc, &CreateOptions::new().files_mode(true)).unwrap();

    let tree = temp.path().join("tree");
    extract_archive(&warc, &tree, &ExtractOptions::default()).unwrap();
    assert_eq!(fs::read(tree.join("file:/main/index.js")).unwrap(), b"export default 1;");
    assert_eq!(fs::read(tree.join("file:/index.html")).unwrap(), b"<h1>home</h1>");

    // The unpacked tree is now an archive-mode tree
    let again = temp.path().join("again.warc");
    let result = create_archive(&tree, &again, &CreateOptions::default()).unwrap();
    assert_eq!(result.records_substituted, 2);
    assert_eq!(result.records_synthesized, 0);
    let records = read_warc(&again);
    assert!(records.iter().all(|r| r.record_type == RecordType::Response));
}

#[test]
fn test_collisions_stay_consistent() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in.warc");
    write_warc(
        &input,
        &[
            response("http://example.com/a/b", "text/plain", b"first"),
            response("http://example.com/a//b", "text/plain", b"second"),
        ],
    );
    let tree = temp.path().join("tree");
    extract_archive(&input, &tree, &ExtractOptions::default()).unwrap();

    let output = temp.path().join("out.warc");
    let result = create_archive(&tree, &output, &CreateOptions::default()).unwrap();
    assert_eq!(result.records_substituted, 2);
    assert_eq!(result.records_synthesized, 0);

    let records = read_warc(&output);
    assert_eq!(records[0].payload, b"second");
    assert_eq!(records[1].payload, b"second");
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Every resource file under `tree` with its bytes. Full copies at the root
/// are left out; their names differ between the two extractions.
fn tree_files(tree: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(tree)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !(e.depth() == 1 && e.file_name().to_string_lossy().ends_with(".warc")))
        .map(|e| {
            let relative = e.path().strip_prefix(tree).unwrap();
            let key = relative.to_string_lossy().replace('\\', "/");
            (key, fs::read(e.path()).unwrap())
        })
        .collect()
}

/// Content-Type of every response in a full copy, by URL.
fn content_types(full_copy: &Path) -> BTreeMap<String, String> {
    read_warc(full_copy)
        .into_iter()
        .filter(|r| r.record_type == RecordType::Response)
        .map(|r| {
            let ty = r.http.as_ref().and_then(|h| h.content_type()).unwrap_or_default();
            (r.url.unwrap_or_default(), ty.to_string())
        })
        .collect()
}

/// Extracts `input`, folds the tree back up and extracts the result, then
/// checks the two trees agree.
fn assert_stable(input: &Path, temp: &Path) {
    let first = temp.join("first");
    extract_archive(input, &first, &ExtractOptions::default()).unwrap();

    let rebuilt = temp.join("rebuilt.warc");
    let result = create_archive(&first, &rebuilt, &CreateOptions::default()).unwrap();
    assert_eq!(result.records_synthesized, 0);
    assert_eq!(result.placeholders_kept, 0);

    let second = temp.join("second");
    extract_archive(&rebuilt, &second, &ExtractOptions::default()).unwrap();

    assert_eq!(tree_files(&first), tree_files(&second));
    let name = input.file_name().unwrap().to_string_lossy().replace(".gz", "");
    assert_eq!(
        content_types(&first.join(name)),
        content_types(&second.join("rebuilt.warc"))
    );
}

#[test]
fn test_extract_create_extract_is_stable() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("mixed.warc.gz");
    let mut members = gzip(b"part one, ");
    members.extend(gzip(b"part two"));
    let double = gzip(&gzip(b"sitemap contents"));
    write_warc(
        &input,
        &[
            Fixture::Info,
            Fixture::Request {
                url: "http://example.com/",
            },
            response("http://example.com/", "text/html", b"<html>home</html>"),
            response("http://example.com/a", "text/html", b"<p>page a</p>"),
            response("http://example.com/a/b.css", "text/css", b"p { margin: 0 }"),
            Fixture::Response {
                url: "http://example.com/chunked.txt",
                content_type: "text/plain",
                headers: &[("Transfer-Encoding", "chunked")],
                body: b"5\r\nhello\r\n0\r\n\r\n",
            },
            Fixture::Response {
                url: "http://example.com/members.txt",
                content_type: "text/plain",
                headers: &[("Content-Encoding", "gzip")],
                body: &members,
            },
            Fixture::Response {
                url: "http://example.com/sitemap.xml.gz",
                content_type: "application/gzip",
                headers: &[("Content-Encoding", "gzip")],
                body: &double,
            },
            Fixture::Response {
                url: "http://example.com/broken.js",
                content_type: "text/javascript",
                headers: &[("Content-Encoding", "gzip")],
                body: b"not gzip at all",
            },
            response("dns:example.com", "text/dns", b"example.com. 300 IN A 1.2.3.4"),
        ],
    );

    assert_stable(&input, temp.path());

    let files = tree_files(&temp.path().join("second"));
    assert_eq!(files["http:/example.com/members.txt"], b"part one, part two");
    assert_eq!(files["http:/example.com/a/__index__.html"], b"<p>page a</p>");
    assert_eq!(files["http:/example.com/chunked.txt"], b"hello");
    assert_eq!(files["http:/example.com/broken.js"], b"not gzip at all");
}

#[test]
fn test_compressed_entity_keeps_its_own_gzip() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in.warc");
    let inner = gzip(b"sitemap contents");
    write_warc(
        &input,
        &[Fixture::Response {
            url: "http://example.com/sitemap.xml.gz",
            content_type: "application/gzip",
            headers: &[("Content-Encoding", "gzip")],
            body: &gzip(&inner),
        }],
    );

    let tree = temp.path().join("tree");
    extract_archive(&input, &tree, &ExtractOptions::default()).unwrap();
    let file = tree.join("http:/example.com/sitemap.xml.gz");
    assert_eq!(fs::read(&file).unwrap(), inner);

    let output = temp.path().join("out.warc");
    create_archive(&tree, &output, &CreateOptions::default()).unwrap();

    // One layer of transport coding over the file's own gzip
    let records = read_warc(&output);
    let mut entity = Vec::new();
    GzDecoder::new(&records[0].payload[..])
        .read_to_end(&mut entity)
        .unwrap();
    assert_eq!(entity, inner);

    let again = temp.path().join("again");
    extract_archive(&output, &again, &ExtractOptions::default()).unwrap();
    assert_eq!(
        fs::read(again.join("http:/example.com/sitemap.xml.gz")).unwrap(),
        inner
    );
}

#[test]
fn test_stored_body_is_not_encoded_again() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in.warc");
    write_warc(
        &input,
        &[Fixture::Response {
            url: "http://example.com/broken.js",
            content_type: "text/javascript",
            headers: &[("Content-Encoding", "gzip")],
            body: b"not gzip at all",
        }],
    );

    let tree = temp.path().join("tree");
    extract_archive(&input, &tree, &ExtractOptions::default()).unwrap();
    let output = temp.path().join("out.warc");
    create_archive(&tree, &output, &CreateOptions::default()).unwrap();

    let records = read_warc(&output);
    assert_eq!(records[0].payload, b"not gzip at all");
    assert_eq!(records[0].header.headers.get(names::WARC_STORED_BODY), None);
}

#[test]
fn test_nested_page_edit_reaches_its_record() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in.warc");
    write_warc(
        &input,
        &[
            response("http://example.com/a/b.css", "text/css", b"p { margin: 0 }"),
            response("http://example.com/a", "text/html", b"<p>page a</p>"),
        ],
    );
    let tree = temp.path().join("tree");
    extract_archive(&input, &tree, &ExtractOptions::default()).unwrap();
    fs::write(tree.join("http:/example.com/a/__index__.html"), b"<p>edited</p>").unwrap();

    let output = temp.path().join("out.warc");
    let result = create_archive(&tree, &output, &CreateOptions::default()).unwrap();
    assert_eq!(result.records_substituted, 2);
    assert_eq!(result.records_synthesized, 0);

    let records = read_warc(&output);
    assert_eq!(common::payload_for(&records, "http://example.com/a"), b"<p>edited</p>");
    assert_eq!(
        common::payload_for(&records, "http://example.com/a/b.css"),
        b"p { margin: 0 }"
    );
}
