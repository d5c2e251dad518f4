//! Shared test utilities for integration tests.
//!
//! WARC fixtures are written with the crate's own `WarcWriter`, so every
//! helper here produces well-formed framing; tests that need broken input
//! truncate or patch the bytes afterwards.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use waczfold::warc::{HeaderMap, HttpHeaders, RecordType, WarcHeader, WarcReader, WarcWriter, names};

/// One record to put in a fixture container.
pub enum Fixture<'a> {
    /// An HTTP response: URL, content type, extra HTTP headers, body as sent.
    Response {
        url: &'a str,
        content_type: &'a str,
        headers: &'a [(&'a str, &'a str)],
        body: &'a [u8],
    },
    /// A request record for `url`.
    Request { url: &'a str },
    /// A `warcinfo` record.
    Info,
    /// A `resource` record without HTTP framing.
    Resource {
        url: &'a str,
        content_type: &'a str,
        body: &'a [u8],
    },
}

/// Shorthand for a plain 200 response.
pub fn response<'a>(url: &'a str, content_type: &'a str, body: &'a [u8]) -> Fixture<'a> {
    Fixture::Response {
        url,
        content_type,
        headers: &[],
        body,
    }
}

fn warc_header(record_type: RecordType, url: Option<&str>, content_type: &str) -> WarcHeader {
    let mut header = WarcHeader::new(record_type);
    header
        .headers
        .append(names::WARC_RECORD_ID, "<urn:uuid:00000000-0000-4000-8000-000000000000>");
    header.headers.append(names::WARC_DATE, "2024-03-01T12:00:00Z");
    if let Some(url) = url {
        header.headers.append(names::WARC_TARGET_URI, url);
    }
    header.headers.append(names::CONTENT_TYPE, content_type);
    header
}

/// Writes `records` to a container at `path`; gzip when the name ends in `.gz`.
pub fn write_warc(path: &Path, records: &[Fixture<'_>]) {
    let gzip = path.to_string_lossy().ends_with(".gz");
    let mut writer = WarcWriter::create_path(path, gzip).expect("create fixture");

    for record in records {
        match record {
            Fixture::Response {
                url,
                content_type,
                headers,
                body,
            } => {
                let mut header = warc_header(
                    RecordType::Response,
                    Some(url),
                    "application/http; msgtype=response",
                );
                let mut fields = HeaderMap::new();
                fields.append(names::CONTENT_TYPE, *content_type);
                let chunked = headers.iter().any(|(k, v)| {
                    k.eq_ignore_ascii_case("transfer-encoding") && v.contains("chunked")
                });
                if !chunked {
                    fields.append(names::CONTENT_LENGTH, body.len().to_string());
                }
                for (name, value) in *headers {
                    fields.append(*name, *value);
                }
                let http = HttpHeaders::new("HTTP/1.1 200 OK", fields);
                writer
                    .write_record_bytes(&mut header, Some(&http), body)
                    .expect("write response");
            }
            Fixture::Request { url } => {
                let mut header = warc_header(
                    RecordType::Request,
                    Some(url),
                    "application/http; msgtype=request",
                );
                let mut fields = HeaderMap::new();
                fields.append("Host", "example.com");
                let http = HttpHeaders::new(format!("GET {} HTTP/1.1", url), fields);
                writer
                    .write_record_bytes(&mut header, Some(&http), b"")
                    .expect("write request");
            }
            Fixture::Info => {
                let mut header = warc_header(RecordType::Warcinfo, None, "application/warc-fields");
                writer
                    .write_record_bytes(&mut header, None, b"software: waczfold tests\r\n")
                    .expect("write warcinfo");
            }
            Fixture::Resource {
                url,
                content_type,
                body,
            } => {
                let mut header = warc_header(RecordType::Resource, Some(url), content_type);
                writer
                    .write_record_bytes(&mut header, None, body)
                    .expect("write resource");
            }
        }
    }
    writer.finish().expect("finish fixture");
}

/// A record as read back from a container.
#[derive(Debug, Clone)]
pub struct ReadRecord {
    pub record_type: RecordType,
    pub url: Option<String>,
    pub http: Option<HttpHeaders>,
    pub header: WarcHeader,
    pub payload: Vec<u8>,
}

/// Reads every record of the container at `path`.
pub fn read_warc(path: &Path) -> Vec<ReadRecord> {
    let mut reader = WarcReader::open_path(path).expect("open container");
    let mut records = Vec::new();
    while let Some(mut record) = reader.next_record().expect("read record") {
        let payload = record.read_payload().expect("read payload");
        records.push(ReadRecord {
            record_type: record.header().record_type(),
            url: record.header().target_uri().map(str::to_string),
            http: record.http().cloned(),
            header: record.header().clone(),
            payload,
        });
    }
    records
}

/// Returns the payload of the response for `url`.
pub fn payload_for(records: &[ReadRecord], url: &str) -> Vec<u8> {
    records
        .iter()
        .find(|r| r.record_type == RecordType::Response && r.url.as_deref() == Some(url))
        .map(|r| r.payload.clone())
        .unwrap_or_else(|| panic!("no response for {}", url))
}

/// Writes `contents` to `root/relative`, creating parents.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parents");
    }
    fs::write(&path, contents).expect("write file");
    path
}

/// The two-record capture of example.com used across the tests.
pub fn example_site(path: &Path) {
    write_warc(
        path,
        &[
            Fixture::Info,
            Fixture::Request {
                url: "http://example.com/",
            },
            response("http://example.com/", "text/html", b"<html>hello</html>"),
            response("http://example.com/favicon.ico", "image/x-icon", b"\x00\x00\x01\x00icon"),
        ],
    );
}
