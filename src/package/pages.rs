//! `pages/pages.jsonl` generation.

use std::io::Write;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::cdx::IndexEntry;
use crate::warc::RecordType;
use crate::Result;

/// File name of the generated page list inside `pages/`.
pub const PAGES_FILE: &str = "pages.jsonl";

const PAGES_FORMAT: &str = "json-pages-1.0";

#[derive(Serialize)]
struct PagesHeader<'a> {
    format: &'a str,
    id: &'a str,
    title: &'a str,
}

/// One line of a page list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Stable identifier derived from the URL and capture date.
    pub id: String,
    /// Page URL.
    pub url: String,
    /// Capture date as written in the record.
    pub ts: String,
}

/// Returns `true` for a successful HTML capture of an http(s) URL.
pub fn is_page(entry: &IndexEntry) -> bool {
    let lower = entry.url.to_ascii_lowercase();
    entry.record_type == RecordType::Response
        && (lower.starts_with("http:") || lower.starts_with("https:"))
        && entry.status.is_some_and(|s| (200..300).contains(&s))
        && entry.mime.as_deref() == Some("text/html")
}

/// Collects the pages among `entries`, in capture order, one per URL.
pub fn collect_pages(entries: &[IndexEntry]) -> Vec<Page> {
    let mut seen = std::collections::HashSet::new();
    entries
        .iter()
        .filter(|e| is_page(e) && seen.insert(e.url.as_str()))
        .map(|e| Page {
            id: page_id(&e.url, &e.date),
            url: e.url.clone(),
            ts: e.date.clone(),
        })
        .collect()
}

fn page_id(url: &str, date: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.as_bytes());
    hasher.update(b" ");
    hasher.update(url.as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

/// Writes a page list: the header line, then one line per page.
pub fn write_pages<W: Write>(pages: &[Page], out: &mut W) -> Result<()> {
    let header = PagesHeader {
        format: PAGES_FORMAT,
        id: "pages",
        title: "All Pages",
    };
    writeln!(out, "{}", serde_json::to_string(&header)?)?;
    for page in pages {
        writeln!(out, "{}", serde_json::to_string(page)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, status: Option<u16>, mime: Option<&str>) -> IndexEntry {
        IndexEntry {
            surt: super::super::surt(url),
            timestamp: "20240301000000".into(),
            date: "2024-03-01T00:00:00Z".into(),
            url: url.into(),
            record_type: RecordType::Response,
            mime: mime.map(String::from),
            status,
            digest: "sha256:00".into(),
            offset: 0,
            length: 0,
            filename: "data.warc.gz".into(),
        }
    }

    #[test]
    fn test_only_html_successes_are_pages() {
        let entries = vec![
            entry("http://example.com/", Some(200), Some("text/html")),
            entry("http://example.com/favicon.ico", Some(200), Some("image/x-icon")),
            entry("http://example.com/gone", Some(404), Some("text/html")),
            entry("file:///notes.html", None, Some("text/html")),
            entry("http://example.com/", Some(200), Some("text/html")),
        ];
        let pages = collect_pages(&entries);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, "http://example.com/");
        assert_eq!(pages[0].id.len(), 32);
    }

    #[test]
    fn test_page_list_layout() {
        let pages = collect_pages(&[entry("https://a.test/", Some(200), Some("text/html"))]);
        let mut out = Vec::new();
        write_pages(&pages, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(r#"{"format":"json-pages-1.0","id":"pages","title":"All Pages"}"#)
        );
        let page: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(page["url"], "https://a.test/");
        assert_eq!(page["ts"], "2024-03-01T00:00:00Z");
        assert!(lines.next().is_none());
    }
}
