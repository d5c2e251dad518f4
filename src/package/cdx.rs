//! CDXJ index of the records in a set of containers.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

use flate2::bufread::GzDecoder;
use serde::Serialize;

use super::surt::surt;
use crate::format::detect::is_gzip;
use crate::mime::essence;
use crate::warc::{Record, RecordType, WarcReader, digest, names};
use crate::Result;

/// One indexed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// SURT key of the URL.
    pub surt: String,
    /// 14-digit capture timestamp.
    pub timestamp: String,
    /// `WARC-Date` as written.
    pub date: String,
    /// Target URL.
    pub url: String,
    /// Record type.
    pub record_type: RecordType,
    /// Media type of the payload, without parameters.
    pub mime: Option<String>,
    /// HTTP status, for records with an HTTP head.
    pub status: Option<u16>,
    /// Payload digest.
    pub digest: String,
    /// Byte offset of the record in its container file.
    pub offset: u64,
    /// Length of the record in its container file.
    pub length: u64,
    /// Container file name inside `archive/`.
    pub filename: String,
}

#[derive(Serialize)]
struct CdxjFields<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    digest: &'a str,
    length: String,
    offset: String,
    filename: &'a str,
}

impl IndexEntry {
    /// Renders the entry as one CDXJ line, without the newline.
    pub fn to_cdxj(&self) -> Result<String> {
        let fields = CdxjFields {
            url: &self.url,
            mime: self.mime.as_deref(),
            status: self.status.map(|s| s.to_string()),
            digest: &self.digest,
            length: self.length.to_string(),
            offset: self.offset.to_string(),
            filename: &self.filename,
        };
        Ok(format!(
            "{} {} {}",
            self.surt,
            self.timestamp,
            serde_json::to_string(&fields)?
        ))
    }
}

/// Indexes the response, revisit and resource records of a container file.
///
/// Offsets and lengths are in file bytes: for a `.warc.gz` they describe
/// the gzip member holding the record.
pub fn index_container(path: &Path, filename: &str) -> Result<Vec<IndexEntry>> {
    let mut input = CountingReader::new(BufReader::new(File::open(path)?));
    let mut entries = Vec::new();

    if !is_gzip(input.fill_buf()?) {
        let mut reader = WarcReader::new(input);
        let mut open: Option<IndexEntry> = None;
        while let Some(mut record) = reader.next_record()? {
            let offset = record.offset();
            if let Some(mut entry) = open.take() {
                entry.length = offset - entry.offset;
                entries.push(entry);
            }
            open = entry_for(&mut record, filename)?.map(|mut entry| {
                entry.offset = offset;
                entry
            });
        }
        if let Some(mut entry) = open {
            entry.length = reader.offset() - entry.offset;
            entries.push(entry);
        }
        return Ok(entries);
    }

    while !input.fill_buf()?.is_empty() {
        let start = input.position();
        let mut member = GzDecoder::new(&mut input);
        let mut found = Vec::new();
        {
            let mut reader = WarcReader::new(BufReader::new(&mut member));
            while let Some(mut record) = reader.next_record()? {
                if let Some(entry) = entry_for(&mut record, filename)? {
                    found.push(entry);
                }
            }
        }
        io::copy(&mut member, &mut io::sink())?;
        drop(member);

        let end = input.position();
        for mut entry in found {
            entry.offset = start;
            entry.length = end - start;
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn entry_for<R: BufRead>(
    record: &mut Record<'_, R>,
    filename: &str,
) -> Result<Option<IndexEntry>> {
    let header = record.header();
    let record_type = header.record_type();
    if !matches!(
        record_type,
        RecordType::Response | RecordType::Revisit | RecordType::Resource
    ) {
        return Ok(None);
    }
    let Some(url) = header.target_uri().map(str::to_string) else {
        return Ok(None);
    };

    let date = header.date().unwrap_or_default().to_string();
    let timestamp: String = date.chars().filter(char::is_ascii_digit).take(14).collect();
    let (mime, status) = match record.http() {
        Some(http) => (http.content_type().map(essence), http.status_code()),
        None if record_type == RecordType::Resource => (header.content_type().map(essence), None),
        None => (None, None),
    };
    let declared = header
        .headers
        .get(names::WARC_PAYLOAD_DIGEST)
        .map(str::to_string);

    let digest = match declared {
        Some(d) => d,
        None => digest::compute_stream(None, record.payload())?.0.payload,
    };

    Ok(Some(IndexEntry {
        surt: surt(&url),
        timestamp,
        date,
        url,
        record_type,
        mime,
        status,
        digest,
        offset: 0,
        length: 0,
        filename: filename.to_string(),
    }))
}

/// Writes entries as a sorted CDXJ file.
pub fn write_cdxj<W: Write>(entries: &[IndexEntry], out: &mut W) -> Result<()> {
    let mut lines = entries
        .iter()
        .map(IndexEntry::to_cdxj)
        .collect::<Result<Vec<_>>>()?;
    lines.sort();
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

/// A `BufRead` that counts consumed bytes.
struct CountingReader<R> {
    inner: R,
    position: u64,
}

impl<R: BufRead> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    fn position(&self) -> u64 {
        self.position
    }
}

impl<R: BufRead> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> BufRead for CountingReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.position += amt as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warc::{HeaderMap, HttpHeaders, WarcHeader, WarcWriter};

    fn response(url: &str, body: &[u8]) -> (WarcHeader, HttpHeaders) {
        let mut header = WarcHeader::new(RecordType::Response);
        header.headers.append(names::WARC_TARGET_URI, url);
        header.headers.append(names::WARC_DATE, "2024-03-01T12:30:45Z");
        header
            .headers
            .append(names::CONTENT_TYPE, "application/http; msgtype=response");
        let mut fields = HeaderMap::new();
        fields.append(names::CONTENT_TYPE, "text/html; charset=utf-8");
        fields.append(names::CONTENT_LENGTH, body.len().to_string());
        (header, HttpHeaders::new("HTTP/1.1 200 OK", fields))
    }

    fn write_container(path: &Path, gzip: bool) -> Vec<u64> {
        let mut writer = WarcWriter::create_path(path, gzip).unwrap();
        let mut offsets = Vec::new();

        let mut info = WarcHeader::new(RecordType::Warcinfo);
        info.headers.append(names::CONTENT_TYPE, "application/warc-fields");
        offsets.push(writer.write_record_bytes(&mut info, None, b"software: test\r\n").unwrap().offset);

        for (url, body) in [("http://example.com/", &b"<p>a</p>"[..]), ("http://example.com/b", &b"bb"[..])] {
            let (mut header, http) = response(url, body);
            offsets.push(writer.write_record_bytes(&mut header, Some(&http), body).unwrap().offset);
        }
        writer.finish().unwrap();
        offsets.push(std::fs::metadata(path).unwrap().len());
        offsets
    }

    #[test]
    fn test_index_plain_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.warc");
        let offsets = write_container(&path, false);

        let entries = index_container(&path, "data.warc").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].surt, "com,example)/");
        assert_eq!(entries[0].timestamp, "20240301123045");
        assert_eq!(entries[0].mime.as_deref(), Some("text/html"));
        assert_eq!(entries[0].status, Some(200));
        assert_eq!(entries[0].offset, offsets[1]);
        assert_eq!(entries[0].length, offsets[2] - offsets[1]);
        assert_eq!(entries[1].offset, offsets[2]);
        assert_eq!(entries[1].length, offsets[3] - offsets[2]);
        assert!(entries[0].digest.starts_with("sha256:"));
    }

    #[test]
    fn test_index_gzip_members() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.warc.gz");
        let offsets = write_container(&path, true);

        let entries = index_container(&path, "data.warc.gz").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].offset, offsets[1]);
        assert_eq!(entries[0].length, offsets[2] - offsets[1]);
        assert_eq!(entries[1].offset, offsets[2]);
        assert_eq!(entries[1].length, offsets[3] - offsets[2]);
        assert_eq!(entries[1].url, "http://example.com/b");
    }

    #[test]
    fn test_cdxj_lines_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.warc");
        write_container(&path, false);
        let mut entries = index_container(&path, "data.warc").unwrap();
        entries.reverse();

        let mut out = Vec::new();
        write_cdxj(&entries, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("com,example)/ 20240301123045 {"));
        assert!(lines[1].starts_with("com,example)/b "));

        let json: serde_json::Value =
            serde_json::from_str(lines[0].splitn(3, ' ').nth(2).unwrap()).unwrap();
        assert_eq!(json["status"], "200");
        assert_eq!(json["filename"], "data.warc");
    }
}
