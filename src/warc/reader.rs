//! Sequential WARC record reader.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::bufread::MultiGzDecoder;

use super::{HeaderMap, HttpHeaders, WarcHeader};
use crate::format::detect::is_gzip;
use crate::{Error, Result};

/// Longest header line accepted before the stream is declared corrupt.
const MAX_LINE_LEN: u64 = 64 * 1024;

/// A container byte stream, transparently gunzipped if it starts with the
/// gzip magic.
pub enum ContainerInput<R: Read> {
    /// Uncompressed record stream.
    Plain(BufReader<R>),
    /// Concatenated gzip members.
    Gzip(BufReader<MultiGzDecoder<BufReader<R>>>),
}

impl<R: Read> ContainerInput<R> {
    /// Wraps `reader`, sniffing its first bytes.
    pub fn new(reader: R) -> io::Result<Self> {
        let mut buffered = BufReader::new(reader);
        if is_gzip(buffered.fill_buf()?) {
            Ok(Self::Gzip(BufReader::new(MultiGzDecoder::new(buffered))))
        } else {
            Ok(Self::Plain(buffered))
        }
    }

    /// Returns `true` if the stream was gzip-compressed.
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Gzip(_))
    }
}

impl<R: Read> Read for ContainerInput<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(r) => r.read(buf),
            Self::Gzip(r) => r.read(buf),
        }
    }
}

impl<R: Read> BufRead for ContainerInput<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            Self::Plain(r) => r.fill_buf(),
            Self::Gzip(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            Self::Plain(r) => r.consume(amt),
            Self::Gzip(r) => r.consume(amt),
        }
    }
}

/// Reads records one at a time from a WARC stream.
///
/// Records are lent: each [`Record`] borrows the reader, and its payload is
/// read straight from the underlying stream. Whatever part of a payload the
/// caller leaves unread is skipped by the next call to
/// [`next_record`](Self::next_record).
///
/// ```rust,no_run
/// use waczfold::warc::WarcReader;
///
/// let mut reader = WarcReader::open_path("crawl.warc.gz")?;
/// while let Some(record) = reader.next_record()? {
///     println!("{} {:?}", record.header().record_type(), record.header().target_uri());
/// }
/// # Ok::<(), waczfold::Error>(())
/// ```
pub struct WarcReader<R> {
    inner: R,
    offset: u64,
    remaining: u64,
    line: Vec<u8>,
}

impl WarcReader<ContainerInput<File>> {
    /// Opens a `.warc` or `.warc.gz` file.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(ContainerInput::new(file)?))
    }

    /// Returns `true` if the underlying file is gzip-compressed.
    pub fn is_compressed(&self) -> bool {
        self.inner.is_compressed()
    }
}

impl<R: BufRead> WarcReader<R> {
    /// Creates a reader over an uncompressed record stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            remaining: 0,
            line: Vec::new(),
        }
    }

    /// Returns the number of (uncompressed) bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next record header, or returns `None` at end of stream.
    ///
    /// For request, response and revisit records whose block is
    /// `application/http`, the HTTP message head is parsed as well and the
    /// returned payload starts at the entity body.
    pub fn next_record(&mut self) -> Result<Option<Record<'_, R>>> {
        self.skip_remaining()?;

        let Some((start, version)) = self.read_version_line()? else {
            return Ok(None);
        };

        let mut headers = HeaderMap::new();
        loop {
            if self.read_line(start)? == 0 {
                return Err(Error::corrupt_record(
                    start,
                    "unexpected end of file in record header",
                ));
            }
            if is_blank(&self.line) {
                break;
            }
            headers.push_line(&String::from_utf8_lossy(&self.line));
        }

        let header = WarcHeader { version, headers };
        let length = header.content_length().ok_or_else(|| {
            Error::corrupt_record(start, "missing or invalid Content-Length")
        })?;
        self.remaining = length;

        let carries_http = header.is_http() && header.record_type().carries_http();
        let mut payload = Payload { reader: self };
        let http = if carries_http {
            HttpHeaders::read_from(&mut payload).map_err(|e| truncation(start, e))?
        } else {
            None
        };

        let payload_len = payload.remaining();
        Ok(Some(Record {
            offset: start,
            header,
            http,
            payload_len,
            payload,
        }))
    }

    /// Skips whatever is left of the current record's block.
    fn skip_remaining(&mut self) -> Result<()> {
        if self.remaining == 0 {
            return Ok(());
        }
        let offset = self.offset;
        let mut payload = Payload { reader: self };
        io::copy(&mut payload, &mut io::sink()).map_err(|e| truncation(offset, e))?;
        Ok(())
    }

    /// Skips blank lines (record trailers) and returns the version line.
    fn read_version_line(&mut self) -> Result<Option<(u64, String)>> {
        loop {
            let start = self.offset;
            if self.read_line(start)? == 0 {
                return Ok(None);
            }
            if is_blank(&self.line) {
                continue;
            }
            let line = String::from_utf8_lossy(&self.line);
            let line = line.trim_end_matches(['\r', '\n']);
            if !line.starts_with("WARC/") {
                let shown: String = line.chars().take(40).collect();
                return Err(Error::corrupt_record(
                    start,
                    format!("expected WARC version line, found {:?}", shown),
                ));
            }
            return Ok(Some((start, line.to_string())));
        }
    }

    fn read_line(&mut self, record_start: u64) -> Result<usize> {
        self.line.clear();
        let n = (&mut self.inner)
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut self.line)
            .map_err(|e| truncation(record_start, e))?;
        self.offset += n as u64;
        if n as u64 == MAX_LINE_LEN && self.line.last() != Some(&b'\n') {
            return Err(Error::corrupt_record(record_start, "header line too long"));
        }
        Ok(n)
    }
}

fn is_blank(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

fn truncation(offset: u64, err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => Error::corrupt_record(offset, "record block truncated"),
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
            Error::corrupt_record(offset, format!("corrupt compressed stream: {}", err))
        }
        _ => Error::Io(err),
    }
}

/// A record lent by [`WarcReader::next_record`].
pub struct Record<'a, R> {
    offset: u64,
    header: WarcHeader,
    http: Option<HttpHeaders>,
    payload_len: u64,
    payload: Payload<'a, R>,
}

impl<'a, R: BufRead> Record<'a, R> {
    /// Offset of the version line in the uncompressed stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the WARC header.
    pub fn header(&self) -> &WarcHeader {
        &self.header
    }

    /// Returns the parsed HTTP head, if the block carries one.
    pub fn http(&self) -> Option<&HttpHeaders> {
        self.http.as_ref()
    }

    /// Length of the payload: the block minus any HTTP head.
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Returns the payload stream.
    pub fn payload(&mut self) -> &mut Payload<'a, R> {
        &mut self.payload
    }

    /// Reads the rest of the payload into memory.
    pub fn read_payload(&mut self) -> Result<Vec<u8>> {
        let offset = self.offset;
        let mut out = Vec::new();
        self.payload
            .read_to_end(&mut out)
            .map_err(|e| truncation(offset, e))?;
        Ok(out)
    }

    /// Splits the record into header, HTTP head and payload stream.
    pub fn into_parts(self) -> (WarcHeader, Option<HttpHeaders>, Payload<'a, R>) {
        (self.header, self.http, self.payload)
    }
}

/// The unread part of a record's block.
///
/// Reading past the declared length returns end of stream; hitting end of
/// stream before it is an [`io::ErrorKind::UnexpectedEof`] error.
pub struct Payload<'a, R> {
    reader: &'a mut WarcReader<R>,
}

impl<R: BufRead> Payload<'_, R> {
    /// Bytes left in the block.
    pub fn remaining(&self) -> u64 {
        self.reader.remaining
    }
}

impl<R: BufRead> Read for Payload<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for Payload<'_, R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let remaining = self.reader.remaining;
        if remaining == 0 {
            return Ok(&[]);
        }
        let buf = self.reader.inner.fill_buf()?;
        if buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "record block truncated",
            ));
        }
        let limit = usize::try_from(remaining).unwrap_or(usize::MAX);
        Ok(&buf[..buf.len().min(limit)])
    }

    fn consume(&mut self, amt: usize) {
        self.reader.inner.consume(amt);
        self.reader.remaining -= amt as u64;
        self.reader.offset += amt as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warc::RecordType;
    use std::io::{Cursor, Write};

    fn record(kind: &str, extra: &str, block: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write!(
            out,
            "WARC/1.0\r\nWARC-Type: {}\r\n{}Content-Length: {}\r\n\r\n",
            kind,
            extra,
            block.len()
        )
        .unwrap();
        out.extend_from_slice(block);
        out.extend_from_slice(b"\r\n\r\n");
        out
    }

    #[test]
    fn test_reads_records_in_order() {
        let http = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nhello";
        let data = [
            record("warcinfo", "", b"software: test\r\n"),
            record(
                "response",
                concat!(
                    "WARC-Target-URI: http://example.com/\r\n",
                    "Content-Type: application/http; msgtype=response\r\n",
                ),
                http,
            ),
        ]
        .concat();

        let mut reader = WarcReader::new(Cursor::new(data));

        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.header().record_type(), RecordType::Warcinfo);
        assert!(first.http().is_none());
        assert_eq!(first.offset(), 0);

        let mut second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.header().target_uri(), Some("http://example.com/"));
        assert_eq!(second.http().unwrap().status_code(), Some(200));
        assert_eq!(second.payload_len(), 5);
        assert_eq!(second.read_payload().unwrap(), b"hello");

        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_unread_payload_is_skipped() {
        let data = [
            record("resource", "", b"0123456789"),
            record("metadata", "", b"x"),
        ]
        .concat();
        let mut reader = WarcReader::new(Cursor::new(data));

        let mut first = reader.next_record().unwrap().unwrap();
        let mut two = [0u8; 2];
        first.payload().read_exact(&mut two).unwrap();
        assert_eq!(&two, b"01");

        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.header().record_type(), RecordType::Metadata);
    }

    #[test]
    fn test_reads_gzip_members() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let mut data = Vec::new();
        for block in [&b"one"[..], &b"two"[..]] {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(&record("resource", "", block)).unwrap();
            data.extend(enc.finish().unwrap());
        }

        let input = ContainerInput::new(Cursor::new(data)).unwrap();
        assert!(input.is_compressed());
        let mut reader = WarcReader::new(input);
        let mut bodies = Vec::new();
        while let Some(mut rec) = reader.next_record().unwrap() {
            bodies.push(rec.read_payload().unwrap());
        }
        assert_eq!(bodies, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn test_missing_content_length_is_corrupt() {
        let data = b"WARC/1.0\r\nWARC-Type: resource\r\n\r\n".to_vec();
        let mut reader = WarcReader::new(Cursor::new(data));
        let err = reader.next_record().err().unwrap();
        assert!(matches!(err, Error::CorruptRecord { offset: 0, .. }));
    }

    #[test]
    fn test_truncated_block_is_corrupt() {
        let mut data = record("resource", "", b"0123456789");
        data.truncate(data.len() - 10);
        let mut reader = WarcReader::new(Cursor::new(data));
        let mut rec = reader.next_record().unwrap().unwrap();
        assert!(rec.read_payload().unwrap_err().is_corruption());
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let mut reader = WarcReader::new(Cursor::new(b"GET / HTTP/1.1\r\n".to_vec()));
        assert!(matches!(
            reader.next_record(),
            Err(Error::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_empty_stream() {
        let mut reader = WarcReader::new(Cursor::new(Vec::new()));
        assert!(reader.next_record().unwrap().is_none());
    }
}
