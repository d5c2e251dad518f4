//! WARC record writer.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

use super::{HttpHeaders, WarcHeader, names};
use crate::Result;

/// Default gzip level for compressed containers.
pub const DEFAULT_LEVEL: u32 = 6;

/// Where a record landed in the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLocation {
    /// Byte offset of the record (or its gzip member) in the file.
    pub offset: u64,
    /// Length in bytes, compressed if the writer compresses.
    pub length: u64,
}

/// Writes records to a WARC stream, one gzip member per record when
/// compressing.
///
/// `Content-Length` is always recomputed from the HTTP head and payload
/// length; the value passed in is overwritten.
pub struct WarcWriter<W: Write> {
    inner: CountingWriter<W>,
    gzip: bool,
    level: u32,
    records_written: usize,
}

impl WarcWriter<BufWriter<File>> {
    /// Creates (or truncates) a file at `path`.
    pub fn create_path(path: impl AsRef<Path>, gzip: bool) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file), gzip))
    }
}

impl<W: Write> WarcWriter<W> {
    /// Creates a writer over `inner`.
    pub fn new(inner: W, gzip: bool) -> Self {
        Self {
            inner: CountingWriter {
                inner,
                count: 0,
            },
            gzip,
            level: DEFAULT_LEVEL,
            records_written: 0,
        }
    }

    /// Sets the gzip level (0-9, clamped).
    pub fn level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    /// Returns `true` if records are gzip-compressed.
    pub fn is_compressed(&self) -> bool {
        self.gzip
    }

    /// Returns the number of records written so far.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Writes one record.
    ///
    /// Exactly `payload_len` bytes are copied from `payload`; a shorter
    /// source is an [`io::ErrorKind::UnexpectedEof`] error.
    pub fn write_record<P: Read>(
        &mut self,
        header: &mut WarcHeader,
        http: Option<&HttpHeaders>,
        payload: P,
        payload_len: u64,
    ) -> Result<RecordLocation> {
        let block_len = http.map(HttpHeaders::encoded_len).unwrap_or(0) + payload_len;
        header
            .headers
            .set(names::CONTENT_LENGTH, block_len.to_string());

        let offset = self.inner.count;
        if self.gzip {
            let mut encoder = GzEncoder::new(&mut self.inner, Compression::new(self.level));
            write_record_body(&mut encoder, header, http, payload, payload_len)?;
            encoder.finish()?;
        } else {
            write_record_body(&mut self.inner, header, http, payload, payload_len)?;
        }
        self.records_written += 1;

        Ok(RecordLocation {
            offset,
            length: self.inner.count - offset,
        })
    }

    /// Writes a record whose payload is already in memory.
    pub fn write_record_bytes(
        &mut self,
        header: &mut WarcHeader,
        http: Option<&HttpHeaders>,
        payload: &[u8],
    ) -> Result<RecordLocation> {
        self.write_record(header, http, payload, payload.len() as u64)
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(self) -> Result<W> {
        let mut inner = self.inner.inner;
        inner.flush()?;
        Ok(inner)
    }
}

fn write_record_body<W: Write, P: Read>(
    w: &mut W,
    header: &WarcHeader,
    http: Option<&HttpHeaders>,
    payload: P,
    payload_len: u64,
) -> io::Result<()> {
    write!(w, "{}\r\n", header.version)?;
    header.headers.write_to(w)?;
    w.write_all(b"\r\n")?;
    if let Some(http) = http {
        http.write_to(w)?;
    }
    let copied = io::copy(&mut payload.take(payload_len), w)?;
    if copied != payload_len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("payload ended after {} of {} bytes", copied, payload_len),
        ));
    }
    w.write_all(b"\r\n\r\n")
}

struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
