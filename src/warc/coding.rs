//! HTTP transfer and content codings.
//!
//! Extraction writes the entity body a browser would see: chunked transfer
//! coding is removed and gzip/deflate content coding is undone. Creation
//! applies the declared content coding again, so an extracted file can go
//! back into a record unchanged.

use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};

use flate2::Compression;
use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use tempfile::SpooledTempFile;

use super::HttpHeaders;
use super::names;

/// A `Content-Encoding` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentCoding {
    /// No coding.
    Identity,
    /// `gzip` or `x-gzip`.
    Gzip,
    /// `deflate` (zlib-wrapped).
    Deflate,
    /// A coding this crate does not undo; bodies pass through unchanged.
    Other(String),
}

impl ContentCoding {
    /// Parses a `Content-Encoding` value. Only the last listed coding
    /// counts; stacked codings are treated as [`Other`](Self::Other).
    pub fn parse(value: &str) -> Self {
        let codings: Vec<&str> = value
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("identity"))
            .collect();
        match codings.as_slice() {
            [] => Self::Identity,
            [single] => match single.to_ascii_lowercase().as_str() {
                "gzip" | "x-gzip" => Self::Gzip,
                "deflate" => Self::Deflate,
                other => Self::Other(other.to_string()),
            },
            _ => Self::Other(value.trim().to_string()),
        }
    }

    /// Reads the coding declared by an HTTP head.
    pub fn from_http(http: Option<&HttpHeaders>) -> Self {
        http.and_then(|h| h.header(names::CONTENT_ENCODING))
            .map(Self::parse)
            .unwrap_or(Self::Identity)
    }

    /// Returns `true` for codings that [`decode_payload`] undoes.
    pub fn is_reversible(&self) -> bool {
        matches!(self, Self::Gzip | Self::Deflate)
    }
}

/// Removes HTTP/1.1 chunked transfer coding from a stream.
///
/// Chunk extensions and trailers are discarded. A size line that is not
/// hexadecimal switches the decoder to pass-through for the rest of the
/// stream (including that line), so a mislabelled body is kept intact
/// rather than lost. End of stream inside a chunk ends the body.
pub struct ChunkedDecoder<R> {
    inner: R,
    state: ChunkState,
}

enum ChunkState {
    SizeLine,
    Data(u64),
    DataEnd,
    Trailer,
    Done,
    Passthrough(Vec<u8>, usize),
}

impl<R: BufRead> ChunkedDecoder<R> {
    /// Wraps a chunked stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            state: ChunkState::SizeLine,
        }
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        self.inner.read_until(b'\n', &mut line)?;
        Ok(line)
    }
}

fn parse_chunk_size(line: &[u8]) -> Option<u64> {
    let text = std::str::from_utf8(line).ok()?;
    let size = text.trim_end_matches(['\r', '\n']).split(';').next()?.trim();
    if size.is_empty() {
        return None;
    }
    u64::from_str_radix(size, 16).ok()
}

impl<R: BufRead> Read for ChunkedDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match &mut self.state {
                ChunkState::SizeLine => {
                    let line = self.read_line()?;
                    if line.is_empty() {
                        self.state = ChunkState::Done;
                        continue;
                    }
                    match parse_chunk_size(&line) {
                        Some(0) => self.state = ChunkState::Trailer,
                        Some(size) => self.state = ChunkState::Data(size),
                        None => {
                            log::debug!("invalid chunk size line, passing body through");
                            self.state = ChunkState::Passthrough(line, 0);
                        }
                    }
                }
                ChunkState::Data(left) => {
                    let limit = usize::try_from(*left).unwrap_or(usize::MAX).min(buf.len());
                    let n = self.inner.read(&mut buf[..limit])?;
                    if n == 0 {
                        self.state = ChunkState::Done;
                        return Ok(0);
                    }
                    *left -= n as u64;
                    if *left == 0 {
                        self.state = ChunkState::DataEnd;
                    }
                    return Ok(n);
                }
                ChunkState::DataEnd => {
                    let line = self.read_line()?;
                    self.state = if line.is_empty() {
                        ChunkState::Done
                    } else {
                        ChunkState::SizeLine
                    };
                }
                ChunkState::Trailer => {
                    let line = self.read_line()?;
                    if line.is_empty() || line == b"\r\n" || line == b"\n" {
                        self.state = ChunkState::Done;
                    }
                }
                ChunkState::Done => return Ok(0),
                ChunkState::Passthrough(pending, pos) => {
                    if *pos < pending.len() {
                        let n = (pending.len() - *pos).min(buf.len());
                        buf[..n].copy_from_slice(&pending[*pos..*pos + n]);
                        *pos += n;
                        return Ok(n);
                    }
                    return self.inner.read(buf);
                }
            }
        }
    }
}

/// Bodies larger than this spill from memory to a temporary file while
/// their content coding is undone.
const SPOOL_LIMIT: usize = 1 << 20;

/// How an entity body was written by [`decode_payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// Bytes written to the output.
    pub bytes_written: u64,
    /// `false` if a declared content coding could not be undone and the
    /// body was written as stored.
    pub decoded: bool,
}

/// Writes the decoded entity body of `payload` to `out`.
///
/// Identity bodies are streamed. Bodies with a reversible content coding are
/// spooled, decoded into a second spool and then copied out; if decoding
/// fails the stored bytes are written instead and a warning is logged.
pub fn decode_payload<R: BufRead, W: Write + ?Sized>(
    payload: R,
    http: Option<&HttpHeaders>,
    out: &mut W,
) -> io::Result<DecodeOutcome> {
    let chunked = http.is_some_and(HttpHeaders::is_chunked);
    if chunked {
        decode_entity(ChunkedDecoder::new(payload), http, out)
    } else {
        decode_entity(payload, http, out)
    }
}

fn decode_entity<R: Read, W: Write + ?Sized>(
    mut body: R,
    http: Option<&HttpHeaders>,
    out: &mut W,
) -> io::Result<DecodeOutcome> {
    let coding = ContentCoding::from_http(http);
    if !coding.is_reversible() {
        let bytes_written = io::copy(&mut body, out)?;
        return Ok(DecodeOutcome {
            bytes_written,
            decoded: true,
        });
    }

    let mut stored = SpooledTempFile::new(SPOOL_LIMIT);
    io::copy(&mut body, &mut stored)?;
    let mut decoded = SpooledTempFile::new(SPOOL_LIMIT);

    match decompress(&mut stored, &mut decoded, &coding) {
        Ok(_) => {
            decoded.seek(SeekFrom::Start(0))?;
            let bytes_written = io::copy(&mut decoded, out)?;
            Ok(DecodeOutcome {
                bytes_written,
                decoded: true,
            })
        }
        Err(e) => {
            log::warn!(
                "could not undo {:?} content coding ({}); keeping stored bytes",
                coding,
                e
            );
            stored.seek(SeekFrom::Start(0))?;
            let bytes_written = io::copy(&mut stored, out)?;
            Ok(DecodeOutcome {
                bytes_written,
                decoded: false,
            })
        }
    }
}

/// Decodes all of `stored` into `decoded`. Every gzip member is read.
fn decompress<S: Read + Seek>(
    stored: &mut S,
    decoded: &mut SpooledTempFile,
    coding: &ContentCoding,
) -> io::Result<u64> {
    stored.seek(SeekFrom::Start(0))?;
    match coding {
        ContentCoding::Gzip => io::copy(&mut MultiGzDecoder::new(BufReader::new(stored)), decoded),
        ContentCoding::Deflate => {
            let zlib = io::copy(&mut ZlibDecoder::new(BufReader::new(&mut *stored)), decoded);
            if zlib.is_ok() {
                return zlib;
            }
            // Some servers send raw deflate despite the zlib wrapping the
            // coding name promises.
            decoded.set_len(0)?;
            decoded.seek(SeekFrom::Start(0))?;
            stored.seek(SeekFrom::Start(0))?;
            io::copy(&mut DeflateDecoder::new(BufReader::new(stored)), decoded)
        }
        ContentCoding::Identity | ContentCoding::Other(_) => io::copy(stored, decoded),
    }
}

/// Applies `coding` to a file's bytes for storage in a record.
///
/// The coding is always applied: the file holds the decoded entity, even
/// when that entity is itself compressed data.
pub fn encode_payload(data: Vec<u8>, coding: &ContentCoding, level: u32) -> io::Result<Vec<u8>> {
    let level = Compression::new(level.min(9));
    match coding {
        ContentCoding::Gzip => {
            let mut enc = GzEncoder::new(Vec::with_capacity(data.len() / 2), level);
            enc.write_all(&data)?;
            enc.finish()
        }
        ContentCoding::Deflate => {
            let mut enc = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), level);
            enc.write_all(&data)?;
            enc.finish()
        }
        ContentCoding::Identity | ContentCoding::Other(_) => Ok(data),
    }
}
