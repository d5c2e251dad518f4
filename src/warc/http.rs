//! The HTTP message head inside request, response and revisit blocks.

use std::io::{self, BufRead, Write};

use super::headers::HeaderMap;
use super::names;

/// Status line and header fields of an embedded HTTP message.
///
/// The bytes the head was parsed from are kept, and an unmodified head is
/// written back byte for byte. Any mutation switches rendering to the
/// normalized `Name: value\r\n` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeaders {
    status_line: String,
    headers: HeaderMap,
    raw: Option<Vec<u8>>,
}

impl HttpHeaders {
    /// Creates a head with the given status (or request) line.
    pub fn new(status_line: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            status_line: status_line.into(),
            headers,
            raw: None,
        }
    }

    /// Reads a message head up to and including the empty line.
    ///
    /// Returns `None` if the stream is empty or does not start with an HTTP
    /// request or status line; nothing beyond the first line is consumed in
    /// that case, and callers should treat the block as opaque. A head cut
    /// short by end of stream is accepted as-is.
    pub fn read_from<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<Option<Self>> {
        if !starts_like_http(reader.fill_buf()?) {
            return Ok(None);
        }

        let mut raw = Vec::new();
        let mut line = Vec::new();

        let n = reader.read_until(b'\n', &mut line)?;
        raw.extend_from_slice(&line[..n]);
        let status_line = String::from_utf8_lossy(&line)
            .trim_end_matches(['\r', '\n'])
            .to_string();

        let mut headers = HeaderMap::new();
        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&line);
            if line == b"\r\n" || line == b"\n" {
                break;
            }
            headers.push_line(&String::from_utf8_lossy(&line));
        }

        Ok(Some(Self {
            status_line,
            headers,
            raw: Some(raw),
        }))
    }

    /// Returns the first line without its terminator.
    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// Returns the numeric status of a response head.
    pub fn status_code(&self) -> Option<u16> {
        if !self.status_line.starts_with("HTTP/") {
            return None;
        }
        self.status_line.split_whitespace().nth(1)?.parse().ok()
    }

    /// Returns the first value of a header field.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Returns all header fields.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets a header field.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.set(name, value);
        self.raw = None;
    }

    /// Removes a header field, returning its first value.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        let removed = self.headers.remove(name);
        if removed.is_some() {
            self.raw = None;
        }
        removed
    }

    /// Returns the declared entity media type.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(names::CONTENT_TYPE)
    }

    /// Returns `true` if the entity uses chunked transfer coding.
    pub fn is_chunked(&self) -> bool {
        self.headers
            .get(names::TRANSFER_ENCODING)
            .map(|v| {
                v.split(',')
                    .any(|c| c.trim().eq_ignore_ascii_case("chunked"))
            })
            .unwrap_or(false)
    }

    /// Returns the number of bytes [`write_to`](Self::write_to) produces.
    pub fn encoded_len(&self) -> u64 {
        match &self.raw {
            Some(raw) => raw.len() as u64,
            None => self.status_line.len() as u64 + 2 + self.headers.encoded_len() + 2,
        }
    }

    /// Writes the head, including the terminating empty line.
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        if let Some(raw) = &self.raw {
            return w.write_all(raw);
        }
        write!(w, "{}\r\n", self.status_line)?;
        self.headers.write_to(w)?;
        w.write_all(b"\r\n")
    }

    /// Returns the rendered head as bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len() as usize);
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut out);
        out
    }
}

/// Checks for `HTTP/` (a status line) or `TOKEN SP` (a request line).
fn starts_like_http(buf: &[u8]) -> bool {
    if buf.starts_with(b"HTTP/") {
        return true;
    }
    let method_len = buf
        .iter()
        .take_while(|b| b.is_ascii_uppercase())
        .count();
    method_len > 0 && buf.get(method_len) == Some(&b' ')
}
