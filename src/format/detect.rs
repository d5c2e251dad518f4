//! Content sniffing by magic bytes.
//!
//! File extensions decide what a path is meant to be; the signatures here
//! confirm what the bytes actually are, so a `.warc` that is really gzip (or
//! a `.wacz` that is not a zip) is read correctly or rejected early.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::{Error, Result};

/// gzip member header: 0x1F 0x8B.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Byte signature of a container or package file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signature {
    /// gzip stream (a compressed WARC, or a gzip-coded payload).
    Gzip,
    /// ZIP archive (a WACZ package).
    Zip,
    /// Uncompressed WARC record stream.
    Warc,
    /// Anything else.
    Unknown,
}

impl Signature {
    /// Returns a human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Signature::Gzip => "gzip",
            Signature::Zip => "ZIP",
            Signature::Warc => "WARC",
            Signature::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const SIGNATURES: &[(&[u8], Signature)] = &[
    (&GZIP_MAGIC, Signature::Gzip),
    // local file header
    (&[0x50, 0x4B, 0x03, 0x04], Signature::Zip),
    // empty archive
    (&[0x50, 0x4B, 0x05, 0x06], Signature::Zip),
    (b"WARC/", Signature::Warc),
];

/// Returns `true` if `bytes` starts with the gzip magic.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Classifies the leading bytes of a stream.
pub fn detect_signature(header: &[u8]) -> Signature {
    SIGNATURES
        .iter()
        .find(|(magic, _)| header.starts_with(magic))
        .map(|(_, sig)| *sig)
        .unwrap_or(Signature::Unknown)
}

/// Sniffs a seekable reader, restoring its position afterwards.
pub fn detect<R: Read + Seek>(reader: &mut R) -> Result<Signature> {
    let start_pos = reader.stream_position().map_err(Error::Io)?;

    let mut header = [0u8; 8];
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..]).map_err(Error::Io)?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    reader.seek(SeekFrom::Start(start_pos)).map_err(Error::Io)?;
    Ok(detect_signature(&header[..filled]))
}

/// Sniffs the file at `path`.
pub fn detect_path(path: impl AsRef<Path>) -> Result<Signature> {
    let mut file = File::open(path.as_ref())?;
    detect(&mut file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_detect_gzip() {
        let data = [0x1F, 0x8B, 0x08, 0x00];
        assert_eq!(detect_signature(&data), Signature::Gzip);
        assert!(is_gzip(&data));
    }

    #[test]
    fn test_detect_zip() {
        assert_eq!(
            detect_signature(&[0x50, 0x4B, 0x03, 0x04, 0x14]),
            Signature::Zip
        );
        assert_eq!(detect_signature(&[0x50, 0x4B, 0x05, 0x06]), Signature::Zip);
    }

    #[test]
    fn test_detect_warc() {
        assert_eq!(detect_signature(b"WARC/1.0\r\n"), Signature::Warc);
        assert_eq!(detect_signature(b"WARC"), Signature::Unknown);
    }

    #[test]
    fn test_detect_restores_position() {
        let mut cursor = Cursor::new(b"xxWARC/1.1".to_vec());
        cursor.set_position(2);
        assert_eq!(detect(&mut cursor).unwrap(), Signature::Warc);
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_detect_short_input() {
        let mut cursor = Cursor::new(vec![0x1F]);
        assert_eq!(detect(&mut cursor).unwrap(), Signature::Unknown);
    }
}
