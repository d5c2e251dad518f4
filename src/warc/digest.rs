//! `WARC-Block-Digest` and `WARC-Payload-Digest` values.
//!
//! Only `sha256:` digests are produced. A record whose block changes has its
//! existing digests replaced; digests are never added to records that did
//! not carry them.

use std::io::{self, Read};

use sha2::{Digest, Sha256};

use super::{HttpHeaders, WarcHeader, names};

/// Digest label written before the hex value.
pub const ALGORITHM: &str = "sha256";

/// Digests of one record block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDigests {
    /// Digest over the HTTP head and payload.
    pub block: String,
    /// Digest over the payload only.
    pub payload: String,
}

/// Formats a digest over `bytes`.
pub fn sha256_digest(bytes: &[u8]) -> String {
    format_digest(Sha256::digest(bytes).as_slice())
}

fn format_digest(hash: &[u8]) -> String {
    format!("{}:{}", ALGORITHM, hex::encode(hash))
}

/// Computes both digests over an in-memory payload.
pub fn compute(http: Option<&HttpHeaders>, payload: &[u8]) -> BlockDigests {
    let mut block = Sha256::new();
    if let Some(http) = http {
        block.update(http.to_bytes());
    }
    block.update(payload);
    BlockDigests {
        block: format_digest(block.finalize().as_slice()),
        payload: sha256_digest(payload),
    }
}

/// Computes both digests over a streamed payload, returning them with the
/// payload length.
pub fn compute_stream<R: Read>(
    http: Option<&HttpHeaders>,
    mut payload: R,
) -> io::Result<(BlockDigests, u64)> {
    let mut block = Sha256::new();
    if let Some(http) = http {
        block.update(http.to_bytes());
    }
    let mut only_payload = Sha256::new();

    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = match payload.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        block.update(&buf[..n]);
        only_payload.update(&buf[..n]);
        total += n as u64;
    }

    Ok((
        BlockDigests {
            block: format_digest(block.finalize().as_slice()),
            payload: format_digest(only_payload.finalize().as_slice()),
        },
        total,
    ))
}

/// Replaces the digest fields `header` already carries.
///
/// Returns `true` if anything was replaced.
pub fn refresh(header: &mut WarcHeader, digests: &BlockDigests) -> bool {
    let mut changed = false;
    if header.headers.contains(names::WARC_BLOCK_DIGEST) {
        header
            .headers
            .set(names::WARC_BLOCK_DIGEST, digests.block.clone());
        changed = true;
    }
    if header.headers.contains(names::WARC_PAYLOAD_DIGEST) {
        header
            .headers
            .set(names::WARC_PAYLOAD_DIGEST, digests.payload.clone());
        changed = true;
    }
    changed
}

/// Sets both digest fields.
pub fn apply(header: &mut WarcHeader, digests: &BlockDigests) {
    header
        .headers
        .set(names::WARC_BLOCK_DIGEST, digests.block.clone());
    header
        .headers
        .set(names::WARC_PAYLOAD_DIGEST, digests.payload.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warc::{HeaderMap, RecordType};

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256_digest(b"abc"),
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_block_covers_http_head() {
        let http = HttpHeaders::new("HTTP/1.1 200 OK", HeaderMap::new());
        let digests = compute(Some(&http), b"abc");
        assert_eq!(digests.payload, sha256_digest(b"abc"));
        assert_ne!(digests.block, digests.payload);

        let mut block = http.to_bytes();
        block.extend_from_slice(b"abc");
        assert_eq!(digests.block, sha256_digest(&block));
    }

    #[test]
    fn test_stream_matches_memory() {
        let data = vec![7u8; 200_000];
        let (streamed, len) = compute_stream(None, &data[..]).unwrap();
        assert_eq!(len, 200_000);
        assert_eq!(streamed, compute(None, &data));
    }

    #[test]
    fn test_refresh_only_replaces_present_fields() {
        let digests = compute(None, b"x");

        let mut bare = WarcHeader::new(RecordType::Response);
        assert!(!refresh(&mut bare, &digests));
        assert!(!bare.headers.contains(names::WARC_BLOCK_DIGEST));

        let mut with = WarcHeader::new(RecordType::Response);
        with.headers.append(names::WARC_PAYLOAD_DIGEST, "sha1:OLD");
        assert!(refresh(&mut with, &digests));
        assert_eq!(
            with.headers.get(names::WARC_PAYLOAD_DIGEST),
            Some(digests.payload.as_str())
        );
        assert!(!with.headers.contains(names::WARC_BLOCK_DIGEST));
    }
}
