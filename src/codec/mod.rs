//! The container stream codec.
//!
//! Both directions are a single sequential pass over one container:
//!
//! - [`decode_container`] writes every extractable response payload to its
//!   canonical path and a full copy of the container in which those payloads
//!   are replaced by a short marker.
//! - [`encode_directory`] replays that full copy, substituting each marker
//!   with the current file contents, then appends synthesized records for
//!   files that have no record yet.
//!
//! Only response records with an `http`, `https` or `file` target are
//! extracted. Everything else is copied through byte for byte.

mod decode;
mod encode;

pub use decode::decode_container;
pub use encode::{EncodeOptions, encode_directory};

use std::path::PathBuf;

use crate::mime::extension_for;
use crate::uri::{INDEX_STEM, canonicalize, is_extractable_uri};
use crate::warc::{HttpHeaders, RecordType, WarcHeader};
use crate::{Error, Result};

/// Outcome of extracting one or more containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractResult {
    /// Records read.
    pub records: usize,
    /// Resource files written (collisions count each write).
    pub files_written: usize,
    /// Bytes written to resource files.
    pub bytes_written: u64,
    /// Full copies of the containers, one per decoded container.
    pub full_copies: Vec<PathBuf>,
}

impl ExtractResult {
    /// Adds another result's counts to this one.
    pub fn absorb(&mut self, other: ExtractResult) {
        self.records += other.records;
        self.files_written += other.files_written;
        self.bytes_written += other.bytes_written;
        self.full_copies.extend(other.full_copies);
    }
}

/// Outcome of creating one or more containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateResult {
    /// Containers produced (copied-through containers in a package count).
    pub containers: usize,
    /// Records written across all produced containers.
    pub records_written: usize,
    /// Records whose payload was replaced by a file's contents.
    pub records_substituted: usize,
    /// Records created for files that had no record.
    pub records_synthesized: usize,
    /// Records left with their extraction marker because the file is gone.
    pub placeholders_kept: usize,
}

impl CreateResult {
    /// Adds another result's counts to this one.
    pub fn absorb(&mut self, other: CreateResult) {
        self.containers += other.containers;
        self.records_written += other.records_written;
        self.records_substituted += other.records_substituted;
        self.records_synthesized += other.records_synthesized;
        self.placeholders_kept += other.placeholders_kept;
    }
}

/// Returns `true` if a record's payload is extracted to a file.
pub fn is_extractable(header: &WarcHeader) -> bool {
    header.record_type() == RecordType::Response
        && header.target_uri().is_some_and(is_extractable_uri)
}

/// Returns the canonical relative path of an extractable record.
///
/// # Errors
///
/// [`Error::InvalidUri`] if the record has no target URI, or it cannot be
/// parsed.
pub fn record_path(header: &WarcHeader, http: Option<&HttpHeaders>) -> Result<String> {
    let uri = header
        .target_uri()
        .ok_or_else(|| Error::invalid_uri(None, "response record has no WARC-Target-URI"))?;
    canonicalize(uri, http.and_then(HttpHeaders::content_type))
}

/// Returns where a record's file is kept once a directory holds its
/// canonical path: an index leaf inside that directory, named for the
/// record's content type.
///
/// `http://example.com/a` is stored at `http:/example.com/a/__index__.html`
/// when `http://example.com/a/b.css` needs `a` to be a directory.
pub fn nested_path(relative: &str, http: Option<&HttpHeaders>) -> String {
    let ext = extension_for(http.and_then(HttpHeaders::content_type));
    format!("{}/{}.{}", relative, INDEX_STEM, ext)
}

/// Name of the full copy written beside an extracted tree: the source file
/// name without a trailing `.gz`.
pub fn full_copy_name(source_name: &str) -> String {
    let lower = source_name.to_ascii_lowercase();
    if lower.ends_with(".gz") && source_name.len() > 3 {
        source_name[..source_name.len() - 3].to_string()
    } else {
        source_name.to_string()
    }
}
