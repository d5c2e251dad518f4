//! Error types for archive folder operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when converting between WARC/WACZ archives and directory
//! trees, along with a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! Every failure is fatal to the top-level operation that raised it. Nothing
//! is retried internally; the caller decides whether to clean up partial
//! output, retry, or report to the user.
//!
//! ```rust,no_run
//! use waczfold::{CreateOptions, Error, create_archive};
//!
//! fn pack(dir: &str, out: &str) -> waczfold::Result<()> {
//!     match create_archive(dir, out, &CreateOptions::default()) {
//!         Ok(_) => Ok(()),
//!         Err(e) if e.suggests_files_mode() => {
//!             eprintln!("{}", e);
//!             eprintln!("hint: rerun with files mode to wrap ordinary files");
//!             Err(e)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// The main error type for archive folder operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io], [`Scan`][Self::Scan] | File system operations |
/// | Records | [`InvalidUri`][Self::InvalidUri], [`CorruptRecord`][Self::CorruptRecord] | Malformed container data |
/// | Layout | [`MultipleContainers`][Self::MultipleContainers], [`UnexpectedFile`][Self::UnexpectedFile], [`EmptyArchive`][Self::EmptyArchive] | Input tree is not an unpacked archive |
/// | Format | [`UnsupportedFormat`][Self::UnsupportedFormat], [`InvalidPackage`][Self::InvalidPackage] | Unknown extension or broken zip |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record that must carry a target URI has none, or it cannot be parsed.
    #[error("Invalid target URI{}: {reason}", uri.as_deref().map(|u| format!(" '{}'", u)).unwrap_or_default())]
    InvalidUri {
        /// The offending URI, if one was present at all.
        uri: Option<String>,
        /// Why the URI was rejected.
        reason: String,
    },

    /// The input directory (or one of its entries) could not be read.
    #[error("Cannot scan '{}': {source}", path.display())]
    Scan {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// More than one raw container file sits at the root of the input tree.
    ///
    /// An unpacked archive carries exactly one full copy of its container;
    /// two of them make it impossible to tell which records to rebuild.
    #[error(
        "Multiple WARC files found in input directory: '{}' and '{}'",
        first.display(),
        second.display()
    )]
    MultipleContainers {
        /// The first container file found (in path order).
        first: PathBuf,
        /// The second container file found.
        second: PathBuf,
    },

    /// A file in the input tree is neither the container nor a resource.
    ///
    /// This is the usual sign that the directory is an ordinary file tree
    /// rather than an unpacked archive. Rerunning in files mode wraps every
    /// file as a `file://` resource instead.
    #[error(
        "Unexpected file in input directory: {}. The directory does not look like an unpacked WARC or WACZ; use files mode to archive ordinary files",
        path.display()
    )]
    UnexpectedFile {
        /// The offending path, relative to the input directory.
        path: PathBuf,
    },

    /// The file extension (or directory layout) is not supported here.
    #[error("Unsupported format for '{}': {reason}", path.display())]
    UnsupportedFormat {
        /// The path whose format was rejected.
        path: PathBuf,
        /// What was expected.
        reason: String,
    },

    /// Packaging found no containers to put in the package.
    #[error("No WARC files or directories found in '{}'", dir.display())]
    EmptyArchive {
        /// The containers directory that turned out empty.
        dir: PathBuf,
    },

    /// The container stream is malformed.
    ///
    /// The offset is measured in the uncompressed record stream.
    #[error("Corrupt record at offset {offset}: {reason}")]
    CorruptRecord {
        /// Byte offset where the problem was detected.
        offset: u64,
        /// A description of the problem.
        reason: String,
    },

    /// The zip package could not be read or written.
    #[error("Invalid WACZ package: {0}")]
    InvalidPackage(String),

    /// A package manifest could not be serialized or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The extraction target already contains files.
    #[error(
        "Output directory '{}' is not empty; delete it first or enable delete-existing",
        path.display()
    )]
    OutputNotEmpty {
        /// The non-empty output directory.
        path: PathBuf,
    },

    /// An invalid compression level was provided.
    #[error("invalid compression level {level}: must be 0-9")]
    InvalidCompressionLevel {
        /// The invalid level that was provided.
        level: u32,
    },
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            other => Error::InvalidPackage(other.to_string()),
        }
    }
}

impl Error {
    /// Returns `true` if the error describes a problem with the input tree's
    /// layout rather than with its bytes.
    pub fn is_input_layout_error(&self) -> bool {
        matches!(
            self,
            Error::MultipleContainers { .. }
                | Error::UnexpectedFile { .. }
                | Error::EmptyArchive { .. }
        )
    }

    /// Returns `true` if the error indicates corrupt archive data.
    pub fn is_corruption(&self) -> bool {
        match self {
            Error::CorruptRecord { .. } | Error::InvalidPackage(_) => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    /// Returns `true` if rerunning in files mode would likely succeed.
    pub fn suggests_files_mode(&self) -> bool {
        matches!(self, Error::UnexpectedFile { .. })
    }

    /// Returns the path the error is about, if known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::Scan { path, .. }
            | Error::UnexpectedFile { path }
            | Error::UnsupportedFormat { path, .. }
            | Error::OutputNotEmpty { path } => Some(path),
            Error::MultipleContainers { second, .. } => Some(second),
            Error::EmptyArchive { dir } => Some(dir),
            _ => None,
        }
    }

    /// Creates an [`Error::InvalidUri`].
    pub fn invalid_uri(uri: Option<&str>, reason: impl Into<String>) -> Self {
        Error::InvalidUri {
            uri: uri.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::CorruptRecord`].
    pub fn corrupt_record(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptRecord {
            offset,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::UnsupportedFormat`].
    pub fn unsupported_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::UnsupportedFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for archive folder operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_invalid_uri_message() {
        let err = Error::invalid_uri(None, "record has no WARC-Target-URI");
        assert_eq!(
            err.to_string(),
            "Invalid target URI: record has no WARC-Target-URI"
        );

        let err = Error::invalid_uri(Some("::nope"), "relative URL without a base");
        assert!(err.to_string().contains("'::nope'"));
    }

    #[test]
    fn test_unexpected_file_suggests_files_mode() {
        let err = Error::UnexpectedFile {
            path: PathBuf::from("notes.txt"),
        };
        assert!(err.suggests_files_mode());
        assert!(err.is_input_layout_error());
        assert!(err.to_string().contains("notes.txt"));
        assert!(err.to_string().contains("files mode"));
        assert_eq!(err.path(), Some(Path::new("notes.txt")));
    }

    #[test]
    fn test_multiple_containers() {
        let err = Error::MultipleContainers {
            first: PathBuf::from("a.warc"),
            second: PathBuf::from("b.warc"),
        };
        let msg = err.to_string();
        assert!(msg.contains("a.warc"));
        assert!(msg.contains("b.warc"));
        assert!(!err.suggests_files_mode());
    }

    #[test]
    fn test_corrupt_record() {
        let err = Error::corrupt_record(1234, "missing Content-Length");
        assert!(err.is_corruption());
        assert!(err.to_string().contains("1234"));

        let eof: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "short").into();
        assert!(eof.is_corruption());
    }

    #[test]
    fn test_scan_error_keeps_source() {
        let err = Error::Scan {
            path: PathBuf::from("/unreadable"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("/unreadable"));
    }

    #[test]
    fn test_zip_error_conversion() {
        let err: Error = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(err, Error::InvalidPackage(_)));
    }
}
