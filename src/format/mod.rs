//! Archive kinds and format selection.
//!
//! For files, the extension is authoritative: `.wacz` is a package, `.warc`
//! and `.warc.gz` are single containers, anything else is rejected. For
//! directories, [`inspect_directory`] guesses what kind of archive the tree
//! was unpacked from. That guess is advisory; callers use it to pick a
//! sensible default, never to override an explicit choice.

pub mod detect;

use std::path::Path;

use serde::Serialize;

use crate::uri::RECOGNIZED_SCHEMES;
use crate::{Error, Result};

/// Extension of an uncompressed container.
pub const WARC_EXTENSION: &str = ".warc";
/// Extension of a gzip-compressed container.
pub const WARC_GZ_EXTENSION: &str = ".warc.gz";
/// Extension of a package.
pub const WACZ_EXTENSION: &str = ".wacz";
/// Package manifest file name.
pub const MANIFEST_FILE: &str = "datapackage.json";
/// Directory holding containers inside a package.
pub const CONTAINERS_DIR: &str = "archive";

/// What an archive path is, or is meant to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveKind {
    /// One WARC file.
    SingleContainer,
    /// A WACZ package of WARC files plus sidecars.
    CompressedPackage,
    /// Ordinary files, wrapped as `file://` resources.
    FlatFiles,
}

impl ArchiveKind {
    /// Returns a human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveKind::SingleContainer => "single container (WARC)",
            ArchiveKind::CompressedPackage => "compressed package (WACZ)",
            ArchiveKind::FlatFiles => "flat files",
        }
    }
}

impl std::fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The resolved intent of one extract or create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchiveTarget {
    /// Kind of archive.
    pub kind: ArchiveKind,
    /// Whether container bytes are gzip-compressed.
    pub compressed: bool,
}

impl ArchiveTarget {
    /// A single container.
    pub fn single(compressed: bool) -> Self {
        Self {
            kind: ArchiveKind::SingleContainer,
            compressed,
        }
    }

    /// A package. Containers inside a package are always compressed.
    pub fn package() -> Self {
        Self {
            kind: ArchiveKind::CompressedPackage,
            compressed: true,
        }
    }

    /// A flat file tree.
    pub fn flat_files(compressed: bool) -> Self {
        Self {
            kind: ArchiveKind::FlatFiles,
            compressed,
        }
    }
}

/// Returns `true` if `name` ends in `.warc` or `.warc.gz` (any case).
pub fn is_container_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(WARC_EXTENSION) || lower.ends_with(WARC_GZ_EXTENSION)
}

/// Strips a trailing `.warc.gz` or `.warc` (any case).
pub fn container_stem(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    for ext in [WARC_GZ_EXTENSION, WARC_EXTENSION] {
        if lower.ends_with(ext) {
            return &name[..name.len() - ext.len()];
        }
    }
    name
}

/// Resolves the archive target for `path`.
///
/// An explicit kind is honored verbatim. For directories without one, the
/// layout is inspected. For files, the extension decides; the explicit kind
/// only replaces the kind, compression still follows the extension.
pub fn select_format(
    path: impl AsRef<Path>,
    explicit: Option<ArchiveKind>,
) -> Result<ArchiveTarget> {
    let path = path.as_ref();

    if path.is_dir() {
        return match explicit {
            Some(ArchiveKind::CompressedPackage) => Ok(ArchiveTarget::package()),
            Some(kind) => Ok(ArchiveTarget {
                kind,
                compressed: false,
            }),
            None => inspect_directory(path),
        };
    }

    let from_extension = target_from_extension(path)?;
    Ok(match explicit {
        Some(kind) => ArchiveTarget {
            kind,
            compressed: from_extension.compressed,
        },
        None => from_extension,
    })
}

fn target_from_extension(path: &Path) -> Result<ArchiveTarget> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if name.ends_with(WACZ_EXTENSION) {
        Ok(ArchiveTarget::package())
    } else if name.ends_with(WARC_GZ_EXTENSION) {
        Ok(ArchiveTarget::single(true))
    } else if name.ends_with(WARC_EXTENSION) {
        Ok(ArchiveTarget::single(false))
    } else {
        Err(Error::unsupported_format(
            path,
            "expected a .warc, .warc.gz or .wacz file",
        ))
    }
}

/// Guesses what an unpacked directory holds.
///
/// - a `datapackage.json` at the root: an unpacked package
/// - a scheme directory (`http:`, `https:`, `file:`) or a root container
///   file: an unpacked single container
/// - anything else: a plain file tree
pub fn inspect_directory(dir: impl AsRef<Path>) -> Result<ArchiveTarget> {
    let dir = dir.as_ref();
    if dir.join(MANIFEST_FILE).is_file() {
        return Ok(ArchiveTarget::package());
    }

    let entries = std::fs::read_dir(dir).map_err(|source| Error::Scan {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| Error::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type().map_err(|source| Error::Scan {
            path: entry.path(),
            source,
        })?;

        if file_type.is_dir() && RECOGNIZED_SCHEMES.contains(&name.as_str()) {
            return Ok(ArchiveTarget::single(false));
        }
        if file_type.is_file() && is_container_name(&name) {
            return Ok(ArchiveTarget::single(false));
        }
    }

    Ok(ArchiveTarget::flat_files(false))
}
