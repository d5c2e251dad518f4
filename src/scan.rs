//! Directory scanning and entry classification.
//!
//! A scan walks the input tree once, classifies every regular file, and
//! stats the survivors. Classification runs first and in path order, so a
//! layout error (a second container, a foreign file) is reported before any
//! output exists and always names the same offending path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::format::is_container_name;
use crate::uri::has_recognized_scheme;
use crate::{Error, Result};

/// How files in the tree are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// The tree was produced by extraction: scheme directories plus at most
    /// one container file at the root.
    #[default]
    Archive,
    /// Every file is a resource.
    Files,
}

/// What a scanned file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The full copy of the original container.
    ContainerFile,
    /// A resource under a scheme directory (or any file in files mode).
    SchemeResource,
    /// Neither; fatal outside files mode.
    Foreign,
}

/// One scanned file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    /// Path relative to the scanned directory, `/`-separated.
    pub relative_path: String,
    /// Path on disk.
    pub path: PathBuf,
    /// Size in bytes at scan time.
    pub size: u64,
    /// How the file was classified.
    pub classification: Classification,
}

/// Scan settings.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Interpretation of the tree.
    pub mode: ScanMode,
    /// Paths to leave out, usually the output file when it is written
    /// inside the input directory.
    pub exclude: Vec<PathBuf>,
}

impl ScanOptions {
    /// Creates options for `mode`.
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            exclude: Vec::new(),
        }
    }

    /// Leaves `path` out of the scan.
    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude.push(path.into());
        self
    }
}

/// Result of a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// The container file, if one was found.
    pub container: Option<PathEntry>,
    /// Resources keyed by relative path, in lexicographic order.
    pub resources: BTreeMap<String, PathEntry>,
}

/// Classifies a `/`-separated relative path.
pub fn classify(relative_path: &str, mode: ScanMode) -> Classification {
    match mode {
        ScanMode::Files => Classification::SchemeResource,
        ScanMode::Archive => {
            if !relative_path.contains('/') && is_container_name(relative_path) {
                Classification::ContainerFile
            } else if has_recognized_scheme(relative_path) {
                Classification::SchemeResource
            } else {
                Classification::Foreign
            }
        }
    }
}

/// Scans `dir`.
///
/// Root-level hidden entries (`.git`, `.DS_Store`, ...) are skipped.
/// Symbolic links are not followed.
///
/// # Errors
///
/// - [`Error::Scan`] if the tree cannot be read
/// - [`Error::MultipleContainers`] for a second root container file
/// - [`Error::UnexpectedFile`] for a foreign file in archive mode
pub fn scan(dir: impl AsRef<Path>, options: &ScanOptions) -> Result<ScanResult> {
    let dir = dir.as_ref();
    let root = std::path::absolute(dir).map_err(|source| Error::Scan {
        path: dir.to_path_buf(),
        source,
    })?;
    let exclude: Vec<PathBuf> = options
        .exclude
        .iter()
        .filter_map(|p| std::path::absolute(p).ok())
        .collect();

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden_root_entry(e));

    let mut container: Option<(String, PathBuf)> = None;
    let mut pending: Vec<(String, PathBuf, Classification)> = Vec::new();

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::Scan {
                path,
                source: e.into(),
            }
        })?;

        if entry.file_type().is_symlink() {
            log::debug!("skipping symbolic link {}", entry.path().display());
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        if exclude.iter().any(|p| p == entry.path()) {
            log::debug!("excluding {}", entry.path().display());
            continue;
        }

        let relative = relative_posix(&root, entry.path());
        match classify(&relative, options.mode) {
            Classification::ContainerFile => {
                if let Some((first, _)) = &container {
                    return Err(Error::MultipleContainers {
                        first: PathBuf::from(first),
                        second: PathBuf::from(&relative),
                    });
                }
                container = Some((relative, entry.into_path()));
            }
            Classification::SchemeResource => {
                pending.push((relative, entry.into_path(), Classification::SchemeResource));
            }
            Classification::Foreign => {
                return Err(Error::UnexpectedFile {
                    path: PathBuf::from(relative),
                });
            }
        }
    }

    let container = container
        .map(|(relative, path)| stat_entry((relative, path, Classification::ContainerFile)))
        .transpose()?;

    let resources = stat_all(pending)?
        .into_iter()
        .map(|entry| (entry.relative_path.clone(), entry))
        .collect::<BTreeMap<_, _>>();

    log::debug!(
        "scanned {}: {} resources, container {}",
        dir.display(),
        resources.len(),
        container
            .as_ref()
            .map(|c| c.relative_path.as_str())
            .unwrap_or("none")
    );

    Ok(ScanResult {
        container,
        resources,
    })
}

fn is_hidden_root_entry(entry: &DirEntry) -> bool {
    let hidden = entry.depth() == 1 && entry.file_name().to_string_lossy().starts_with('.');
    if hidden {
        log::debug!("skipping hidden entry {}", entry.path().display());
    }
    hidden
}

fn relative_posix(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn stat_entry(
    (relative_path, path, classification): (String, PathBuf, Classification),
) -> Result<PathEntry> {
    let metadata = fs::metadata(&path).map_err(|source| Error::Scan {
        path: path.clone(),
        source,
    })?;
    Ok(PathEntry {
        relative_path,
        path,
        size: metadata.len(),
        classification,
    })
}

#[cfg(feature = "parallel")]
fn stat_all(pending: Vec<(String, PathBuf, Classification)>) -> Result<Vec<PathEntry>> {
    use rayon::prelude::*;

    pending.into_par_iter().map(stat_entry).collect()
}

#[cfg(not(feature = "parallel"))]
fn stat_all(pending: Vec<(String, PathBuf, Classification)>) -> Result<Vec<PathEntry>> {
    pending.into_iter().map(stat_entry).collect()
}
