//! Options for [`extract_archive`](crate::extract_archive) and
//! [`create_archive`](crate::create_archive).

use std::path::PathBuf;

use crate::format::ArchiveKind;
use crate::progress::{NoProgress, ProgressReporter};
use crate::warc::DEFAULT_LEVEL;
use crate::{Error, Result};

static NO_PROGRESS: NoProgress = NoProgress;

/// Options for extraction.
#[derive(Default)]
pub struct ExtractOptions {
    /// Remove a non-empty output directory instead of failing.
    pub delete_existing: bool,
    /// Progress reporter (optional).
    pub progress: Option<Box<dyn ProgressReporter>>,
}

impl std::fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("delete_existing", &self.delete_existing)
            .finish_non_exhaustive()
    }
}

impl ExtractOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether a non-empty output directory is removed first.
    pub fn delete_existing(mut self, delete: bool) -> Self {
        self.delete_existing = delete;
        self
    }

    /// Sets the progress reporter.
    pub fn progress(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.progress = Some(Box::new(reporter));
        self
    }

    pub(crate) fn reporter(&self) -> &dyn ProgressReporter {
        self.progress.as_deref().unwrap_or(&NO_PROGRESS)
    }
}

/// Options for creation.
pub struct CreateOptions {
    /// Wrap every file as a `file://` resource.
    pub files_mode: bool,
    /// Archive kind to use instead of the one the output extension implies.
    pub explicit: Option<ArchiveKind>,
    /// gzip level, 0-9.
    pub compression_level: u32,
    /// Pages directory for a package, instead of `<input>/pages`.
    pub pages_dir: Option<PathBuf>,
    /// Logs directory for a package, instead of `<input>/logs`.
    pub logs_dir: Option<PathBuf>,
    /// Progress reporter (optional).
    pub progress: Option<Box<dyn ProgressReporter>>,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            files_mode: false,
            explicit: None,
            compression_level: DEFAULT_LEVEL,
            pages_dir: None,
            logs_dir: None,
            progress: None,
        }
    }
}

impl std::fmt::Debug for CreateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateOptions")
            .field("files_mode", &self.files_mode)
            .field("explicit", &self.explicit)
            .field("compression_level", &self.compression_level)
            .field("pages_dir", &self.pages_dir)
            .field("logs_dir", &self.logs_dir)
            .finish_non_exhaustive()
    }
}

impl CreateOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables files mode.
    pub fn files_mode(mut self, enabled: bool) -> Self {
        self.files_mode = enabled;
        self
    }

    /// Forces an archive kind.
    pub fn explicit(mut self, kind: ArchiveKind) -> Self {
        self.explicit = Some(kind);
        self
    }

    /// Sets the gzip level.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCompressionLevel`] if `level` is above 9.
    pub fn compression_level(mut self, level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::InvalidCompressionLevel { level });
        }
        self.compression_level = level;
        Ok(self)
    }

    /// Uses `dir` as the package's pages directory.
    pub fn pages_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pages_dir = Some(dir.into());
        self
    }

    /// Uses `dir` as the package's logs directory.
    pub fn logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = Some(dir.into());
        self
    }

    /// Sets the progress reporter.
    pub fn progress(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.progress = Some(Box::new(reporter));
        self
    }

    /// Checks settings that can be set directly on the public fields.
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(Error::InvalidCompressionLevel {
                level: self.compression_level,
            });
        }
        Ok(())
    }

    /// Returns `true` if files mode is on, directly or via an explicit
    /// [`ArchiveKind::FlatFiles`].
    pub fn wants_files_mode(&self) -> bool {
        self.files_mode || self.explicit == Some(ArchiveKind::FlatFiles)
    }

    pub(crate) fn reporter(&self) -> &dyn ProgressReporter {
        self.progress.as_deref().unwrap_or(&NO_PROGRESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults() {
        let options = CreateOptions::new();
        assert!(!options.files_mode);
        assert_eq!(options.compression_level, 6);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_compression_level_validation() {
        assert!(CreateOptions::new().compression_level(9).is_ok());
        assert!(matches!(
            CreateOptions::new().compression_level(10),
            Err(Error::InvalidCompressionLevel { level: 10 })
        ));

        let options = CreateOptions {
            compression_level: 12,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_files_mode_from_explicit_kind() {
        assert!(CreateOptions::new().files_mode(true).wants_files_mode());
        assert!(
            CreateOptions::new()
                .explicit(ArchiveKind::FlatFiles)
                .wants_files_mode()
        );
        assert!(
            !CreateOptions::new()
                .explicit(ArchiveKind::SingleContainer)
                .wants_files_mode()
        );
    }

    #[test]
    fn test_debug_skips_progress() {
        let options = ExtractOptions::new()
            .delete_existing(true)
            .progress(NoProgress);
        let debug = format!("{:?}", options);
        assert!(debug.contains("delete_existing: true"));
    }
}
