//! Progress reporting for extract and create operations.
//!
//! Reporters are called from the single streaming pass over each container,
//! so callbacks should be cheap. All methods have empty defaults; implement
//! only the ones you need.
//!
//! # Example
//!
//! ```rust,no_run
//! use waczfold::progress::StatisticsProgress;
//! use waczfold::{ExtractOptions, extract_archive};
//! use std::sync::Arc;
//!
//! let stats = Arc::new(StatisticsProgress::new());
//! let options = ExtractOptions::new().progress(stats.clone());
//! extract_archive("crawl.warc.gz", "crawl", &options)?;
//! println!("{} records", stats.records());
//! # Ok::<(), waczfold::Error>(())
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// IEC byte unit: 1 KiB = 1024 bytes.
pub const BYTES_KIB: u64 = 1024;
/// IEC byte unit: 1 MiB = 1024 KiB.
pub const BYTES_MIB: u64 = 1024 * BYTES_KIB;
/// IEC byte unit: 1 GiB = 1024 MiB.
pub const BYTES_GIB: u64 = 1024 * BYTES_MIB;

/// Callbacks fired while containers are decoded or encoded.
pub trait ProgressReporter: Send + Sync {
    /// A container is about to be read or written.
    fn on_container_start(&self, container: &Path) {
        let _ = container;
    }

    /// A record was processed. `index` counts from zero within the container.
    fn on_record(&self, index: usize, target_uri: Option<&str>) {
        let _ = (index, target_uri);
    }

    /// A resource file was written during extraction.
    fn on_file_written(&self, path: &Path, bytes: u64) {
        let _ = (path, bytes);
    }

    /// The container is finished.
    fn on_container_complete(&self, records: usize) {
        let _ = records;
    }

    /// Something unusual happened that did not stop the operation.
    fn on_warning(&self, message: &str) {
        let _ = message;
    }
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for Arc<P> {
    fn on_container_start(&self, container: &Path) {
        (**self).on_container_start(container)
    }

    fn on_record(&self, index: usize, target_uri: Option<&str>) {
        (**self).on_record(index, target_uri)
    }

    fn on_file_written(&self, path: &Path, bytes: u64) {
        (**self).on_file_written(path, bytes)
    }

    fn on_container_complete(&self, records: usize) {
        (**self).on_container_complete(records)
    }

    fn on_warning(&self, message: &str) {
        (**self).on_warning(message)
    }
}

/// A reporter that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// A reporter that counts what happened.
#[derive(Debug, Default)]
pub struct StatisticsProgress {
    containers: AtomicUsize,
    records: AtomicUsize,
    files: AtomicUsize,
    bytes: AtomicU64,
    warnings: Mutex<Vec<String>>,
}

impl StatisticsProgress {
    /// Creates a zeroed reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Containers started.
    pub fn containers(&self) -> usize {
        self.containers.load(Ordering::Relaxed)
    }

    /// Records processed across all containers.
    pub fn records(&self) -> usize {
        self.records.load(Ordering::Relaxed)
    }

    /// Files written.
    pub fn files(&self) -> usize {
        self.files.load(Ordering::Relaxed)
    }

    /// Bytes written to resource files.
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Warnings received, in order.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for StatisticsProgress {
    fn on_container_start(&self, _container: &Path) {
        self.containers.fetch_add(1, Ordering::Relaxed);
    }

    fn on_record(&self, _index: usize, _target_uri: Option<&str>) {
        self.records.fetch_add(1, Ordering::Relaxed);
    }

    fn on_file_written(&self, _path: &Path, bytes: u64) {
        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn on_warning(&self, message: &str) {
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(message.to_string());
        }
    }
}

/// Formats a byte count with IEC units.
pub fn format_bytes(bytes: u64) -> String {
    let value = bytes as f64;
    if bytes >= BYTES_GIB {
        format!("{:.2} GiB", value / BYTES_GIB as f64)
    } else if bytes >= BYTES_MIB {
        format!("{:.2} MiB", value / BYTES_MIB as f64)
    } else if bytes >= BYTES_KIB {
        format!("{:.2} KiB", value / BYTES_KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
