//! Progress display for CLI operations.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use waczfold::ProgressReporter;
use waczfold::progress::format_bytes;

/// Spinner showing the record being processed.
pub struct CliProgress {
    bar: ProgressBar,
    bytes: Mutex<u64>,
}

impl CliProgress {
    /// Creates a spinner, hidden when `quiet`.
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} records {wide_msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };
        Self {
            bar,
            bytes: Mutex::new(0),
        }
    }

    /// Clears the spinner.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Stops the spinner, leaving `msg`.
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.bar.abandon_with_message(msg.into());
    }
}

impl ProgressReporter for CliProgress {
    fn on_container_start(&self, container: &Path) {
        self.bar.set_position(0);
        self.bar.set_message(container.display().to_string());
    }

    fn on_record(&self, index: usize, target_uri: Option<&str>) {
        self.bar.set_position(index as u64 + 1);
        if let Some(uri) = target_uri {
            // Truncate long URLs
            let shown = if uri.chars().count() > 60 {
                let tail: String = uri.chars().rev().take(57).collect::<Vec<_>>().into_iter().rev().collect();
                format!("...{}", tail)
            } else {
                uri.to_string()
            };
            self.bar.set_message(shown);
        }
    }

    fn on_file_written(&self, _path: &Path, bytes: u64) {
        if let Ok(mut total) = self.bytes.lock() {
            *total += bytes;
            self.bar.set_message(format!("{} written", format_bytes(*total)));
        }
    }

    fn on_warning(&self, message: &str) {
        self.bar
            .println(format!("{} {}", style("warning:").yellow().bold(), message));
    }
}
