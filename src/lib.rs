//! # waczfold
//!
//! Unfold WARC and WACZ web archives into ordinary directory trees, edit
//! them with any tool, and fold them back.
//!
//! Extraction writes every captured `http`, `https` or `file` response to a
//! path derived from its URL (`http:/example.com/__index__.html`) and keeps
//! a full copy of the container in which those payloads are replaced by
//! their relative paths. Creation replays that copy, putting the current
//! file contents back, and adds records for any files that are new.
//!
//! ## Quick Start
//!
//! ### Extracting an Archive
//!
//! ```rust,no_run
//! use waczfold::{ExtractOptions, Result, extract_archive};
//!
//! fn main() -> Result<()> {
//!     let result = extract_archive("crawl.warc.gz", "crawl", &ExtractOptions::default())?;
//!     println!("{} files written", result.files_written);
//!     Ok(())
//! }
//! ```
//!
//! ### Creating an Archive
//!
//! ```rust,no_run
//! use waczfold::{CreateOptions, Result, create_archive};
//!
//! fn main() -> Result<()> {
//!     // Fold an edited tree back into a container
//!     create_archive("crawl", "crawl-edited.warc.gz", &CreateOptions::default())?;
//!
//!     // Wrap an ordinary folder as file:// resources inside a package
//!     let options = CreateOptions::new().files_mode(true).compression_level(9)?;
//!     create_archive("./site", "site.wacz", &options)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Layout
//!
//! | Archive | Unfolded as |
//! |---------|-------------|
//! | `x.warc`, `x.warc.gz` | `<scheme>:/<host>/<path>` files plus `x.warc` |
//! | `x.wacz` | the package entries, with each `archive/<name>.warc.gz` unfolded into `archive/<name>/` |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `parallel` | Yes | Stat scanned files on a Rayon pool |
//! | `cli` | No | Command-line interface tool |
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`]. Layout problems in an input tree
//! are reported before any output is written:
//!
//! ```rust,no_run
//! use waczfold::{CreateOptions, Error, create_archive};
//!
//! match create_archive("notes", "notes.warc", &CreateOptions::default()) {
//!     Err(e @ Error::UnexpectedFile { .. }) => eprintln!("{} (try files mode)", e),
//!     Err(e) => eprintln!("{}", e),
//!     Ok(result) => println!("{} records", result.records_written),
//! }
//! ```
//!
//! ## Safety
//!
//! Every path derived from archive content (URLs, zip entry names) is joined
//! with [`safety::safe_join`], which never escapes the output directory.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod archive;
pub mod codec;
pub mod error;
pub mod format;
pub mod mime;
pub mod options;
pub mod package;
pub mod progress;
pub mod safety;
pub mod scan;
pub mod uri;
pub mod warc;

pub use archive::{
    DEFAULT_CONTAINER_STEM, create_archive, default_output_dir, extract_archive, has_files,
};
pub use codec::{CreateResult, ExtractResult};
pub use error::{Error, Result};
pub use format::{ArchiveKind, ArchiveTarget, inspect_directory, select_format};
pub use options::{CreateOptions, ExtractOptions};
pub use progress::{NoProgress, ProgressReporter, StatisticsProgress};
