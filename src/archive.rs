//! Top-level extract and create operations.
//!
//! These pick the archive kind from the path (or an explicit override),
//! apply the output guards and hand off to the container codec or the
//! package layer.

use std::fs;
use std::path::{Path, PathBuf};

use crate::codec::{
    CreateResult, EncodeOptions, ExtractResult, decode_container, encode_directory,
};
use crate::format::{
    ArchiveKind, CONTAINERS_DIR, WACZ_EXTENSION, WARC_GZ_EXTENSION, inspect_directory,
    select_format,
};
use crate::options::{CreateOptions, ExtractOptions};
use crate::package::{
    PackageOptions, PackageRequest, Packager, WaczPackager, create_package, extract_package,
};
use crate::{Error, Result};

/// Name of the container made when a plain tree is packaged.
pub const DEFAULT_CONTAINER_STEM: &str = "data";

/// Extracts a `.warc`, `.warc.gz` or `.wacz` file into `output_dir`.
///
/// The output directory is created if needed. An existing non-empty
/// directory is refused unless [`ExtractOptions::delete_existing`] is set,
/// in which case it is removed first.
///
/// # Errors
///
/// - [`Error::UnsupportedFormat`] for a directory input, an unknown
///   extension, or an output path that is a file
/// - [`Error::OutputNotEmpty`] for a non-empty output directory
/// - [`Error::InvalidPackage`] for a `.wacz` that is not a zip
///
/// # Examples
///
/// ```rust,no_run
/// use waczfold::{ExtractOptions, extract_archive};
///
/// let result = extract_archive("crawl.wacz", "crawl", &ExtractOptions::default())?;
/// println!("{} files from {} records", result.files_written, result.records);
/// # Ok::<(), waczfold::Error>(())
/// ```
pub fn extract_archive(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<ExtractResult> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();

    if input.is_dir() {
        return Err(Error::unsupported_format(
            input,
            "input is a directory; expected a .warc, .warc.gz or .wacz file",
        ));
    }
    let target = select_format(input, None)?;
    prepare_output_dir(output_dir, options.delete_existing)?;

    let progress = options.reporter();
    match target.kind {
        ArchiveKind::CompressedPackage => extract_package(input, output_dir, progress),
        _ => decode_container(input, output_dir, progress),
    }
}

fn prepare_output_dir(output_dir: &Path, delete_existing: bool) -> Result<()> {
    if output_dir.exists() && !output_dir.is_dir() {
        return Err(Error::unsupported_format(
            output_dir,
            "output path exists and is not a directory",
        ));
    }
    if has_files(output_dir)? {
        if !delete_existing {
            return Err(Error::OutputNotEmpty {
                path: output_dir.to_path_buf(),
            });
        }
        log::info!("removing existing {}", output_dir.display());
        fs::remove_dir_all(output_dir)?;
    }
    Ok(())
}

/// Builds `output` from the directory tree at `input_dir`.
///
/// The output extension decides the result: `.warc` or `.warc.gz` gives a
/// single container, `.wacz` a package. For a package, an `archive/`
/// directory in the tree is folded container by container; a tree without
/// one is folded into a single `archive/data.warc.gz`.
///
/// # Errors
///
/// - [`Error::UnexpectedFile`] when the tree has files that are not part
///   of an unpacked archive and files mode is off
/// - [`Error::MultipleContainers`] for two container files at the root
/// - [`Error::EmptyArchive`] for a package tree with no containers
/// - [`Error::UnsupportedFormat`] for an unknown output extension, or a
///   package tree written to a single container
///
/// # Examples
///
/// ```rust,no_run
/// use waczfold::{CreateOptions, create_archive};
///
/// let options = CreateOptions::new().files_mode(true);
/// let result = create_archive("./site", "site.warc.gz", &options)?;
/// println!("{} records", result.records_written);
/// # Ok::<(), waczfold::Error>(())
/// ```
pub fn create_archive(
    input_dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &CreateOptions,
) -> Result<CreateResult> {
    let input_dir = input_dir.as_ref();
    let output = output.as_ref();
    options.validate()?;

    if !input_dir.is_dir() {
        return Err(Error::unsupported_format(input_dir, "input is not a directory"));
    }
    let target = select_format(output, options.explicit)?;
    let files_mode = options.wants_files_mode();
    let progress = options.reporter();

    let encode = EncodeOptions {
        files_mode,
        compressed: target.compressed,
        level: options.compression_level,
        exclude: None,
    };

    // An explicit kind wins over the output's extension.
    let packaged = match options.explicit {
        Some(kind) => kind == ArchiveKind::CompressedPackage,
        None => target.kind == ArchiveKind::CompressedPackage || is_package_name(output),
    };
    if packaged {
        let layout = inspect_directory(input_dir)?;
        let has_containers_dir = input_dir.join(CONTAINERS_DIR).is_dir();
        if has_containers_dir || (!files_mode && layout.kind == ArchiveKind::CompressedPackage) {
            let package_options = PackageOptions {
                encode,
                pages_dir: options.pages_dir.clone(),
                logs_dir: options.logs_dir.clone(),
            };
            return create_package(input_dir, output, &package_options, &WaczPackager, progress);
        }
        return package_tree(input_dir, output, encode, options);
    }

    if !files_mode && inspect_directory(input_dir)?.kind == ArchiveKind::CompressedPackage {
        return Err(Error::unsupported_format(
            output,
            "input is an unpacked WACZ package; write a .wacz file instead",
        ));
    }

    encode_directory(input_dir, output, &encode, progress).inspect_err(|e| {
        if matches!(e, Error::UnexpectedFile { .. })
            && inspect_directory(input_dir).is_ok_and(|t| t.kind == ArchiveKind::FlatFiles)
        {
            log::warn!(
                "{} looks like a plain file tree; files mode wraps ordinary files",
                input_dir.display()
            );
        }
    })
}

/// Wraps a whole tree as `archive/data.warc.gz` in a new package.
fn package_tree(
    input_dir: &Path,
    output: &Path,
    mut encode: EncodeOptions,
    options: &CreateOptions,
) -> Result<CreateResult> {
    let staging = tempfile::Builder::new().prefix("waczfold-").tempdir()?;
    let container = staging
        .path()
        .join(format!("{}{}", DEFAULT_CONTAINER_STEM, WARC_GZ_EXTENSION));

    encode.compressed = true;
    encode.exclude = Some(output.to_path_buf());
    let result = encode_directory(input_dir, &container, &encode, options.reporter())?;

    let request = PackageRequest {
        containers: vec![container],
        pages_dir: options.pages_dir.clone(),
        logs_dir: options.logs_dir.clone(),
    };
    WaczPackager.package(&request, output)?;
    Ok(result)
}

fn is_package_name(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().to_ascii_lowercase().ends_with(WACZ_EXTENSION))
}

/// Returns `true` if `dir` exists and has at least one entry.
pub fn has_files(dir: impl AsRef<Path>) -> Result<bool> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(dir)?.next().is_some())
}

/// Returns the default extraction directory for `input`: the same path
/// with its last extension removed.
///
/// ```
/// use std::path::Path;
/// use waczfold::default_output_dir;
///
/// assert_eq!(default_output_dir("crawl.wacz"), Path::new("crawl"));
/// assert_eq!(default_output_dir("a/b.warc.gz"), Path::new("a/b.warc"));
/// ```
pub fn default_output_dir(input: impl AsRef<Path>) -> PathBuf {
    input.as_ref().with_extension("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_has_files() {
        let dir = TempDir::new().unwrap();
        assert!(!has_files(dir.path()).unwrap());
        assert!(!has_files(dir.path().join("missing")).unwrap());
        fs::write(dir.path().join("a"), "").unwrap();
        assert!(has_files(dir.path()).unwrap());
    }

    #[test]
    fn test_extract_refuses_directory_input() {
        let dir = TempDir::new().unwrap();
        let err = extract_archive(dir.path(), dir.path().join("out"), &ExtractOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_extract_guards_non_empty_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.warc");
        fs::write(&input, "").unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("stale.txt"), "x").unwrap();

        let err = extract_archive(&input, &out, &ExtractOptions::new()).unwrap_err();
        assert!(matches!(err, Error::OutputNotEmpty { .. }));

        extract_archive(&input, &out, &ExtractOptions::new().delete_existing(true)).unwrap();
        assert!(!out.join("stale.txt").exists());
        assert!(out.join("in.warc").exists());
    }

    #[test]
    fn test_extract_output_is_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.warc");
        fs::write(&input, "").unwrap();
        let out = dir.path().join("out");
        fs::write(&out, "").unwrap();
        let err = extract_archive(&input, &out, &ExtractOptions::new()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_create_refuses_package_tree_into_single() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("tree");
        fs::create_dir_all(input.join("archive")).unwrap();
        fs::write(input.join("datapackage.json"), "{}").unwrap();
        let err = create_archive(&input, dir.path().join("out.warc"), &CreateOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_create_explicit_single_container_ignores_wacz_name() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("tree");
        fs::create_dir_all(input.join("http:/example.com")).unwrap();
        fs::write(input.join("http:/example.com/__index__.html"), "<p>hi</p>").unwrap();
        let output = dir.path().join("out.wacz");

        let options = CreateOptions::new().explicit(ArchiveKind::SingleContainer);
        let result = create_archive(&input, &output, &options).unwrap();
        assert_eq!(result.containers, 1);
        assert_eq!(result.records_synthesized, 1);

        let bytes = fs::read(&output).unwrap();
        assert_ne!(&bytes[..2], b"PK", "a zip was written");
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_create_rejects_bad_level() {
        let dir = TempDir::new().unwrap();
        let options = CreateOptions {
            compression_level: 11,
            ..Default::default()
        };
        let err = create_archive(dir.path(), dir.path().join("x.warc"), &options).unwrap_err();
        assert!(matches!(err, Error::InvalidCompressionLevel { level: 11 }));
    }
}
