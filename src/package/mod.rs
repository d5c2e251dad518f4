//! WACZ packages.
//!
//! A package is a stored zip holding WARC files under `archive/`, a CDXJ
//! index, a page list, optional logs and a `datapackage.json` manifest that
//! lists every other entry with its digest.
//!
//! Extraction unzips the package and unfolds each container in `archive/`
//! into a sibling directory named after it; creation folds those
//! directories back into containers and hands them to a [`Packager`].

pub mod cdx;
pub mod datapackage;
pub mod pages;
mod surt;

pub use surt::surt;

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::codec::{CreateResult, EncodeOptions, ExtractResult, decode_container, encode_directory};
use crate::format::detect::{Signature, detect_path};
use crate::format::{
    CONTAINERS_DIR, MANIFEST_FILE, WARC_GZ_EXTENSION, container_stem, is_container_name,
};
use crate::progress::ProgressReporter;
use crate::safety::safe_join;
use crate::warc::digest;
use crate::{Error, Result};

use self::cdx::{IndexEntry, index_container, write_cdxj};
use self::datapackage::{DIGEST_FILE, DataPackage, digest_json};
use self::pages::{PAGES_FILE, collect_pages, write_pages};

/// Directory of page lists inside a package.
pub const PAGES_DIR: &str = "pages";
/// Directory of crawl logs inside a package.
pub const LOGS_DIR: &str = "logs";
/// Directory of indexes inside a package.
pub const INDEXES_DIR: &str = "indexes";
/// Path of the CDXJ index inside a package.
pub const INDEX_PATH: &str = "indexes/index.cdx";

/// What to put in a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageRequest {
    /// Container files, stored under `archive/` by file name.
    pub containers: Vec<PathBuf>,
    /// Page lists to copy instead of generating one.
    pub pages_dir: Option<PathBuf>,
    /// Log files to copy.
    pub logs_dir: Option<PathBuf>,
}

/// What a [`Packager`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSummary {
    /// Containers stored.
    pub containers: usize,
    /// Zip entries written, manifests included.
    pub entries: usize,
    /// Lines in the CDXJ index.
    pub indexed_records: usize,
    /// Pages listed, when the page list was generated.
    pub pages: usize,
}

/// Builds a package file from a set of containers.
pub trait Packager {
    /// Writes the package for `request` to `output`.
    fn package(&self, request: &PackageRequest, output: &Path) -> Result<PackageSummary>;
}

/// The built-in [`Packager`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WaczPackager;

impl Packager for WaczPackager {
    fn package(&self, request: &PackageRequest, output: &Path) -> Result<PackageSummary> {
        let mut zip = PackageWriter::create(output)?;
        let mut summary = PackageSummary::default();
        let mut index: Vec<IndexEntry> = Vec::new();

        for container in &request.containers {
            let name = container
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::unsupported_format(container, "container path has no file name")
                })?;
            index.extend(index_container(container, &name)?);
            zip.add_file(&format!("{}/{}", CONTAINERS_DIR, name), container)?;
            summary.containers += 1;
        }

        let copied = match &request.pages_dir {
            Some(dir) => zip.add_dir(PAGES_DIR, dir)?,
            None => 0,
        };
        if copied == 0 {
            let pages = collect_pages(&index);
            let mut buf = Vec::new();
            write_pages(&pages, &mut buf)?;
            zip.add_bytes(&format!("{}/{}", PAGES_DIR, PAGES_FILE), &buf)?;
            summary.pages = pages.len();
        }

        if let Some(dir) = &request.logs_dir {
            zip.add_dir(LOGS_DIR, dir)?;
        }

        let mut cdx = Vec::new();
        write_cdxj(&index, &mut cdx)?;
        zip.add_bytes(INDEX_PATH, &cdx)?;
        summary.indexed_records = index.len();

        summary.entries = zip.finish()?;
        log::info!(
            "packaged {} containers ({} index lines) into {}",
            summary.containers,
            summary.indexed_records,
            output.display()
        );
        Ok(summary)
    }
}

/// Zip writer that lists every entry in the manifest.
struct PackageWriter {
    zip: ZipWriter<File>,
    manifest: DataPackage,
    entries: usize,
}

impl PackageWriter {
    fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            zip: ZipWriter::new(File::create(path)?),
            manifest: DataPackage::new(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            entries: 0,
        })
    }

    fn options(size: u64) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(size >= u64::from(u32::MAX))
    }

    fn add_file(&mut self, name: &str, path: &Path) -> Result<()> {
        let size = fs::metadata(path)?.len();
        self.zip.start_file(name, Self::options(size))?;
        let mut hashing = HashingWriter::new(&mut self.zip);
        let bytes = io::copy(&mut BufReader::new(File::open(path)?), &mut hashing)?;
        let hash = hashing.digest();
        self.manifest.add(name, hash, bytes);
        self.entries += 1;
        log::debug!("stored {} ({} bytes)", name, bytes);
        Ok(())
    }

    fn add_bytes(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.write_unlisted(name, data)?;
        self.manifest.add(name, digest::sha256_digest(data), data.len() as u64);
        Ok(())
    }

    fn write_unlisted(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.zip.start_file(name, Self::options(data.len() as u64))?;
        self.zip.write_all(data)?;
        self.entries += 1;
        Ok(())
    }

    /// Stores the regular files directly inside `dir` under `prefix/`.
    fn add_dir(&mut self, prefix: &str, dir: &Path) -> Result<usize> {
        let mut files: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            files.push((name, entry.path()));
        }
        files.sort();
        for (name, path) in &files {
            self.add_file(&format!("{}/{}", prefix, name), path)?;
        }
        Ok(files.len())
    }

    /// Writes the manifest and its digest, then closes the zip.
    fn finish(mut self) -> Result<usize> {
        let manifest = self.manifest.to_json()?;
        self.write_unlisted(MANIFEST_FILE, &manifest)?;
        self.write_unlisted(DIGEST_FILE, &digest_json(&manifest)?)?;
        self.zip.finish()?;
        Ok(self.entries)
    }
}

struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    fn digest(self) -> String {
        format!("{}:{}", digest::ALGORITHM, hex::encode(self.hasher.finalize()))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Unzips a package into `output_dir` and unfolds its containers.
///
/// Every entry is written through [`safe_join`]. Each `archive/<name>.warc`
/// or `archive/<name>.warc.gz` is then extracted into `archive/<name>/`;
/// the container files themselves stay where they were.
pub fn extract_package(
    input: &Path,
    output_dir: &Path,
    progress: &dyn ProgressReporter,
) -> Result<ExtractResult> {
    let signature = detect_path(input)?;
    if signature != Signature::Zip {
        return Err(Error::InvalidPackage(format!(
            "{} is not a zip file (found {})",
            input.display(),
            signature
        )));
    }

    let mut archive = ZipArchive::new(BufReader::new(File::open(input)?))?;
    fs::create_dir_all(output_dir)?;
    let containers = unzip(&mut archive, output_dir)?;

    log::info!(
        "unpacked {} entries from {}, {} containers",
        archive.len(),
        input.display(),
        containers.len()
    );

    let mut result = ExtractResult::default();
    for name in &containers {
        let path = safe_join(output_dir, &[CONTAINERS_DIR, name]);
        let target = safe_join(output_dir, &[CONTAINERS_DIR, container_stem(name)]);
        result.absorb(decode_container(&path, &target, progress)?);
    }
    Ok(result)
}

/// Writes every entry and returns the container names found in `archive/`.
fn unzip<R: Read + Seek>(archive: &mut ZipArchive<R>, output_dir: &Path) -> Result<Vec<String>> {
    let mut containers = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let target = safe_join(output_dir, &[name.as_str()]);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(&target)?);
        io::copy(&mut entry, &mut out)?;
        out.flush()?;

        if let Some(file_name) = name
            .strip_prefix(CONTAINERS_DIR)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.contains('/') && is_container_name(rest))
        {
            containers.push(file_name.to_string());
        }
    }
    Ok(containers)
}

/// Settings for [`create_package`].
#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Settings for each folded container; `compressed` is forced on.
    pub encode: EncodeOptions,
    /// Page lists to store instead of `<input>/pages`.
    pub pages_dir: Option<PathBuf>,
    /// Logs to store instead of `<input>/logs`.
    pub logs_dir: Option<PathBuf>,
}

/// Folds an unpacked package tree back into a package at `output`.
///
/// Each directory in `<input>/archive/` becomes `<dir>.warc.gz`; container
/// files in `archive/` whose stem did not come from a directory are stored
/// as they are. Pages and logs are taken from the options or from the tree.
/// Indexes and manifests in the tree are ignored and regenerated.
///
/// # Errors
///
/// [`Error::EmptyArchive`] if there is no container to store.
pub fn create_package(
    input_dir: &Path,
    output: &Path,
    options: &PackageOptions,
    packager: &dyn Packager,
    progress: &dyn ProgressReporter,
) -> Result<CreateResult> {
    let containers_dir = input_dir.join(CONTAINERS_DIR);
    let staging = tempfile::Builder::new().prefix("waczfold-").tempdir()?;

    let mut subdirs: Vec<(String, PathBuf)> = Vec::new();
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    if containers_dir.is_dir() {
        for entry in fs::read_dir(&containers_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                subdirs.push((name, entry.path()));
            } else if file_type.is_file() && is_container_name(&name) {
                files.push((name, entry.path()));
            }
        }
    }
    subdirs.sort();
    files.sort();

    let mut result = CreateResult::default();
    let mut staged: Vec<PathBuf> = Vec::new();
    let mut produced: HashSet<String> = HashSet::new();

    let mut encode = options.encode.clone();
    encode.compressed = true;
    if encode.exclude.is_none() {
        encode.exclude = Some(output.to_path_buf());
    }

    for (name, dir) in &subdirs {
        let warc = staging.path().join(format!("{}{}", name, WARC_GZ_EXTENSION));
        result.absorb(encode_directory(dir, &warc, &encode, progress)?);
        produced.insert(name.clone());
        staged.push(warc);
    }

    for (name, path) in &files {
        if produced.contains(container_stem(name)) {
            log::debug!("{} superseded by its unpacked directory", name);
            continue;
        }
        let copy = staging.path().join(name);
        fs::copy(path, &copy)?;
        log::debug!("copying {} through unchanged", name);
        result.containers += 1;
        staged.push(copy);
    }

    if staged.is_empty() {
        return Err(Error::EmptyArchive {
            dir: containers_dir,
        });
    }

    let request = PackageRequest {
        containers: staged,
        pages_dir: sidecar(options.pages_dir.as_deref(), input_dir, PAGES_DIR),
        logs_dir: sidecar(options.logs_dir.as_deref(), input_dir, LOGS_DIR),
    };
    packager.package(&request, output)?;
    Ok(result)
}

fn sidecar(explicit: Option<&Path>, input_dir: &Path, name: &str) -> Option<PathBuf> {
    match explicit {
        Some(dir) => Some(dir.to_path_buf()),
        None => {
            let dir = input_dir.join(name);
            dir.is_dir().then_some(dir)
        }
    }
}
