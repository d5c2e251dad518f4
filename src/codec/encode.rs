//! Directory tree → container.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use super::{CreateResult, is_extractable, nested_path, record_path};
use crate::mime::guess_content_type;
use crate::progress::ProgressReporter;
use crate::scan::{PathEntry, ScanMode, ScanOptions, ScanResult, scan};
use crate::uri::reconstruct_url;
use crate::warc::coding::{ContentCoding, encode_payload};
use crate::warc::{
    DEFAULT_LEVEL, HeaderMap, HttpHeaders, RecordType, WarcHeader, WarcReader, WarcWriter,
    digest, names,
};
use crate::{Error, Result};

/// Settings for one [`encode_directory`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Treat every file as a `file://` resource.
    pub files_mode: bool,
    /// Write one gzip member per record.
    pub compressed: bool,
    /// gzip level for the container and for re-encoded payloads.
    pub level: u32,
    /// Path left out of the scan, besides `output`.
    pub exclude: Option<PathBuf>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            files_mode: false,
            compressed: false,
            level: DEFAULT_LEVEL,
            exclude: None,
        }
    }
}

/// Builds a container at `output` from the tree at `input_dir`.
///
/// Records of the tree's container file come first, in their original
/// order; each extractable record whose canonical path names a scanned file
/// gets that file's current contents. Files no record claimed follow as
/// synthesized response records in path order.
///
/// A record's file is looked up at its canonical path first, then at its
/// [`nested_path`], where extraction puts it when that path is a directory.
/// A record flagged with [`names::WARC_STORED_BODY`] gets the file's bytes
/// as they are; every other record gets its declared content coding
/// applied again. The flag itself is not written out.
///
/// The tree is scanned, and layout errors raised, before `output` is
/// created.
pub fn encode_directory(
    input_dir: &Path,
    output: &Path,
    options: &EncodeOptions,
    progress: &dyn ProgressReporter,
) -> Result<CreateResult> {
    let mode = if options.files_mode {
        ScanMode::Files
    } else {
        ScanMode::Archive
    };
    let mut scan_options = ScanOptions::new(mode).exclude(output);
    if let Some(extra) = &options.exclude {
        scan_options = scan_options.exclude(extra);
    }
    let ScanResult {
        container,
        resources,
    } = scan(input_dir, &scan_options)?;

    log::info!(
        "creating {} from {} ({} resources{})",
        output.display(),
        input_dir.display(),
        resources.len(),
        if container.is_some() {
            ", with container"
        } else {
            ""
        }
    );

    let mut writer = WarcWriter::new(BufWriter::new(File::create(output)?), options.compressed)
        .level(options.level);
    progress.on_container_start(output);

    let mut result = CreateResult {
        containers: 1,
        ..Default::default()
    };
    let mut claimed: HashSet<String> = HashSet::new();

    if let Some(container) = &container {
        let mut reader = WarcReader::open_path(&container.path)?;
        while let Some(record) = reader.next_record()? {
            let offset = record.offset();
            progress.on_record(result.records_written, record.header().target_uri());
            let extract = is_extractable(record.header());
            let (mut header, http, mut payload) = record.into_parts();

            if extract {
                let relative = record_path(&header, http.as_ref())?;
                let stored_body = header.headers.remove(names::WARC_STORED_BODY).is_some();
                let nested = nested_path(&relative, http.as_ref());
                let found = resources
                    .get_key_value(&relative)
                    .or_else(|| resources.get_key_value(&nested));
                if let Some((key, entry)) = found {
                    let coding = if stored_body {
                        ContentCoding::Identity
                    } else {
                        ContentCoding::from_http(http.as_ref())
                    };
                    substitute(&mut writer, &mut header, http, entry, &coding, options.level)?;
                    claimed.insert(key.clone());
                    result.records_substituted += 1;
                    result.records_written += 1;
                    continue;
                }

                // The marker is the relative path; anything else is a body
                // the tree never had a file for.
                if payload.remaining() == relative.len() as u64 {
                    let mut body = Vec::with_capacity(relative.len());
                    payload
                        .read_to_end(&mut body)
                        .map_err(|e| at_offset(offset, e))?;
                    if body == relative.as_bytes() {
                        let message = format!(
                            "{} is missing; keeping its placeholder body",
                            relative
                        );
                        log::warn!("{}", message);
                        progress.on_warning(&message);
                        result.placeholders_kept += 1;
                    }
                    writer.write_record_bytes(&mut header, http.as_ref(), &body)?;
                    result.records_written += 1;
                    continue;
                }
            }

            let len = payload.remaining();
            writer
                .write_record(&mut header, http.as_ref(), &mut payload, len)
                .map_err(|e| match e {
                    Error::Io(io) => at_offset(offset, io),
                    other => other,
                })?;
            result.records_written += 1;
        }
    }

    for (relative, entry) in &resources {
        if claimed.contains(relative) {
            continue;
        }
        progress.on_record(result.records_written, None);
        synthesize(&mut writer, entry, options.files_mode)?;
        result.records_synthesized += 1;
        result.records_written += 1;
    }

    writer.finish()?;
    progress.on_container_complete(result.records_written);
    log::info!(
        "wrote {} records ({} substituted, {} synthesized)",
        result.records_written,
        result.records_substituted,
        result.records_synthesized
    );
    Ok(result)
}

/// Writes a record with its payload replaced by the file's contents.
fn substitute<W: io::Write>(
    writer: &mut WarcWriter<W>,
    header: &mut WarcHeader,
    mut http: Option<HttpHeaders>,
    entry: &PathEntry,
    coding: &ContentCoding,
    level: u32,
) -> Result<()> {
    let data = fs::read(&entry.path)?;
    let body = encode_payload(data, coding, level)?;

    if let Some(http) = http.as_mut() {
        if http.is_chunked() {
            http.remove_header(names::TRANSFER_ENCODING);
        }
        http.set_header(names::CONTENT_LENGTH, body.len().to_string());
    }

    let digests = digest::compute(http.as_ref(), &body);
    digest::refresh(header, &digests);

    log::debug!("substituting {} ({} bytes)", entry.relative_path, body.len());
    writer.write_record_bytes(header, http.as_ref(), &body)?;
    Ok(())
}

/// Writes a new response record for a file no record claimed.
fn synthesize<W: io::Write>(
    writer: &mut WarcWriter<W>,
    entry: &PathEntry,
    files_mode: bool,
) -> Result<()> {
    let url = reconstruct_url(&entry.relative_path, files_mode);
    let file_name = entry
        .relative_path
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let mut file = File::open(&entry.path)?;
    let size = file.metadata()?.len();

    let mut fields = HeaderMap::new();
    fields.append(names::CONTENT_TYPE, guess_content_type(file_name));
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http:") || lower.starts_with("https:") {
        fields.append(names::CONTENT_LENGTH, size.to_string());
    }
    let http = HttpHeaders::new("HTTP/1.1 200 OK", fields);

    let body = BufReader::new(&mut file).take(size);
    let (digests, hashed) = digest::compute_stream(Some(&http), body)?;
    if hashed != size {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("{} shrank while it was being read", entry.path.display()),
        )));
    }
    file.seek(SeekFrom::Start(0))?;

    let mut header = WarcHeader::new(RecordType::Response);
    header.headers.append(
        names::WARC_RECORD_ID,
        format!("<urn:uuid:{}>", Uuid::new_v4()),
    );
    header.headers.append(
        names::WARC_DATE,
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    header.headers.append(names::WARC_TARGET_URI, url.as_str());
    header
        .headers
        .append(names::CONTENT_TYPE, "application/http; msgtype=response");
    digest::apply(&mut header, &digests);

    log::debug!("synthesizing {} from {}", url, entry.relative_path);
    writer.write_record(&mut header, Some(&http), BufReader::new(file), size)?;
    Ok(())
}

fn at_offset(offset: u64, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::corrupt_record(offset, "record block truncated")
    } else {
        Error::Io(err)
    }
}
