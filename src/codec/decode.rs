//! Container → directory tree.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::{ExtractResult, full_copy_name, is_extractable, nested_path, record_path};
use crate::progress::ProgressReporter;
use crate::safety::safe_join;
use crate::warc::coding::decode_payload;
use crate::warc::{WarcReader, WarcWriter, names};
use crate::{Error, Result};

/// A file written during one extraction, keyed by its relative path.
struct Written {
    uri: String,
    /// Where the file moves when a later record needs its path as a
    /// directory.
    nested: String,
}

/// Extracts one container into `output_dir`.
///
/// Each extractable response payload is decoded and written to its
/// canonical path under `output_dir`; the container itself is copied,
/// uncompressed, to `output_dir/<name without .gz>` with every extracted
/// payload replaced by its canonical relative path.
///
/// When two records map to the same path the later one wins and a warning
/// is logged. A record whose path is, or becomes, a directory because of
/// another record's path is stored at its [`nested_path`] inside that
/// directory, whatever the record order. Its marker in the full copy is
/// still the canonical path.
///
/// A body whose content coding cannot be undone is written as stored, and
/// its record in the full copy carries [`names::WARC_STORED_BODY`] so the
/// coding is not applied a second time on create.
///
/// Output already written is left in place on error.
pub fn decode_container(
    input: &Path,
    output_dir: &Path,
    progress: &dyn ProgressReporter,
) -> Result<ExtractResult> {
    let source_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::unsupported_format(input, "container path has no file name"))?;

    fs::create_dir_all(output_dir)?;
    let full_copy = output_dir.join(full_copy_name(&source_name));
    if std::path::absolute(&full_copy)? == std::path::absolute(input)? {
        return Err(Error::unsupported_format(
            input,
            "extracting next to the container would overwrite it; choose another output directory",
        ));
    }

    let mut reader = WarcReader::open_path(input)?;
    let mut writer = WarcWriter::create_path(&full_copy, false)?;

    log::info!(
        "extracting {} into {}",
        input.display(),
        output_dir.display()
    );
    progress.on_container_start(input);

    let mut result = ExtractResult::default();
    let mut owners: HashMap<String, Written> = HashMap::new();

    while let Some(record) = reader.next_record()? {
        let offset = record.offset();
        let index = result.records;
        progress.on_record(index, record.header().target_uri());
        result.records += 1;

        let extract = is_extractable(record.header());
        let (mut header, http, mut payload) = record.into_parts();

        if !extract {
            let len = payload.remaining();
            writer
                .write_record(&mut header, http.as_ref(), &mut payload, len)
                .map_err(|e| at_offset(offset, e))?;
            continue;
        }

        let relative = record_path(&header, http.as_ref())?;
        let uri = header.target_uri().unwrap_or_default().to_string();
        make_room(output_dir, &relative, &mut owners)?;

        let mut stored = relative.clone();
        let mut target = safe_join(output_dir, &[relative.as_str()]);
        if target.is_dir() {
            stored = nested_path(&relative, http.as_ref());
            target = safe_join(output_dir, &[stored.as_str()]);
        }

        let written = Written {
            uri: uri.clone(),
            nested: nested_path(&stored, http.as_ref()),
        };
        if let Some(previous) = owners.insert(stored.clone(), written) {
            let message = format!(
                "{} and {} both map to {}; keeping the later one",
                previous.uri, uri, stored
            );
            log::warn!("{}", message);
            progress.on_warning(&message);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = BufWriter::new(File::create(&target)?);
        let outcome = decode_payload(&mut payload, http.as_ref(), &mut file)
            .map_err(|e| at_offset(offset, Error::Io(e)))?;
        file.flush()?;

        if !outcome.decoded {
            let coding = http
                .as_ref()
                .and_then(|h| h.header(names::CONTENT_ENCODING))
                .unwrap_or_default()
                .to_string();
            header.headers.set(names::WARC_STORED_BODY, coding);
            progress.on_warning(&format!(
                "{}: content coding could not be undone, stored bytes kept",
                stored
            ));
        }
        log::debug!("{} -> {} ({} bytes)", uri, stored, outcome.bytes_written);
        progress.on_file_written(&target, outcome.bytes_written);
        result.files_written += 1;
        result.bytes_written += outcome.bytes_written;

        writer.write_record_bytes(&mut header, http.as_ref(), relative.as_bytes())?;
    }

    writer.finish()?;
    progress.on_container_complete(result.records);
    log::info!(
        "extracted {} files from {} records",
        result.files_written,
        result.records
    );

    result.full_copies.push(full_copy);
    Ok(result)
}

/// Moves every file that sits where `relative` needs a directory into that
/// directory, under the file's index leaf.
///
/// The scheme segment is never a file, so prefixes start one segment in.
fn make_room(
    output_dir: &Path,
    relative: &str,
    owners: &mut HashMap<String, Written>,
) -> Result<()> {
    let segments: Vec<&str> = relative.split('/').collect();
    for depth in 2..segments.len() {
        let prefix = segments[..depth].join("/");
        let path = safe_join(output_dir, &[prefix.as_str()]);
        if !path.is_file() {
            continue;
        }
        let Some(parent) = path.parent() else {
            continue;
        };

        let owner = owners.remove(&prefix);
        let nested = owner
            .as_ref()
            .map(|o| o.nested.clone())
            .unwrap_or_else(|| nested_path(&prefix, None));

        // The file and the new directory share a name, so it waits in a
        // sibling directory while the swap happens.
        let holding = tempfile::Builder::new()
            .prefix(".waczfold-")
            .tempdir_in(parent)?;
        let held = holding.path().join("entity");
        fs::rename(&path, &held)?;
        fs::create_dir(&path)?;
        fs::rename(&held, safe_join(output_dir, &[nested.as_str()]))?;
        holding.close()?;

        log::debug!("moved {} to {} to make room for {}", prefix, nested, relative);
        if let Some(owner) = owner {
            let moved = Written {
                nested: format!("{}/{}", nested, nested_leaf(&owner.nested)),
                uri: owner.uri,
            };
            owners.insert(nested, moved);
        }
    }
    Ok(())
}

/// The index leaf name at the end of a nested path.
fn nested_leaf(nested: &str) -> &str {
    nested.rsplit('/').next().unwrap_or_default()
}

/// Rewrites a truncation surfaced while streaming a payload as a corrupt
/// record at the record's offset.
fn at_offset(offset: u64, err: Error) -> Error {
    match err {
        Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Error::corrupt_record(offset, "record block truncated")
        }
        other => other,
    }
}
