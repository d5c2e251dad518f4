//! Canonical mapping between captured URLs and relative file paths.
//!
//! A captured resource lands on disk at a path derived from its URL: the
//! scheme becomes the first directory (`https:`), consecutive slashes
//! collapse, directory-like URLs get a synthetic `__index__.<ext>` leaf, and
//! overlong segments are shortened with a digest suffix. The same path is the
//! lookup key when the tree is packed again, and [`reconstruct_url`] turns a
//! path without a matching record back into a URL.
//!
//! Distinct URLs can collapse onto one path (`a//b` and `a/b`, or two query
//! strings that differ only past the truncation point). Callers decide what to
//! do about such collisions; this module only guarantees determinism.

use sha2::{Digest, Sha256};
use url::Url;

use crate::mime::extension_for;
use crate::{Error, Result};

/// Stem of the synthetic leaf used for directory-like URLs.
pub const INDEX_STEM: &str = "__index__";

/// First path segments that mark a resource file in an unpacked archive.
pub const RECOGNIZED_SCHEMES: [&str; 3] = ["http:", "https:", "file:"];

/// Longest path segment written verbatim, in characters.
pub const MAX_SEGMENT_CHARS: usize = 255;

/// Characters kept from an overlong segment before the digest suffix.
pub const TRUNCATED_PREFIX_CHARS: usize = 190;

/// Converts a captured URL into its canonical relative path.
///
/// `content_type` is the record's declared HTTP `Content-Type`; it only
/// matters for directory-like URLs, where it picks the index leaf extension.
///
/// # Errors
///
/// Returns [`Error::InvalidUri`] if the URL is empty or cannot be parsed.
///
/// # Examples
///
/// ```
/// use waczfold::uri::canonicalize;
///
/// assert_eq!(
///     canonicalize("https://example.com/path/page.html", None).unwrap(),
///     "https:/example.com/path/page.html"
/// );
/// assert_eq!(
///     canonicalize("https://example.com/path/", None).unwrap(),
///     "https:/example.com/path/__index__.html"
/// );
/// assert_eq!(
///     canonicalize("file:///path/page.html", None).unwrap(),
///     "file:/path/page.html"
/// );
/// ```
pub fn canonicalize(uri: &str, content_type: Option<&str>) -> Result<String> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(Error::invalid_uri(None, "empty target URI"));
    }

    let url = Url::parse(uri).map_err(|e| Error::invalid_uri(Some(uri), e.to_string()))?;
    let protocol = format!("{}:", url.scheme());

    let rooted = root_empty_path(uri, &url);
    let body = match rooted.get(..protocol.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(&protocol) => &rooted[protocol.len()..],
        _ => rooted.as_str(),
    };

    let mut segments: Vec<String> = vec![protocol];
    let mut directory = true;
    for raw in body.split('/') {
        match raw {
            "" => {}
            "." => directory = true,
            ".." => {
                if segments.len() > 1 {
                    segments.pop();
                }
                directory = true;
            }
            name => {
                segments.push(name.to_string());
                directory = false;
            }
        }
    }
    if body.ends_with('/') {
        directory = true;
    }
    if directory {
        segments.push(format!("{}.{}", INDEX_STEM, extension_for(content_type)));
    }

    for segment in segments.iter_mut().skip(1) {
        if let Some(short) = truncate_segment(segment) {
            *segment = short;
        }
    }

    Ok(segments.join("/"))
}

/// Rebuilds a URL from a relative resource path.
///
/// In files mode the whole path becomes a `file:///` URL. Otherwise the first
/// segment is the scheme: `http:`/`https:` regain their `//`, anything else is
/// treated as a `file:` style scheme with an empty authority. A synthetic
/// index leaf turns back into a trailing slash.
///
/// Truncated segments cannot be restored; the URL keeps the shortened name.
///
/// # Examples
///
/// ```
/// use waczfold::uri::reconstruct_url;
///
/// assert_eq!(
///     reconstruct_url("http:/example.com/__index__.html", false),
///     "http://example.com/"
/// );
/// assert_eq!(reconstruct_url("file:/a/b.png", false), "file:///a/b.png");
/// assert_eq!(reconstruct_url("main/index.js", true), "file:///main/index.js");
/// ```
pub fn reconstruct_url(relative_path: &str, files_mode: bool) -> String {
    let mut parts: Vec<String> = relative_path.split('/').map(str::to_string).collect();

    if files_mode {
        parts.insert(0, "file://".to_string());
    } else if let Some(first) = parts.first_mut() {
        if first == "http:" || first == "https:" {
            first.push('/');
        } else {
            first.push_str("//");
        }
    }

    if let Some(last) = parts.last_mut() {
        if is_index_leaf(last) {
            last.clear();
        }
    }

    parts.join("/")
}

/// Returns `true` for a synthetic index leaf name such as `__index__.html`.
pub fn is_index_leaf(name: &str) -> bool {
    name.strip_prefix(INDEX_STEM)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|ext| !ext.is_empty() && !ext.contains('.'))
}

/// Returns `true` if a relative path's first segment is a recognized scheme.
pub fn has_recognized_scheme(relative_path: &str) -> bool {
    let first = relative_path.split('/').next().unwrap_or_default();
    RECOGNIZED_SCHEMES.contains(&first)
}

/// Returns `true` if resources with this URL can be extracted to files.
///
/// Only schemes whose canonical paths a later scan recognizes qualify;
/// anything else (`dns:`, `urn:`, ...) stays inside the container untouched.
pub fn is_extractable_uri(uri: &str) -> bool {
    Url::parse(uri.trim())
        .map(|url| {
            let protocol = format!("{}:", url.scheme());
            RECOGNIZED_SCHEMES.contains(&protocol.as_str())
        })
        .unwrap_or(false)
}

/// Shortens a segment longer than [`MAX_SEGMENT_CHARS`].
///
/// The result is the first [`TRUNCATED_PREFIX_CHARS`] characters, an
/// underscore, and the SHA-256 hex digest of the remaining characters.
pub fn truncate_segment(segment: &str) -> Option<String> {
    if segment.chars().count() <= MAX_SEGMENT_CHARS {
        return None;
    }

    let split_at = segment
        .char_indices()
        .nth(TRUNCATED_PREFIX_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(segment.len());
    let (prefix, suffix) = segment.split_at(split_at);
    let digest = hex::encode(Sha256::digest(suffix.as_bytes()));
    Some(format!("{}_{}", prefix, digest))
}

/// Makes sure a hierarchical URL with an empty path reads as `/`.
///
/// `http://example.com` and `http://example.com?q` become
/// `http://example.com/` and `http://example.com/?q`, so they map to an index
/// leaf instead of a file named after the host.
fn root_empty_path(uri: &str, url: &Url) -> String {
    if !url.has_authority() {
        return uri.to_string();
    }
    let Some(scheme_end) = uri.find("://") else {
        return uri.to_string();
    };

    let authority_start = scheme_end + 3;
    let authority_end = uri[authority_start..]
        .find(['/', '?', '#'])
        .map(|idx| authority_start + idx)
        .unwrap_or(uri.len());

    if uri[authority_end..].starts_with('/') {
        uri.to_string()
    } else {
        format!("{}/{}", &uri[..authority_end], &uri[authority_end..])
    }
}
