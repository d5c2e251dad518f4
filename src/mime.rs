//! Content type and file extension mapping.
//!
//! Two total functions back the canonical path rules: [`extension_for`]
//! names the synthetic index leaf from a declared content type, and
//! [`guess_content_type`] labels a synthesized record from a file name.
//! Both use the same static table, so a leaf named by the first maps back to
//! the type it came from.

/// Content type assumed when a file name gives no hint.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Extension used when no content type is declared at all.
pub const DEFAULT_EXTENSION: &str = "html";

/// Extension used for declared content types this table does not know.
pub const UNKNOWN_EXTENSION: &str = "bin";

/// (content type, canonical extension, extra extensions)
const TABLE: &[(&str, &str, &[&str])] = &[
    ("text/html", "html", &["htm", "shtml"]),
    ("text/css", "css", &[]),
    ("text/plain", "txt", &["text", "log"]),
    ("text/csv", "csv", &[]),
    ("text/xml", "xml", &[]),
    ("text/markdown", "md", &["markdown"]),
    ("text/calendar", "ics", &[]),
    ("text/javascript", "js", &["mjs"]),
    ("application/javascript", "js", &[]),
    ("application/x-javascript", "js", &[]),
    ("application/json", "json", &["map"]),
    ("application/ld+json", "jsonld", &[]),
    ("application/manifest+json", "webmanifest", &[]),
    ("application/xml", "xml", &["xsl"]),
    ("application/xhtml+xml", "xhtml", &[]),
    ("application/rss+xml", "rss", &[]),
    ("application/atom+xml", "atom", &[]),
    ("application/pdf", "pdf", &[]),
    ("application/zip", "zip", &[]),
    ("application/gzip", "gz", &[]),
    ("application/wasm", "wasm", &[]),
    ("application/octet-stream", "bin", &["exe", "dll", "so"]),
    ("application/x-x509-ca-cert", "der", &["pem", "crt"]),
    ("image/png", "png", &[]),
    ("image/jpeg", "jpeg", &["jpg", "jpe"]),
    ("image/gif", "gif", &[]),
    ("image/webp", "webp", &[]),
    ("image/avif", "avif", &[]),
    ("image/svg+xml", "svg", &["svgz"]),
    ("image/x-icon", "ico", &[]),
    ("image/vnd.microsoft.icon", "ico", &[]),
    ("image/bmp", "bmp", &[]),
    ("image/tiff", "tif", &["tiff"]),
    ("font/woff", "woff", &[]),
    ("font/woff2", "woff2", &[]),
    ("font/ttf", "ttf", &[]),
    ("font/otf", "otf", &[]),
    ("application/font-woff", "woff", &[]),
    ("application/vnd.ms-fontobject", "eot", &[]),
    ("audio/mpeg", "mp3", &["mpga"]),
    ("audio/ogg", "oga", &["ogg"]),
    ("audio/wav", "wav", &[]),
    ("video/mp4", "mp4", &["m4v"]),
    ("video/webm", "webm", &[]),
    ("video/ogg", "ogv", &[]),
    ("application/warc", "warc", &[]),
];

/// Returns the file extension for a declared content type.
///
/// Parameters (`; charset=...`) and case are ignored. `None` (or an empty
/// value) gives [`DEFAULT_EXTENSION`]; an unknown type gives
/// [`UNKNOWN_EXTENSION`].
///
/// # Examples
///
/// ```
/// use waczfold::mime::extension_for;
///
/// assert_eq!(extension_for(Some("text/html; charset=utf-8")), "html");
/// assert_eq!(extension_for(Some("image/x-icon")), "ico");
/// assert_eq!(extension_for(None), "html");
/// ```
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let Some(essence) = content_type.map(essence).filter(|s| !s.is_empty()) else {
        return DEFAULT_EXTENSION;
    };

    TABLE
        .iter()
        .find(|(ty, _, _)| ty.eq_ignore_ascii_case(&essence))
        .map(|(_, ext, _)| *ext)
        .unwrap_or(UNKNOWN_EXTENSION)
}

/// Guesses a content type from a file name's extension.
///
/// Falls back to [`DEFAULT_CONTENT_TYPE`] when the name has no extension or
/// the extension is unknown.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let Some(ext) = file_name.rsplit_once('.').map(|(_, ext)| ext) else {
        return DEFAULT_CONTENT_TYPE;
    };

    TABLE
        .iter()
        .find(|(_, canonical, extra)| {
            canonical.eq_ignore_ascii_case(ext) || extra.iter().any(|e| e.eq_ignore_ascii_case(ext))
        })
        .map(|(ty, _, _)| *ty)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Strips parameters and surrounding whitespace from a content type.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_defaults() {
        assert_eq!(extension_for(None), "html");
        assert_eq!(extension_for(Some("")), "html");
        assert_eq!(extension_for(Some("application/x-unheard-of")), "bin");
    }

    #[test]
    fn test_extension_for_ignores_parameters_and_case() {
        assert_eq!(extension_for(Some("Text/CSS; charset=UTF-8")), "css");
        assert_eq!(extension_for(Some("application/json")), "json");
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("favicon.ico"), "image/x-icon");
        assert_eq!(guess_content_type("photo.JPG"), "image/jpeg");
        assert_eq!(guess_content_type("__index__.html"), "text/html");
        assert_eq!(guess_content_type("README"), "text/html");
        assert_eq!(guess_content_type("archive.unknownext"), "text/html");
    }

    #[test]
    fn test_index_leaf_maps_back_to_its_type() {
        for ty in ["text/html", "text/css", "application/json", "image/png"] {
            let ext = extension_for(Some(ty));
            assert_eq!(guess_content_type(&format!("__index__.{}", ext)), ty);
        }
    }
}
