//! Path safety utilities.
//!
//! Every filesystem write derived from an archive (a record's target URI, a
//! zip entry name) goes through [`safe_join`], which neutralizes `..` and
//! absolute-looking segments so the result always stays under the base
//! directory. The check is purely lexical: no filesystem access, no
//! canonicalization, so it works for paths that do not exist yet.

use std::path::{Path, PathBuf};

/// Joins untrusted path segments onto `base`, never escaping it.
///
/// The segments are first normalized as if they were joined onto a synthetic
/// root (`/`), so `..` can climb no higher than that root, and leading
/// slashes are meaningless. The normalized relative path is then joined onto
/// `base`. An empty base means the current directory, and in that case the
/// relative path is returned as-is.
///
/// A trailing separator on the last segment is preserved.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use waczfold::safety::safe_join;
///
/// assert_eq!(
///     safe_join("/safe/path", &["../../../etc/passwd"]),
///     Path::new("/safe/path/etc/passwd")
/// );
/// assert_eq!(safe_join("", &["/etc/passwd"]), Path::new("etc/passwd"));
/// ```
pub fn safe_join(base: impl AsRef<Path>, segments: &[&str]) -> PathBuf {
    let base = base.as_ref();
    let (parts, trailing) = normalize_rooted(segments);

    let mut relative = parts.join("/");
    if trailing && !relative.is_empty() {
        relative.push('/');
    }

    if base.as_os_str().is_empty() || base == Path::new(".") {
        return PathBuf::from(relative);
    }
    if relative.is_empty() {
        return base.to_path_buf();
    }
    base.join(relative)
}

/// Returns `true` if `candidate`, after lexical normalization, lies under
/// `base` (or is `base` itself).
pub fn is_within(base: impl AsRef<Path>, candidate: impl AsRef<Path>) -> bool {
    let base = lexical_normalize(base.as_ref());
    let candidate = lexical_normalize(candidate.as_ref());
    candidate.starts_with(&base)
}

/// Resolves segments against a synthetic root, returning the surviving
/// components and whether the input ended with a separator.
fn normalize_rooted<'a>(segments: &[&'a str]) -> (Vec<&'a str>, bool) {
    let mut parts: Vec<&'a str> = Vec::new();
    let mut trailing = false;

    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        trailing = segment.ends_with(is_separator);
        for component in segment.split(is_separator) {
            match component {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
    }

    (parts, trailing)
}

fn is_separator(c: char) -> bool {
    c == '/' || (cfg!(windows) && c == '\\')
}

fn lexical_normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
