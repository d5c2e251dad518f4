//! Sort-friendly URI Reordering Transform keys for the CDXJ index.

use url::Url;

/// Returns the SURT key of `url`.
///
/// The host is lowercased, reversed label by label, and a leading `www`
/// dropped; a non-default port follows the host. Path and query keep their
/// case. URLs without a host (`file:`, `urn:`, ...) and unparseable input
/// are lowercased and returned as-is.
///
/// # Examples
///
/// ```
/// use waczfold::package::surt;
///
/// assert_eq!(surt("https://www.Example.com/a/B?x=1"), "com,example)/a/B?x=1");
/// assert_eq!(surt("http://example.com:8080"), "com,example:8080)/");
/// ```
pub fn surt(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return url.trim().to_ascii_lowercase();
    };
    let Some(host) = parsed.host_str().filter(|h| !h.is_empty()) else {
        return url.trim().to_ascii_lowercase();
    };

    let host = host.to_ascii_lowercase();
    let mut labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    labels.reverse();
    if labels.len() > 2 && labels.last() == Some(&"www") {
        labels.pop();
    }

    let mut key = labels.join(",");
    if let Some(port) = parsed.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push(')');
    key.push_str(parsed.path());
    if let Some(query) = parsed.query() {
        key.push('?');
        key.push_str(query);
    }
    key
}
