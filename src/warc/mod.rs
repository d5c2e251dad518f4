//! WARC record framing.
//!
//! A WARC file is a sequence of records, each a version line, a block of
//! `Name: value` header lines, an empty line, `Content-Length` bytes of block
//! and a `\r\n\r\n` trailer. A `.warc.gz` is the same stream with every record
//! compressed as its own gzip member.
//!
//! This module is deliberately small: it parses and renders record framing
//! and the HTTP header block of request/response records, and leaves
//! everything else (digests aside) to the caller. Payloads are never buffered
//! here; [`WarcReader`] lends each record's body as a bounded stream and
//! [`WarcWriter`] copies exactly the declared number of bytes.

pub mod coding;
pub mod digest;
mod headers;
mod http;
mod reader;
mod writer;

pub use headers::HeaderMap;
pub use http::HttpHeaders;
pub use reader::{ContainerInput, Payload, Record, WarcReader};
pub use writer::{DEFAULT_LEVEL, RecordLocation, WarcWriter};

/// Version line written for new records.
pub const WARC_VERSION: &str = "WARC/1.0";

/// Header names used by this crate.
pub mod names {
    /// Record type.
    pub const WARC_TYPE: &str = "WARC-Type";
    /// Record identifier (`<urn:uuid:...>`).
    pub const WARC_RECORD_ID: &str = "WARC-Record-ID";
    /// Capture timestamp.
    pub const WARC_DATE: &str = "WARC-Date";
    /// Captured resource URL.
    pub const WARC_TARGET_URI: &str = "WARC-Target-URI";
    /// Digest over the whole block.
    pub const WARC_BLOCK_DIGEST: &str = "WARC-Block-Digest";
    /// Digest over the HTTP entity body.
    pub const WARC_PAYLOAD_DIGEST: &str = "WARC-Payload-Digest";
    /// Block length (WARC) or entity length (HTTP).
    pub const CONTENT_LENGTH: &str = "Content-Length";
    /// Block media type (WARC) or entity media type (HTTP).
    pub const CONTENT_TYPE: &str = "Content-Type";
    /// HTTP content coding.
    pub const CONTENT_ENCODING: &str = "Content-Encoding";
    /// HTTP transfer coding.
    pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
    /// Set on a full copy's record when its file holds the stored body
    /// because the content coding could not be undone. The value is the
    /// declared coding.
    pub const WARC_STORED_BODY: &str = "WARC-Waczfold-Stored-Body";
}

/// The `WARC-Type` of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// Information about the WARC file itself.
    Warcinfo,
    /// A captured request.
    Request,
    /// A captured response; the only content-bearing type for extraction.
    Response,
    /// A resource captured without HTTP framing.
    Resource,
    /// Metadata about another record.
    Metadata,
    /// A deduplicated response.
    Revisit,
    /// A transformed version of another record.
    Conversion,
    /// A continuation of a segmented record.
    Continuation,
    /// Any other value, kept verbatim.
    Other(String),
}

impl RecordType {
    /// Parses a `WARC-Type` value (case-insensitive).
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "warcinfo" => Self::Warcinfo,
            "request" => Self::Request,
            "response" => Self::Response,
            "resource" => Self::Resource,
            "metadata" => Self::Metadata,
            "revisit" => Self::Revisit,
            "conversion" => Self::Conversion,
            "continuation" => Self::Continuation,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    /// Returns the header value for this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Warcinfo => "warcinfo",
            Self::Request => "request",
            Self::Response => "response",
            Self::Resource => "resource",
            Self::Metadata => "metadata",
            Self::Revisit => "revisit",
            Self::Conversion => "conversion",
            Self::Continuation => "continuation",
            Self::Other(s) => s,
        }
    }

    /// Returns `true` for types whose block may start with HTTP headers.
    pub fn carries_http(&self) -> bool {
        matches!(self, Self::Request | Self::Response | Self::Revisit)
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The version line and named fields of a WARC record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarcHeader {
    /// The version line, e.g. `WARC/1.0`.
    pub version: String,
    /// Named fields in file order.
    pub headers: HeaderMap,
}

impl WarcHeader {
    /// Creates a header for a new record of the given type.
    pub fn new(record_type: RecordType) -> Self {
        let mut headers = HeaderMap::new();
        headers.append(names::WARC_TYPE, record_type.as_str());
        Self {
            version: WARC_VERSION.to_string(),
            headers,
        }
    }

    /// Returns the record type, `Other("")` if the field is missing.
    pub fn record_type(&self) -> RecordType {
        RecordType::parse(self.headers.get(names::WARC_TYPE).unwrap_or_default())
    }

    /// Returns the target URI with any surrounding angle brackets removed.
    pub fn target_uri(&self) -> Option<&str> {
        let value = self.headers.get(names::WARC_TARGET_URI)?.trim();
        let value = value
            .strip_prefix('<')
            .and_then(|v| v.strip_suffix('>'))
            .unwrap_or(value);
        (!value.is_empty()).then_some(value)
    }

    /// Returns the declared block length.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(names::CONTENT_LENGTH)
            .and_then(|v| v.trim().parse().ok())
    }

    /// Returns the block media type.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(names::CONTENT_TYPE)
    }

    /// Returns the record identifier.
    pub fn record_id(&self) -> Option<&str> {
        self.headers.get(names::WARC_RECORD_ID)
    }

    /// Returns the capture timestamp as written.
    pub fn date(&self) -> Option<&str> {
        self.headers.get(names::WARC_DATE)
    }

    /// Returns `true` if the block is an HTTP message.
    pub fn is_http(&self) -> bool {
        self.content_type()
            .map(|ct| {
                ct.trim_start()
                    .to_ascii_lowercase()
                    .starts_with("application/http")
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_parse() {
        assert_eq!(RecordType::parse("response"), RecordType::Response);
        assert_eq!(RecordType::parse(" WarcInfo "), RecordType::Warcinfo);
        assert_eq!(
            RecordType::parse("custom"),
            RecordType::Other("custom".into())
        );
        assert!(RecordType::Revisit.carries_http());
        assert!(!RecordType::Resource.carries_http());
    }

    #[test]
    fn test_header_accessors() {
        let mut header = WarcHeader::new(RecordType::Response);
        header
            .headers
            .append(names::WARC_TARGET_URI, "<http://example.com/>");
        header.headers.append(names::CONTENT_LENGTH, "42");
        header
            .headers
            .append(names::CONTENT_TYPE, "application/http; msgtype=response");

        assert_eq!(header.record_type(), RecordType::Response);
        assert_eq!(header.target_uri(), Some("http://example.com/"));
        assert_eq!(header.content_length(), Some(42));
        assert!(header.is_http());
    }

    #[test]
    fn test_missing_fields() {
        let header = WarcHeader {
            version: WARC_VERSION.into(),
            headers: HeaderMap::new(),
        };
        assert_eq!(header.record_type(), RecordType::Other(String::new()));
        assert_eq!(header.target_uri(), None);
        assert_eq!(header.content_length(), None);
        assert!(!header.is_http());
    }
}
