//! Fuzz target for URL to path canonicalization.
//!
//! Every path that comes out must stay inside the output directory once
//! joined, and must map back to some URL without panicking.
//!
//! Run with: cargo +nightly fuzz run canonicalize

#![no_main]

use libfuzzer_sys::fuzz_target;
use waczfold::safety::{is_within, safe_join};
use waczfold::uri::{MAX_SEGMENT_CHARS, canonicalize, reconstruct_url};

fuzz_target!(|data: &[u8]| {
    let Ok(uri) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(relative) = canonicalize(uri, Some("text/html")) else {
        return;
    };

    for segment in relative.split('/') {
        assert!(segment.chars().count() <= MAX_SEGMENT_CHARS);
    }
    let joined = safe_join("/out", &[relative.as_str()]);
    assert!(is_within("/out", &joined));
    let _ = reconstruct_url(&relative, false);
});
