//! Fuzz target for the record reader.
//!
//! Feeds arbitrary bytes (plain or gzip) through `ContainerInput` and reads
//! every record and payload. Errors are expected; panics and hangs are not.
//!
//! Run with: cargo +nightly fuzz run warc_reader

#![no_main]

use std::io::{BufReader, Read};

use libfuzzer_sys::fuzz_target;
use waczfold::warc::{ContainerInput, WarcReader};
use waczfold::warc::coding::ContentCoding;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = ContainerInput::new(data) else {
        return;
    };
    let mut reader = WarcReader::new(input);
    while let Ok(Some(mut record)) = reader.next_record() {
        // Touch the parsed HTTP head the way extraction does
        let _ = ContentCoding::from_http(record.http());
        let _ = record.header().target_uri();
        let mut sink = Vec::new();
        if BufReader::new(record.payload()).read_to_end(&mut sink).is_err() {
            break;
        }
    }
});
