//! Common test utilities for grib2-parser tests
//!
//! Wraps generated messages in a reader over the built-in tables.

use std::sync::Arc;

use bytes::Bytes;
use grib2_parser::{Grib2Message, Grib2Reader, Grib2Tables};

#[allow(dead_code)]
/// Reader over an in-memory file image using the built-in tables.
pub fn reader_for(bytes: Vec<u8>) -> Grib2Reader {
    Grib2Reader::new(Bytes::from(bytes), Arc::new(Grib2Tables::builtin()))
}

/// Parse the single message in `bytes`.
#[allow(dead_code)]
pub fn parse_one(bytes: Vec<u8>) -> Grib2Message {
    reader_for(bytes)
        .next_message()
        .expect("Should parse without error")
        .expect("Should have a message")
}
