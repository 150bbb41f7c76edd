//! Integration tests against real GRIB2 files, skipped when absent.
//!
//! Point TEST_DATA_DIR at a directory holding
//! `gep01.t00z.pgrb2a.0p50.f003` (a GEFS 0.5° member) to run them.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use grib2_parser::{Grib2StreamReader, Grib2Tables, KeyValue};
use test_utils::require_test_file;

#[test]
fn test_parse_gefs_member() {
    let path = require_test_file!("gep01.t00z.pgrb2a.0p50.f003");

    let file = File::open(&path).expect("Failed to open test file");
    let reader = Grib2StreamReader::new(BufReader::new(file), Arc::new(Grib2Tables::builtin()));

    let mut message_count = 0;
    for message in reader {
        let message = message.expect("Real sample should parse");
        if message_count == 0 {
            assert_eq!(message.key("edition"), Some(KeyValue::Int(2)));
            assert_eq!(message.key("Ni"), Some(KeyValue::Int(720)));
            assert_eq!(message.key("Nj"), Some(KeyValue::Int(361)));

            let values = message.unpack_data().expect("first field should unpack");
            assert_eq!(values.len(), 259_920);
            println!(
                "Message 0: {} step {:?}",
                message.parameter(),
                message.key("step")
            );
        }
        message_count += 1;
    }

    assert!(message_count > 0, "Sample should contain messages");
    println!("✓ Parsed {} messages", message_count);
}
