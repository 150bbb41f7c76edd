//! Reader lifecycle tests
//!
//! These tests verify:
//! 1. Forward and repeatable traversal counts
//! 2. Message identifiers
//! 3. Eager configuration errors and lazy decode errors
//!
//! Run with: cargo test --package grib-arrow --test reader -- --nocapture

mod common;

use common::{height_message, temperature_message, Fixture};
use grib_arrow::{ErrorKind, GribArrowError, GribReader, MatchStrategy, ReaderOptions};
use test_utils::csv_files;

fn count(reader: &mut GribReader) -> usize {
    reader
        .iter()
        .map(|m| m.expect("message should decode"))
        .count()
}

#[test]
fn test_default_iteration_is_single_pass() {
    let fixture = Fixture::new();
    let path = fixture.grib(
        "three.grib2",
        &[temperature_message(), height_message(1), height_message(2)],
    );

    let mut reader = GribReader::open(&path).unwrap();
    assert_eq!(count(&mut reader), 3);
    assert_eq!(count(&mut reader), 0, "second pass should be empty");
}

#[test]
fn test_repeatable_iteration_restarts() {
    let fixture = Fixture::new();
    let path = fixture.grib(
        "three.grib2",
        &[temperature_message(), height_message(1), height_message(2)],
    );

    let mut reader = GribReader::builder(&path).unwrap().repeatable(true).build();
    for pass in 0..3 {
        let ids: Vec<i64> = reader.iter().map(|m| m.unwrap().message_id()).collect();
        assert_eq!(ids, vec![0, 1, 2], "pass {}", pass);
    }
}

#[test]
fn test_repeatable_after_partial_iteration() {
    let fixture = Fixture::new();
    let path = fixture.grib("two.grib2", &[height_message(1), height_message(2)]);

    let mut reader = GribReader::builder(&path).unwrap().repeatable(true).build();
    let first = reader.iter().next().unwrap().unwrap();
    assert_eq!(first.model_number(), 1);
    drop(first);

    assert_eq!(count(&mut reader), 2);
}

#[test]
fn test_partial_iteration_resumes_without_repeat() {
    let fixture = Fixture::new();
    let path = fixture.grib(
        "three.grib2",
        &[height_message(1), height_message(2), height_message(3)],
    );

    let mut reader = GribReader::open(&path).unwrap();
    {
        let mut iter = reader.iter();
        assert_eq!(iter.next().unwrap().unwrap().message_id(), 0);
    }
    let rest: Vec<i64> = reader.iter().map(|m| m.unwrap().message_id()).collect();
    assert_eq!(rest, vec![1, 2]);
}

#[test]
fn test_for_loop_over_reader() {
    let fixture = Fixture::new();
    let path = fixture.grib("two.grib2", &[height_message(4), height_message(5)]);

    let mut reader = GribReader::open(&path).unwrap();
    let mut members = Vec::new();
    for message in &mut reader {
        members.push(message.unwrap().model_number());
    }
    assert_eq!(members, vec![4, 5]);
}

#[test]
fn test_empty_file_yields_nothing() {
    let fixture = Fixture::new();
    let path = fixture.file("empty.grib2", Vec::<u8>::new());

    let mut reader = GribReader::open(&path).unwrap();
    assert_eq!(count(&mut reader), 0);
}

#[test]
fn test_in_memory_reader() {
    let bytes = test_utils::concat_messages(&[temperature_message().build(), height_message(7).build()]);
    let mut reader = GribReader::builder_from_bytes(bytes, ReaderOptions::default().repeatable(true))
        .unwrap()
        .build();

    assert!(reader.path().is_none());
    assert_eq!(count(&mut reader), 2);
    assert_eq!(count(&mut reader), 2);
}

#[test]
fn test_missing_grib_file() {
    let fixture = Fixture::new();
    let err = GribReader::open(fixture.missing("nope.grib2")).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
    assert!(matches!(err, GribArrowError::FileNotFound(_)));
}

#[test]
fn test_directory_is_not_a_grib_file() {
    let fixture = Fixture::new();
    let err = GribReader::open(fixture.dir.path()).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
}

#[test]
fn test_missing_locations_file() {
    let fixture = Fixture::new();
    let path = fixture.grib("t.grib2", &[temperature_message()]);

    let err = GribReader::builder(&path)
        .unwrap()
        .with_locations_file(fixture.missing("locations.csv"))
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::AuxiliaryFileNotFound);
    assert!(err.to_string().contains("locations"), "{}", err);
}

#[test]
fn test_missing_conversions_file() {
    let fixture = Fixture::new();
    let path = fixture.grib("t.grib2", &[temperature_message()]);

    let err = GribReader::builder(&path)
        .unwrap()
        .with_conversions_file(fixture.missing("conversions.csv"))
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::AuxiliaryFileNotFound);
}

#[test]
fn test_malformed_stations_file() {
    let fixture = Fixture::new();
    let path = fixture.grib("t.grib2", &[temperature_message()]);
    let stations = fixture.file("stations.csv", "station_id,lat,lon\nEGLC,51.5\nEGCC,53.35,-2.27,78\n");

    let err = GribReader::builder(&path)
        .unwrap()
        .with_stations_file(stations)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::MalformedAuxiliaryFile);
}

#[test]
fn test_conversions_without_ceiling_rejected_before_reading() {
    let fixture = Fixture::new();
    // Not a GRIB file at all: configuration must fail before it is read
    let path = fixture.file("junk.grib2", b"definitely not grib".to_vec());
    let conversions = fixture.file(
        "conversions.csv",
        "parameterId,addition_value,subtraction_value,multiplication_value,division_value\n167,,273.15,,\n",
    );

    let err = GribReader::builder(&path)
        .unwrap()
        .with_conversions_file(conversions)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    assert!(err.to_string().contains("ceiling_value"), "{}", err);
}

#[test]
fn test_locations_without_coordinates_rejected() {
    let fixture = Fixture::new();
    let path = fixture.grib("t.grib2", &[temperature_message()]);
    let locations = fixture.file("locations.csv", "name,latitude,lon\nOslo,59.9,10.7\n");

    let err = GribReader::builder(&path)
        .unwrap()
        .with_locations_file(locations)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
}

#[test]
fn test_decode_failure_is_lazy() {
    let fixture = Fixture::new();
    // gzip header: externally compressed content
    let path = fixture.file(
        "compressed.grib2.gz",
        vec![0x1fu8, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x4b, 0x4c],
    );
    let locations = fixture.file("locations.csv", csv_files::LOCATIONS);

    let mut reader = GribReader::builder(&path)
        .expect("opening must not decode")
        .with_locations_file(locations)
        .expect("auxiliary files are valid")
        .build();

    let mut iter = reader.iter();
    let err = iter.next().unwrap().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    assert!(iter.next().is_none(), "iterator is fused after a failure");
}

#[test]
fn test_decode_failure_after_good_messages() {
    let fixture = Fixture::new();
    let mut bytes = height_message(1).build();
    let second = height_message(2).build();
    bytes.extend_from_slice(&second[..second.len() / 2]);
    let path = fixture.file("truncated.grib2", bytes);

    let mut reader = GribReader::open(&path).unwrap();
    let results: Vec<_> = reader.iter().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert_eq!(
        results[1].as_ref().err().map(GribArrowError::kind),
        Some(ErrorKind::DecodeFailure)
    );
}

#[test]
fn test_unsupported_grid_template_fails_on_advance() {
    let fixture = Fixture::new();
    let mut gaussian = temperature_message().build();
    let section1_len = u32::from_be_bytes(gaussian[16..20].try_into().unwrap()) as usize;
    let section3 = 16 + section1_len;
    assert_eq!(gaussian[section3 + 4], 3);
    gaussian[section3 + 12..section3 + 14].copy_from_slice(&40u16.to_be_bytes());

    let mut bytes = height_message(1).build();
    bytes.extend_from_slice(&gaussian);
    let path = fixture.file("gaussian.grib2", bytes);

    let mut reader = GribReader::open(&path).unwrap();
    let mut iter = reader.iter();
    let first = iter.next().unwrap().unwrap();
    assert_eq!(first.parameter_id(), 156);

    let err = iter.next().unwrap().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    assert!(err.to_string().contains("3.40"), "{}", err);
    assert!(iter.next().is_none());
}

#[test]
fn test_options_applied_through_builder() {
    let fixture = Fixture::new();
    let path = fixture.grib("t.grib2", &[temperature_message()]);
    let options = ReaderOptions::default()
        .with_match_strategy(MatchStrategy::BucketIndex)
        .with_csv_delimiter(';');

    let locations = fixture.file("locations.csv", "name;lat;lon\nBergen;60.39;5.32\n");
    let reader = GribReader::builder_with_options(&path, options)
        .unwrap()
        .with_locations_file(locations)
        .unwrap()
        .build();

    assert_eq!(reader.options().match_strategy, MatchStrategy::BucketIndex);
    assert_eq!(reader.locations().map(|l| l.len()), Some(1));
}

#[test]
fn test_invalid_options_rejected() {
    let fixture = Fixture::new();
    let path = fixture.grib("t.grib2", &[temperature_message()]);
    let options = ReaderOptions::default().with_csv_delimiter('é');

    let err = GribReader::builder_with_options(&path, options).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
}
