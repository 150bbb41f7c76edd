//! Tests against real ensemble output, skipped unless the sample file is
//! available (see `test_utils::find_test_file`).
//!
//! Run with: TEST_DATA_DIR=/data/grib cargo test --package grib-arrow --test real_samples

mod common;

use common::{f64_column, i64_column, Fixture};
use grib_arrow::GribReader;
use test_utils::{csv_files, grid::GLOBAL_HALF_DEGREE, require_test_file};

#[test]
fn test_gefs_member_joined_with_locations() {
    let path = require_test_file!("gep01.t00z.pgrb2a.0p50.f003");
    let fixture = Fixture::new();
    let locations = fixture.file("locations.csv", csv_files::LOCATIONS);

    let mut reader = GribReader::builder(&path)
        .unwrap()
        .with_locations_file(locations)
        .unwrap()
        .repeatable(true)
        .build();

    let mut messages = 0;
    for message in reader.iter() {
        let message = message.expect("sample should decode");
        assert_eq!(message.edition_number(), 2);
        assert_eq!(message.model_number(), 1);
        assert_eq!(message.step(), 3);

        let table = message.data_with_locations().unwrap();
        assert_eq!(table.num_rows(), 4);
        assert_eq!(i64_column(&table, "surrogate_key"), vec![0, 1, 2, 3]);
        for distance in f64_column(&table, "distance") {
            assert!(distance.unwrap() <= 0.5_f64.hypot(0.5) / 2.0 + 1e-9);
        }
        messages += 1;
    }
    assert!(messages > 0);
    assert_eq!(reader.iter().count(), messages, "repeatable pass");
}

#[test]
fn test_gefs_raw_grid() {
    let path = require_test_file!("gep01.t00z.pgrb2a.0p50.f003");

    let mut reader = GribReader::open(&path).unwrap();
    let message = reader.iter().next().unwrap().unwrap();
    let raw = message.data().unwrap();
    assert_eq!(raw.num_rows(), GLOBAL_HALF_DEGREE.size());

    let lats = f64_column(&raw, "lat");
    assert_eq!(lats[0], Some(GLOBAL_HALF_DEGREE.first_lat));
    assert_eq!(lats[GLOBAL_HALF_DEGREE.size() - 1], Some(GLOBAL_HALF_DEGREE.last_lat()));
    assert_eq!(f64_column(&raw, "lon")[1], Some(GLOBAL_HALF_DEGREE.first_lon + GLOBAL_HALF_DEGREE.step));
}
