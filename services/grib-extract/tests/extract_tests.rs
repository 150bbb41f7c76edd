//! End-to-end extraction tests
//!
//! Run with: cargo test --package grib-extract --test extract_tests

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::ipc::reader::FileReader;
use grib_extract::{run, JobConfig, OutputFormat, Outputs, TableSink};
use tempfile::TempDir;
use test_utils::{assert_approx_eq, concat_messages, csv_files, write_test_file, Grib2Builder};

fn temperature() -> Grib2Builder {
    Grib2Builder::new_gfs()
        .with_origin(62.0, 0.0, 0.5, 0.5)
        .with_grid(20, 20)
        .with_decimal_scale(3)
        .with_constant_value(280.128)
}

fn height() -> Grib2Builder {
    temperature()
        .with_parameter(3, 5)
        .with_level(100, 50_000)
        .with_decimal_scale(0)
        .with_constant_value(5_500.0)
}

fn write_grib(dir: &TempDir, name: &str, messages: &[Grib2Builder]) -> PathBuf {
    let bytes: Vec<Vec<u8>> = messages.iter().map(Grib2Builder::build).collect();
    write_test_file(dir.path(), name, concat_messages(&bytes))
}

#[test]
fn test_joined_csv_with_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let job = JobConfig {
        input: Some(write_grib(&dir, "t.grib2", &[temperature(), height()])),
        locations: Some(write_test_file(dir.path(), "locations.csv", csv_files::LOCATIONS)),
        conversions: Some(write_test_file(dir.path(), "conversions.csv", csv_files::CONVERSIONS)),
        output: Some(dir.path().join("out.csv")),
        ..Default::default()
    };

    let mut outputs = Outputs::create(&job).unwrap();
    let summary = run(&job, &mut outputs).unwrap();
    outputs.finish().unwrap();

    assert_eq!(summary.files, 1);
    assert_eq!(summary.messages, 2);
    assert_eq!(summary.rows, 8);

    let text = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(&header[..4], &["name", "lat", "lon", "surrogate_key"]);
    let value_col = header.iter().position(|h| *h == "value").unwrap();

    let values: Vec<f64> = lines
        .map(|l| l.split(',').nth(value_col).unwrap().parse().unwrap())
        .collect();
    assert_eq!(values.len(), 8);
    for value in &values[..4] {
        assert_approx_eq!(*value, 6.978, 1e-6);
    }
    for value in &values[4..] {
        assert_approx_eq!(*value, 550.0, 1e-9);
    }
}

#[test]
fn test_param_filter_and_raw_ipc() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("run");
    std::fs::create_dir(&input).unwrap();
    write_test_file(&input, "a.grib2", concat_messages(&[temperature().build(), height().build()]));
    write_test_file(&input, "b.grb2", height().build());
    write_test_file(&input, "README", "not grib");

    let job = JobConfig {
        input: Some(input),
        param_ids: vec![156],
        format: OutputFormat::Ipc,
        output: Some(dir.path().join("out.arrow")),
        ..Default::default()
    };

    let mut outputs = Outputs::create(&job).unwrap();
    let summary = run(&job, &mut outputs).unwrap();
    outputs.finish().unwrap();

    assert_eq!(summary.files, 2);
    assert_eq!(summary.messages, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.rows, 2 * 400);

    let reader = FileReader::try_new(File::open(dir.path().join("out.arrow")).unwrap(), None).unwrap();
    let names: Vec<String> = reader.schema().fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(names, vec!["lat", "lon", "value", "parameterId", "modelNo", "messageId"]);
    let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
    assert_eq!(rows, 800);
}

#[test]
fn test_missing_input_is_a_grib_error() {
    let dir = tempfile::tempdir().unwrap();
    let job = JobConfig {
        input: Some(dir.path().join("missing.grib2")),
        ..Default::default()
    };

    let mut outputs = Outputs::new(TableSink::new(OutputFormat::Csv, Box::new(std::io::sink())));
    let err = run(&job, &mut outputs).unwrap_err();
    let grib_error = err.downcast_ref::<grib_arrow::GribArrowError>().unwrap();
    assert_eq!(grib_error.kind(), grib_arrow::ErrorKind::FileNotFound);
}

fn csv_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let text = std::fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap().split(',').map(String::from).collect();
    let rows = lines.map(|l| l.split(',').map(String::from).collect()).collect();
    (header, rows)
}

#[test]
fn test_locations_and_stations_written_to_separate_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let job = JobConfig {
        input: Some(write_grib(&dir, "t.grib2", &[temperature(), height()])),
        locations: Some(write_test_file(dir.path(), "locations.csv", csv_files::LOCATIONS)),
        stations: Some(write_test_file(dir.path(), "stations.csv", csv_files::STATIONS)),
        output: Some(dir.path().join("locations.out.csv")),
        stations_output: Some(dir.path().join("stations.out.csv")),
        ..Default::default()
    };

    let mut outputs = Outputs::create(&job).unwrap();
    let summary = run(&job, &mut outputs).unwrap();
    outputs.finish().unwrap();

    assert_eq!(summary.messages, 2);
    assert_eq!(summary.rows, 2 * 4);
    assert_eq!(summary.station_rows, 2 * 2);

    let (header, rows) = csv_rows(&dir.path().join("locations.out.csv"));
    assert_eq!(header[0], "name");
    assert_eq!(rows.len(), 8);

    let (header, rows) = csv_rows(&dir.path().join("stations.out.csv"));
    assert_eq!(&header[..5], &["station_id", "lat", "lon", "elevation", "surrogate_key"]);
    assert_eq!(rows.len(), 4);
    let ids: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(ids, vec!["EGLC", "EGCC", "EGLC", "EGCC"]);
}

#[test]
fn test_locations_and_stations_without_stations_output_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let job = JobConfig {
        input: Some(write_grib(&dir, "t.grib2", &[temperature()])),
        locations: Some(write_test_file(dir.path(), "locations.csv", csv_files::LOCATIONS)),
        stations: Some(write_test_file(dir.path(), "stations.csv", csv_files::STATIONS)),
        ..Default::default()
    };

    assert!(Outputs::create(&job).is_err());

    let mut outputs = Outputs::new(TableSink::new(OutputFormat::Csv, Box::new(std::io::sink())));
    let err = run(&job, &mut outputs).unwrap_err();
    assert!(err.to_string().contains("--stations-output"), "{}", err);
    assert_eq!(outputs.primary.rows(), 0);
}
