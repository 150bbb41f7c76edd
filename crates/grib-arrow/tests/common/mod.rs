//! Common helpers for grib-arrow integration tests
//!
//! Provides helpers for:
//! - Writing generated GRIB files and auxiliary CSVs to a temp directory
//! - A small regular grid over the North Sea used by most tests
//! - Pulling typed columns out of record batches

#![allow(dead_code)]

use std::path::PathBuf;

use arrow::array::{Array, Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::record_batch::RecordBatch;
use tempfile::TempDir;
use test_utils::{concat_messages, write_test_file, Grib2Builder};

/// Rows of the test grid (62°N to 47.5°N).
pub const ROWS: u32 = 30;
/// Columns of the test grid (0°E to 14.5°E).
pub const COLUMNS: u32 = 30;
pub const GRID_SIZE: usize = (ROWS * COLUMNS) as usize;

/// Storage index of the grid point at (row, column).
pub fn index(row: u32, column: u32) -> usize {
    (row * COLUMNS + column) as usize
}

/// 2 m temperature forecast on a 0.5° grid, 3 hours after
/// 2025-12-10T12:00Z, 270 K everywhere.
pub fn temperature_message() -> Grib2Builder {
    Grib2Builder::new_gfs()
        .with_origin(62.0, 0.0, 0.5, 0.5)
        .with_grid(COLUMNS, ROWS)
        .with_forecast_hour(3)
        .with_decimal_scale(3)
        .with_constant_value(270.0)
}

/// Geopotential height at 500 hPa for ensemble member `member`.
pub fn height_message(member: u8) -> Grib2Builder {
    Grib2Builder::new_gfs()
        .with_origin(62.0, 0.0, 0.5, 0.5)
        .with_grid(COLUMNS, ROWS)
        .with_parameter(3, 5)
        .with_level(100, 50_000)
        .with_ensemble(member, 30)
        .with_processed_data_type(4)
        .with_forecast_hour(3)
        .with_constant_value(5_500.0)
}

/// A temp directory holding generated files. Dropping it removes them.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn grib(&self, name: &str, messages: &[Grib2Builder]) -> PathBuf {
        let bytes: Vec<Vec<u8>> = messages.iter().map(Grib2Builder::build).collect();
        write_test_file(self.dir.path(), name, concat_messages(&bytes))
    }

    pub fn file(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        write_test_file(self.dir.path(), name, contents)
    }

    pub fn missing(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn f64_column(batch: &RecordBatch, name: &str) -> Vec<Option<f64>> {
    let column = batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {}", name));
    let array = column
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap_or_else(|| panic!("column {} is not Float64", name));
    array.iter().collect()
}

pub fn i64_column(batch: &RecordBatch, name: &str) -> Vec<i64> {
    let column = batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {}", name));
    let array = column
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap_or_else(|| panic!("column {} is not Int64", name));
    array.values().to_vec()
}

pub fn string_column(batch: &RecordBatch, name: &str) -> Vec<String> {
    let column = batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {}", name));
    let array = column
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap_or_else(|| panic!("column {} is not Utf8", name));
    (0..array.len()).map(|i| array.value(i).to_string()).collect()
}

pub fn timestamp_column(batch: &RecordBatch, name: &str) -> Vec<Option<i64>> {
    let column = batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {}", name));
    let array = column
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .unwrap_or_else(|| panic!("column {} is not a millisecond timestamp", name));
    array.iter().collect()
}
