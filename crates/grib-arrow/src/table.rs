//! Arrow table assembly.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};

use crate::conversion::ConversionSpec;
use crate::error::Result;
use crate::grid::GridView;
use crate::locations::QueryPointSet;
use crate::spatial::NearestPoint;

pub const LATITUDE: &str = "lat";
pub const LONGITUDE: &str = "lon";
pub const VALUE: &str = "value";
pub const PARAMETER_ID: &str = "parameterId";
pub const MODEL_NUMBER: &str = "modelNo";
pub const MESSAGE_ID: &str = "messageId";
pub const SURROGATE_KEY: &str = "surrogate_key";
pub const DISTANCE: &str = "distance";
pub const NEAREST_LATITUDE: &str = "nearestlatitude";
pub const NEAREST_LONGITUDE: &str = "nearestlongitude";
pub const FORECAST_DATE: &str = "forecast_date";
pub const DATETIME: &str = "datetime";

/// Message-level values repeated on every row.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageColumns {
    pub message_id: i64,
    pub parameter_id: i64,
    pub model_number: i64,
    pub forecast_date: Option<DateTime<Utc>>,
    pub observation_datetime: Option<DateTime<Utc>>,
}

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
}

/// Schema of [`raw_table`] output.
pub fn raw_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(LATITUDE, DataType::Float64, false),
        Field::new(LONGITUDE, DataType::Float64, false),
        Field::new(VALUE, DataType::Float64, true),
        Field::new(PARAMETER_ID, DataType::Int64, false),
        Field::new(MODEL_NUMBER, DataType::Int64, false),
        Field::new(MESSAGE_ID, DataType::Int64, false),
    ]))
}

/// One row per grid point.
pub fn raw_table(grid: &GridView, columns: &MessageColumns) -> Result<RecordBatch> {
    let n = grid.len();
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(grid.latitudes().to_vec())),
        Arc::new(Float64Array::from(grid.longitudes().to_vec())),
        Arc::new(nullable_values(grid.values().iter().copied())),
        Arc::new(Int64Array::from(vec![columns.parameter_id; n])),
        Arc::new(Int64Array::from(vec![columns.model_number; n])),
        Arc::new(Int64Array::from(vec![columns.message_id; n])),
    ];
    Ok(RecordBatch::try_new(raw_schema(), arrays)?)
}

/// One row per query point, in query order, with the nearest grid point's
/// coordinates and value. The value is converted when `conversions` has a
/// rule for the message's parameter.
pub fn joined_table(
    points: &QueryPointSet,
    matches: &[Option<NearestPoint>],
    grid: &GridView,
    columns: &MessageColumns,
    conversions: Option<&ConversionSpec>,
) -> Result<RecordBatch> {
    let n = points.len();
    let input = points.batch();

    let pick = |values: &[f64]| -> Float64Array {
        matches
            .iter()
            .map(|m| m.and_then(|m| values.get(m.index).copied()))
            .collect()
    };

    let mut values = nullable_values(
        matches
            .iter()
            .map(|m| m.and_then(|m| grid.values().get(m.index).copied()).unwrap_or(f64::NAN)),
    );
    if let Some(conversions) = conversions {
        values = conversions.apply_column(columns.parameter_id, &values);
    }

    let mut fields: Vec<Field> = input
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    let mut arrays: Vec<ArrayRef> = input.columns().to_vec();

    let timestamp = |t: Option<DateTime<Utc>>| -> ArrayRef {
        Arc::new(
            TimestampMillisecondArray::from(vec![t.map(|t| t.timestamp_millis()); n])
                .with_timezone("UTC"),
        )
    };

    fields.push(Field::new(SURROGATE_KEY, DataType::Int64, false));
    arrays.push(Arc::new(Int64Array::from_iter_values(0..n as i64)));

    fields.push(Field::new(DISTANCE, DataType::Float64, true));
    arrays.push(Arc::new(
        matches
            .iter()
            .map(|m| m.map(|m| m.distance))
            .collect::<Float64Array>(),
    ));

    fields.push(Field::new(NEAREST_LATITUDE, DataType::Float64, true));
    arrays.push(Arc::new(pick(grid.latitudes())));

    fields.push(Field::new(NEAREST_LONGITUDE, DataType::Float64, true));
    arrays.push(Arc::new(pick(grid.longitudes())));

    fields.push(Field::new(VALUE, DataType::Float64, true));
    arrays.push(Arc::new(values));

    fields.push(Field::new(PARAMETER_ID, DataType::Int64, false));
    arrays.push(Arc::new(Int64Array::from(vec![columns.parameter_id; n])));

    fields.push(Field::new(MODEL_NUMBER, DataType::Int64, false));
    arrays.push(Arc::new(Int64Array::from(vec![columns.model_number; n])));

    fields.push(Field::new(FORECAST_DATE, timestamp_type(), true));
    arrays.push(timestamp(columns.forecast_date));

    fields.push(Field::new(DATETIME, timestamp_type(), true));
    arrays.push(timestamp(columns.observation_datetime));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Float64 array with NaN mapped to null.
fn nullable_values(values: impl Iterator<Item = f64>) -> Float64Array {
    values.map(|v| (!v.is_nan()).then_some(v)).collect()
}
