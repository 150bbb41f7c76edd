//! Query points joined against message grids.

use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::config::CsvOptions;
use crate::csv::read_csv_file;
use crate::error::{GribArrowError, Result};

pub const LATITUDE_COLUMN: &str = "lat";
pub const LONGITUDE_COLUMN: &str = "lon";

/// Column names the joined table adds. A query point column with one of
/// these names is carried under [`RENAMED_COLUMN_PREFIX`] plus its name.
pub const RESERVED_COLUMNS: &[&str] = &[
    "surrogate_key",
    "distance",
    "nearestlatitude",
    "nearestlongitude",
    "value",
    "parameterId",
    "modelNo",
    "forecast_date",
    "datetime",
];

pub const RENAMED_COLUMN_PREFIX: &str = "point_";

/// An ordered, immutable set of query points.
///
/// Every column of the source table is carried into joined output, in
/// order and with its values unchanged. Columns named like one of the
/// [`RESERVED_COLUMNS`] are renamed with [`RENAMED_COLUMN_PREFIX`]. `lat`
/// and `lon` must be numeric without nulls.
#[derive(Debug, Clone)]
pub struct QueryPointSet {
    batch: RecordBatch,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    id_column: Option<String>,
    renamed: Vec<(String, String)>,
}

impl QueryPointSet {
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        let latitudes = coordinate_column(&batch, LATITUDE_COLUMN, 90.0)?;
        let longitudes = coordinate_column(&batch, LONGITUDE_COLUMN, 360.0)?;
        let (batch, renamed) = rename_reserved(batch)?;

        Ok(Self {
            batch,
            latitudes,
            longitudes,
            id_column: None,
            renamed,
        })
    }

    /// Load query points from a delimited file. `what` names the slot in
    /// errors ("locations" or "stations").
    pub fn from_csv(path: impl AsRef<Path>, options: &CsvOptions, what: &'static str) -> Result<Self> {
        Self::from_batch(read_csv_file(path.as_ref(), options, what)?)
    }

    /// Name an explicit identifier column. It must exist and have no nulls.
    /// A renamed column may be named by either its source or output name.
    pub fn with_id_column(mut self, name: &str) -> Result<Self> {
        let name = self.output_name(name).to_string();
        let name = name.as_str();
        let column = self.batch.column_by_name(name).ok_or_else(|| {
            GribArrowError::schema_violation(format!("identifier column '{}' not found", name))
        })?;
        if column.null_count() > 0 {
            return Err(GribArrowError::schema_violation(format!(
                "identifier column '{}' contains nulls",
                name
            )));
        }
        self.id_column = Some(name.to_string());
        Ok(self)
    }

    /// `(source, output)` names of the columns that were renamed.
    pub fn renamed_columns(&self) -> &[(String, String)] {
        &self.renamed
    }

    /// Name a source column carries in joined output.
    pub fn output_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.renamed
            .iter()
            .find(|(source, _)| source == name)
            .map_or(name, |(_, output)| output.as_str())
    }

    pub fn id_column(&self) -> Option<&str> {
        self.id_column.as_deref()
    }

    /// Values of the identifier column, if one was named.
    pub fn ids(&self) -> Option<&ArrayRef> {
        self.batch.column_by_name(self.id_column.as_deref()?)
    }

    pub fn len(&self) -> usize {
        self.latitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latitudes.is_empty()
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    /// `(latitude, longitude)` pairs in row order.
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.latitudes
            .iter()
            .copied()
            .zip(self.longitudes.iter().copied())
            .collect()
    }

    /// The source table, passed through to joined output.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }
}

fn rename_reserved(batch: RecordBatch) -> Result<(RecordBatch, Vec<(String, String)>)> {
    let schema = batch.schema();
    let taken = |name: &str| {
        RESERVED_COLUMNS.contains(&name) || schema.fields().iter().any(|f| f.name() == name)
    };

    let mut renamed: Vec<(String, String)> = Vec::new();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|field| {
            if !RESERVED_COLUMNS.contains(&field.name().as_str()) {
                return field.as_ref().clone();
            }
            let mut name = format!("{}{}", RENAMED_COLUMN_PREFIX, field.name());
            while taken(&name) || renamed.iter().any(|(_, n)| *n == name) {
                name.insert_str(0, RENAMED_COLUMN_PREFIX);
            }
            debug!(column = %field.name(), renamed = %name, "Renamed query point column");
            renamed.push((field.name().clone(), name.clone()));
            field.as_ref().clone().with_name(name)
        })
        .collect();

    if renamed.is_empty() {
        return Ok((batch, renamed));
    }

    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    let batch = RecordBatch::try_new(schema.into(), batch.columns().to_vec())
        .map_err(|e| GribArrowError::schema_violation(e.to_string()))?;
    Ok((batch, renamed))
}

fn coordinate_column(batch: &RecordBatch, name: &str, limit: f64) -> Result<Vec<f64>> {
    let column = batch.column_by_name(name).ok_or_else(|| {
        GribArrowError::schema_violation(format!("query points need a numeric '{}' column", name))
    })?;

    if !column.data_type().is_numeric() {
        return Err(GribArrowError::schema_violation(format!(
            "column '{}' must be numeric, found {}",
            name,
            column.data_type()
        )));
    }
    if column.null_count() > 0 {
        return Err(GribArrowError::schema_violation(format!(
            "column '{}' contains nulls",
            name
        )));
    }

    let values = cast(column, &DataType::Float64).map_err(|e| {
        GribArrowError::schema_violation(format!("column '{}' is not coercible to Float64: {}", name, e))
    })?;
    let values = values.as_primitive::<Float64Type>().values().to_vec();

    if let Some(bad) = values.iter().find(|v| !v.is_finite() || v.abs() > limit) {
        return Err(GribArrowError::schema_violation(format!(
            "column '{}' has out of range value {}",
            name, bad
        )));
    }

    Ok(values)
}
