//! Delimited text files as Arrow record batches.
//!
//! Column types are inferred from the cells: a column whose non-empty
//! cells all parse as integers is Int64, else Float64 if they all parse as
//! numbers, else Utf8. Empty cells are nulls; a column of only empty cells
//! is Float64.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::config::CsvOptions;
use crate::error::{GribArrowError, Result};

/// Read the file at `path`. `what` names the file's role in errors, e.g.
/// "locations".
pub fn read_csv_file(path: &Path, options: &CsvOptions, what: &'static str) -> Result<RecordBatch> {
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => GribArrowError::AuxiliaryFileNotFound {
            what,
            path: path.to_path_buf(),
        },
        _ => GribArrowError::Io(e),
    })?;

    let batch = read_csv(file, options, path)?;
    debug!(
        path = %path.display(),
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "Loaded {} file",
        what
    );
    Ok(batch)
}

/// Parse delimited text from `input`. `origin` is only used in errors.
pub fn read_csv<R: Read>(input: R, options: &CsvOptions, origin: &Path) -> Result<RecordBatch> {
    let delimiter = options.delimiter_byte().ok_or_else(|| {
        GribArrowError::malformed(
            origin,
            format!("delimiter {:?} is not a single ASCII character", options.delimiter),
        )
    })?;

    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(options.has_header)
        .trim(::csv::Trim::All)
        .from_reader(input);

    let mut names: Vec<String> = if options.has_header {
        reader
            .headers()
            .map_err(|e| GribArrowError::malformed(origin, e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    for record in reader.records() {
        let record = record.map_err(|e| GribArrowError::malformed(origin, e.to_string()))?;
        if names.is_empty() && !options.has_header {
            names = (1..=record.len()).map(|i| format!("column_{}", i)).collect();
            cells = vec![Vec::new(); names.len()];
        }
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    if names.is_empty() || names.iter().all(String::is_empty) {
        return Err(GribArrowError::malformed(origin, "no columns found"));
    }
    let mut seen = HashSet::new();
    for name in &names {
        if name.is_empty() {
            return Err(GribArrowError::malformed(origin, "empty column name in header"));
        }
        if !seen.insert(name.as_str()) {
            return Err(GribArrowError::malformed(
                origin,
                format!("duplicate column '{}'", name),
            ));
        }
    }

    let mut fields = Vec::with_capacity(names.len());
    let mut arrays = Vec::with_capacity(names.len());
    for (name, column) in names.iter().zip(&cells) {
        let array = infer_column(column);
        fields.push(Field::new(name, array.data_type().clone(), true));
        arrays.push(array);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

fn infer_column(cells: &[String]) -> ArrayRef {
    let present = || cells.iter().filter(|c| !c.is_empty());

    if present().next().is_none() {
        return Arc::new(Float64Array::from(vec![None::<f64>; cells.len()]));
    }

    if present().all(|c| c.parse::<i64>().is_ok()) {
        let values: Int64Array = cells.iter().map(|c| c.parse::<i64>().ok()).collect();
        return Arc::new(values);
    }

    if present().all(|c| c.parse::<f64>().is_ok()) {
        let values: Float64Array = cells.iter().map(|c| c.parse::<f64>().ok()).collect();
        return Arc::new(values);
    }

    let values: StringArray = cells
        .iter()
        .map(|c| (!c.is_empty()).then_some(c.as_str()))
        .collect();
    Arc::new(values)
}
