//! Per-parameter unit conversion.
//!
//! Each row of a conversion table applies, in order: add, subtract,
//! multiply, divide, then clamp to the ceiling. Null operations are skipped.

use std::collections::HashMap;
use std::path::Path;

use arrow::array::{Array, AsArray, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::config::CsvOptions;
use crate::csv::read_csv_file;
use crate::error::{GribArrowError, Result};

pub const PARAMETER_ID_COLUMN: &str = "parameterId";
pub const ADDITION_COLUMN: &str = "addition_value";
pub const SUBTRACTION_COLUMN: &str = "subtraction_value";
pub const MULTIPLICATION_COLUMN: &str = "multiplication_value";
pub const DIVISION_COLUMN: &str = "division_value";
pub const CEILING_COLUMN: &str = "ceiling_value";

/// Value columns in the order their operations are applied.
pub const VALUE_COLUMNS: [&str; 5] = [
    ADDITION_COLUMN,
    SUBTRACTION_COLUMN,
    MULTIPLICATION_COLUMN,
    DIVISION_COLUMN,
    CEILING_COLUMN,
];

/// Arithmetic applied to one parameter's values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Conversion {
    pub addition: Option<f64>,
    pub subtraction: Option<f64>,
    pub multiplication: Option<f64>,
    pub division: Option<f64>,
    pub ceiling: Option<f64>,
}

impl Conversion {
    pub fn apply(&self, value: f64) -> f64 {
        let mut v = value;
        if let Some(a) = self.addition {
            v += a;
        }
        if let Some(s) = self.subtraction {
            v -= s;
        }
        if let Some(m) = self.multiplication {
            v *= m;
        }
        if let Some(d) = self.division {
            v /= d;
        }
        if let Some(c) = self.ceiling {
            v = v.min(c);
        }
        v
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Conversions keyed by parameter id.
#[derive(Debug, Clone, Default)]
pub struct ConversionSpec {
    rules: HashMap<i64, Conversion>,
}

impl ConversionSpec {
    /// Validate and load a conversion table.
    ///
    /// The table must have exactly `parameterId` plus the five value
    /// columns. `parameterId` must be an integer type without nulls or
    /// duplicates; value columns must be numeric or entirely null.
    pub fn from_batch(batch: &RecordBatch) -> Result<Self> {
        let schema = batch.schema();

        for field in schema.fields() {
            let name = field.name().as_str();
            if name != PARAMETER_ID_COLUMN && !VALUE_COLUMNS.contains(&name) {
                return Err(GribArrowError::schema_violation(format!(
                    "unexpected conversion column '{}'",
                    name
                )));
            }
        }

        let ids = parameter_ids(batch)?;
        let columns = VALUE_COLUMNS
            .iter()
            .map(|name| value_column(batch, name))
            .collect::<Result<Vec<_>>>()?;

        let mut rules = HashMap::with_capacity(ids.len());
        for (row, &id) in ids.iter().enumerate() {
            let at = |c: usize| columns[c].is_valid(row).then(|| columns[c].value(row));
            let conversion = Conversion {
                addition: at(0),
                subtraction: at(1),
                multiplication: at(2),
                division: at(3),
                ceiling: at(4),
            };
            if rules.insert(id, conversion).is_some() {
                return Err(GribArrowError::schema_violation(format!(
                    "duplicate parameterId {} in conversions",
                    id
                )));
            }
        }

        debug!(parameters = rules.len(), "Loaded conversions");
        Ok(Self { rules })
    }

    pub fn from_csv(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Self> {
        Self::from_batch(&read_csv_file(path.as_ref(), options, "conversions")?)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, parameter_id: i64) -> Option<&Conversion> {
        self.rules.get(&parameter_id)
    }

    /// Convert one value. Parameters without a rule pass through.
    pub fn apply(&self, parameter_id: i64, value: f64) -> f64 {
        match self.get(parameter_id) {
            Some(conversion) => conversion.apply(value),
            None => value,
        }
    }

    /// Convert a column of values. Nulls stay null.
    pub fn apply_column(&self, parameter_id: i64, values: &Float64Array) -> Float64Array {
        match self.get(parameter_id) {
            Some(conversion) if !conversion.is_identity() => {
                values.unary(|v| conversion.apply(v))
            }
            _ => values.clone(),
        }
    }
}

fn parameter_ids(batch: &RecordBatch) -> Result<Vec<i64>> {
    let column = batch.column_by_name(PARAMETER_ID_COLUMN).ok_or_else(|| {
        GribArrowError::schema_violation(format!("conversions need a '{}' column", PARAMETER_ID_COLUMN))
    })?;

    if !column.data_type().is_integer() {
        return Err(GribArrowError::schema_violation(format!(
            "'{}' must be an integer column, found {}",
            PARAMETER_ID_COLUMN,
            column.data_type()
        )));
    }
    if column.null_count() > 0 {
        return Err(GribArrowError::schema_violation(format!(
            "'{}' contains nulls",
            PARAMETER_ID_COLUMN
        )));
    }

    let ids = cast(column, &DataType::Int64).map_err(|e| {
        GribArrowError::schema_violation(format!("'{}' does not fit Int64: {}", PARAMETER_ID_COLUMN, e))
    })?;
    Ok(ids.as_primitive::<Int64Type>().values().to_vec())
}

fn value_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    let column = batch.column_by_name(name).ok_or_else(|| {
        GribArrowError::schema_violation(format!("conversions are missing column '{}'", name))
    })?;

    let all_null = column.null_count() == column.len();
    let coercible = column.data_type().is_numeric() || *column.data_type() == DataType::Null;
    if !coercible && !(all_null && column.data_type() == &DataType::Utf8) {
        return Err(GribArrowError::schema_violation(format!(
            "conversion column '{}' must be Float64, found {}",
            name,
            column.data_type()
        )));
    }

    let values = cast(column, &DataType::Float64).map_err(|e| {
        GribArrowError::schema_violation(format!("conversion column '{}': {}", name, e))
    })?;
    Ok(values.as_primitive::<Float64Type>().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use test_utils::assert_approx_eq;

    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};

    fn table(ids: Vec<i64>, values: [Vec<Option<f64>>; 5]) -> RecordBatch {
        let mut fields = vec![Field::new(PARAMETER_ID_COLUMN, DataType::Int64, false)];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(Int64Array::from(ids))];
        for (name, column) in VALUE_COLUMNS.iter().zip(values) {
            fields.push(Field::new(*name, DataType::Float64, true));
            arrays.push(Arc::new(Float64Array::from(column)));
        }
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    fn single(id: i64, op: usize, value: f64) -> ConversionSpec {
        let mut values: [Vec<Option<f64>>; 5] = Default::default();
        for (i, column) in values.iter_mut().enumerate() {
            column.push((i == op).then_some(value));
        }
        ConversionSpec::from_batch(&table(vec![id], values)).unwrap()
    }

    #[test]
    fn test_subtraction_kelvin_to_celsius() {
        let spec = single(167, 1, 273.15);
        let celsius = spec.apply(167, 280.128);
        assert_approx_eq!(celsius, 6.978, 1e-9);
    }

    #[test]
    fn test_addition_only_touches_its_parameter() {
        let spec = single(167, 0, -273.15);
        assert_approx_eq!(spec.apply(167, 280.128), 6.978, 1e-9);
        assert_eq!(spec.apply(228164, 100.0), 100.0);
    }

    #[test]
    fn test_division_and_multiplication() {
        assert_eq!(single(228164, 3, 100.0).apply(228164, 100.0), 1.0);
        assert_eq!(single(228164, 2, 0.01).apply(228164, 100.0), 1.0);
    }

    #[test]
    fn test_ceiling_clamps() {
        let spec = single(228164, 4, 1.0);
        assert_eq!(spec.apply(228164, 1.2), 1.0);
        assert_eq!(spec.apply(228164, 0.4), 0.4);
    }

    #[test]
    fn test_operations_apply_in_fixed_order() {
        // ((10 + 2 - 4) * 3 / 2) = 12, clamped to 11
        let conversion = Conversion {
            addition: Some(2.0),
            subtraction: Some(4.0),
            multiplication: Some(3.0),
            division: Some(2.0),
            ceiling: Some(11.0),
        };
        assert_eq!(conversion.apply(10.0), 11.0);

        let unclamped = Conversion {
            ceiling: None,
            ..conversion
        };
        assert_eq!(unclamped.apply(10.0), 12.0);
    }

    #[test]
    fn test_apply_column_keeps_nulls() {
        let spec = single(167, 1, 273.15);
        let values = Float64Array::from(vec![Some(273.15), None, Some(283.15)]);
        let converted = spec.apply_column(167, &values);

        assert_approx_eq!(converted.value(0), 0.0, 1e-9);
        assert!(converted.is_null(1));
        assert_approx_eq!(converted.value(2), 10.0, 1e-9);

        let untouched = spec.apply_column(130, &values);
        assert_eq!(untouched, values);
    }

    #[test]
    fn test_missing_ceiling_column() {
        let schema = Schema::new(vec![
            Field::new(PARAMETER_ID_COLUMN, DataType::Int64, false),
            Field::new(ADDITION_COLUMN, DataType::Float64, true),
            Field::new(SUBTRACTION_COLUMN, DataType::Float64, true),
            Field::new(MULTIPLICATION_COLUMN, DataType::Float64, true),
            Field::new(DIVISION_COLUMN, DataType::Float64, true),
        ]);
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![167])),
            Arc::new(Float64Array::from(vec![None::<f64>])),
            Arc::new(Float64Array::from(vec![Some(273.15)])),
            Arc::new(Float64Array::from(vec![None::<f64>])),
            Arc::new(Float64Array::from(vec![None::<f64>])),
        ];
        let batch = RecordBatch::try_new(Arc::new(schema), columns).unwrap();

        let err = ConversionSpec::from_batch(&batch).unwrap_err();
        assert!(matches!(err, GribArrowError::SchemaViolation(ref m) if m.contains("ceiling_value")));
    }

    #[test]
    fn test_text_value_column_is_rejected() {
        let mut batch = table(vec![167], std::array::from_fn(|_| vec![None]));
        let mut columns = batch.columns().to_vec();
        columns[1] = Arc::new(StringArray::from(vec!["hugo pendlebury"]));
        let mut fields: Vec<Field> = batch.schema().fields().iter().map(|f| f.as_ref().clone()).collect();
        fields[1] = Field::new(ADDITION_COLUMN, DataType::Utf8, true);
        batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();

        assert!(matches!(
            ConversionSpec::from_batch(&batch).unwrap_err(),
            GribArrowError::SchemaViolation(_)
        ));
    }

    #[test]
    fn test_duplicate_parameter_ids() {
        let values: [Vec<Option<f64>>; 5] = std::array::from_fn(|_| vec![None, None]);
        let err = ConversionSpec::from_batch(&table(vec![167, 167], values)).unwrap_err();
        assert!(matches!(err, GribArrowError::SchemaViolation(_)));
    }

    #[test]
    fn test_extra_column_is_rejected() {
        let batch = table(vec![167], std::array::from_fn(|_| vec![None]));
        let mut fields: Vec<Field> = batch.schema().fields().iter().map(|f| f.as_ref().clone()).collect();
        fields.push(Field::new("comment", DataType::Utf8, true));
        let mut columns = batch.columns().to_vec();
        columns.push(Arc::new(StringArray::from(vec!["K to C"])));
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();

        assert!(ConversionSpec::from_batch(&batch).is_err());
    }

    #[test]
    fn test_integer_value_columns_are_coerced() {
        let batch = table(vec![228164], std::array::from_fn(|_| vec![None]));
        let mut columns = batch.columns().to_vec();
        columns[4] = Arc::new(Int64Array::from(vec![100]));
        let mut fields: Vec<Field> = batch.schema().fields().iter().map(|f| f.as_ref().clone()).collect();
        fields[4] = Field::new(DIVISION_COLUMN, DataType::Int64, true);
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();

        let spec = ConversionSpec::from_batch(&batch).unwrap();
        assert_eq!(spec.apply(228164, 50.0), 0.5);
    }
}
