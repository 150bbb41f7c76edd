//! Named key access to message metadata.
//!
//! Keys follow the ecCodes naming so that callers can look fields up by the
//! names they already know (`paramId`, `shortName`, `dataDate`, ...).

use std::fmt;

use crate::message::Grib2Message;
use crate::sections::{data_type_name, type_of_level, MISSING_U32};

/// A key's value in its natural type.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{}", v),
            KeyValue::Float(v) => write!(f, "{}", v),
            KeyValue::Str(v) => f.write_str(v),
        }
    }
}

/// Every key name [`Grib2Message::key`] understands. Some keys are only
/// present for certain templates.
pub const KEY_NAMES: &[&str] = &[
    "edition",
    "discipline",
    "totalLength",
    "centre",
    "subCentre",
    "tablesVersion",
    "localTablesVersion",
    "significanceOfReferenceTime",
    "productionStatusOfProcessedData",
    "typeOfProcessedData",
    "dataType",
    "dataDate",
    "date",
    "dataTime",
    "time",
    "year",
    "month",
    "day",
    "hour",
    "minute",
    "second",
    "step",
    "startStep",
    "endStep",
    "forecastTime",
    "indicatorOfUnitOfTimeRange",
    "stepUnits",
    "stepRange",
    "paramId",
    "shortName",
    "name",
    "units",
    "parameterCategory",
    "parameterNumber",
    "productDefinitionTemplateNumber",
    "typeOfGeneratingProcess",
    "typeOfFirstFixedSurface",
    "scaleFactorOfFirstFixedSurface",
    "scaledValueOfFirstFixedSurface",
    "level",
    "typeOfLevel",
    "number",
    "numberOfForecastsInEnsemble",
    "typeOfEnsembleForecast",
    "typeOfStatisticalProcessing",
    "gridDefinitionTemplateNumber",
    "numberOfDataPoints",
    "numberOfPoints",
    "shapeOfTheEarth",
    "Ni",
    "Nj",
    "scanningMode",
    "iScansNegatively",
    "jScansPositively",
    "jPointsAreConsecutive",
    "alternativeRowScanning",
    "latitudeOfFirstGridPointInDegrees",
    "longitudeOfFirstGridPointInDegrees",
    "latitudeOfLastGridPointInDegrees",
    "longitudeOfLastGridPointInDegrees",
    "iDirectionIncrementInDegrees",
    "jDirectionIncrementInDegrees",
    "dataRepresentationTemplateNumber",
    "numberOfValues",
    "bitsPerValue",
    "binaryScaleFactor",
    "decimalScaleFactor",
    "referenceValue",
    "packingType",
    "bitMapIndicator",
];

impl Grib2Message {
    /// Look up a metadata key. Returns `None` for unknown keys and for keys
    /// the message's templates do not carry.
    pub fn key(&self, name: &str) -> Option<KeyValue> {
        use KeyValue::{Float, Int, Str};

        let id = &self.identification;
        let time = &id.reference_time;
        let gd = &self.grid_definition;
        let pd = &self.product_definition;
        let dr = &self.data_representation;
        let flag = |set: bool| Int(set as i64);
        let degrees = |v: f64| v.is_finite().then_some(Float(v));

        let value = match name {
            "edition" => Int(self.indicator.edition as i64),
            "discipline" => Int(self.indicator.discipline as i64),
            "totalLength" => Int(self.indicator.message_length as i64),

            "centre" => Int(id.center as i64),
            "subCentre" => Int(id.sub_center as i64),
            "tablesVersion" => Int(id.table_version as i64),
            "localTablesVersion" => Int(id.local_table_version as i64),
            "significanceOfReferenceTime" => Int(id.significance_of_reference_time as i64),
            "productionStatusOfProcessedData" => Int(id.production_status as i64),
            "typeOfProcessedData" => Int(id.data_type as i64),
            "dataType" => Str(data_type_name(id.data_type).to_string()),
            "dataDate" | "date" => Int(time.date()),
            "dataTime" | "time" => Int(time.time()),
            "year" => Int(time.year as i64),
            "month" => Int(time.month as i64),
            "day" => Int(time.day as i64),
            "hour" => Int(time.hour as i64),
            "minute" => Int(time.minute as i64),
            "second" => Int(time.second as i64),

            "step" | "endStep" => Int(pd.end_step()),
            "startStep" | "forecastTime" => Int(pd.start_step()),
            "indicatorOfUnitOfTimeRange" => Int(pd.time_range_unit.code() as i64),
            "stepUnits" => Str(pd.time_range_unit.abbreviation().to_string()),
            "stepRange" => {
                let (start, end) = (pd.start_step(), pd.end_step());
                if pd.statistical.is_some() && start != end {
                    Str(format!("{}-{}", start, end))
                } else {
                    Str(end.to_string())
                }
            }

            "paramId" => Int(self.parameter.param_id),
            "shortName" => Str(self.parameter.short_name.clone()),
            "name" => Str(self.parameter.name.clone()),
            "units" => Str(self.parameter.units.clone()),
            "parameterCategory" => Int(pd.parameter_category as i64),
            "parameterNumber" => Int(pd.parameter_number as i64),
            "productDefinitionTemplateNumber" => Int(pd.template_number as i64),
            "typeOfGeneratingProcess" => Int(pd.generating_process as i64),
            "typeOfFirstFixedSurface" => Int(pd.first_surface.surface_type as i64),
            "scaleFactorOfFirstFixedSurface" => Int(pd.first_surface.scale_factor as i64),
            "scaledValueOfFirstFixedSurface" if pd.first_surface.scaled_value != MISSING_U32 => {
                Int(pd.first_surface.scaled_value as i64)
            }
            "level" => {
                let value = pd.first_surface.value()?;
                // Isobaric levels are reported in hPa
                let value = if pd.first_surface.surface_type == 100 {
                    value / 100.0
                } else {
                    value
                };
                Int(value.round() as i64)
            }
            "typeOfLevel" => Str(type_of_level(pd.first_surface.surface_type).to_string()),

            "number" => Int(pd.ensemble?.perturbation_number as i64),
            "numberOfForecastsInEnsemble" => Int(pd.ensemble?.number_in_ensemble as i64),
            "typeOfEnsembleForecast" => Int(pd.ensemble?.type_of_ensemble as i64),
            "typeOfStatisticalProcessing" => Int(pd.statistical?.process as i64),

            "gridDefinitionTemplateNumber" => Int(gd.template_number as i64),
            "numberOfDataPoints" | "numberOfPoints" => Int(gd.num_data_points as i64),
            "shapeOfTheEarth" => Int(gd.shape_of_earth as i64),
            "Ni" => Int(gd.ni as i64),
            "Nj" => Int(gd.nj as i64),
            "scanningMode" => Int(gd.scanning_mode.0 as i64),
            "iScansNegatively" => flag(gd.scanning_mode.i_scans_negatively()),
            "jScansPositively" => flag(gd.scanning_mode.j_scans_positively()),
            "jPointsAreConsecutive" => flag(gd.scanning_mode.j_points_consecutive()),
            "alternativeRowScanning" => flag(gd.scanning_mode.alternating_rows()),
            "latitudeOfFirstGridPointInDegrees" => degrees(gd.first_latitude)?,
            "longitudeOfFirstGridPointInDegrees" => degrees(gd.first_longitude)?,
            "latitudeOfLastGridPointInDegrees" => degrees(gd.last_latitude)?,
            "longitudeOfLastGridPointInDegrees" => degrees(gd.last_longitude)?,
            "iDirectionIncrementInDegrees" => Float(gd.i_increment?),
            "jDirectionIncrementInDegrees" => Float(gd.j_increment?),

            "dataRepresentationTemplateNumber" => Int(dr.template_number as i64),
            "numberOfValues" => Int(dr.num_data_points as i64),
            "bitsPerValue" => Int(dr.bits_per_value as i64),
            "binaryScaleFactor" => Int(dr.binary_scale_factor as i64),
            "decimalScaleFactor" => Int(dr.decimal_scale_factor as i64),
            "referenceValue" => Float(dr.reference_value as f64),
            "packingType" => Str(dr.packing_type().to_string()),
            "bitMapIndicator" => Int(self.bitmap.as_ref().map_or(255, |b| b.indicator) as i64),

            _ => return None,
        };

        Some(value)
    }

    /// All keys present on this message with their values.
    pub fn keys(&self) -> impl Iterator<Item = (&'static str, KeyValue)> + '_ {
        KEY_NAMES
            .iter()
            .filter_map(move |name| self.key(name).map(|value| (*name, value)))
    }
}
