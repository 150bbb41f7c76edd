//! GRIB2 parameter lookup tables.
//!
//! Translates the numeric (discipline, category, number) triple of a field,
//! optionally qualified by its first fixed surface, into ECMWF-style
//! parameter identity: `paramId`, `shortName`, `name` and `units`.

use std::collections::HashMap;

use crate::sections::FixedSurface;

/// Lookup key for parameter: (discipline, category, number)
pub type ParamKey = (u8, u8, u8);

/// Parameter id reported for fields absent from the table.
pub const UNKNOWN_PARAM_ID: i64 = 0;

/// Short name reported for fields absent from the table.
pub const UNKNOWN_SHORT_NAME: &str = "unknown";

/// Identity of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEntry {
    pub param_id: i64,
    pub short_name: String,
    pub name: String,
    pub units: String,
}

impl ParameterEntry {
    pub fn new(param_id: i64, short_name: &str, name: &str, units: &str) -> Self {
        Self {
            param_id,
            short_name: short_name.to_string(),
            name: name.to_string(),
            units: units.to_string(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_PARAM_ID, UNKNOWN_SHORT_NAME, "unknown", "unknown")
    }
}

/// Restricts a table entry to one type of first fixed surface, and
/// optionally to one value of it (e.g. 2 m above ground).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelQualifier {
    pub surface_type: u8,
    pub value: Option<f64>,
}

impl LevelQualifier {
    pub fn any_value(surface_type: u8) -> Self {
        Self {
            surface_type,
            value: None,
        }
    }

    pub fn at(surface_type: u8, value: f64) -> Self {
        Self {
            surface_type,
            value: Some(value),
        }
    }

    fn matches(&self, surface: &FixedSurface) -> bool {
        if surface.surface_type != self.surface_type {
            return false;
        }
        match (self.value, surface.value()) {
            (None, _) => true,
            (Some(expected), Some(actual)) => (expected - actual).abs() < 1e-6,
            (Some(_), None) => false,
        }
    }
}

#[derive(Debug, Clone)]
struct ParameterRule {
    level: Option<LevelQualifier>,
    entry: ParameterEntry,
}

/// GRIB2 parameter lookup tables.
///
/// Passed to the GRIB2 reader to resolve each field's identity.
#[derive(Debug, Clone, Default)]
pub struct Grib2Tables {
    parameters: HashMap<ParamKey, Vec<ParameterRule>>,
}

impl Grib2Tables {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables covering the common ECMWF and NCEP surface and upper-air
    /// parameters.
    pub fn builtin() -> Self {
        use LevelQualifier as L;

        let mut tables = Self::new();
        let mut add = |key: ParamKey, level: Option<L>, id: i64, short: &str, name: &str, units: &str| {
            tables.add_parameter(key.0, key.1, key.2, level, ParameterEntry::new(id, short, name, units));
        };

        // Temperature
        add((0, 0, 0), Some(L::at(103, 2.0)), 167, "2t", "2 metre temperature", "K");
        add((0, 0, 0), None, 130, "t", "Temperature", "K");
        add((0, 0, 6), Some(L::at(103, 2.0)), 168, "2d", "2 metre dewpoint temperature", "K");
        add((0, 0, 6), None, 3017, "dpt", "Dew point temperature", "K");
        add((0, 0, 4), Some(L::at(103, 2.0)), 201, "mx2t", "Maximum temperature at 2 metres", "K");
        add((0, 0, 5), Some(L::at(103, 2.0)), 202, "mn2t", "Minimum temperature at 2 metres", "K");

        // Moisture
        add((0, 1, 0), None, 133, "q", "Specific humidity", "kg kg**-1");
        add((0, 1, 1), Some(L::at(103, 2.0)), 260242, "2r", "2 metre relative humidity", "%");
        add((0, 1, 1), None, 157, "r", "Relative humidity", "%");
        add((0, 1, 3), None, 3054, "pwat", "Precipitable water", "kg m**-2");
        add((0, 1, 7), None, 3059, "prate", "Precipitation rate", "kg m**-2 s**-1");
        add((0, 1, 8), None, 228228, "tp", "Total Precipitation", "kg m**-2");

        // Momentum
        add((0, 2, 0), None, 3031, "wdir", "Wind direction", "Degree true");
        add((0, 2, 1), Some(L::at(103, 10.0)), 207, "10si", "10 metre wind speed", "m s**-1");
        add((0, 2, 1), None, 10, "ws", "Wind speed", "m s**-1");
        add((0, 2, 2), Some(L::at(103, 10.0)), 165, "10u", "10 metre U wind component", "m s**-1");
        add((0, 2, 2), None, 131, "u", "U component of wind", "m s**-1");
        add((0, 2, 3), Some(L::at(103, 10.0)), 166, "10v", "10 metre V wind component", "m s**-1");
        add((0, 2, 3), None, 132, "v", "V component of wind", "m s**-1");
        add((0, 2, 8), None, 135, "w", "Vertical velocity", "Pa s**-1");
        add((0, 2, 22), None, 260065, "gust", "Wind speed (gust)", "m s**-1");

        // Mass
        add((0, 3, 0), Some(L::any_value(1)), 134, "sp", "Surface pressure", "Pa");
        add((0, 3, 0), Some(L::any_value(101)), 151, "msl", "Mean sea level pressure", "Pa");
        add((0, 3, 0), None, 54, "pres", "Pressure", "Pa");
        add((0, 3, 1), None, 260074, "prmsl", "Pressure reduced to MSL", "Pa");
        add((0, 3, 4), None, 129, "z", "Geopotential", "m**2 s**-2");
        add((0, 3, 5), None, 156, "gh", "Geopotential height", "gpm");

        // Cloud, stability and physical properties
        add((0, 6, 1), None, 228164, "tcc", "Total Cloud Cover", "%");
        add((0, 7, 6), None, 59, "cape", "Convective available potential energy", "J kg**-1");
        add((0, 7, 7), None, 228001, "cin", "Convective inhibition", "J kg**-1");
        add((0, 19, 0), None, 3020, "vis", "Visibility", "m");

        // Land surface and oceanography
        add((2, 0, 0), None, 172, "lsm", "Land-sea mask", "(0 - 1)");
        add((10, 0, 3), None, 140229, "swh", "Significant height of combined wind waves and swell", "m");
        add((10, 3, 0), None, 34, "sst", "Sea surface temperature", "K");

        tables
    }

    /// Add a parameter mapping
    ///
    /// # Arguments
    /// * `discipline` - GRIB2 discipline code
    /// * `category` - Parameter category within discipline
    /// * `number` - Parameter number within category
    /// * `level` - Restrict the entry to a first fixed surface; entries with a
    ///   qualifier take precedence over the unqualified entry
    /// * `entry` - Parameter identity
    pub fn add_parameter(
        &mut self,
        discipline: u8,
        category: u8,
        number: u8,
        level: Option<LevelQualifier>,
        entry: ParameterEntry,
    ) {
        let rules = self.parameters.entry((discipline, category, number)).or_default();
        let rule = ParameterRule { level, entry };
        // Qualified rules are checked before the catch-all
        match level {
            Some(_) => {
                let position = rules.iter().position(|r| r.level.is_none()).unwrap_or(rules.len());
                rules.insert(position, rule);
            }
            None => rules.push(rule),
        }
    }

    /// Look up a parameter by GRIB2 codes and first fixed surface.
    pub fn lookup(
        &self,
        discipline: u8,
        category: u8,
        number: u8,
        surface: &FixedSurface,
    ) -> Option<&ParameterEntry> {
        self.parameters
            .get(&(discipline, category, number))?
            .iter()
            .find(|rule| rule.level.map_or(true, |level| level.matches(surface)))
            .map(|rule| &rule.entry)
    }

    /// Look up parameter short name by GRIB2 codes.
    ///
    /// Returns "unknown" if not found.
    pub fn get_parameter_name(
        &self,
        discipline: u8,
        category: u8,
        number: u8,
        surface: &FixedSurface,
    ) -> &str {
        self.lookup(discipline, category, number, surface)
            .map(|entry| entry.short_name.as_str())
            .unwrap_or(UNKNOWN_SHORT_NAME)
    }

    /// Get the number of parameter entries in the table
    pub fn parameter_count(&self) -> usize {
        self.parameters.values().map(Vec::len).sum()
    }

    /// Check if the tables are empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}
