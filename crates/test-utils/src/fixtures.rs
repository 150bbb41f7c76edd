//! Common test fixtures for grib-arrow tests.
//!
//! Pre-defined query points, grids and auxiliary CSV
//! contents that represent common extraction scenarios.

/// Named query points used across the test suite, as (name, lat, lon).
pub mod places {
    pub const CANARY_WHARF: (&str, f64, f64) = ("Canary Wharf", 51.5054, -0.027176);
    pub const MANCHESTER: (&str, f64, f64) = ("Manchester", 53.4808, -2.2426);
    pub const KRISTIANSAND: (&str, f64, f64) = ("Kristiansand", 58.1599, 8.0182);
    pub const BERGEN: (&str, f64, f64) = ("Bergen", 60.3913, 5.3221);

    pub const UK_AND_NORWAY: [(&str, f64, f64); 4] =
        [CANARY_WHARF, MANCHESTER, KRISTIANSAND, BERGEN];
}

/// Common grid specifications for testing.
pub mod grid {
    /// Global 0.5 degree grid, north to south from the Greenwich meridian
    pub const GLOBAL_HALF_DEGREE: GridSpec = GridSpec {
        width: 720,
        height: 361,
        first_lat: 90.0,
        first_lon: 0.0,
        step: 0.5,
    };

    /// Grid specification for testing.
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub width: usize,
        pub height: usize,
        pub first_lat: f64,
        pub first_lon: f64,
        pub step: f64,
    }

    impl GridSpec {
        /// Returns the total number of grid cells.
        pub fn size(&self) -> usize {
            self.width * self.height
        }

        /// Latitude of the last stored row.
        pub fn last_lat(&self) -> f64 {
            self.first_lat - self.step * (self.height - 1) as f64
        }
    }
}

/// Auxiliary CSV file contents.
pub mod csv_files {
    /// Four locations with a passthrough `name` column.
    pub const LOCATIONS: &str = "name,lat,lon\n\
        Canary Wharf,51.5054,-0.027176\n\
        Manchester,53.4808,-2.2426\n\
        Kristiansand,58.1599,8.0182\n\
        Bergen,60.3913,5.3221\n";

    /// Stations carrying an identifier and an elevation column.
    pub const STATIONS: &str = "station_id,lat,lon,elevation\n\
        EGLC,51.5048,0.0495,5\n\
        EGCC,53.3537,-2.2750,78\n";

    /// Kelvin to Celsius for 2 m temperature, metres to decametres for
    /// geopotential height.
    pub const CONVERSIONS: &str = "parameterId,addition_value,subtraction_value,multiplication_value,division_value,ceiling_value\n\
        167,,273.15,,,\n\
        156,,,,10,\n";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_spec_size() {
        assert_eq!(grid::GLOBAL_HALF_DEGREE.size(), 259_920);
        assert_eq!(grid::GLOBAL_HALF_DEGREE.last_lat(), -90.0);
    }

    #[test]
    fn test_csv_fixtures_have_headers() {
        assert!(csv_files::LOCATIONS.starts_with("name,lat,lon\n"));
        assert_eq!(csv_files::CONVERSIONS.lines().count(), 3);
    }
}
