//! Grid point coordinates for regular latitude/longitude grids.

use crate::sections::GridDefinition;
use crate::Grib2Error;

/// Latitude and longitude of every grid point, in the order values are
/// stored in the data section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridCoordinates {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
}

impl GridCoordinates {
    pub fn len(&self) -> usize {
        self.latitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latitudes.is_empty()
    }
}

/// Compute point coordinates for a grid definition.
///
/// Only template 3.0 (regular lat/lon) is supported.
pub fn grid_coordinates(grid: &GridDefinition) -> Result<GridCoordinates, Grib2Error> {
    if grid.template_number != 0 {
        return Err(Grib2Error::UnsupportedTemplate {
            section: 3,
            template: grid.template_number,
        });
    }

    let ni = grid.ni as usize;
    let nj = grid.nj as usize;
    if ni.checked_mul(nj) != Some(grid.num_data_points as usize) {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: format!(
                "Ni x Nj = {} x {} does not match {} data points",
                ni, nj, grid.num_data_points
            ),
        });
    }

    let scan = grid.scanning_mode;
    let i_step = if scan.i_scans_negatively() { -1.0 } else { 1.0 };
    let j_step = if scan.j_scans_positively() { 1.0 } else { -1.0 };

    let di = grid.i_increment.unwrap_or_else(|| {
        let mut span = (grid.last_longitude - grid.first_longitude) * i_step;
        if span < 0.0 {
            span += 360.0;
        }
        span_increment(span, ni)
    });
    let dj = grid.j_increment.unwrap_or_else(|| {
        span_increment((grid.last_latitude - grid.first_latitude).abs(), nj)
    });

    let lon_at = |i: usize| round_micro(grid.first_longitude + i_step * di * i as f64);
    let lat_at = |j: usize| round_micro(grid.first_latitude + j_step * dj * j as f64);

    let mut latitudes = Vec::with_capacity(ni * nj);
    let mut longitudes = Vec::with_capacity(ni * nj);

    if scan.j_points_consecutive() {
        for i in 0..ni {
            let lon = lon_at(i);
            for k in 0..nj {
                let j = if scan.alternating_rows() && i % 2 == 1 { nj - 1 - k } else { k };
                latitudes.push(lat_at(j));
                longitudes.push(lon);
            }
        }
    } else {
        for j in 0..nj {
            let lat = lat_at(j);
            for k in 0..ni {
                let i = if scan.alternating_rows() && j % 2 == 1 { ni - 1 - k } else { k };
                latitudes.push(lat);
                longitudes.push(lon_at(i));
            }
        }
    }

    Ok(GridCoordinates {
        latitudes,
        longitudes,
    })
}

fn span_increment(span: f64, points: usize) -> f64 {
    if points > 1 {
        span / (points - 1) as f64
    } else {
        0.0
    }
}

fn round_micro(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
