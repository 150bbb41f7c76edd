//! Grid geometry and the decoded point grid of a message.

use std::hash::{Hash, Hasher};

use grib2_parser::Grib2Message;

use crate::error::Result;

/// The geometry that determines where a message's grid points lie.
///
/// Two messages with equal areas have identical coordinates, so nearest
/// point matches computed for one are valid for the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridArea {
    pub template_number: u16,
    pub ni: u32,
    pub nj: u32,
    pub num_points: u32,
    pub first_latitude: f64,
    pub first_longitude: f64,
    pub last_latitude: f64,
    pub last_longitude: f64,
    pub i_increment: Option<f64>,
    pub j_increment: Option<f64>,
    pub scanning_mode: u8,
}

impl GridArea {
    pub fn of(message: &Grib2Message) -> Self {
        let gd = &message.grid_definition;
        Self {
            template_number: gd.template_number,
            ni: gd.ni,
            nj: gd.nj,
            num_points: gd.num_data_points,
            first_latitude: gd.first_latitude,
            first_longitude: gd.first_longitude,
            last_latitude: gd.last_latitude,
            last_longitude: gd.last_longitude,
            i_increment: gd.i_increment,
            j_increment: gd.j_increment,
            scanning_mode: gd.scanning_mode.0,
        }
    }

    pub fn i_scans_negatively(&self) -> bool {
        self.scanning_mode & 0x80 != 0
    }

    pub fn j_scans_positively(&self) -> bool {
        self.scanning_mode & 0x40 != 0
    }

    fn bits(&self) -> [u64; 6] {
        [
            self.first_latitude.to_bits(),
            self.first_longitude.to_bits(),
            self.last_latitude.to_bits(),
            self.last_longitude.to_bits(),
            self.i_increment.map_or(u64::MAX, f64::to_bits),
            self.j_increment.map_or(u64::MAX, f64::to_bits),
        ]
    }
}

// Bitwise equality so that NaN corners (undefined templates) compare equal
// and the area can key a hash map.
impl PartialEq for GridArea {
    fn eq(&self, other: &Self) -> bool {
        self.template_number == other.template_number
            && self.ni == other.ni
            && self.nj == other.nj
            && self.num_points == other.num_points
            && self.scanning_mode == other.scanning_mode
            && self.bits() == other.bits()
    }
}

impl Eq for GridArea {}

impl Hash for GridArea {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.template_number.hash(state);
        self.ni.hash(state);
        self.nj.hash(state);
        self.num_points.hash(state);
        self.scanning_mode.hash(state);
        self.bits().hash(state);
    }
}

/// Every grid point of a message as parallel latitude, longitude and value
/// arrays, in the order the message stores them. Missing values are NaN.
#[derive(Debug, Clone)]
pub struct GridView {
    area: GridArea,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    values: Vec<f64>,
}

impl GridView {
    /// Decode coordinates and values of `message`.
    pub fn decode(message: &Grib2Message) -> Result<Self> {
        let coordinates = message.coordinates()?;
        let values = message.unpack_data()?;
        Ok(Self {
            area: GridArea::of(message),
            latitudes: coordinates.latitudes,
            longitudes: coordinates.longitudes,
            values,
        })
    }

    /// Assemble a view from already decoded arrays of equal length.
    pub fn from_parts(
        area: GridArea,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        values: Vec<f64>,
    ) -> Self {
        Self {
            area,
            latitudes,
            longitudes,
            values,
        }
    }

    pub fn area(&self) -> &GridArea {
        &self.area
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of points along a parallel.
    pub fn columns(&self) -> u32 {
        self.area.ni
    }

    /// Number of points along a meridian.
    pub fn rows(&self) -> u32 {
        self.area.nj
    }

    /// `(latitude, longitude, value)` of point `index`.
    pub fn point(&self, index: usize) -> Option<(f64, f64, f64)> {
        Some((
            *self.latitudes.get(index)?,
            *self.longitudes.get(index)?,
            *self.values.get(index)?,
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.latitudes
            .iter()
            .zip(&self.longitudes)
            .zip(&self.values)
            .map(|((&lat, &lon), &value)| (lat, lon, value))
    }
}
