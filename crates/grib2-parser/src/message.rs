//! A parsed GRIB2 message.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::grid::{grid_coordinates, GridCoordinates};
use crate::sections::{
    count_fields, parse_bitmap, parse_data_representation, parse_data_section,
    parse_grid_definition, parse_identification, parse_indicator, parse_product_definition,
    Bitmap, DataRepresentation, DataSection, GridDefinition, Identification, Indicator,
    ProductDefinition,
};
use crate::tables::{Grib2Tables, ParameterEntry};
use crate::unpacking::{unpack_simple, unpack_with_grib_crate};
use crate::Grib2Error;

/// A single GRIB2 message with its sections parsed.
///
/// Field values stay packed until [`Grib2Message::unpack_data`] is called.
#[derive(Debug, Clone)]
pub struct Grib2Message {
    pub raw: Bytes,
    pub indicator: Indicator,
    pub identification: Identification,
    pub grid_definition: GridDefinition,
    pub product_definition: ProductDefinition,
    pub data_representation: DataRepresentation,
    pub bitmap: Option<Bitmap>,
    pub data_section: DataSection,
    pub parameter: ParameterEntry,
}

impl Grib2Message {
    /// Parse the sections of a complete message (`GRIB` through `7777`).
    pub fn parse(raw: Bytes, tables: &Grib2Tables) -> Result<Self, Grib2Error> {
        let indicator = parse_indicator(&raw)?;
        if indicator.message_length != raw.len() as u64 {
            return Err(Grib2Error::InvalidFormat(format!(
                "Message length {} does not match {} bytes read",
                indicator.message_length,
                raw.len()
            )));
        }

        let identification = parse_identification(&raw)?;
        let grid_definition = parse_grid_definition(&raw)?;
        let product_definition = parse_product_definition(&raw)?;
        let data_representation = parse_data_representation(&raw)?;
        let bitmap = parse_bitmap(&raw)?;
        let data_section = parse_data_section(&raw)?;

        let fields = count_fields(&raw);
        if fields > 1 {
            debug!(fields, "Multi-field message, reading the first field only");
        }

        let parameter = match tables.lookup(
            indicator.discipline,
            product_definition.parameter_category,
            product_definition.parameter_number,
            &product_definition.first_surface,
        ) {
            Some(entry) => entry.clone(),
            None => {
                debug!(
                    discipline = indicator.discipline,
                    category = product_definition.parameter_category,
                    number = product_definition.parameter_number,
                    "Parameter not in tables"
                );
                ParameterEntry::unknown()
            }
        };

        Ok(Self {
            raw,
            indicator,
            identification,
            grid_definition,
            product_definition,
            data_representation,
            bitmap,
            data_section,
            parameter,
        })
    }

    /// Parameter short name (e.g. "2t", "gh").
    pub fn parameter(&self) -> &str {
        &self.parameter.short_name
    }

    /// Grid dimensions as (Nj, Ni).
    pub fn grid_dims(&self) -> (u32, u32) {
        (self.grid_definition.nj, self.grid_definition.ni)
    }

    /// Number of grid points, including missing ones.
    pub fn num_points(&self) -> usize {
        self.grid_definition.num_data_points as usize
    }

    /// Analysis or forecast base time.
    pub fn reference_datetime(&self) -> Option<DateTime<Utc>> {
        self.identification.reference_time.to_datetime()
    }

    /// Base time plus the end step, in the message's own time unit.
    pub fn valid_datetime(&self) -> Option<DateTime<Utc>> {
        let base = self.reference_datetime()?;
        self.product_definition
            .time_range_unit
            .offset(base, self.product_definition.end_step())
    }

    /// Coordinates of every grid point in storage order.
    pub fn coordinates(&self) -> Result<GridCoordinates, Grib2Error> {
        grid_coordinates(&self.grid_definition)
    }

    /// Unpack the field values in storage order. Missing points are NaN.
    pub fn unpack_data(&self) -> Result<Vec<f64>, Grib2Error> {
        let num_points = self.grid_definition.num_data_points;
        let dr = &self.data_representation;

        if dr.template_number != 0 {
            debug!(
                template = dr.template_number,
                packing = dr.packing_type(),
                "Delegating unpacking to grib decoder"
            );
            let values = unpack_with_grib_crate(&self.raw)?;
            if values.len() != num_points as usize {
                return Err(Grib2Error::UnpackingError(format!(
                    "Decoder returned {} values for {} grid points",
                    values.len(),
                    num_points
                )));
            }
            return Ok(values);
        }

        match &self.bitmap {
            Some(bitmap) if bitmap.data.len() * 8 < num_points as usize => {
                return Err(Grib2Error::InvalidSection {
                    section: 6,
                    reason: format!(
                        "Bitmap covers {} points, grid has {}",
                        bitmap.data.len() * 8,
                        num_points
                    ),
                });
            }
            None if dr.num_data_points != num_points => {
                return Err(Grib2Error::InvalidSection {
                    section: 5,
                    reason: format!(
                        "{} packed values for {} grid points without a bitmap",
                        dr.num_data_points, num_points
                    ),
                });
            }
            _ => {}
        }

        let values = unpack_simple(
            &self.data_section.data,
            num_points,
            dr.bits_per_value,
            dr.reference_value,
            dr.binary_scale_factor,
            dr.decimal_scale_factor,
            self.bitmap.as_ref(),
        )?;

        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}
