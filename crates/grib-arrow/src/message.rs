//! Per-message handle yielded by the iterator.

use std::cell::OnceCell;

use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use grib2_parser::Grib2Message;
use tracing::debug;

use crate::error::{GribArrowError, Result};
use crate::grid::{GridArea, GridView};
use crate::keys::KeyAccessor;
use crate::reader::{ReaderContext, Slot};
use crate::table::{joined_table, raw_table, MessageColumns};

/// One decoded message plus access to the reader's query points and
/// conversions.
///
/// The iterator unpacks the grid before handing the message out, and the
/// decoded values are kept for the life of the handle.
#[derive(Debug)]
pub struct GribMessage<'r> {
    message: Grib2Message,
    message_id: i64,
    context: &'r ReaderContext,
    grid: OnceCell<GridView>,
}

impl<'r> GribMessage<'r> {
    pub(crate) fn new(message: Grib2Message, message_id: i64, context: &'r ReaderContext) -> Self {
        Self {
            message,
            message_id,
            context,
            grid: OnceCell::new(),
        }
    }

    /// Zero-based position of the message in the file.
    pub fn message_id(&self) -> i64 {
        self.message_id
    }

    pub fn keys(&self) -> KeyAccessor<'_> {
        KeyAccessor::new(&self.message)
    }

    /// The underlying parsed message.
    pub fn raw(&self) -> &Grib2Message {
        &self.message
    }

    pub fn parameter_id(&self) -> i64 {
        self.keys().required("paramId")
    }

    pub fn short_name(&self) -> String {
        self.keys().required("shortName")
    }

    /// Ensemble member number, 0 for messages without one.
    pub fn model_number(&self) -> i64 {
        self.keys().get("number").unwrap_or(0)
    }

    pub fn perturbation_number(&self) -> i64 {
        self.model_number()
    }

    /// End of the forecast period in `step_units`.
    pub fn step(&self) -> i64 {
        self.keys().required("step")
    }

    pub fn step_units(&self) -> String {
        self.keys().required("stepUnits")
    }

    pub fn step_range(&self) -> String {
        self.keys().required("stepRange")
    }

    /// Reference date as `YYYYMMDD`.
    pub fn date(&self) -> String {
        format!("{:08}", self.date_numeric())
    }

    /// Reference time as `HHMM`.
    pub fn time(&self) -> String {
        format!("{:04}", self.time_numeric())
    }

    pub fn date_numeric(&self) -> i64 {
        self.keys().required("date")
    }

    pub fn time_numeric(&self) -> i64 {
        self.keys().required("time")
    }

    /// Reference date and time.
    pub fn base_datetime(&self) -> Option<DateTime<Utc>> {
        self.message.reference_datetime()
    }

    /// Reference time plus the step, in the message's own time unit.
    pub fn observation_datetime(&self) -> Option<DateTime<Utc>> {
        self.message.valid_datetime()
    }

    pub fn latitude_of_first_point(&self) -> f64 {
        self.keys().required("latitudeOfFirstGridPointInDegrees")
    }

    pub fn longitude_of_first_point(&self) -> f64 {
        self.keys().required("longitudeOfFirstGridPointInDegrees")
    }

    pub fn latitude_of_last_point(&self) -> f64 {
        self.keys().required("latitudeOfLastGridPointInDegrees")
    }

    pub fn longitude_of_last_point(&self) -> f64 {
        self.keys().required("longitudeOfLastGridPointInDegrees")
    }

    /// Longitude of the first point mapped into [-180, 180).
    pub fn standardised_longitude_of_first_point(&self) -> f64 {
        standardise_longitude(self.longitude_of_first_point())
    }

    /// Longitude of the last point mapped into [-180, 180).
    pub fn standardised_longitude_of_last_point(&self) -> f64 {
        standardise_longitude(self.longitude_of_last_point())
    }

    pub fn i_scans_negatively(&self) -> bool {
        self.keys().required::<i64>("iScansNegatively") == 1
    }

    pub fn j_scans_positively(&self) -> bool {
        self.keys().required::<i64>("jScansPositively") == 1
    }

    pub fn edition_number(&self) -> i64 {
        self.keys().required("edition")
    }

    /// Type of data, e.g. "fc" or "pf".
    pub fn data_type(&self) -> String {
        self.keys().required("dataType")
    }

    pub fn number_of_points(&self) -> i64 {
        self.keys().required("numberOfPoints")
    }

    pub fn grid_definition_template_number(&self) -> i64 {
        self.keys().required("gridDefinitionTemplateNumber")
    }

    pub fn grid_area(&self) -> GridArea {
        GridArea::of(&self.message)
    }

    /// Coordinates and values of every grid point.
    pub fn grid(&self) -> Result<&GridView> {
        if let Some(grid) = self.grid.get() {
            return Ok(grid);
        }
        let view = GridView::decode(&self.message)?;
        debug!(message_id = self.message_id, points = view.len(), "Decoded grid");
        Ok(self.grid.get_or_init(|| view))
    }

    /// One row per grid point.
    pub fn data(&self) -> Result<RecordBatch> {
        raw_table(self.grid()?, &self.columns())
    }

    /// One row per location, matched to its nearest grid point.
    pub fn data_with_locations(&self) -> Result<RecordBatch> {
        self.joined(Slot::Locations)
    }

    /// One row per station, matched to its nearest grid point.
    pub fn data_with_stations(&self) -> Result<RecordBatch> {
        self.joined(Slot::Stations)
    }

    /// Joined with locations if configured, else stations, else raw.
    pub fn table(&self) -> Result<RecordBatch> {
        if self.context.points(Slot::Locations).is_some() {
            self.data_with_locations()
        } else if self.context.points(Slot::Stations).is_some() {
            self.data_with_stations()
        } else {
            self.data()
        }
    }

    /// The message-level columns shared by raw and joined tables.
    pub fn columns(&self) -> MessageColumns {
        MessageColumns {
            message_id: self.message_id,
            parameter_id: self.parameter_id(),
            model_number: self.model_number(),
            forecast_date: self.base_datetime(),
            observation_datetime: self.observation_datetime(),
        }
    }

    fn joined(&self, slot: Slot) -> Result<RecordBatch> {
        let points = self
            .context
            .points(slot)
            .ok_or(GribArrowError::QueryPointsNotConfigured(slot.name()))?;
        let grid = self.grid()?;
        let matches = self.context.matches(slot, points, grid);
        joined_table(
            points,
            &matches,
            grid,
            &self.columns(),
            self.context.conversions(),
        )
    }
}

fn standardise_longitude(lon: f64) -> f64 {
    let lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if lon >= 180.0 {
        lon - 360.0
    } else {
        lon
    }
}
