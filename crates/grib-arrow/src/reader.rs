//! Top-level entry point.
//!
//! A [`GribReaderBuilder`] opens the file and validates query points and
//! conversions as they are attached. Once built, a [`GribReader`]'s
//! configuration cannot change.
//!
//! ```no_run
//! use grib_arrow::GribReader;
//!
//! let mut reader = GribReader::builder("gep01.t00z.pgrb2a.0p50.f003")?
//!     .with_locations_file("locations.csv")?
//!     .with_conversions_file("conversions.csv")?
//!     .build();
//!
//! for message in reader.iter() {
//!     let message = message?;
//!     let table = message.data_with_locations()?;
//!     println!("{} {} rows", message.short_name(), table.num_rows());
//! }
//! # Ok::<(), grib_arrow::GribArrowError>(())
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use grib2_parser::Grib2Tables;
use tracing::{debug, info};

use crate::config::{CsvOptions, MatchStrategy, ReaderOptions};
use crate::conversion::ConversionSpec;
use crate::error::{GribArrowError, Result};
use crate::grid::{GridArea, GridView};
use crate::iterator::MessageIterator;
use crate::locations::QueryPointSet;
use crate::source::{self, MessageSource};
use crate::spatial::{nearest_points, NearestPoint};

/// The two independent query point slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Locations,
    Stations,
}

impl Slot {
    pub fn name(&self) -> &'static str {
        match self {
            Slot::Locations => "locations",
            Slot::Stations => "stations",
        }
    }
}

type MatchCache = HashMap<(Slot, GridArea), Rc<[Option<NearestPoint>]>>;

/// Configuration shared with every message handle.
#[derive(Debug, Default)]
pub struct ReaderContext {
    options: ReaderOptions,
    locations: Option<QueryPointSet>,
    stations: Option<QueryPointSet>,
    conversions: Option<ConversionSpec>,
    matches: RefCell<MatchCache>,
}

impl ReaderContext {
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn points(&self, slot: Slot) -> Option<&QueryPointSet> {
        match slot {
            Slot::Locations => self.locations.as_ref(),
            Slot::Stations => self.stations.as_ref(),
        }
    }

    pub fn conversions(&self) -> Option<&ConversionSpec> {
        self.conversions.as_ref()
    }

    /// Nearest grid points for `slot`'s query points, computed once per
    /// grid geometry.
    pub(crate) fn matches(
        &self,
        slot: Slot,
        points: &QueryPointSet,
        grid: &GridView,
    ) -> Rc<[Option<NearestPoint>]> {
        let key = (slot, *grid.area());
        if let Some(cached) = self.matches.borrow().get(&key) {
            debug!(slot = slot.name(), "Reusing nearest point matches");
            return Rc::clone(cached);
        }

        let found: Rc<[Option<NearestPoint>]> = nearest_points(
            grid.latitudes(),
            grid.longitudes(),
            &points.coordinates(),
            self.options.match_strategy,
        )
        .into();
        self.matches.borrow_mut().insert(key, Rc::clone(&found));
        found
    }

    /// Number of distinct (slot, grid) match results held.
    pub fn cached_matches(&self) -> usize {
        self.matches.borrow().len()
    }
}

/// Configures a [`GribReader`].
pub struct GribReaderBuilder {
    path: Option<PathBuf>,
    source: Box<dyn MessageSource>,
    context: ReaderContext,
}

impl GribReaderBuilder {
    fn new(path: Option<PathBuf>, source: Box<dyn MessageSource>, options: ReaderOptions) -> Result<Self> {
        options
            .validate()
            .map_err(|e| GribArrowError::schema_violation(format!("invalid reader options: {}", e)))?;
        Ok(Self {
            path,
            source,
            context: ReaderContext {
                options,
                ..Default::default()
            },
        })
    }

    /// Rewind to the first message every time iteration starts.
    pub fn repeatable(mut self, repeatable: bool) -> Self {
        self.context.options.repeatable = repeatable;
        self
    }

    pub fn with_match_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.context.options.match_strategy = strategy;
        self
    }

    /// Options for auxiliary files attached after this call.
    pub fn with_csv_options(mut self, csv: CsvOptions) -> Result<Self> {
        self.context.options.csv = csv;
        self.context
            .options
            .validate()
            .map_err(|e| GribArrowError::schema_violation(format!("invalid reader options: {}", e)))?;
        Ok(self)
    }

    pub fn with_locations(mut self, points: QueryPointSet) -> Self {
        self.context.locations = Some(points);
        self
    }

    /// Locations from a table with numeric `lat` and `lon` columns. Other
    /// columns pass through to joined output; any named like a column the
    /// join adds (`value`, `datetime`, `distance` and the rest of
    /// [`RESERVED_COLUMNS`](crate::locations::RESERVED_COLUMNS)) gets a
    /// `point_` prefix.
    pub fn with_locations_batch(self, batch: RecordBatch) -> Result<Self> {
        Ok(self.with_locations(QueryPointSet::from_batch(batch)?))
    }

    /// Locations from a delimited file, read with the reader's CSV options.
    /// Columns are handled as in [`with_locations_batch`](Self::with_locations_batch).
    pub fn with_locations_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let points = QueryPointSet::from_csv(path, &self.context.options.csv, "locations")?;
        Ok(self.with_locations(points))
    }

    pub fn with_stations(mut self, points: QueryPointSet) -> Self {
        self.context.stations = Some(points);
        self
    }

    /// Stations from a table; columns as in
    /// [`with_locations_batch`](Self::with_locations_batch).
    pub fn with_stations_batch(self, batch: RecordBatch) -> Result<Self> {
        Ok(self.with_stations(QueryPointSet::from_batch(batch)?))
    }

    pub fn with_stations_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let points = QueryPointSet::from_csv(path, &self.context.options.csv, "stations")?;
        Ok(self.with_stations(points))
    }

    pub fn with_conversions(mut self, conversions: ConversionSpec) -> Self {
        self.context.conversions = Some(conversions);
        self
    }

    pub fn with_conversions_batch(self, batch: &RecordBatch) -> Result<Self> {
        Ok(self.with_conversions(ConversionSpec::from_batch(batch)?))
    }

    pub fn with_conversions_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let spec = ConversionSpec::from_csv(path, &self.context.options.csv)?;
        Ok(self.with_conversions(spec))
    }

    pub fn build(self) -> GribReader {
        let context = &self.context;
        info!(
            path = ?self.path,
            repeatable = context.options.repeatable,
            match_strategy = %context.options.match_strategy,
            locations = context.locations.as_ref().map_or(0, QueryPointSet::len),
            stations = context.stations.as_ref().map_or(0, QueryPointSet::len),
            conversions = context.conversions.as_ref().map_or(0, ConversionSpec::len),
            "GRIB reader configured"
        );
        GribReader {
            path: self.path,
            source: self.source,
            context: self.context,
        }
    }
}

/// Reads the messages of one GRIB file.
pub struct GribReader {
    path: Option<PathBuf>,
    source: Box<dyn MessageSource>,
    context: ReaderContext,
}

impl GribReader {
    /// Open `path` with default options and no query points.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::builder(path)?.build())
    }

    /// Start configuring a reader for `path`. Fails with
    /// [`GribArrowError::FileNotFound`] if the file does not exist; nothing
    /// is decoded yet.
    pub fn builder(path: impl AsRef<Path>) -> Result<GribReaderBuilder> {
        Self::builder_with_options(path, ReaderOptions::default())
    }

    pub fn builder_with_options(
        path: impl AsRef<Path>,
        options: ReaderOptions,
    ) -> Result<GribReaderBuilder> {
        let path = path.as_ref();
        let source = source::open_file(path, Arc::new(Grib2Tables::builtin()))?;
        GribReaderBuilder::new(Some(path.to_path_buf()), source, options)
    }

    /// Start configuring a reader over an in-memory file image.
    pub fn builder_from_bytes(data: impl Into<Bytes>, options: ReaderOptions) -> Result<GribReaderBuilder> {
        let source = source::from_bytes(data.into(), Arc::new(Grib2Tables::builtin()));
        GribReaderBuilder::new(None, source, options)
    }

    /// Start configuring a reader over any message source.
    pub fn builder_from_source(
        source: Box<dyn MessageSource>,
        options: ReaderOptions,
    ) -> Result<GribReaderBuilder> {
        GribReaderBuilder::new(None, source, options)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn options(&self) -> &ReaderOptions {
        self.context.options()
    }

    pub fn locations(&self) -> Option<&QueryPointSet> {
        self.context.points(Slot::Locations)
    }

    pub fn stations(&self) -> Option<&QueryPointSet> {
        self.context.points(Slot::Stations)
    }

    pub fn conversions(&self) -> Option<&ConversionSpec> {
        self.context.conversions()
    }

    /// Iterate over messages.
    ///
    /// A repeatable reader starts from the first message every time. Any
    /// other reader continues where the previous iteration stopped, so a
    /// second full pass yields nothing.
    pub fn iter(&mut self) -> MessageIterator<'_> {
        let pending = if self.context.options.repeatable {
            self.source.rewind().err().map(GribArrowError::from)
        } else {
            None
        };
        MessageIterator::new(self.source.as_mut(), &self.context, pending)
    }

    /// Number of distinct (slot, grid) nearest point results computed so far.
    pub fn cached_matches(&self) -> usize {
        self.context.cached_matches()
    }
}

impl<'r> IntoIterator for &'r mut GribReader {
    type Item = Result<crate::message::GribMessage<'r>>;
    type IntoIter = MessageIterator<'r>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
