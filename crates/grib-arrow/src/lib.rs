//! Read GRIB2 files as Arrow record batches.
//!
//! Each message of a file becomes a table: either the full grid (one row
//! per grid point) or one row per user-supplied location, matched to its
//! nearest grid point. Values can be passed through per-parameter unit
//! conversions on the way out.
//!
//! The entry point is [`GribReader`].

pub mod config;
pub mod conversion;
pub mod csv;
pub mod error;
pub mod grid;
pub mod iterator;
pub mod keys;
pub mod locations;
pub mod message;
pub mod reader;
pub mod source;
pub mod spatial;
pub mod table;

pub use config::{CsvOptions, MatchStrategy, ReaderOptions};
pub use conversion::{Conversion, ConversionSpec};
pub use error::{ErrorKind, GribArrowError, Result};
pub use grid::{GridArea, GridView};
pub use iterator::MessageIterator;
pub use keys::{FromKeyValue, KeyAccessor, MISSING_NUMERIC};
pub use locations::QueryPointSet;
pub use message::GribMessage;
pub use reader::{GribReader, GribReaderBuilder, ReaderContext, Slot};
pub use spatial::NearestPoint;

pub use grib2_parser::KeyValue;
