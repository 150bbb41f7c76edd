//! GRIB2 parser implementation (WMO FM 92 GRIB Edition 2).
//!
//! This crate frames GRIB2 messages out of a byte stream, parses their
//! sections, resolves parameter identity and unpacks field values.
//! Simple packing is decoded natively; other packings go through the
//! `grib` crate.

pub mod error;
pub mod grid;
pub mod keys;
pub mod message;
pub mod reader;
pub mod sections;
pub mod tables;
pub mod unpacking;

pub use error::{Grib2Error, Grib2Result};
pub use grid::GridCoordinates;
pub use keys::{KeyValue, KEY_NAMES};
pub use message::Grib2Message;
pub use reader::{Grib2Reader, Grib2StreamReader};
pub use sections::{ScanningMode, TimeUnit};
pub use tables::{Grib2Tables, LevelQualifier, ParameterEntry};
pub use unpacking::unpack_simple;
