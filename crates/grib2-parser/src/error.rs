//! Error types for GRIB2 parsing.

use thiserror::Error;

/// Errors raised while framing, parsing or unpacking GRIB2 messages.
#[derive(Error, Debug)]
pub enum Grib2Error {
    #[error("Invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("Invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("Unsupported GRIB edition {0}")]
    UnsupportedEdition(u8),

    #[error("Unsupported template {section}.{template}")]
    UnsupportedTemplate { section: u8, template: u16 },

    #[error("Unpacking error: {0}")]
    UnpackingError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Grib2Result<T> = Result<T, Grib2Error>;
