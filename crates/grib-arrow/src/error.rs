//! Error types for grib-arrow.

use std::fmt;
use std::path::PathBuf;

use arrow::error::ArrowError;
use grib2_parser::Grib2Error;
use thiserror::Error;

/// Errors raised while configuring a reader or producing tables.
///
/// Everything except [`GribArrowError::DecodeFailure`] is raised while the
/// reader is being configured. Decode failures only appear once messages
/// are actually read.
#[derive(Error, Debug)]
pub enum GribArrowError {
    /// The GRIB file does not exist.
    #[error("GRIB file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A query-point or conversion file does not exist.
    #[error("{what} file not found: {}", path.display())]
    AuxiliaryFileNotFound { what: &'static str, path: PathBuf },

    /// A delimited auxiliary file could not be parsed.
    #[error("invalid CSV in {}: {reason}", path.display())]
    MalformedAuxiliaryFile { path: PathBuf, reason: String },

    /// A query-point or conversion table has missing or mistyped columns.
    #[error("invalid schema: {0}")]
    SchemaViolation(String),

    /// The GRIB decoder could not process the file or a message.
    #[error("failed to decode GRIB data: {0}")]
    DecodeFailure(String),

    /// A joined table was requested but no query points are attached.
    #[error("no {0} configured on this reader")]
    QueryPointsNotConfigured(&'static str),

    /// Table assembly failed.
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless discriminant of [`GribArrowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FileNotFound,
    AuxiliaryFileNotFound,
    MalformedAuxiliaryFile,
    SchemaViolation,
    DecodeFailure,
    QueryPointsNotConfigured,
    Arrow,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::FileNotFound => "file_not_found",
            ErrorKind::AuxiliaryFileNotFound => "auxiliary_file_not_found",
            ErrorKind::MalformedAuxiliaryFile => "malformed_auxiliary_file",
            ErrorKind::SchemaViolation => "schema_violation",
            ErrorKind::DecodeFailure => "decode_failure",
            ErrorKind::QueryPointsNotConfigured => "query_points_not_configured",
            ErrorKind::Arrow => "arrow",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

impl GribArrowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::AuxiliaryFileNotFound { .. } => ErrorKind::AuxiliaryFileNotFound,
            Self::MalformedAuxiliaryFile { .. } => ErrorKind::MalformedAuxiliaryFile,
            Self::SchemaViolation(_) => ErrorKind::SchemaViolation,
            Self::DecodeFailure(_) => ErrorKind::DecodeFailure,
            Self::QueryPointsNotConfigured(_) => ErrorKind::QueryPointsNotConfigured,
            Self::Arrow(_) => ErrorKind::Arrow,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Create a SchemaViolation error.
    pub fn schema_violation(msg: impl Into<String>) -> Self {
        Self::SchemaViolation(msg.into())
    }

    /// Create a MalformedAuxiliaryFile error.
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedAuxiliaryFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<Grib2Error> for GribArrowError {
    fn from(err: Grib2Error) -> Self {
        Self::DecodeFailure(err.to_string())
    }
}

/// Result type for grib-arrow operations.
pub type Result<T> = std::result::Result<T, GribArrowError>;
