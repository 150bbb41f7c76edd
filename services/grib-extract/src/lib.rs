//! Command-line extraction of GRIB2 messages into tabular files.
//!
//! Every message of every input file becomes one Arrow record batch (joined
//! with query points when some are configured, the full grid otherwise)
//! which is appended to a CSV or Arrow IPC output. A job giving both
//! locations and stations writes the stations join to a second output.

pub mod config;
pub mod extract;
pub mod output;

pub use config::{CliArgs, JobConfig};
pub use extract::{find_inputs, run, ExtractSummary};
pub use output::{OutputFormat, Outputs, TableSink};
