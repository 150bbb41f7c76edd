//! grib-extract: GRIB2 messages to CSV or Arrow IPC.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use grib_arrow::GribArrowError;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use grib_extract::{run, CliArgs, JobConfig, Outputs};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    match extract(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<GribArrowError>() {
                Some(grib_error) => {
                    error!(kind = %grib_error.kind(), error = %grib_error, "Extraction failed")
                }
                None => error!(error = %format!("{:#}", e), "Extraction failed"),
            }
            ExitCode::FAILURE
        }
    }
}

fn extract(args: &CliArgs) -> Result<()> {
    let job = JobConfig::resolve(args)?;
    info!(
        input = ?job.input,
        format = %job.format,
        output = ?job.output,
        stations_output = ?job.stations_output,
        "Starting extraction"
    );

    let mut outputs = Outputs::create(&job)?;
    run(&job, &mut outputs)?;
    outputs.finish()
}
