//! Drive a reader over each input file and feed the sink.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use grib_arrow::GribReader;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::JobConfig;
use crate::output::Outputs;

/// File extensions treated as GRIB when walking a directory.
pub const GRIB_EXTENSIONS: &[&str] = &["grib", "grib2", "grb", "grb2"];

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub messages: usize,
    pub skipped: usize,
    pub rows: usize,
    pub station_rows: usize,
}

/// `input` itself when it is a file, otherwise every GRIB file below it
/// in path order.
pub fn find_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_grib = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| GRIB_EXTENSIONS.contains(&e.to_lowercase().as_str()));
        if is_grib {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Extract every configured input into `outputs`.
pub fn run(job: &JobConfig, outputs: &mut Outputs) -> Result<ExtractSummary> {
    let Some(input) = &job.input else {
        bail!("no input given");
    };
    job.validate()?;
    if job.stations_output.is_some() && outputs.stations.is_none() {
        bail!("no sink opened for the stations output");
    }

    let files = find_inputs(input)?;
    if files.is_empty() {
        bail!("no GRIB files found under {}", input.display());
    }

    let mut summary = ExtractSummary::default();
    for path in &files {
        let file = extract_file(job, path, outputs)?;
        summary.files += 1;
        summary.messages += file.messages;
        summary.skipped += file.skipped;
        summary.rows += file.rows;
        summary.station_rows += file.station_rows;
    }

    info!(
        files = summary.files,
        messages = summary.messages,
        skipped = summary.skipped,
        rows = summary.rows,
        station_rows = summary.station_rows,
        "Extraction complete"
    );
    Ok(summary)
}

fn extract_file(job: &JobConfig, path: &Path, outputs: &mut Outputs) -> Result<ExtractSummary> {
    let mut builder = GribReader::builder_with_options(path, job.reader.clone())?;
    if let Some(locations) = &job.locations {
        builder = builder.with_locations_file(locations)?;
    }
    if let Some(stations) = &job.stations {
        builder = builder.with_stations_file(stations)?;
    }
    if let Some(conversions) = &job.conversions {
        builder = builder.with_conversions_file(conversions)?;
    }
    let mut reader = builder.build();

    let mut summary = ExtractSummary::default();
    for message in reader.iter() {
        let message = message?;
        summary.messages += 1;

        let parameter_id = message.parameter_id();
        if !job.wants(parameter_id) {
            debug!(message_id = message.message_id(), parameter_id, "Skipping message");
            summary.skipped += 1;
            continue;
        }

        let table = message.table()?;
        summary.rows += table.num_rows();
        outputs.primary.write(&table)?;

        if let Some(stations) = outputs.stations.as_mut() {
            let table = message.data_with_stations()?;
            summary.station_rows += table.num_rows();
            stations.write(&table)?;
        }
    }

    info!(
        path = %path.display(),
        messages = summary.messages,
        rows = summary.rows,
        station_rows = summary.station_rows,
        "Extracted file"
    );
    Ok(summary)
}
