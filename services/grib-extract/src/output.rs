//! Output writers for extracted tables.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::csv::Writer as CsvWriter;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::JobConfig;

/// File format of the extraction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma separated values with a header row
    #[default]
    Csv,
    /// Arrow IPC file
    Ipc,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Ipc => "ipc",
        })
    }
}

enum Writer {
    Csv(CsvWriter<Box<dyn Write>>),
    Ipc(FileWriter<Box<dyn Write>>),
}

/// Appends record batches to one output.
///
/// Every batch must have the schema of the first one. The IPC writer is
/// created on the first batch, once the schema is known.
pub struct TableSink {
    format: OutputFormat,
    target: Option<Box<dyn Write>>,
    writer: Option<Writer>,
    rows: usize,
    batches: usize,
}

impl TableSink {
    pub fn new(format: OutputFormat, target: Box<dyn Write>) -> Self {
        Self {
            format,
            target: Some(target),
            writer: None,
            rows: 0,
            batches: 0,
        }
    }

    /// Write to `path`, or to stdout when `None`.
    pub fn create(format: OutputFormat, path: Option<&Path>) -> Result<Self> {
        let target: Box<dyn Write> = match path {
            Some(path) => Box::new(BufWriter::new(
                File::create(path)
                    .with_context(|| format!("Failed to create output {}", path.display()))?,
            )),
            None => Box::new(BufWriter::new(io::stdout())),
        };
        Ok(Self::new(format, target))
    }

    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        if let Some(target) = self.target.take() {
            self.writer = Some(match self.format {
                OutputFormat::Csv => Writer::Csv(CsvWriter::new(target)),
                OutputFormat::Ipc => Writer::Ipc(FileWriter::try_new(target, &batch.schema())?),
            });
        }

        match &mut self.writer {
            Some(Writer::Csv(writer)) => writer.write(batch)?,
            Some(Writer::Ipc(writer)) => writer.write(batch)?,
            None => bail!("output already finished"),
        }

        self.rows += batch.num_rows();
        self.batches += 1;
        Ok(())
    }

    /// Flush and close the output.
    pub fn finish(mut self) -> Result<()> {
        match self.writer.take() {
            Some(Writer::Csv(writer)) => writer.into_inner().flush()?,
            Some(Writer::Ipc(mut writer)) => {
                writer.finish()?;
                writer.into_inner()?.flush()?;
            }
            None => {
                if let Some(mut target) = self.target.take() {
                    target.flush()?;
                }
            }
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn batches(&self) -> usize {
        self.batches
    }
}

/// The sinks of one run: the primary output, plus a second one for the
/// stations join when a job configures both locations and stations.
pub struct Outputs {
    pub primary: TableSink,
    pub stations: Option<TableSink>,
}

impl Outputs {
    pub fn new(primary: TableSink) -> Self {
        Self {
            primary,
            stations: None,
        }
    }

    pub fn with_stations(mut self, stations: TableSink) -> Self {
        self.stations = Some(stations);
        self
    }

    /// Open the outputs named by `job`. The primary output falls back to
    /// stdout; the stations output always names a file.
    pub fn create(job: &JobConfig) -> Result<Self> {
        job.validate()?;
        let outputs = Self::new(TableSink::create(job.format, job.output.as_deref())?);
        match &job.stations_output {
            Some(path) => Ok(outputs.with_stations(TableSink::create(job.format, Some(path))?)),
            None => Ok(outputs),
        }
    }

    pub fn finish(self) -> Result<()> {
        self.primary.finish()?;
        if let Some(stations) = self.stations {
            stations.finish()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, Int64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::ipc::reader::FileReader;

    fn batch(values: &[f64]) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("value", DataType::Float64, true),
            Field::new("parameterId", DataType::Int64, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Float64Array::from(values.to_vec())) as ArrayRef,
                Arc::new(Int64Array::from(vec![167; values.len()])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_csv_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = TableSink::create(OutputFormat::Csv, Some(&path)).unwrap();
        sink.write(&batch(&[1.5, 2.5])).unwrap();
        sink.write(&batch(&[3.5])).unwrap();
        assert_eq!(sink.rows(), 3);
        assert_eq!(sink.batches(), 2);
        sink.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["value,parameterId", "1.5,167", "2.5,167", "3.5,167"]);
    }

    #[test]
    fn test_ipc_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.arrow");

        let mut sink = TableSink::create(OutputFormat::Ipc, Some(&path)).unwrap();
        sink.write(&batch(&[1.0, 2.0])).unwrap();
        sink.write(&batch(&[3.0])).unwrap();
        sink.finish().unwrap();

        let reader = FileReader::try_new(File::open(&path).unwrap(), None).unwrap();
        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 3);
    }

    #[test]
    fn test_outputs_open_stations_file() {
        let dir = tempfile::tempdir().unwrap();
        let job = JobConfig {
            locations: Some(dir.path().join("locations.csv")),
            stations: Some(dir.path().join("stations.csv")),
            output: Some(dir.path().join("locations.out.csv")),
            stations_output: Some(dir.path().join("stations.out.csv")),
            ..Default::default()
        };

        let mut outputs = Outputs::create(&job).unwrap();
        outputs.stations.as_mut().unwrap().write(&batch(&[4.5])).unwrap();
        outputs.finish().unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("locations.out.csv")).unwrap(), "");
        let stations = std::fs::read_to_string(dir.path().join("stations.out.csv")).unwrap();
        assert_eq!(stations.lines().collect::<Vec<_>>(), vec!["value,parameterId", "4.5,167"]);
    }

    #[test]
    fn test_finish_without_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        TableSink::create(OutputFormat::Csv, Some(&path)).unwrap().finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
