//! Job configuration: a YAML job file overridden by command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use grib_arrow::{MatchStrategy, ReaderOptions};
use serde::{Deserialize, Serialize};

use crate::output::OutputFormat;

/// Extract GRIB2 messages to CSV or Arrow IPC
#[derive(Parser, Debug, Clone)]
#[command(name = "grib-extract")]
#[command(about = "Extract GRIB2 messages to CSV or Arrow IPC, optionally joined with point locations")]
pub struct CliArgs {
    /// GRIB2 file, or a directory searched recursively for GRIB files
    pub input: Option<PathBuf>,

    /// Locations CSV (columns lat, lon, plus any passthrough columns)
    #[arg(long, env = "GRIB_EXTRACT_LOCATIONS")]
    pub locations: Option<PathBuf>,

    /// Stations CSV; joined into the main output unless locations are
    /// also given, in which case the stations join goes to --stations-output
    #[arg(long, env = "GRIB_EXTRACT_STATIONS")]
    pub stations: Option<PathBuf>,

    /// Output file for the stations join when locations are also given
    #[arg(long)]
    pub stations_output: Option<PathBuf>,

    /// Unit conversion CSV keyed by parameterId
    #[arg(long, env = "GRIB_EXTRACT_CONVERSIONS")]
    pub conversions: Option<PathBuf>,

    /// Only emit messages with this parameterId (repeatable)
    #[arg(long = "param-id")]
    pub param_ids: Vec<i64>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Nearest point search: auto, brute_force or bucket_index
    #[arg(long)]
    pub match_strategy: Option<MatchStrategy>,

    /// YAML job file; flags override its fields
    #[arg(short, long, env = "GRIB_EXTRACT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

/// A complete extraction job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub input: Option<PathBuf>,
    pub locations: Option<PathBuf>,
    pub stations: Option<PathBuf>,
    pub conversions: Option<PathBuf>,
    pub param_ids: Vec<i64>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub stations_output: Option<PathBuf>,
    pub reader: ReaderOptions,
}

impl JobConfig {
    /// Load a job from a YAML file.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse job file {}", path.display()))
    }

    /// The job file named by `args` (or reader options from the environment
    /// when there is none), with every flag given on the command line
    /// taking precedence.
    pub fn resolve(args: &CliArgs) -> Result<Self> {
        let base = match &args.config {
            Some(path) => Self::from_yaml(path)?,
            None => Self {
                reader: ReaderOptions::from_env(),
                ..Self::default()
            },
        };
        let job = base.with_overrides(args);
        job.validate()?;
        Ok(job)
    }

    /// Both point sets need both outputs: the locations join goes to
    /// `output`, the stations join to `stations_output`.
    pub fn validate(&self) -> Result<()> {
        let both = self.locations.is_some() && self.stations.is_some();
        match (&self.stations_output, both) {
            (None, true) => bail!(
                "both locations and stations were given; name an output for the stations join with --stations-output"
            ),
            (Some(path), false) => bail!(
                "stations output {} is only written when both locations and stations are given",
                path.display()
            ),
            _ => Ok(()),
        }
    }

    pub fn with_overrides(mut self, args: &CliArgs) -> Self {
        fn pick(flag: &Option<PathBuf>, current: &mut Option<PathBuf>) {
            if flag.is_some() {
                current.clone_from(flag);
            }
        }

        pick(&args.input, &mut self.input);
        pick(&args.locations, &mut self.locations);
        pick(&args.stations, &mut self.stations);
        pick(&args.conversions, &mut self.conversions);
        pick(&args.output, &mut self.output);
        pick(&args.stations_output, &mut self.stations_output);
        if !args.param_ids.is_empty() {
            self.param_ids = args.param_ids.clone();
        }
        if let Some(format) = args.format {
            self.format = format;
        }
        if let Some(strategy) = args.match_strategy {
            self.reader.match_strategy = strategy;
        }
        self
    }

    /// Whether messages with `parameter_id` are wanted.
    pub fn wants(&self, parameter_id: i64) -> bool {
        self.param_ids.is_empty() || self.param_ids.contains(&parameter_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("grib-extract").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn test_yaml_job() {
        let job: JobConfig = serde_yaml::from_str(
            r#"
input: /data/gep01.t00z.pgrb2a.0p50.f003
locations: /data/locations.csv
param_ids: [167, 228164]
format: ipc
reader:
  match_strategy: bucket_index
  csv:
    delimiter: ";"
"#,
        )
        .unwrap();

        assert_eq!(job.input, Some(PathBuf::from("/data/gep01.t00z.pgrb2a.0p50.f003")));
        assert_eq!(job.param_ids, vec![167, 228164]);
        assert_eq!(job.format, OutputFormat::Ipc);
        assert_eq!(job.reader.match_strategy, MatchStrategy::BucketIndex);
        assert_eq!(job.reader.csv.delimiter, ';');
        assert!(job.reader.csv.has_header);
        assert!(job.stations.is_none());
    }

    #[test]
    fn test_flags_override_job_file() {
        let job = JobConfig {
            input: Some("/data/a.grib2".into()),
            locations: Some("/data/locations.csv".into()),
            param_ids: vec![167],
            ..Default::default()
        };
        let args = parse(&[
            "/data/b.grib2",
            "--param-id",
            "156",
            "--param-id",
            "228164",
            "--format",
            "ipc",
            "--match-strategy",
            "brute_force",
        ]);

        let job = job.with_overrides(&args);
        assert_eq!(job.input, Some(PathBuf::from("/data/b.grib2")));
        assert_eq!(job.locations, Some(PathBuf::from("/data/locations.csv")));
        assert_eq!(job.param_ids, vec![156, 228164]);
        assert_eq!(job.format, OutputFormat::Ipc);
        assert_eq!(job.reader.match_strategy, MatchStrategy::BruteForce);
    }

    #[test]
    fn test_absent_flags_keep_job_values() {
        let job = JobConfig {
            output: Some("/tmp/out.csv".into()),
            param_ids: vec![167],
            format: OutputFormat::Ipc,
            ..Default::default()
        };
        let merged = job.clone().with_overrides(&parse(&[]));
        assert_eq!(merged, job);
    }

    #[test]
    fn test_both_point_sets_need_a_stations_output() {
        let mut job = JobConfig {
            locations: Some("/data/locations.csv".into()),
            stations: Some("/data/stations.csv".into()),
            ..Default::default()
        };
        let err = job.validate().unwrap_err();
        assert!(err.to_string().contains("--stations-output"), "{}", err);

        job.stations_output = Some("/data/stations.out.csv".into());
        assert!(job.validate().is_ok());

        job.locations = None;
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_stations_output_flag() {
        let job = JobConfig::default().with_overrides(&parse(&[
            "--locations",
            "/data/l.csv",
            "--stations",
            "/data/s.csv",
            "--stations-output",
            "/tmp/s.out.csv",
        ]));
        assert_eq!(job.stations_output, Some(PathBuf::from("/tmp/s.out.csv")));
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_wants() {
        let mut job = JobConfig::default();
        assert!(job.wants(167));
        job.param_ids = vec![156];
        assert!(job.wants(156));
        assert!(!job.wants(167));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result = CliArgs::try_parse_from(["grib-extract", "--match-strategy", "kdtree"]);
        assert!(result.is_err());
    }
}
