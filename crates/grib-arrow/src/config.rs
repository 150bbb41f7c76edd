//! Reader configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Nearest-neighbour search algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Brute force for a handful of query points, bucket index otherwise.
    #[default]
    Auto,
    /// Scan every grid point for every query point.
    BruteForce,
    /// Bucket the grid once, then search outward from the query's bucket.
    BucketIndex,
}

impl MatchStrategy {
    /// Query-point count up to which `Auto` scans by brute force.
    pub const AUTO_BRUTE_FORCE_LIMIT: usize = 8;

    /// Concrete strategy for `query_count` points.
    pub fn resolve(self, query_count: usize) -> Self {
        match self {
            Self::Auto if query_count <= Self::AUTO_BRUTE_FORCE_LIMIT => Self::BruteForce,
            Self::Auto => Self::BucketIndex,
            other => other,
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(Self::Auto),
            "brute_force" | "brute" => Ok(Self::BruteForce),
            "bucket_index" | "bucket" | "index" => Ok(Self::BucketIndex),
            other => Err(format!("unknown match strategy '{}'", other)),
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::BruteForce => "brute_force",
            Self::BucketIndex => "bucket_index",
        })
    }
}

/// How delimited auxiliary files are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field delimiter; must be a single ASCII character.
    pub delimiter: char,

    /// Whether the first row holds column names. Without a header, columns
    /// are named `column_1`, `column_2`, ...
    pub has_header: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
        }
    }
}

impl CsvOptions {
    /// The delimiter as the byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Option<u8> {
        u8::try_from(self.delimiter).ok().filter(u8::is_ascii)
    }
}

/// Options fixed at reader construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Rewind to the first message every time iteration starts.
    pub repeatable: bool,

    pub match_strategy: MatchStrategy,

    pub csv: CsvOptions,
}

impl ReaderOptions {
    /// Load options from environment variables, falling back to defaults.
    ///
    /// - `GRIB_ARROW_REPEATABLE`: `true`/`1` to enable repeatable iteration
    /// - `GRIB_ARROW_MATCH_STRATEGY`: `auto`, `brute_force` or `bucket_index`
    /// - `GRIB_ARROW_CSV_DELIMITER`: single character, e.g. `;`
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(val) = std::env::var("GRIB_ARROW_REPEATABLE") {
            options.repeatable = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("GRIB_ARROW_MATCH_STRATEGY") {
            match val.parse() {
                Ok(strategy) => options.match_strategy = strategy,
                Err(e) => warn!(error = %e, "Ignoring GRIB_ARROW_MATCH_STRATEGY"),
            }
        }

        if let Ok(val) = std::env::var("GRIB_ARROW_CSV_DELIMITER") {
            let mut chars = val.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => options.csv.delimiter = c,
                _ => warn!(value = %val, "GRIB_ARROW_CSV_DELIMITER must be one character"),
            }
        }

        options
    }

    pub fn repeatable(mut self, repeatable: bool) -> Self {
        self.repeatable = repeatable;
        self
    }

    pub fn with_match_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.match_strategy = strategy;
        self
    }

    pub fn with_csv_delimiter(mut self, delimiter: char) -> Self {
        self.csv.delimiter = delimiter;
        self
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), String> {
        if self.csv.delimiter_byte().is_none() {
            return Err(format!(
                "CSV delimiter {:?} is not a single ASCII character",
                self.csv.delimiter
            ));
        }
        Ok(())
    }
}
