//! This module controls configuration parsing from the end user, providing a
//! convenience mechanism for the rest of the program. Crashes are most likely
//! to originate from this code, intentionally.
use std::{
    collections::BTreeMap,
    fs, io,
    num::{NonZeroU64, NonZeroUsize},
    path::{Path, PathBuf},
};

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, warn};
use tsdg_payload::{
    Assembly, Column, LabelSet, Metric, TimeRange, column, series, slice,
};

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// Error reading the base metrics file
    #[error("Failed to load base metrics {path:?}: {source}")]
    Base {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
    /// A base label value is not a scalar
    #[error("Base label `{label}` of metric `{metric}` must be a string, number or boolean")]
    BaseLabel {
        /// Metric the label belongs to
        metric: String,
        /// Name of the label
        label: String,
    },
    /// See [`column::Error`]
    #[error(transparent)]
    Column(#[from] column::Error),
    /// See [`slice::Error`]
    #[error(transparent)]
    TimeRange(#[from] slice::Error),
    /// See [`series::Error`]
    #[error(transparent)]
    Series(#[from] series::Error),
}

fn default_precision() -> u32 {
    1_000
}

fn default_time_slice() -> u32 {
    120
}

fn default_batch_size() -> NonZeroU64 {
    NonZeroU64::new(10_000_000).unwrap_or(NonZeroU64::MIN)
}

fn default_parallelism() -> NonZeroUsize {
    NonZeroUsize::MIN
}

/// Main configuration struct for this program
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Start of the generated range, inclusive.
    #[serde(with = "timestamp")]
    pub start: OffsetDateTime,
    /// End of the generated range, exclusive.
    #[serde(with = "timestamp")]
    pub end: OffsetDateTime,
    /// Seconds between two samples of a series.
    pub interval: u32,
    /// Factor applied to unix seconds to obtain sample timestamps.
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Seconds of data produced for every series before moving on to the
    /// next series.
    #[serde(default = "default_time_slice")]
    pub time_slice: u32,
    /// Samples held in memory before a file is written.
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroU64,
    /// Number of concurrent shards.
    #[serde(default = "default_parallelism")]
    pub parallelism: NonZeroUsize,
    /// Seed for every shard's random source. Shard `i` is seeded with
    /// `seed + i`. When absent shards draw from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Path to a base metrics file. Relative paths are resolved against the
    /// directory holding the configuration file.
    #[serde(default)]
    pub base: Option<PathBuf>,
    /// Columns expanded into label sets.
    #[serde(default)]
    pub tags: Vec<column::Config>,
    /// Columns driving sample values, one per metric.
    #[serde(default)]
    pub fields: Vec<column::Config>,
}

impl Config {
    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid configuration.
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!("Attempting to open configuration file at: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        let mut config = Self::parse(&contents)?;
        if let Some(base) = config.base.take() {
            let base = match path.parent() {
                Some(dir) if base.is_relative() => dir.join(base),
                _ => base,
            };
            config.base = Some(base);
        }
        Ok(config)
    }

    /// Parse a configuration from YAML text. Relative `base` paths are left
    /// as they are.
    ///
    /// # Errors
    ///
    /// Fails if `contents` is not a valid configuration.
    pub fn parse(contents: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// The sampled time range.
    ///
    /// # Errors
    ///
    /// Fails if the range is empty or one of its steps is zero.
    pub fn time_range(&self) -> Result<TimeRange, Error> {
        if self.time_slice < self.interval {
            warn!(
                "time_slice {}s is shorter than interval {}s, some slices will carry no samples",
                self.time_slice, self.interval
            );
        }
        Ok(TimeRange::new(
            self.start.unix_timestamp(),
            self.end.unix_timestamp(),
            self.interval,
            self.time_slice,
            self.precision,
        )?)
    }

    /// The metrics listed in the base file, or none when no base file is
    /// configured.
    ///
    /// # Errors
    ///
    /// Fails if the base file cannot be read or parsed.
    pub fn metrics(&self) -> Result<Vec<Metric>, Error> {
        let Some(path) = &self.base else {
            return Ok(Vec::new());
        };
        load_base(path).map_err(|source| Error::Base {
            path: path.clone(),
            source: Box::new(source),
        })
    }

    /// Build the series of this configuration.
    ///
    /// # Errors
    ///
    /// Fails if a column is invalid, the base file cannot be loaded or the
    /// columns do not describe a valid set of series.
    pub fn assembly(&self) -> Result<Assembly, Error> {
        let tags = Column::from_configs(&self.tags)?;
        let fields = Column::from_configs(&self.fields)?;
        let metrics = self.metrics()?;
        Ok(Assembly::new(&tags, &fields, &metrics)?)
    }

    /// Check everything a run would check before it starts generating.
    ///
    /// # Errors
    ///
    /// See [`Config::time_range`] and [`Config::assembly`].
    pub fn validate(&self) -> Result<(), Error> {
        self.time_range()?;
        self.assembly()?;
        Ok(())
    }
}

/// On-disk shape of a base metrics file: metric name to a list of label maps.
type BaseFile = BTreeMap<String, Vec<BTreeMap<String, serde_yaml::Value>>>;

fn load_base(path: &Path) -> Result<Vec<Metric>, Error> {
    let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    let base: BaseFile = serde_yaml::from_str(&contents)?;
    debug!("Loaded {} base metrics from {}", base.len(), path.display());

    base.into_iter()
        .map(|(name, sets)| {
            let base = sets
                .into_iter()
                .map(|set| {
                    set.into_iter()
                        .map(|(label, value)| match scalar(&value) {
                            Some(value) => Ok((label, value)),
                            None => Err(Error::BaseLabel {
                                metric: name.clone(),
                                label,
                            }),
                        })
                        .collect::<Result<LabelSet, Error>>()
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Metric { name, base })
        })
        .collect()
}

fn scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Timestamps as RFC 3339 or as `YYYY-MM-DDTHH:MM:SS`, the latter taken as
/// UTC.
mod timestamp {
    use serde::{Deserialize, Deserializer, de::Error as _};
    use time::{
        OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
        macros::format_description,
    };

    pub(super) fn parse(input: &str) -> Result<OffsetDateTime, time::error::Parse> {
        let input = input.trim();
        OffsetDateTime::parse(input, &Rfc3339).or_else(|_| {
            PrimitiveDateTime::parse(
                input,
                format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
            )
            .map(PrimitiveDateTime::assume_utc)
        })
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|err| D::Error::custom(format!("invalid timestamp `{raw}`: {err}")))
    }
}
