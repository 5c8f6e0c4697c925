//! Column definitions.
//!
//! A column names one dimension of generated data. Columns play one of two
//! roles: _tag_ columns are enumerated into label sets and so must use an
//! enumerable distribution, _field_ columns drive the values of samples and
//! so must produce numbers.

use serde::{Deserialize, Serialize};

use crate::distribution::{self, Distribution};

/// Errors produced when building a [`Column`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The column's distribution could not be built.
    #[error("column `{column}`: {source}")]
    Distribution {
        /// Name of the offending column.
        column: String,
        /// Underlying distribution error.
        #[source]
        source: distribution::Error,
    },
    /// Nullability must be a ratio.
    #[error("column `{column}`: nullability must be within [0, 1], found {nullability}")]
    Nullability {
        /// Name of the offending column.
        column: String,
        /// The configured nullability.
        nullability: f32,
    },
    /// Columns must be named.
    #[error("column names must not be empty")]
    EmptyName,
}

/// Declared data type of a column.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// Integer values
    Integer,
    /// String values
    String,
    /// Floating point values
    Float,
}

/// Configuration for a [`Column`]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Name of the column. Tag names become label names, field names become
    /// metric names.
    pub name: String,
    /// Declared data type.
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Ratio of null values in `[0, 1]`. Carried, not consumed by generation.
    #[serde(default)]
    pub nullability: f32,
    /// The value distribution.
    pub dist: distribution::Config,
}

/// A validated column.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    data_type: DataType,
    nullability: f32,
    dist: Distribution,
}

impl Column {
    /// Build a column from its configuration.
    ///
    /// # Errors
    ///
    /// Fails if the name is empty, nullability is outside `[0, 1]` or the
    /// distribution is invalid.
    pub fn new(config: &Config) -> Result<Self, Error> {
        if config.name.is_empty() {
            return Err(Error::EmptyName);
        }
        if !(0.0..=1.0).contains(&config.nullability) {
            return Err(Error::Nullability {
                column: config.name.clone(),
                nullability: config.nullability,
            });
        }
        let dist = Distribution::new(&config.dist).map_err(|source| Error::Distribution {
            column: config.name.clone(),
            source,
        })?;
        Ok(Self {
            name: config.name.clone(),
            data_type: config.data_type,
            nullability: config.nullability,
            dist,
        })
    }

    /// Build every column in `configs`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// See [`Column::new`].
    pub fn from_configs(configs: &[Config]) -> Result<Vec<Self>, Error> {
        configs.iter().map(Self::new).collect()
    }

    /// Name of the column.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Configured nullability ratio.
    #[must_use]
    pub fn nullability(&self) -> f32 {
        self.nullability
    }

    /// The column's distribution.
    #[must_use]
    pub fn dist(&self) -> &Distribution {
        &self.dist
    }
}
