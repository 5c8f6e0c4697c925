//! Series assembly.
//!
//! A series is one label set, one metric name and one live generator. The
//! [`Assembly`] describes every series of a run without holding them: the
//! series at a given index is derived from the label set enumeration and the
//! metric list on demand, so that workers can each build only the series they
//! own.

use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{info, warn};

use crate::{
    column::Column,
    distribution::{self, Advance, Distribution, Generator},
    labels::{self, Enumerator, LabelSet, METRIC_NAME_LABEL},
    proto::prometheus::{Label, Sample},
    slice::{Slice, TimeRange},
};

/// Errors produced while assembling series.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// See [`labels::Error`]
    #[error(transparent)]
    Labels(#[from] labels::Error),
    /// See [`distribution::Error`]
    #[error(transparent)]
    Distribution(#[from] distribution::Error),
    /// A field column cannot produce sample values.
    #[error("field column `{column}` uses `{kind}` which does not produce numbers")]
    NonNumericField {
        /// Name of the offending column.
        column: String,
        /// Type tag of its distribution.
        kind: &'static str,
    },
    /// Two field columns share a name.
    #[error("field column `{0}` is declared more than once")]
    DuplicateField(String),
    /// A tag column uses the name reserved for the metric name.
    #[error("tag column `{0}` uses a reserved label name")]
    ReservedTag(String),
    /// A base label would overwrite a tag or the metric name.
    #[error("base label `{label}` of metric `{metric}` clashes with a tag or the metric name")]
    BaseLabelClash {
        /// Metric the label belongs to.
        metric: String,
        /// Name of the label.
        label: String,
    },
    /// A metric lists the same base label set twice.
    #[error("metric `{0}` lists the same base label set more than once")]
    DuplicateBase(String),
    /// There is nothing to generate.
    #[error("no metrics defined: configure field columns or a base metrics file")]
    NoMetrics,
    /// The number of series does not fit in 64 bits.
    #[error("the number of series overflows")]
    Overflow,
}

/// A metric and the base label sets it is emitted with.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    /// Value of the `__name__` label.
    pub name: String,
    /// One series is produced per base label set and tag combination.
    pub base: Vec<LabelSet>,
}

impl Metric {
    /// A metric with a single, empty, base label set.
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: vec![LabelSet::new()],
        }
    }
}

/// One time series and the generator feeding it.
#[derive(Debug, Clone)]
pub struct Series {
    labels: Vec<Label>,
    generator: Generator,
}

impl Series {
    /// Create a series from its labels and a fresh generator.
    #[must_use]
    pub fn new(labels: &LabelSet, generator: Generator) -> Self {
        Self {
            labels: labels.to_proto(),
            generator,
        }
    }

    /// Labels of this series in wire order.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Produce this series' samples for `slice`, advancing the generator
    /// once per tick.
    pub fn sample<R>(&mut self, range: &TimeRange, slice: Slice, rng: &mut R) -> Vec<Sample>
    where
        R: Rng + ?Sized,
    {
        range
            .ticks(slice)
            .map(|tick| Sample {
                // Assembly only admits numeric distributions.
                value: self.generator.advance(&mut *rng).as_f64().unwrap_or(f64::NAN),
                timestamp: range.timestamp(tick),
            })
            .collect()
    }
}

/// The full, indexable list of series of a run.
///
/// Series are ordered by tag combination first, then metric, then base label
/// set.
#[derive(Debug, Clone)]
pub struct Assembly {
    enumerator: Enumerator,
    templates: Vec<(String, LabelSet)>,
    fields: FxHashMap<String, Distribution>,
    fallback: Distribution,
    len: u64,
}

impl Assembly {
    /// Assemble the series described by `tags`, `fields` and `metrics`.
    ///
    /// When `metrics` is empty every field column becomes one metric with no
    /// base labels.
    ///
    /// # Errors
    ///
    /// Fails when tag enumeration fails, a field is not numeric or declared
    /// twice, no metric is defined, two series would share their labels or
    /// the series count overflows.
    pub fn new(tags: &[Column], fields: &[Column], metrics: &[Metric]) -> Result<Self, Error> {
        let enumerator = Enumerator::new(tags)?;
        if let Some(tag) = enumerator.names().find(|name| *name == METRIC_NAME_LABEL) {
            return Err(Error::ReservedTag(tag.to_string()));
        }

        let mut by_name = FxHashMap::default();
        for field in fields {
            if !field.dist().is_numeric() {
                return Err(Error::NonNumericField {
                    column: field.name().to_string(),
                    kind: field.dist().kind(),
                });
            }
            if by_name
                .insert(field.name().to_string(), field.dist().clone())
                .is_some()
            {
                return Err(Error::DuplicateField(field.name().to_string()));
            }
        }

        let templates: Vec<(String, LabelSet)> = if metrics.is_empty() {
            fields
                .iter()
                .map(|f| (f.name().to_string(), LabelSet::new()))
                .collect()
        } else {
            for field in fields {
                if !metrics.iter().any(|m| m.name == field.name()) {
                    warn!(
                        "field column `{}` matches no base metric and will not be generated",
                        field.name()
                    );
                }
            }
            metrics
                .iter()
                .flat_map(|m| m.base.iter().map(|b| (m.name.clone(), b.clone())))
                .collect()
        };
        if templates.is_empty() {
            return Err(Error::NoMetrics);
        }
        check_templates(&enumerator, &templates)?;

        let len = enumerator
            .cardinality()
            .checked_mul(templates.len() as u64)
            .ok_or(Error::Overflow)?;
        info!(
            "assembled {len} series from {} tag combinations and {} metric templates",
            enumerator.cardinality(),
            templates.len()
        );

        Ok(Self {
            enumerator,
            templates,
            fields: by_name,
            fallback: Distribution::new(&DEFAULT_FIELD)?,
            len,
        })
    }

    /// Number of series.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether there are no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The series at `index`, with a fresh generator.
    #[must_use]
    pub fn get(&self, index: u64) -> Option<Series> {
        if index >= self.len {
            return None;
        }
        let per_label_set = self.templates.len() as u64;
        let mut labels = self.enumerator.get(index / per_label_set)?;
        let template = usize::try_from(index % per_label_set).ok()?;
        let (metric, base) = self.templates.get(template)?;

        labels.insert(METRIC_NAME_LABEL, metric.as_str());
        for (name, value) in base.iter() {
            labels.insert(name, value);
        }
        let generator = self.fields.get(metric).unwrap_or(&self.fallback).generator();
        Some(Series::new(&labels, generator))
    }

    /// The series at every index of `range`, in order.
    pub fn series(&self, range: std::ops::Range<u64>) -> impl Iterator<Item = Series> + '_ {
        range.map_while(|index| self.get(index))
    }
}

/// Every series must have a distinct identity: base labels may not shadow a
/// tag or the metric name, and no metric may repeat a base label set.
fn check_templates(
    enumerator: &Enumerator,
    templates: &[(String, LabelSet)],
) -> Result<(), Error> {
    let tags: FxHashSet<&str> = enumerator.names().collect();
    let mut seen = FxHashSet::default();
    for (metric, base) in templates {
        if let Some((label, _)) = base
            .iter()
            .find(|(label, _)| *label == METRIC_NAME_LABEL || tags.contains(label))
        {
            return Err(Error::BaseLabelClash {
                metric: metric.clone(),
                label: label.to_string(),
            });
        }
        let mut identity: Vec<(&str, &str)> = base.iter().collect();
        identity.sort_unstable();
        if !seen.insert((metric.as_str(), identity)) {
            return Err(Error::DuplicateBase(metric.clone()));
        }
    }
    Ok(())
}

/// Used for metrics that have no field column of their own.
const DEFAULT_FIELD: distribution::Config = distribution::Config::Uniform {
    lower_bound: 0.0,
    upper_bound: 100.0,
};
