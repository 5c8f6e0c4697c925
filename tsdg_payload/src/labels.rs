//! Label sets and their enumeration from tag columns.
//!
//! Every tag column contributes the full list of values its distribution can
//! produce. The label sets of a run are the Cartesian product of those lists,
//! keyed in column declaration order. The product is usually the dominant
//! driver of run size so [`Enumerator`] reports its cardinality up front and
//! hands out combinations lazily.

use rustc_hash::FxHashSet;
use tracing::info;

use crate::{
    column::Column,
    distribution,
    proto::prometheus::Label,
};

/// The reserved label carrying a series' metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Errors produced by [`Enumerator`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A tag column's distribution cannot list its values.
    #[error("tag column `{column}` cannot be enumerated: {source}")]
    NotEnumerable {
        /// Name of the offending column.
        column: String,
        /// Underlying distribution error.
        #[source]
        source: distribution::Error,
    },
    /// Two tag columns share a name.
    #[error("tag column `{0}` is declared more than once")]
    DuplicateTag(String),
    /// A tag column lists the same value twice once rendered as a label.
    #[error("tag column `{column}` produces the value `{value}` more than once")]
    DuplicateTagValue {
        /// Name of the offending column.
        column: String,
        /// The repeated label value.
        value: String,
    },
    /// A tag column has more values than can be held in memory.
    #[error("tag column `{column}` has {size} values, at most {max} are allowed", max = MAX_TAG_VALUES)]
    TooManyValues {
        /// Name of the offending column.
        column: String,
        /// Number of values the column would enumerate.
        size: u64,
    },
    /// The product of tag cardinalities does not fit in 64 bits.
    #[error("the number of tag combinations overflows")]
    Overflow,
}

/// Upper bound on the values a single tag column may enumerate.
pub const MAX_TAG_VALUES: u64 = 1 << 20;

/// An ordered mapping from label name to label value.
///
/// Insertion order is preserved. Inserting an existing name replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelSet {
    pairs: Vec<(String, String)>,
}

impl LabelSet {
    /// Create an empty label set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether there are no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Value of the label `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set `name` to `value`, replacing any existing value.
    pub fn insert<N, V>(&mut self, name: N, value: V)
    where
        N: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.pairs.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.pairs.push((name, value));
        }
    }

    /// Iterate labels in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Convert to remote-write labels, preserving order.
    #[must_use]
    pub fn to_proto(&self) -> Vec<Label> {
        self.pairs
            .iter()
            .map(|(name, value)| Label {
                name: name.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

impl<N, V> FromIterator<(N, V)> for LabelSet
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

/// Expands tag columns into every combination of their values.
#[derive(Debug, Clone)]
pub struct Enumerator {
    names: Vec<String>,
    values: Vec<Vec<String>>,
    cardinality: u64,
}

impl Enumerator {
    /// Enumerate the value lists of `tags`.
    ///
    /// The cardinality of the product is computed, and logged, before any
    /// value list is materialized.
    ///
    /// # Errors
    ///
    /// Fails if a tag column is not enumerable or too wide, two tags share a
    /// name, a column repeats a value or the product overflows.
    pub fn new(tags: &[Column]) -> Result<Self, Error> {
        let mut seen = FxHashSet::default();
        let mut cardinality: u64 = 1;
        for tag in tags {
            if !seen.insert(tag.name()) {
                return Err(Error::DuplicateTag(tag.name().to_string()));
            }
            let size = tag
                .dist()
                .cardinality()
                .map_err(|source| Error::NotEnumerable {
                    column: tag.name().to_string(),
                    source,
                })?;
            if size > MAX_TAG_VALUES {
                return Err(Error::TooManyValues {
                    column: tag.name().to_string(),
                    size,
                });
            }
            cardinality = cardinality.checked_mul(size).ok_or(Error::Overflow)?;
        }
        info!("number of tag combinations: {cardinality}");

        let mut names = Vec::with_capacity(tags.len());
        let mut values = Vec::with_capacity(tags.len());
        for tag in tags {
            let all = tag
                .dist()
                .all()
                .map_err(|source| Error::NotEnumerable {
                    column: tag.name().to_string(),
                    source,
                })?;
            let rendered: Vec<String> = all.iter().map(ToString::to_string).collect();
            let mut unique = FxHashSet::default();
            for value in &rendered {
                if !unique.insert(value.as_str()) {
                    return Err(Error::DuplicateTagValue {
                        column: tag.name().to_string(),
                        value: value.clone(),
                    });
                }
            }
            names.push(tag.name().to_string());
            values.push(rendered);
        }

        Ok(Self {
            names,
            values,
            cardinality,
        })
    }

    /// Tag names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of label sets [`Enumerator::iter`] will yield.
    #[must_use]
    pub fn cardinality(&self) -> u64 {
        self.cardinality
    }

    /// The combination at position `index` of [`Enumerator::iter`], without
    /// walking the ones before it.
    #[must_use]
    pub fn get(&self, index: u64) -> Option<LabelSet> {
        if index >= self.cardinality {
            return None;
        }
        let mut rest = index;
        let mut picks = vec![0; self.values.len()];
        for (pick, values) in picks.iter_mut().zip(&self.values).rev() {
            let len = values.len() as u64;
            *pick = usize::try_from(rest % len).ok()?;
            rest /= len;
        }
        Some(
            self.names
                .iter()
                .zip(&self.values)
                .zip(picks)
                .map(|((name, values), pick)| (name.clone(), values[pick].clone()))
                .collect(),
        )
    }

    /// Iterate every combination. The last tag varies fastest.
    #[must_use]
    pub fn iter(&self) -> LabelSets<'_> {
        LabelSets {
            enumerator: self,
            odometer: vec![0; self.names.len()],
            remaining: self.cardinality,
        }
    }
}

impl<'a> IntoIterator for &'a Enumerator {
    type Item = LabelSet;
    type IntoIter = LabelSets<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over the product of an [`Enumerator`].
#[derive(Debug)]
pub struct LabelSets<'a> {
    enumerator: &'a Enumerator,
    odometer: Vec<usize>,
    remaining: u64,
}

impl Iterator for LabelSets<'_> {
    type Item = LabelSet;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let set = self
            .enumerator
            .names
            .iter()
            .zip(&self.enumerator.values)
            .zip(&self.odometer)
            .map(|((name, values), idx)| (name.clone(), values[*idx].clone()))
            .collect();

        // Roll the odometer, rightmost digit first.
        for (digit, values) in self
            .odometer
            .iter_mut()
            .zip(&self.enumerator.values)
            .rev()
        {
            *digit += 1;
            if *digit < values.len() {
                break;
            }
            *digit = 0;
        }

        Some(set)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LabelSets<'_> {}
