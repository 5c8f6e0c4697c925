//! Weighted choice over a fixed list of values.

use rand::distr::{Distribution as _, weighted::WeightedIndex};
use serde::{Deserialize, Serialize};

use super::{Advance, Error, Value};

/// A candidate value and its relative weight.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Weight {
    /// The value emitted when this candidate is drawn.
    pub value: Value,
    /// Relative probability of this candidate. Need not sum to one.
    pub weight: f64,
}

/// Draws one of a fixed list of values. Enumerable; enumeration ignores
/// weights.
#[derive(Debug, Clone)]
pub struct WeightedPreset {
    values: Vec<Value>,
    index: WeightedIndex<f64>,
}

impl WeightedPreset {
    pub(crate) fn new(kind: &'static str, preset: &[Weight]) -> Result<Self, Error> {
        if preset.is_empty() {
            return Err(Error::InvalidParameter {
                kind,
                reason: "preset must list at least one value".to_string(),
            });
        }
        let index = WeightedIndex::new(preset.iter().map(|p| p.weight)).map_err(|err| {
            Error::InvalidParameter {
                kind,
                reason: format!("preset weights are unusable: {err}"),
            }
        })?;
        let values = preset.iter().map(|p| p.value.clone()).collect();
        Ok(Self { values, index })
    }

    pub(crate) fn values(&self) -> &[Value] {
        &self.values
    }
}

impl Advance for WeightedPreset {
    fn advance<R>(&mut self, rng: &mut R) -> Value
    where
        R: rand::Rng + ?Sized,
    {
        self.values[self.index.sample(rng)].clone()
    }
}
