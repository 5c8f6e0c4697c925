//! Stateful value distributions.
//!
//! A [`Distribution`] is built once from its [`Config`] and holds immutable
//! parameters. Every series that needs values from it asks for a fresh
//! [`Generator`] through [`Distribution::generator`]; the generator owns all
//! mutable state -- the running sum of a random walk, the last output of a
//! periodic recurrence -- and moves forward one step per call to
//! [`Advance::advance`]. Randomness is supplied by the caller so that a shard
//! controls, and optionally seeds, the source of entropy for every series it
//! owns.
//!
//! Only a handful of distributions are _enumerable_, that is, can list every
//! value they might produce. Tag columns are expanded by enumeration and so
//! must use one of these: `random_int`, `constant_string`, `constant_int`,
//! `constant_float` and `weighted_preset`.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod constant;
pub mod preset;
pub mod random;
pub mod walk;

pub use preset::Weight;

/// Errors produced when building or enumerating a [`Distribution`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A parameter was absent and no default exists for it.
    #[error("distribution `{kind}` requires parameter `{parameter}`")]
    MissingParameter {
        /// Type tag of the distribution.
        kind: &'static str,
        /// Name of the absent parameter.
        parameter: &'static str,
    },
    /// A parameter was present but unusable.
    #[error("distribution `{kind}` has an invalid parameter: {reason}")]
    InvalidParameter {
        /// Type tag of the distribution.
        kind: &'static str,
        /// What was wrong with the parameter.
        reason: String,
    },
    /// Enumeration was requested from a streaming-only distribution.
    #[error("distribution `{kind}` is not enumerable")]
    NotEnumerable {
        /// Type tag of the distribution.
        kind: &'static str,
    },
}

/// A single generated value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A signed integer
    Int(i64),
    /// A floating point number
    Float(f64),
    /// A string
    Str(String),
}

impl Value {
    /// Interpret this value as a sample value.
    ///
    /// Strings convert only when they parse as a floating point number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

/// Configuration of a [`Distribution`], keyed by its `type` tag.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Config {
    /// Emits 0, then adds `step` after every value.
    MonoInc {
        /// Increment applied after each value.
        step: f64,
    },
    /// Emits 0, then subtracts `step` after every value.
    MonoDec {
        /// Decrement applied after each value.
        step: f64,
    },
    /// Independent uniform floats in `[lower_bound, upper_bound]`.
    Random {
        /// Inclusive lower bound.
        lower_bound: f64,
        /// Inclusive upper bound.
        upper_bound: f64,
    },
    /// Independent uniform floats in `[lower_bound, upper_bound]`.
    Uniform {
        /// Inclusive lower bound.
        lower_bound: f64,
        /// Inclusive upper bound.
        upper_bound: f64,
    },
    /// Independent uniform integers in `[lower_bound, upper_bound]`.
    RandomInt {
        /// Inclusive lower bound.
        lower_bound: i64,
        /// Inclusive upper bound.
        upper_bound: i64,
    },
    /// Fresh alphanumeric strings of a fixed length.
    RandomString {
        /// Length of every string, in characters.
        length: usize,
    },
    /// Independent Gaussian draws.
    Normal {
        /// Mean of the distribution.
        mean: f64,
        /// Standard deviation of the distribution.
        stddev: f64,
    },
    /// A cumulative random walk. Each step is drawn uniformly from
    /// `[lower_bound, upper_bound]`; `max_fluctuation: m` is shorthand for the
    /// symmetric step `[-m, m]`.
    Noise {
        /// Symmetric bound on the size of a single step.
        max_fluctuation: Option<f64>,
        /// Inclusive lower bound of a single step.
        lower_bound: Option<f64>,
        /// Inclusive upper bound of a single step.
        upper_bound: Option<f64>,
    },
    /// The recurrence `s = amplitude * sin(s / period) + bias`, starting from
    /// zero and fed with its own previous output.
    Periodic {
        /// Divisor applied to the previous output before `sin`.
        period: f64,
        /// Multiplier applied to the `sin` term.
        amplitude: f64,
        /// Offset added to every value.
        bias: f64,
    },
    /// Always the same string.
    ConstantString {
        /// The string.
        value: String,
    },
    /// Always the same integer.
    ConstantInt {
        /// The integer.
        value: i64,
    },
    /// Always the same float.
    ConstantFloat {
        /// The float.
        value: f64,
    },
    /// One of `preset`, drawn with probability proportional to its weight.
    WeightedPreset {
        /// The candidate values and their weights.
        preset: Vec<Weight>,
    },
}

impl Config {
    /// The `type` tag of this configuration.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Config::MonoInc { .. } => "mono_inc",
            Config::MonoDec { .. } => "mono_dec",
            Config::Random { .. } => "random",
            Config::Uniform { .. } => "uniform",
            Config::RandomInt { .. } => "random_int",
            Config::RandomString { .. } => "random_string",
            Config::Normal { .. } => "normal",
            Config::Noise { .. } => "noise",
            Config::Periodic { .. } => "periodic",
            Config::ConstantString { .. } => "constant_string",
            Config::ConstantInt { .. } => "constant_int",
            Config::ConstantFloat { .. } => "constant_float",
            Config::WeightedPreset { .. } => "weighted_preset",
        }
    }
}

/// Advance a generator by exactly one step.
pub trait Advance {
    /// Return the next value, updating internal state.
    fn advance<R>(&mut self, rng: &mut R) -> Value
    where
        R: rand::Rng + ?Sized;
}

/// A live, stateful value generator produced by [`Distribution::generator`].
#[derive(Debug, Clone)]
pub enum Generator {
    /// See [`walk::Monotonic`]
    Monotonic(walk::Monotonic),
    /// See [`walk::Noise`]
    Noise(walk::Noise),
    /// See [`walk::Periodic`]
    Periodic(walk::Periodic),
    /// See [`random::UniformFloat`]
    UniformFloat(random::UniformFloat),
    /// See [`random::UniformInt`]
    UniformInt(random::UniformInt),
    /// See [`random::Gaussian`]
    Gaussian(random::Gaussian),
    /// See [`random::Alphanumeric`]
    Alphanumeric(random::Alphanumeric),
    /// See [`constant::Constant`]
    Constant(constant::Constant),
    /// See [`preset::WeightedPreset`]
    WeightedPreset(preset::WeightedPreset),
}

impl Advance for Generator {
    fn advance<R>(&mut self, rng: &mut R) -> Value
    where
        R: rand::Rng + ?Sized,
    {
        match self {
            Generator::Monotonic(g) => g.advance(rng),
            Generator::Noise(g) => g.advance(rng),
            Generator::Periodic(g) => g.advance(rng),
            Generator::UniformFloat(g) => g.advance(rng),
            Generator::UniformInt(g) => g.advance(rng),
            Generator::Gaussian(g) => g.advance(rng),
            Generator::Alphanumeric(g) => g.advance(rng),
            Generator::Constant(g) => g.advance(rng),
            Generator::WeightedPreset(g) => g.advance(rng),
        }
    }
}

/// A validated distribution, able to mint fresh generators.
#[derive(Debug, Clone)]
pub struct Distribution {
    kind: &'static str,
    prototype: Generator,
}

impl Distribution {
    /// Build a distribution from its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a required parameter is missing or a parameter is
    /// out of its domain: inverted or non-finite bounds, a negative standard
    /// deviation, a zero period, a zero string length or a preset list with
    /// no positive weight.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let kind = config.kind();
        let prototype = match config {
            Config::MonoInc { step } => {
                Generator::Monotonic(walk::Monotonic::new(finite(kind, "step", *step)?))
            }
            Config::MonoDec { step } => {
                Generator::Monotonic(walk::Monotonic::new(-finite(kind, "step", *step)?))
            }
            Config::Random {
                lower_bound,
                upper_bound,
            }
            | Config::Uniform {
                lower_bound,
                upper_bound,
            } => Generator::UniformFloat(random::UniformFloat::new(
                kind,
                *lower_bound,
                *upper_bound,
            )?),
            Config::RandomInt {
                lower_bound,
                upper_bound,
            } => Generator::UniformInt(random::UniformInt::new(kind, *lower_bound, *upper_bound)?),
            Config::RandomString { length } => {
                Generator::Alphanumeric(random::Alphanumeric::new(kind, *length)?)
            }
            Config::Normal { mean, stddev } => {
                Generator::Gaussian(random::Gaussian::new(kind, *mean, *stddev)?)
            }
            Config::Noise {
                max_fluctuation,
                lower_bound,
                upper_bound,
            } => {
                let (lower, upper) = match (max_fluctuation, lower_bound, upper_bound) {
                    (Some(m), None, None) => {
                        let m = finite(kind, "max_fluctuation", *m)?;
                        (-m.abs(), m.abs())
                    }
                    (None, Some(lower), Some(upper)) => (*lower, *upper),
                    (None, Some(_), None) => {
                        return Err(Error::MissingParameter {
                            kind,
                            parameter: "upper_bound",
                        });
                    }
                    (None, None, Some(_)) => {
                        return Err(Error::MissingParameter {
                            kind,
                            parameter: "lower_bound",
                        });
                    }
                    (None, None, None) => {
                        return Err(Error::MissingParameter {
                            kind,
                            parameter: "max_fluctuation",
                        });
                    }
                    (Some(_), _, _) => {
                        return Err(Error::InvalidParameter {
                            kind,
                            reason: "give either max_fluctuation or lower_bound and upper_bound, not both"
                                .to_string(),
                        });
                    }
                };
                Generator::Noise(walk::Noise::new(kind, lower, upper)?)
            }
            Config::Periodic {
                period,
                amplitude,
                bias,
            } => Generator::Periodic(walk::Periodic::new(kind, *period, *amplitude, *bias)?),
            Config::ConstantString { value } => {
                Generator::Constant(constant::Constant::new(Value::Str(value.clone())))
            }
            Config::ConstantInt { value } => {
                Generator::Constant(constant::Constant::new(Value::Int(*value)))
            }
            Config::ConstantFloat { value } => Generator::Constant(constant::Constant::new(
                Value::Float(finite(kind, "value", *value)?),
            )),
            Config::WeightedPreset { preset } => {
                Generator::WeightedPreset(preset::WeightedPreset::new(kind, preset)?)
            }
        };

        Ok(Self { kind, prototype })
    }

    /// The `type` tag this distribution was configured with.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Mint a fresh generator in its initial state.
    #[must_use]
    pub fn generator(&self) -> Generator {
        self.prototype.clone()
    }

    /// Whether [`Distribution::all`] will succeed.
    #[must_use]
    pub fn is_enumerable(&self) -> bool {
        matches!(
            self.prototype,
            Generator::UniformInt(_) | Generator::Constant(_) | Generator::WeightedPreset(_)
        )
    }

    /// Whether every value produced converts with [`Value::as_f64`].
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        match &self.prototype {
            Generator::Alphanumeric(_) => false,
            Generator::Constant(c) => c.value().as_f64().is_some(),
            Generator::WeightedPreset(p) => p.values().iter().all(|v| v.as_f64().is_some()),
            _ => true,
        }
    }

    /// List every value this distribution can produce.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotEnumerable`] for streaming-only distributions.
    pub fn all(&self) -> Result<Vec<Value>, Error> {
        match &self.prototype {
            Generator::UniformInt(g) => Ok(g.all()),
            Generator::Constant(g) => Ok(vec![g.value().clone()]),
            Generator::WeightedPreset(g) => Ok(g.values().to_vec()),
            _ => Err(Error::NotEnumerable { kind: self.kind }),
        }
    }

    /// Number of values [`Distribution::all`] would return, without
    /// materializing them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotEnumerable`] for streaming-only distributions.
    pub fn cardinality(&self) -> Result<u64, Error> {
        match &self.prototype {
            Generator::UniformInt(g) => Ok(g.len()),
            Generator::Constant(_) => Ok(1),
            Generator::WeightedPreset(g) => Ok(g.values().len() as u64),
            _ => Err(Error::NotEnumerable { kind: self.kind }),
        }
    }
}

impl TryFrom<&Config> for Distribution {
    type Error = Error;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

fn finite(kind: &'static str, parameter: &'static str, value: f64) -> Result<f64, Error> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidParameter {
            kind,
            reason: format!("{parameter} must be finite, found {value}"),
        })
    }
}
