//! Distributions that draw every value independently.

use rand::distr::{self, Distribution as _, SampleString, Uniform};

use super::{Advance, Error, Value};

/// Uniform floats in an inclusive range.
#[derive(Debug, Clone)]
pub struct UniformFloat {
    range: Uniform<f64>,
}

impl UniformFloat {
    pub(crate) fn new(kind: &'static str, lower: f64, upper: f64) -> Result<Self, Error> {
        let range = Uniform::new_inclusive(lower, upper).map_err(|err| Error::InvalidParameter {
            kind,
            reason: format!("bounds [{lower}, {upper}] are unusable: {err}"),
        })?;
        Ok(Self { range })
    }
}

impl Advance for UniformFloat {
    fn advance<R>(&mut self, rng: &mut R) -> Value
    where
        R: rand::Rng + ?Sized,
    {
        Value::Float(self.range.sample(rng))
    }
}

/// Uniform integers in an inclusive range. Enumerable.
#[derive(Debug, Clone)]
pub struct UniformInt {
    lower: i64,
    upper: i64,
    range: Uniform<i64>,
}

impl UniformInt {
    pub(crate) fn new(kind: &'static str, lower: i64, upper: i64) -> Result<Self, Error> {
        let range = Uniform::new_inclusive(lower, upper).map_err(|err| Error::InvalidParameter {
            kind,
            reason: format!("bounds [{lower}, {upper}] are unusable: {err}"),
        })?;
        Ok(Self {
            lower,
            upper,
            range,
        })
    }

    /// Number of integers in the range, saturating at `u64::MAX`.
    pub(crate) fn len(&self) -> u64 {
        self.upper.abs_diff(self.lower).saturating_add(1)
    }

    pub(crate) fn all(&self) -> Vec<Value> {
        (self.lower..=self.upper).map(Value::Int).collect()
    }
}

impl Advance for UniformInt {
    fn advance<R>(&mut self, rng: &mut R) -> Value
    where
        R: rand::Rng + ?Sized,
    {
        Value::Int(self.range.sample(rng))
    }
}

/// Gaussian draws.
#[derive(Debug, Clone)]
pub struct Gaussian {
    normal: rand_distr::Normal<f64>,
}

impl Gaussian {
    pub(crate) fn new(kind: &'static str, mean: f64, stddev: f64) -> Result<Self, Error> {
        if !mean.is_finite() || !stddev.is_finite() {
            return Err(Error::InvalidParameter {
                kind,
                reason: format!("mean and stddev must be finite, found {mean} and {stddev}"),
            });
        }
        if stddev < 0.0 {
            return Err(Error::InvalidParameter {
                kind,
                reason: format!("stddev must not be negative, found {stddev}"),
            });
        }
        let normal = rand_distr::Normal::new(mean, stddev).map_err(|err| {
            Error::InvalidParameter {
                kind,
                reason: format!("stddev {stddev} is unusable: {err}"),
            }
        })?;
        Ok(Self { normal })
    }
}

impl Advance for Gaussian {
    fn advance<R>(&mut self, rng: &mut R) -> Value
    where
        R: rand::Rng + ?Sized,
    {
        Value::Float(self.normal.sample(rng))
    }
}

/// Fresh `[a-zA-Z0-9]` strings of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct Alphanumeric {
    length: usize,
}

impl Alphanumeric {
    pub(crate) fn new(kind: &'static str, length: usize) -> Result<Self, Error> {
        if length == 0 {
            return Err(Error::InvalidParameter {
                kind,
                reason: "length must be greater than zero".to_string(),
            });
        }
        Ok(Self { length })
    }
}

impl Advance for Alphanumeric {
    fn advance<R>(&mut self, rng: &mut R) -> Value
    where
        R: rand::Rng + ?Sized,
    {
        Value::Str(distr::Alphanumeric.sample_string(rng, self.length))
    }
}
