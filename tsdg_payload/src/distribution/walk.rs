//! Distributions whose next value depends on their previous one.

use rand::distr::{Distribution as _, Uniform};

use super::{Advance, Error, Value};

/// Arithmetic progression from zero. A negative `step` counts down.
#[derive(Debug, Clone, Copy)]
pub struct Monotonic {
    step: f64,
    current: f64,
}

impl Monotonic {
    pub(crate) fn new(step: f64) -> Self {
        Self { step, current: 0.0 }
    }
}

impl Advance for Monotonic {
    fn advance<R>(&mut self, _rng: &mut R) -> Value
    where
        R: rand::Rng + ?Sized,
    {
        let value = self.current;
        self.current += self.step;
        Value::Float(value)
    }
}

/// Random walk from zero with uniformly distributed steps.
#[derive(Debug, Clone)]
pub struct Noise {
    step: Uniform<f64>,
    current: f64,
}

impl Noise {
    pub(crate) fn new(kind: &'static str, lower: f64, upper: f64) -> Result<Self, Error> {
        let step = Uniform::new_inclusive(lower, upper).map_err(|err| Error::InvalidParameter {
            kind,
            reason: format!("step bounds [{lower}, {upper}] are unusable: {err}"),
        })?;
        Ok(Self { step, current: 0.0 })
    }
}

impl Advance for Noise {
    fn advance<R>(&mut self, rng: &mut R) -> Value
    where
        R: rand::Rng + ?Sized,
    {
        self.current += self.step.sample(rng);
        Value::Float(self.current)
    }
}

/// The self-referential recurrence `s = amplitude * sin(s / period) + bias`.
///
/// The sine is fed the previous output, not elapsed time, so the sequence is
/// only periodic for some parameter choices. It is continuous for as long as
/// the same instance is advanced.
#[derive(Debug, Clone, Copy)]
pub struct Periodic {
    period: f64,
    amplitude: f64,
    bias: f64,
    current: f64,
}

impl Periodic {
    pub(crate) fn new(
        kind: &'static str,
        period: f64,
        amplitude: f64,
        bias: f64,
    ) -> Result<Self, Error> {
        if period == 0.0 || !period.is_finite() {
            return Err(Error::InvalidParameter {
                kind,
                reason: format!("period must be finite and non-zero, found {period}"),
            });
        }
        if !amplitude.is_finite() || !bias.is_finite() {
            return Err(Error::InvalidParameter {
                kind,
                reason: format!(
                    "amplitude and bias must be finite, found {amplitude} and {bias}"
                ),
            });
        }
        Ok(Self {
            period,
            amplitude,
            bias,
            current: 0.0,
        })
    }
}

impl Advance for Periodic {
    fn advance<R>(&mut self, _rng: &mut R) -> Value
    where
        R: rand::Rng + ?Sized,
    {
        self.current = self.amplitude * (self.current / self.period).sin() + self.bias;
        Value::Float(self.current)
    }
}
