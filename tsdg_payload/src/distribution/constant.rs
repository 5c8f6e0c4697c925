//! The degenerate distribution.

use super::{Advance, Value};

/// Emits the same value forever.
#[derive(Debug, Clone)]
pub struct Constant {
    value: Value,
}

impl Constant {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }

    pub(crate) fn value(&self) -> &Value {
        &self.value
    }
}

impl Advance for Constant {
    fn advance<R>(&mut self, _rng: &mut R) -> Value
    where
        R: rand::Rng + ?Sized,
    {
        self.value.clone()
    }
}
