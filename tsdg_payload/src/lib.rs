//! The tsdg payloads
//!
//! This library holds the generation engine of tsdg: value distributions,
//! the expansion of tag columns into label sets, series assembly, time
//! slicing and the batching and encoding of samples into Prometheus
//! remote-write messages. It performs no I/O of its own.

#![deny(clippy::cargo)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod batch;
pub mod codec;
pub mod column;
pub mod distribution;
pub mod labels;
pub mod proto;
pub mod series;
pub mod slice;

pub use batch::{Batch, Block};
pub use column::Column;
pub use distribution::Distribution;
pub use labels::{Enumerator, LabelSet};
pub use series::{Assembly, Metric, Series};
pub use slice::TimeRange;

/// Errors produced by the generation engine.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// See [`column::Error`]
    #[error(transparent)]
    Column(#[from] column::Error),
    /// See [`series::Error`]
    #[error(transparent)]
    Series(#[from] series::Error),
    /// See [`slice::Error`]
    #[error(transparent)]
    Slice(#[from] slice::Error),
    /// See [`codec::Error`]
    #[error(transparent)]
    Codec(#[from] codec::Error),
}
