//! The tsdg time-series data generator.
//!
//! This library supports the tsdg binary found elsewhere in this project. It
//! loads generator configuration, splits the configured series between
//! shards and writes their samples as Snappy-compressed Prometheus
//! remote-write files. It also carries a small analyzer for existing
//! Prometheus expositions.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod analyze;
pub mod config;
pub mod generator;
