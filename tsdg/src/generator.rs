//! The time-series generator.
//!
//! The generator turns a [`Config`] into output files. The full list of
//! series is split into contiguous shards, one per unit of parallelism, and
//! every shard runs to completion on its own blocking thread. Shards share
//! only the counters behind their writers.

use std::{
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    sync::{Arc, atomic::Ordering},
};

use futures::future::join_all;
use rand::{SeedableRng, rngs::SmallRng};
use tokio::task::{self, JoinError};
use tracing::{error, info};
use tsdg_payload::{Assembly, Batch, TimeRange};

use crate::config::{self, Config};

pub mod partition;
pub mod shard;
pub mod writer;

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Generator`].
pub enum Error {
    /// See [`config::Error`]
    #[error(transparent)]
    Config(#[from] config::Error),
}

/// Why a shard did not complete.
#[derive(thiserror::Error, Debug)]
pub enum ShardFailure {
    /// The shard stopped on an error.
    #[error(transparent)]
    Shard(#[from] shard::Error),
    /// The shard's thread panicked or was cancelled.
    #[error("Child join error: {0}")]
    Join(#[from] JoinError),
}

/// The outcome of a run.
#[derive(Debug, Default)]
pub struct Summary {
    /// Distinct series generated.
    pub series: u64,
    /// Samples written to disk.
    pub samples: u64,
    /// Files written.
    pub files: u64,
    /// Shards that did not complete, by shard index.
    pub failures: Vec<(usize, ShardFailure)>,
}

impl Summary {
    /// Whether every shard completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A fully validated run, ready to [`Generator::spin`].
#[derive(Debug)]
pub struct Generator {
    assembly: Arc<Assembly>,
    range: TimeRange,
    batch_size: NonZeroU64,
    parallelism: NonZeroUsize,
    seed: Option<u64>,
    prefix: PathBuf,
}

impl Generator {
    /// Create a new [`Generator`] writing files next to `prefix`.
    ///
    /// `parallelism`, when given, overrides the configured value.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not describe a valid run.
    pub fn new(
        config: &Config,
        prefix: impl Into<PathBuf>,
        parallelism: Option<NonZeroUsize>,
    ) -> Result<Self, Error> {
        let range = config.time_range()?;
        let assembly = config.assembly()?;
        let parallelism = parallelism.unwrap_or(config.parallelism);
        info!(
            "{} series over {} ticks, {} samples expected, {} shards",
            assembly.len(),
            range.total_ticks(),
            assembly.len().saturating_mul(range.total_ticks()),
            parallelism
        );
        Ok(Self {
            assembly: Arc::new(assembly),
            range,
            batch_size: config.batch_size,
            parallelism,
            seed: config.seed,
            prefix: prefix.into(),
        })
    }

    /// Run every shard to completion.
    ///
    /// Shard failures do not stop other shards. They are logged and listed
    /// in the returned [`Summary`], and files already written are kept.
    pub async fn spin(self) -> Summary {
        let counters = writer::Counters::default();
        let mut handles = Vec::with_capacity(self.parallelism.get());

        for (id, owned) in partition::split(self.assembly.len(), self.parallelism)
            .into_iter()
            .enumerate()
        {
            let assembly = Arc::clone(&self.assembly);
            let writer = writer::Writer::new(&self.prefix, counters.clone(), id);
            let batch = Batch::new(self.batch_size);
            let rng = match self.seed {
                Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(id as u64)),
                None => SmallRng::from_os_rng(),
            };
            let range = self.range;

            handles.push(task::spawn_blocking(move || {
                let series = assembly.series(owned).collect();
                shard::Shard::new(id, series, range, batch, writer, rng).run()
            }));
        }

        let mut summary = Summary {
            series: self.assembly.len(),
            ..Summary::default()
        };
        for (id, res) in join_all(handles).await.into_iter().enumerate() {
            match res {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    error!("shard {id} failed: {err}");
                    summary.failures.push((id, err.into()));
                }
                Err(err) => {
                    error!("shard {id} did not complete: {err}");
                    summary.failures.push((id, err.into()));
                }
            }
        }
        summary.files = counters.files.load(Ordering::Relaxed);
        summary.samples = counters.samples.load(Ordering::Relaxed);

        info!(
            "generated {} series, {} samples in {} files, {} failed shards",
            summary.series,
            summary.samples,
            summary.files,
            summary.failures.len()
        );
        summary
    }
}
