//! A shard owns a contiguous run of series and everything needed to produce
//! their samples: generators, a random source, a batch and a writer. Nothing
//! in a shard is shared with other shards except the [`Counters`] behind its
//! writer.
//!
//! [`Counters`]: super::writer::Counters

use tracing::{debug, info};
use tsdg_payload::{Batch, Series, TimeRange, codec};

use super::writer::{self, Writer};

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Shard`].
pub enum Error {
    /// A batch could not be encoded.
    #[error("Encoding error: {0}")]
    Codec(#[from] codec::Error),
    /// A batch could not be written.
    #[error(transparent)]
    Writer(#[from] writer::Error),
}

/// What a shard produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    /// Series owned by the shard.
    pub series: u64,
    /// Samples written by the shard.
    pub samples: u64,
    /// Files written by the shard.
    pub files: u64,
}

/// One isolated unit of generation work.
#[derive(Debug)]
pub struct Shard<R> {
    id: usize,
    series: Vec<Series>,
    range: TimeRange,
    batch: Batch,
    writer: Writer,
    rng: R,
    report: Report,
}

impl<R> Shard<R>
where
    R: rand::Rng,
{
    /// Create a shard.
    #[must_use]
    pub fn new(
        id: usize,
        series: Vec<Series>,
        range: TimeRange,
        batch: Batch,
        writer: Writer,
        rng: R,
    ) -> Self {
        let report = Report {
            series: series.len() as u64,
            ..Report::default()
        };
        Self {
            id,
            series,
            range,
            batch,
            writer,
            rng,
            report,
        }
    }

    /// Produce every sample of every owned series, slice by slice, writing a
    /// file each time the batch fills and once more for the remainder.
    ///
    /// # Errors
    ///
    /// Stops at the first encoding or I/O failure.
    pub fn run(mut self) -> Result<Report, Error> {
        info!(
            "shard {} generating {} series",
            self.id, self.report.series
        );
        let range = self.range;
        for slice in range.slices() {
            for series in &mut self.series {
                let samples = series.sample(&range, slice, &mut self.rng);
                self.batch.push(series.labels(), samples);
                if self.batch.is_full() {
                    flush(&mut self.batch, &self.writer, &mut self.report)?;
                }
            }
            debug!(
                "shard {} finished slice [{}, {})",
                self.id, slice.start, slice.end
            );
        }
        flush(&mut self.batch, &self.writer, &mut self.report)?;
        info!(
            "shard {} done: {} samples in {} files",
            self.id, self.report.samples, self.report.files
        );
        Ok(self.report)
    }
}

fn flush(batch: &mut Batch, writer: &Writer, report: &mut Report) -> Result<(), Error> {
    if let Some(block) = batch.take()? {
        writer.write(&block)?;
        report.samples += block.samples;
        report.files += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, num::NonZeroU64};

    use rand::{SeedableRng, rngs::SmallRng};
    use tsdg_payload::{
        Assembly, Column,
        column::{self, DataType},
        distribution,
    };

    use super::*;
    use crate::generator::writer::{Counters, path_from_prefix};

    fn counter_series(count: u64) -> Vec<Series> {
        let field = Column::new(&column::Config {
            name: "ticks".to_string(),
            data_type: DataType::Float,
            nullability: 0.0,
            dist: distribution::Config::MonoInc { step: 1.0 },
        })
        .expect("valid column");
        let tag = Column::new(&column::Config {
            name: "id".to_string(),
            data_type: DataType::Integer,
            nullability: 0.0,
            dist: distribution::Config::RandomInt {
                lower_bound: 0,
                upper_bound: i64::try_from(count).expect("small count") - 1,
            },
        })
        .expect("valid column");
        let assembly = Assembly::new(&[tag], &[field], &[]).expect("valid assembly");
        assembly.series(0..assembly.len()).collect()
    }

    #[test]
    fn batches_flush_at_threshold_with_a_trailing_remainder() {
        let dir = tempfile::tempdir().expect("directory could not be created");
        let prefix = dir.path().join("out");
        let counters = Counters::default();
        // 5 series with 5 samples each, one slice.
        let range = TimeRange::new(0, 5, 1, 120, 1000).expect("valid range");
        let shard = Shard::new(
            0,
            counter_series(5),
            range,
            Batch::new(NonZeroU64::new(10).expect("non-zero")),
            Writer::new(&prefix, counters.clone(), 0),
            SmallRng::seed_from_u64(1),
        );
        let report = shard.run().expect("shard succeeds");
        assert_eq!(
            report,
            Report {
                series: 5,
                samples: 25,
                files: 3
            }
        );

        let per_file: Vec<usize> = (0..3)
            .map(|i| {
                let bytes = fs::read(path_from_prefix(&prefix, i)).expect("file exists");
                let request = codec::decode(&bytes).expect("decodes");
                request.timeseries.iter().map(|ts| ts.samples.len()).sum()
            })
            .collect();
        assert_eq!(per_file, vec![10, 10, 5]);
        assert!(!path_from_prefix(&prefix, 3).exists());
    }

    #[test]
    fn series_stay_continuous_across_slices() {
        let dir = tempfile::tempdir().expect("directory could not be created");
        let prefix = dir.path().join("out");
        // 2 series, 10 ticks, slices of 3 ticks: each series appears in 4
        // slices.
        let range = TimeRange::new(0, 10, 1, 3, 1).expect("valid range");
        let shard = Shard::new(
            0,
            counter_series(2),
            range,
            Batch::new(NonZeroU64::new(1_000).expect("non-zero")),
            Writer::new(&prefix, Counters::default(), 0),
            SmallRng::seed_from_u64(1),
        );
        let report = shard.run().expect("shard succeeds");
        assert_eq!(report.files, 1);

        let bytes = fs::read(path_from_prefix(&prefix, 0)).expect("file exists");
        let request = codec::decode(&bytes).expect("decodes");
        assert_eq!(request.timeseries.len(), 8);
        for id in ["0", "1"] {
            let (values, stamps): (Vec<f64>, Vec<i64>) = request
                .timeseries
                .iter()
                .filter(|ts| ts.labels.iter().any(|l| l.name == "id" && l.value == id))
                .flat_map(|ts| ts.samples.iter().map(|s| (s.value, s.timestamp)))
                .unzip();
            assert_eq!(values, (0..10).map(f64::from).collect::<Vec<_>>());
            assert_eq!(stamps, (0..10).collect::<Vec<i64>>());
        }
    }
}
