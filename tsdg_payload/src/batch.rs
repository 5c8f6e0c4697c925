//! Bounded accumulation of finished series.
//!
//! A [`Batch`] collects `(labels, samples)` pairs until the number of samples
//! it holds reaches its threshold. The owner checks [`Batch::is_full`] after
//! every push and drains the batch into a [`Block`] with [`Batch::take`].

use std::num::NonZeroU64;

use bytes::Bytes;

use crate::{
    codec,
    proto::prometheus::{Label, Sample, TimeSeries, WriteRequest},
};

/// An encoded batch, ready to be written out.
#[derive(Debug, Clone)]
pub struct Block {
    /// The compressed `WriteRequest`.
    pub bytes: Bytes,
    /// Number of time series in the request.
    pub series: usize,
    /// Number of samples in the request.
    pub samples: u64,
}

/// Accumulates time series up to a sample threshold.
#[derive(Debug)]
pub struct Batch {
    timeseries: Vec<TimeSeries>,
    samples: u64,
    threshold: NonZeroU64,
}

impl Batch {
    /// Create an empty batch that is full once it holds `threshold` samples.
    #[must_use]
    pub fn new(threshold: NonZeroU64) -> Self {
        Self {
            timeseries: Vec::new(),
            samples: 0,
            threshold,
        }
    }

    /// Append one series' samples. Empty sample lists are ignored.
    pub fn push(&mut self, labels: &[Label], samples: Vec<Sample>) {
        if samples.is_empty() {
            return;
        }
        self.samples += samples.len() as u64;
        self.timeseries.push(TimeSeries {
            labels: labels.to_vec(),
            samples,
        });
    }

    /// Whether the held samples reached the threshold.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.samples >= self.threshold.get()
    }

    /// Whether nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timeseries.is_empty()
    }

    /// Number of samples held.
    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Drain the batch into an encoded [`Block`], or `None` when empty.
    ///
    /// # Errors
    ///
    /// See [`codec::encode`]. The batch is drained either way.
    pub fn take(&mut self) -> Result<Option<Block>, codec::Error> {
        if self.is_empty() {
            return Ok(None);
        }
        let request = WriteRequest {
            timeseries: std::mem::take(&mut self.timeseries),
        };
        let samples = std::mem::take(&mut self.samples);
        let bytes = codec::encode(&request)?;
        Ok(Some(Block {
            bytes,
            series: request.timeseries.len(),
            samples,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: i64) -> Vec<Sample> {
        (0..n)
            .map(|t| Sample {
                value: t as f64,
                timestamp: t,
            })
            .collect()
    }

    fn label(value: &str) -> Vec<Label> {
        vec![Label {
            name: "id".to_string(),
            value: value.to_string(),
        }]
    }

    #[test]
    fn flushes_at_threshold_and_once_at_the_end() {
        let threshold = NonZeroU64::new(10).expect("non-zero");
        let mut batch = Batch::new(threshold);
        let mut blocks = Vec::new();
        for id in 0..5 {
            batch.push(&label(&id.to_string()), samples(5));
            if batch.is_full() {
                blocks.push(batch.take().expect("encodes").expect("non-empty"));
            }
        }
        if let Some(block) = batch.take().expect("encodes") {
            blocks.push(block);
        }

        let sizes: Vec<u64> = blocks.iter().map(|b| b.samples).collect();
        assert_eq!(sizes, vec![10, 10, 5]);

        let mut ids = Vec::new();
        for block in &blocks {
            let request = codec::decode(&block.bytes).expect("decodes");
            assert_eq!(request.timeseries.len(), block.series);
            let decoded: u64 = request
                .timeseries
                .iter()
                .map(|ts| ts.samples.len() as u64)
                .sum();
            assert_eq!(decoded, block.samples);
            ids.extend(request.timeseries.into_iter().map(|ts| ts.labels[0].value.clone()));
        }
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn empty_batch_yields_nothing() {
        let mut batch = Batch::new(NonZeroU64::MIN);
        batch.push(&label("x"), Vec::new());
        assert!(batch.is_empty());
        assert!(batch.take().expect("encodes").is_none());
    }

    #[test]
    fn take_resets_the_counter() {
        let mut batch = Batch::new(NonZeroU64::new(3).expect("non-zero"));
        batch.push(&label("x"), samples(4));
        assert!(batch.is_full());
        assert!(batch.take().expect("encodes").is_some());
        assert_eq!(batch.samples(), 0);
        assert!(!batch.is_full());
    }
}
