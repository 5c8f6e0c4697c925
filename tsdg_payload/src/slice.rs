//! Cutting a time range into slices and slices into sample ticks.
//!
//! Ticks always fall on the global grid `start + k * interval`, whatever the
//! slice size. A slice boundary never shifts the grid, so a series sampled
//! slice by slice sees exactly the ticks it would see in one pass.

/// Errors produced when building a [`TimeRange`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// `end` is not after `start`.
    #[error("time range is empty: start {start} is not before end {end}")]
    Empty {
        /// Start, unix seconds.
        start: i64,
        /// End, unix seconds.
        end: i64,
    },
    /// The sample interval must be positive.
    #[error("interval must be greater than zero")]
    ZeroInterval,
    /// The slice length must be positive.
    #[error("time_slice must be greater than zero")]
    ZeroSlice,
    /// The timestamp precision must be positive.
    #[error("precision must be greater than zero")]
    ZeroPrecision,
    /// Scaled timestamps would not fit an `i64`.
    #[error("end {end} scaled by precision {precision} overflows a timestamp")]
    Overflow {
        /// End, unix seconds.
        end: i64,
        /// Precision factor.
        precision: i64,
    },
}

/// One half-open window `[start, end)` of a [`TimeRange`], in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    /// Inclusive start.
    pub start: i64,
    /// Exclusive end.
    pub end: i64,
}

/// The sampled time range of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: i64,
    end: i64,
    interval: i64,
    time_slice: i64,
    precision: i64,
}

impl TimeRange {
    /// Create a range from unix-second bounds.
    ///
    /// # Errors
    ///
    /// Fails if the range is empty, a step is zero or scaled timestamps
    /// overflow.
    pub fn new(
        start: i64,
        end: i64,
        interval: u32,
        time_slice: u32,
        precision: u32,
    ) -> Result<Self, Error> {
        if start >= end {
            return Err(Error::Empty { start, end });
        }
        if interval == 0 {
            return Err(Error::ZeroInterval);
        }
        if time_slice == 0 {
            return Err(Error::ZeroSlice);
        }
        if precision == 0 {
            return Err(Error::ZeroPrecision);
        }
        let precision = i64::from(precision);
        if end.checked_mul(precision).is_none() || start.checked_mul(precision).is_none() {
            return Err(Error::Overflow { end, precision });
        }
        Ok(Self {
            start,
            end,
            interval: i64::from(interval),
            time_slice: i64::from(time_slice),
            precision,
        })
    }

    /// Range start, unix seconds.
    #[must_use]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Range end, unix seconds, exclusive.
    #[must_use]
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Factor applied to a tick to obtain its timestamp.
    #[must_use]
    pub fn precision(&self) -> i64 {
        self.precision
    }

    /// The slices covering the range, in order. The last is clamped to the
    /// range end.
    pub fn slices(&self) -> impl Iterator<Item = Slice> + use<> {
        let Self {
            start,
            end,
            time_slice,
            ..
        } = *self;
        let mut cursor = start;
        std::iter::from_fn(move || {
            if cursor >= end {
                return None;
            }
            let slice = Slice {
                start: cursor,
                end: cursor.saturating_add(time_slice).min(end),
            };
            cursor = slice.end;
            Some(slice)
        })
    }

    /// Grid ticks inside `slice`, unix seconds.
    pub fn ticks(&self, slice: Slice) -> impl Iterator<Item = i64> + use<> {
        let Self {
            start, interval, ..
        } = *self;
        let end = slice.end.min(self.end);
        // First grid point at or after the slice start.
        let offset = (slice.start - start).max(0);
        let k = offset.div_euclid(interval) + i64::from(offset.rem_euclid(interval) != 0);
        let mut tick = start + k * interval;
        std::iter::from_fn(move || {
            if tick >= end {
                return None;
            }
            let current = tick;
            tick = tick.saturating_add(interval);
            Some(current)
        })
    }

    /// Scale a tick to a sample timestamp.
    #[must_use]
    pub fn timestamp(&self, tick: i64) -> i64 {
        tick * self.precision
    }

    /// Number of ticks in the whole range, which is the number of samples
    /// every series receives.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        let span = self.end.abs_diff(self.start);
        span.div_ceil(self.interval.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn last_slice_is_clamped() {
        let range = TimeRange::new(0, 250, 10, 120, 1000).expect("valid range");
        let slices: Vec<Slice> = range.slices().collect();
        assert_eq!(
            slices,
            vec![
                Slice { start: 0, end: 120 },
                Slice {
                    start: 120,
                    end: 240
                },
                Slice {
                    start: 240,
                    end: 250
                },
            ]
        );
    }

    #[test]
    fn ticks_stay_on_the_global_grid() {
        // Slices of 7s with a 3s interval: boundaries never align with ticks.
        let range = TimeRange::new(100, 130, 3, 7, 1).expect("valid range");
        let ticks: Vec<i64> = range.slices().flat_map(|s| range.ticks(s)).collect();
        let expected: Vec<i64> = (100..130).step_by(3).collect();
        assert_eq!(ticks, expected);
        assert_eq!(range.total_ticks(), expected.len() as u64);
    }

    #[test]
    fn timestamps_are_scaled() {
        let range = TimeRange::new(10, 20, 5, 120, 1000).expect("valid range");
        let stamps: Vec<i64> = range
            .slices()
            .flat_map(|s| range.ticks(s))
            .map(|t| range.timestamp(t))
            .collect();
        assert_eq!(stamps, vec![10_000, 15_000]);
    }

    #[test]
    fn rejects_degenerate_ranges() {
        assert_eq!(
            TimeRange::new(5, 5, 1, 1, 1),
            Err(Error::Empty { start: 5, end: 5 })
        );
        assert_eq!(TimeRange::new(0, 5, 0, 1, 1), Err(Error::ZeroInterval));
        assert_eq!(TimeRange::new(0, 5, 1, 0, 1), Err(Error::ZeroSlice));
        assert_eq!(TimeRange::new(0, 5, 1, 1, 0), Err(Error::ZeroPrecision));
        assert!(matches!(
            TimeRange::new(0, i64::MAX, 1, 1, 1000),
            Err(Error::Overflow { .. })
        ));
    }

    proptest! {
        #[test]
        fn slicing_preserves_ticks(
            start in -10_000i64..10_000,
            span in 1i64..5_000,
            interval in 1u32..300,
            time_slice in 1u32..600,
        ) {
            let range = TimeRange::new(start, start + span, interval, time_slice, 1)
                .expect("valid range");
            let sliced: Vec<i64> = range.slices().flat_map(|s| range.ticks(s)).collect();
            let whole: Vec<i64> = (start..start + span)
                .step_by(interval as usize)
                .collect();
            prop_assert_eq!(sliced.len() as u64, range.total_ticks());
            prop_assert_eq!(sliced, whole);
        }
    }
}
