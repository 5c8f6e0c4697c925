//! Splitting the series list between shards.

use std::{num::NonZeroUsize, ops::Range};

/// Split `0..len` into `parts` contiguous ranges whose lengths differ by at
/// most one. Earlier ranges take the remainder. When `len < parts` the
/// trailing ranges are empty.
#[must_use]
pub fn split(len: u64, parts: NonZeroUsize) -> Vec<Range<u64>> {
    let parts_u64 = parts.get() as u64;
    let (size, remainder) = (len / parts_u64, len % parts_u64);
    let mut start = 0;
    (0..parts_u64)
        .map(|i| {
            let end = start + size + u64::from(i < remainder);
            let range = start..end;
            start = end;
            range
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn remainder_goes_first() {
        let parts = NonZeroUsize::new(3).expect("non-zero");
        assert_eq!(split(10, parts), vec![0..4, 4..7, 7..10]);
    }

    #[test]
    fn more_parts_than_items() {
        let parts = NonZeroUsize::new(4).expect("non-zero");
        assert_eq!(split(2, parts), vec![0..1, 1..2, 2..2, 2..2]);
    }

    proptest! {
        #[test]
        fn shards_are_balanced_and_cover_everything(len in 0u64..10_000, parts in 1usize..64) {
            let parts = NonZeroUsize::new(parts).expect("non-zero");
            let shards = split(len, parts);
            prop_assert_eq!(shards.len(), parts.get());

            let p = parts.get() as u64;
            let (lo, hi) = (len / p, len.div_ceil(p));
            let mut next = 0;
            for shard in &shards {
                prop_assert_eq!(shard.start, next);
                let size = shard.end - shard.start;
                prop_assert!(size == lo || size == hi);
                next = shard.end;
            }
            prop_assert_eq!(next, len);
            let total: u64 = shards.iter().map(|s| s.end - s.start).sum();
            prop_assert_eq!(total, len);
        }
    }
}
