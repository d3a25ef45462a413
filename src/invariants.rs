//! Debug assertion macros for the ring buffer's structural invariants.
//!
//! Only active in debug builds (`debug_assert!`), so there is zero overhead
//! in release builds. All of these are checked under the channel mutex,
//! where the state is quiescent.

/// Assert that count does not exceed capacity.
///
/// **Invariant**: `0 <= count <= capacity`
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "bounded-count violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that head never advances past tail.
///
/// **Invariant**: `head <= tail`
macro_rules! debug_assert_head_not_past_tail {
    ($head:expr, $tail:expr) => {
        debug_assert!(
            $head <= $tail,
            "head {} is past tail {}",
            $head,
            $tail
        )
    };
}

/// Assert that the materialized occupancy agrees with the sequence numbers.
///
/// **Invariant**: `tail - head == count`
macro_rules! debug_assert_count_consistent {
    ($head:expr, $tail:expr, $count:expr) => {
        debug_assert!(
            $tail - $head == $count as u64,
            "count {} disagrees with sequence window [{}, {})",
            $count,
            $head,
            $tail
        )
    };
}

/// Assert that a sequence number only increases.
///
/// **Invariant**: `new >= old` for both head and tail
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "{} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_count_consistent;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_monotonic;
