//! Aggregate usage counters.
//!
//! Recomputed incrementally on every tracked event. `max_bytes`,
//! `cumulative_bytes`, and the per-kind counts are monotonic; only
//! `current_bytes` may decrease. Deallocation never touches
//! `cumulative_bytes` or `max_bytes` -- they track allocation history, not
//! current footprint.

use serde::{Deserialize, Serialize};

/// Snapshot of the usage aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Bytes currently live; always equals the sum of registered sizes.
    pub current_bytes: u64,
    /// Historical maximum of `current_bytes` observed after any event.
    pub max_bytes: u64,
    /// Total bytes ever requested through allocate and reallocate.
    pub cumulative_bytes: u64,
    /// Successful allocations.
    pub allocate_count: u64,
    /// Successful reallocations. Failed reallocates are not counted.
    pub reallocate_count: u64,
    /// Deallocations.
    pub deallocate_count: u64,
}

impl UsageStats {
    /// Creates a zeroed snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful allocation of `size` bytes.
    pub(crate) fn record_allocate(&mut self, size: u64) {
        self.cumulative_bytes += size;
        self.current_bytes += size;
        self.max_bytes = self.max_bytes.max(self.current_bytes);
        self.allocate_count += 1;
    }

    /// Records a successful reallocation from `old_size` to `new_size` bytes.
    pub(crate) fn record_reallocate(&mut self, old_size: u64, new_size: u64) {
        self.cumulative_bytes += new_size;
        // current may shrink when new_size < old_size.
        self.current_bytes = self.current_bytes - old_size + new_size;
        self.max_bytes = self.max_bytes.max(self.current_bytes);
        self.reallocate_count += 1;
    }

    /// Records a deallocation of `size` bytes.
    pub(crate) fn record_deallocate(&mut self, size: u64) {
        self.current_bytes -= size;
        self.deallocate_count += 1;
    }
}
