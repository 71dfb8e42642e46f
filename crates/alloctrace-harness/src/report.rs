//! Leak report over a finished tracked session.
//!
//! The harness's final assertion surface: every live record left in the
//! registry is a leak, attributed to its tagged call site when one was
//! recorded. Rendered as a small markdown report in the style of the
//! conformance tooling this crate sits beside.

use alloctrace_core::{AllocationTracker, NativeAllocator, PointerRecord, UsageStats};
use serde::{Deserialize, Serialize};

/// Pass/fail verdict of a tracked run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Post-run leak report: surviving records plus the final statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakReport {
    pub stats: UsageStats,
    /// Live records at teardown, sorted by address for stable output.
    pub leaks: Vec<PointerRecord>,
}

impl LeakReport {
    /// Builds the report from a finished tracker.
    #[must_use]
    pub fn from_tracker<A: NativeAllocator>(tracker: &AllocationTracker<A>) -> Self {
        let mut leaks: Vec<PointerRecord> = tracker.live_records().cloned().collect();
        leaks.sort_by_key(|record| record.addr);
        Self {
            stats: tracker.stats(),
            leaks,
        }
    }

    /// Builds the report from already-extracted parts.
    #[must_use]
    pub fn from_parts(stats: UsageStats, mut leaks: Vec<PointerRecord>) -> Self {
        leaks.sort_by_key(|record| record.addr);
        Self { stats, leaks }
    }

    /// A run passes when nothing is live and the aggregator agrees.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        if self.leaks.is_empty() && self.stats.current_bytes == 0 {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// Total bytes still live.
    #[must_use]
    pub fn leaked_bytes(&self) -> u64 {
        self.leaks.iter().map(|record| record.size as u64).sum()
    }

    /// Renders the report as markdown.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("# Allocation audit\n\n");
        out.push_str(&format!(
            "- verdict: **{}**\n",
            match self.verdict() {
                Verdict::Pass => "PASS",
                Verdict::Fail => "FAIL",
            }
        ));
        out.push_str(&format!(
            "- allocations: {} / reallocations: {} / deallocations: {}\n",
            self.stats.allocate_count, self.stats.reallocate_count, self.stats.deallocate_count
        ));
        out.push_str(&format!(
            "- peak: {} bytes, cumulative: {} bytes\n",
            self.stats.max_bytes, self.stats.cumulative_bytes
        ));

        if self.leaks.is_empty() {
            out.push_str("\nNo live allocations at teardown.\n");
        } else {
            out.push_str(&format!(
                "\n{} leaked allocation(s), {} bytes total:\n\n",
                self.leaks.len(),
                self.leaked_bytes()
            ));
            for record in &self.leaks {
                out.push_str(&format!("- {record}\n"));
            }
        }
        out
    }
}
