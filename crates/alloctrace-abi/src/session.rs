//! Process-wide tracked session.
//!
//! The whole tracker state (registry, log, stats) is one shared resource, so
//! every hook executes under a single process-wide mutex. One session
//! corresponds to one enable/disable span; enabling always starts from a
//! fresh tracker so independent tracked runs (e.g. per test) do not bleed
//! into each other, and disabling removes and returns the finished tracker
//! so a harness can assert on its final state.

use alloctrace_core::{AllocationTracker, UsageStats};
use parking_lot::Mutex;

use crate::allocator::LibcAllocator;

/// The session behind the extern "C" hooks. `None` means default mode:
/// hooks fall through to libc without bookkeeping.
static SESSION: Mutex<Option<AllocationTracker<LibcAllocator>>> = Mutex::new(None);

/// Starts a fresh tracked session, replacing any previous one.
///
/// Returns the tracker of the replaced session, if one was active.
pub fn enable_tracking() -> Option<AllocationTracker<LibcAllocator>> {
    SESSION
        .lock()
        .replace(AllocationTracker::new(LibcAllocator::new()))
}

/// Ends the tracked session, if any, and returns its tracker for
/// post-run inspection (leak assertions, audit export).
pub fn disable_tracking() -> Option<AllocationTracker<LibcAllocator>> {
    SESSION.lock().take()
}

/// Whether a tracked session is currently active.
#[must_use]
pub fn is_tracking() -> bool {
    SESSION.lock().is_some()
}

/// Snapshot of the active session's usage aggregator, if tracking.
#[must_use]
pub fn session_stats() -> Option<UsageStats> {
    SESSION.lock().as_ref().map(AllocationTracker::stats)
}

/// Runs `f` against the active session under the session lock.
///
/// Returns `None` without calling `f` when no session is active. All hook
/// bookkeeping goes through here, keeping every tracker mutation inside one
/// mutual-exclusion domain.
pub fn with_session<R>(f: impl FnOnce(&mut AllocationTracker<LibcAllocator>) -> R) -> Option<R> {
    SESSION.lock().as_mut().map(f)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_disable_lifecycle() {
        let _guard = test_support::serialize_session_tests();

        enable_tracking();
        assert!(is_tracking());
        assert_eq!(session_stats(), Some(UsageStats::new()));

        let tracker = disable_tracking().unwrap();
        assert!(!tracker.has_leaks());
        assert!(!is_tracking());
        assert!(session_stats().is_none());
        assert!(disable_tracking().is_none());
    }

    #[test]
    fn test_sessions_do_not_bleed_into_each_other() {
        let _guard = test_support::serialize_session_tests();

        enable_tracking();
        let addr = with_session(|t| t.allocate(128).unwrap()).unwrap();
        with_session(|t| t.deallocate(addr).unwrap()).unwrap();
        let first = disable_tracking().unwrap();
        assert_eq!(first.stats().allocate_count, 1);

        enable_tracking();
        let second = disable_tracking().unwrap();
        assert_eq!(second.stats(), UsageStats::new());
        assert!(second.events().is_empty());
    }

    #[test]
    fn test_with_session_in_default_mode_returns_none() {
        let _guard = test_support::serialize_session_tests();

        disable_tracking();
        assert!(with_session(|t| t.stats()).is_none());
    }
}
