//! End-to-end leak detection through the extern "C" hook set.
//!
//! Drives the hooks the way an instrumented native library would and checks
//! that the finished session explains exactly which call sites still own
//! live allocations.

use alloctrace_abi::{
    disable_tracking, enable_tracking, tracked_allocate, tracked_deallocate,
    tracked_mark_pointer,
};

#[test]
fn leaked_allocation_is_reported_with_its_call_site() {
    enable_tracking();

    let kept = unsafe { tracked_allocate(512) };
    let released = unsafe { tracked_allocate(64) };
    assert!(!kept.is_null() && !released.is_null());

    let file = c"leaky_module.c";
    unsafe { tracked_mark_pointer(kept, file.as_ptr(), 77) };
    assert_eq!(unsafe { tracked_deallocate(released) }, 0);

    let tracker = disable_tracking().expect("session was enabled");
    assert!(tracker.has_leaks());
    assert_eq!(tracker.stats().current_bytes, 512);

    let leaks: Vec<_> = tracker.live_records().collect();
    assert_eq!(leaks.len(), 1);
    assert_eq!(leaks[0].addr, kept as usize);
    assert_eq!(leaks[0].size, 512);
    assert_eq!(leaks[0].file(), "leaky_module.c");
    assert_eq!(leaks[0].line(), "77");

    // The leaked block is real memory; release it now that the audit is done.
    unsafe { libc::free(kept) };
}
