//! The four extern "C" hook entry points.
//!
//! Each hook forwards to the tracked session when one is active and falls
//! through to libc otherwise, so installing the hooks while tracking is
//! disabled degrades to plain allocation. A [`ContractViolation`] cannot be
//! unwound across the C boundary and a corrupted registry would poison every
//! later statistic, so violations print the offending operation and abort
//! the process.
//!
//! Hooks never dereference tracked addresses; the only pointer read is the
//! caller-owned file-name string in [`tracked_mark_pointer`].

use std::ffi::{CStr, c_char, c_int, c_uint, c_void};

use alloctrace_core::{ContractViolation, NULL_ADDR};

use crate::session::with_session;

fn fatal_violation(violation: &ContractViolation) -> ! {
    eprintln!("alloctrace: fatal contract violation: {violation}");
    std::process::abort();
}

/// `allocate(size) -> address` hook.
///
/// # Safety
///
/// Callable from any C context; the returned pointer is owned by the
/// underlying allocator and must be released through [`tracked_deallocate`]
/// (or the library's deallocate path) exactly once.
pub unsafe extern "C" fn tracked_allocate(size: usize) -> *mut c_void {
    let addr = match with_session(|t| t.allocate(size)) {
        Some(Ok(addr)) => addr,
        Some(Err(violation)) => fatal_violation(&violation),
        // Default mode: bypass all bookkeeping.
        // SAFETY: plain malloc forward.
        None => unsafe { libc::malloc(size) as usize },
    };
    addr as *mut c_void
}

/// `reallocate(address, size) -> address` hook.
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned by this hook set and
/// not yet deallocated.
pub unsafe extern "C" fn tracked_reallocate(ptr: *mut c_void, size: usize) -> *mut c_void {
    let addr = ptr as usize;
    if addr == NULL_ADDR {
        // realloc(NULL, size) allocates; route it through the allocate
        // bookkeeping so the new block is registered.
        return unsafe { tracked_allocate(size) };
    }
    let new_addr = match with_session(|t| t.reallocate(addr, size)) {
        Some(Ok(new_addr)) => new_addr,
        Some(Err(violation)) => fatal_violation(&violation),
        // SAFETY: plain realloc forward in default mode.
        None => unsafe { libc::realloc(ptr, size) as usize },
    };
    new_addr as *mut c_void
}

/// `deallocate(address) -> status` hook. Returns 0 on success.
///
/// Deallocating null is a no-op by allocator contract and bypasses the
/// session entirely.
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned by this hook set and
/// not yet deallocated.
pub unsafe extern "C" fn tracked_deallocate(ptr: *mut c_void) -> c_int {
    let addr = ptr as usize;
    if addr == NULL_ADDR {
        return 0;
    }
    match with_session(|t| t.deallocate(addr)) {
        Some(Ok(())) => {}
        Some(Err(violation)) => fatal_violation(&violation),
        // SAFETY: plain free forward in default mode.
        None => unsafe { libc::free(ptr) },
    }
    0
}

/// `mark_pointer(address, file, line) -> address` debug hook.
///
/// Attaches the call site to an already-registered pointer and returns the
/// pointer unchanged. Appends no event and touches no statistics. A null
/// `file` leaves the record untagged (the unknown markers stay in place).
///
/// # Safety
///
/// `ptr` must be a live pointer from this hook set; `file`, when non-null,
/// must point to a valid NUL-terminated string for the duration of the call.
pub unsafe extern "C" fn tracked_mark_pointer(
    ptr: *mut c_void,
    file: *const c_char,
    line: c_uint,
) -> *mut c_void {
    let addr = ptr as usize;
    if file.is_null() {
        return ptr;
    }
    // SAFETY: caller guarantees `file` is a valid NUL-terminated string.
    let file = unsafe { CStr::from_ptr(file) }.to_string_lossy().into_owned();
    match with_session(|t| t.tag(addr, file, line)) {
        Some(Ok(())) | None => ptr,
        Some(Err(violation)) => fatal_violation(&violation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::serialize_session_tests;
    use crate::session::{disable_tracking, enable_tracking, session_stats};

    #[test]
    fn test_hooks_track_a_full_lifecycle() {
        let _guard = serialize_session_tests();
        enable_tracking();

        let ptr = unsafe { tracked_allocate(100) };
        assert!(!ptr.is_null());
        assert_eq!(session_stats().unwrap().current_bytes, 100);

        let file = c"scenario.c";
        let marked = unsafe { tracked_mark_pointer(ptr, file.as_ptr(), 42) };
        assert_eq!(marked, ptr);

        let grown = unsafe { tracked_reallocate(ptr, 200) };
        assert!(!grown.is_null());
        assert_eq!(session_stats().unwrap().current_bytes, 200);

        assert_eq!(unsafe { tracked_deallocate(grown) }, 0);

        let tracker = disable_tracking().unwrap();
        assert!(!tracker.has_leaks());
        let stats = tracker.stats();
        assert_eq!(stats.current_bytes, 0);
        assert_eq!(stats.max_bytes, 200);
        assert_eq!(stats.allocate_count, 1);
        assert_eq!(stats.reallocate_count, 1);
        assert_eq!(stats.deallocate_count, 1);
        assert_eq!(tracker.events().len(), 3);
    }

    #[test]
    fn test_realloc_of_null_behaves_like_allocate() {
        let _guard = serialize_session_tests();
        enable_tracking();

        let ptr = unsafe { tracked_reallocate(std::ptr::null_mut(), 64) };
        assert!(!ptr.is_null());
        let stats = session_stats().unwrap();
        assert_eq!(stats.allocate_count, 1);
        assert_eq!(stats.reallocate_count, 0);

        unsafe { tracked_deallocate(ptr) };
        disable_tracking();
    }

    #[test]
    fn test_deallocate_null_is_a_noop() {
        let _guard = serialize_session_tests();
        enable_tracking();

        assert_eq!(unsafe { tracked_deallocate(std::ptr::null_mut()) }, 0);
        let tracker = disable_tracking().unwrap();
        assert_eq!(tracker.stats().deallocate_count, 0);
        assert!(tracker.events().is_empty());
    }

    #[test]
    fn test_default_mode_falls_through_to_libc() {
        let _guard = serialize_session_tests();
        disable_tracking();

        let ptr = unsafe { tracked_allocate(32) };
        assert!(!ptr.is_null());
        let grown = unsafe { tracked_reallocate(ptr, 64) };
        assert!(!grown.is_null());
        assert_eq!(unsafe { tracked_deallocate(grown) }, 0);
        assert!(session_stats().is_none());
    }

    #[test]
    fn test_mark_with_null_file_leaves_record_untagged() {
        let _guard = serialize_session_tests();
        enable_tracking();

        let ptr = unsafe { tracked_allocate(8) };
        unsafe { tracked_mark_pointer(ptr, std::ptr::null(), 3) };

        let addr = ptr as usize;
        crate::session::with_session(|t| {
            let record = t.registry().lookup("lookup", addr).unwrap();
            assert!(record.tag.is_none());
        })
        .unwrap();

        unsafe { tracked_deallocate(ptr) };
        disable_tracking();
    }
}
