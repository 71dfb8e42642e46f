//! The libc heap as a [`NativeAllocator`].
//!
//! Addresses cross the trait boundary as `usize` so the safe core never
//! holds a raw pointer. The casts are confined to this module.

use std::ffi::c_void;

use alloctrace_core::{NativeAllocator, NULL_ADDR};

/// Underlying allocator backed by `malloc`/`realloc`/`free`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibcAllocator;

impl LibcAllocator {
    /// Creates the (stateless) libc allocator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NativeAllocator for LibcAllocator {
    fn allocate(&mut self, size: usize) -> usize {
        // SAFETY: plain malloc call; the returned block is only ever handed
        // back to realloc/free below.
        let ptr = unsafe { libc::malloc(size) };
        ptr as usize
    }

    fn reallocate(&mut self, addr: usize, size: usize) -> usize {
        // SAFETY: `addr` was returned by malloc/realloc above and is still
        // live; the tracker enforces that before forwarding.
        let ptr = unsafe { libc::realloc(addr as *mut c_void, size) };
        ptr as usize
    }

    fn deallocate(&mut self, addr: usize) {
        if addr == NULL_ADDR {
            return;
        }
        // SAFETY: `addr` was returned by malloc/realloc above and is still
        // live; the tracker enforces that before forwarding.
        unsafe { libc::free(addr as *mut c_void) };
    }
}
