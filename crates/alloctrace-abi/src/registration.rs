//! Installing the hook set into a native library.
//!
//! Native libraries that support allocator interception expose a
//! function-pointer registration entry point: pass concrete hooks to route
//! every allocator call through them, pass nulls to restore the default
//! (untracked) allocator. This module carries the typed hook table and a
//! registrar that pairs hook installation with the session lifecycle.
//!
//! Switching modes only changes which entry point future calls reach; it
//! never clears tracker state that already exists.

use std::ffi::{c_char, c_int, c_uint, c_void};

use alloctrace_core::AllocationTracker;

use crate::allocator::LibcAllocator;
use crate::hooks::{
    tracked_allocate, tracked_deallocate, tracked_mark_pointer, tracked_reallocate,
};
use crate::session::{disable_tracking, enable_tracking};

/// `allocate(size) -> address` hook signature.
pub type AllocateHook = unsafe extern "C" fn(usize) -> *mut c_void;

/// `reallocate(address, size) -> address` hook signature.
pub type ReallocateHook = unsafe extern "C" fn(*mut c_void, usize) -> *mut c_void;

/// `deallocate(address) -> status` hook signature.
pub type DeallocateHook = unsafe extern "C" fn(*mut c_void) -> c_int;

/// `mark_pointer(address, file, line) -> address` debug hook signature.
pub type MarkPointerHook =
    unsafe extern "C" fn(*mut c_void, *const c_char, c_uint) -> *mut c_void;

/// The native library's memory-hook registration entry point.
pub type RegisterMemoryFunctions =
    unsafe extern "C" fn(Option<AllocateHook>, Option<ReallocateHook>, Option<DeallocateHook>);

/// The native library's debug-hook registration entry point.
pub type RegisterMemoryDebugFunctions = unsafe extern "C" fn(Option<MarkPointerHook>);

/// One complete hook table. `None` entries mean "use the library default".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryHooks {
    pub allocate: Option<AllocateHook>,
    pub reallocate: Option<ReallocateHook>,
    pub deallocate: Option<DeallocateHook>,
    pub mark_pointer: Option<MarkPointerHook>,
}

impl MemoryHooks {
    /// The tracked hook set.
    #[must_use]
    pub fn tracked() -> Self {
        Self {
            allocate: Some(tracked_allocate as AllocateHook),
            reallocate: Some(tracked_reallocate as ReallocateHook),
            deallocate: Some(tracked_deallocate as DeallocateHook),
            mark_pointer: Some(tracked_mark_pointer as MarkPointerHook),
        }
    }

    /// The all-null table restoring default allocator behavior.
    #[must_use]
    pub const fn default_mode() -> Self {
        Self {
            allocate: None,
            reallocate: None,
            deallocate: None,
            mark_pointer: None,
        }
    }
}

/// Pairs a native library's registration entry points with the tracked
/// session lifecycle.
#[derive(Debug, Clone, Copy)]
pub struct HookRegistrar {
    register_memory: RegisterMemoryFunctions,
    register_debug: RegisterMemoryDebugFunctions,
}

impl HookRegistrar {
    /// Wraps the library's two registration entry points.
    #[must_use]
    pub fn new(
        register_memory: RegisterMemoryFunctions,
        register_debug: RegisterMemoryDebugFunctions,
    ) -> Self {
        Self {
            register_memory,
            register_debug,
        }
    }

    /// Starts a fresh tracked session and installs the tracked hook set.
    ///
    /// # Safety
    ///
    /// The wrapped registration entry points must be valid, and the library
    /// must not be performing allocator calls concurrently with the switch.
    pub unsafe fn install_tracked(&self) {
        enable_tracking();
        let hooks = MemoryHooks::tracked();
        // SAFETY: entry points valid per the function contract.
        unsafe {
            (self.register_memory)(hooks.allocate, hooks.reallocate, hooks.deallocate);
            (self.register_debug)(hooks.mark_pointer);
        }
    }

    /// Installs null hooks, restoring the default allocator, and returns the
    /// finished session (if any) for post-run inspection.
    ///
    /// Debug hooks are removed first so no mark call can arrive between the
    /// two registrations with the session already gone.
    ///
    /// # Safety
    ///
    /// Same contract as [`Self::install_tracked`].
    pub unsafe fn install_default(&self) -> Option<AllocationTracker<LibcAllocator>> {
        let hooks = MemoryHooks::default_mode();
        // SAFETY: entry points valid per the function contract.
        unsafe {
            (self.register_debug)(hooks.mark_pointer);
            (self.register_memory)(hooks.allocate, hooks.reallocate, hooks.deallocate);
        }
        disable_tracking()
    }
}
