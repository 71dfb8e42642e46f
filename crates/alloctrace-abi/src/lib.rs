//! # alloctrace-abi
//!
//! The extern "C" boundary of the allocation tracker: the four hook entry
//! points with fixed signatures, the process-wide tracked session they share,
//! the libc-backed underlying allocator, and the plumbing for installing the
//! hooks into a native library's function-pointer registration mechanism.
//!
//! Tracked mode carries a steep performance cost (one global lock plus full
//! bookkeeping per allocator call). Enable it only in test and debugging
//! runs, never on production hot paths.

pub mod allocator;
pub mod hooks;
pub mod registration;
pub mod session;

pub use allocator::LibcAllocator;
pub use hooks::{tracked_allocate, tracked_deallocate, tracked_mark_pointer, tracked_reallocate};
pub use registration::{HookRegistrar, MemoryHooks};
pub use session::{disable_tracking, enable_tracking, is_tracking, session_stats, with_session};
