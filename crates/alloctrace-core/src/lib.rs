//! # alloctrace-core
//!
//! Bookkeeping core of the allocation tracker: a registry of live pointers,
//! aggregate usage statistics, and an append-only event log, maintained in
//! lockstep with a real underlying allocator.
//!
//! This crate never touches memory it tracks. Addresses are opaque `usize`
//! handles supplied by a [`NativeAllocator`] implementation; the tracker
//! observes the allocator's results and forwards them unchanged. No `unsafe`
//! code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod error;
pub mod events;
pub mod registry;
pub mod stats;
pub mod tracker;

pub use error::ContractViolation;
pub use events::{AllocationEvent, EventLog};
pub use registry::{PointerRecord, PointerRegistry, SourceTag};
pub use stats::UsageStats;
pub use tracker::{AllocationTracker, NativeAllocator, NULL_ADDR};
