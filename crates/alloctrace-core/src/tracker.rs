//! The allocation tracker state machine.
//!
//! Wraps a real underlying allocator and turns its lifecycle calls into a
//! verifiable record: every operation forwards to the allocator first, then
//! updates the registry, aggregator, and log before returning the
//! allocator's result unchanged (including failure results).
//!
//! The tracker is a single-threaded, synchronous interception layer. If the
//! surrounding native library is multi-threaded, callers must serialize
//! every hook behind one process-wide lock (the abi crate does exactly
//! that); an interleaved register/unregister pair on the same address is
//! undefined.

use crate::error::ContractViolation;
use crate::events::{AllocationEvent, EventLog};
use crate::registry::{PointerRecord, PointerRegistry};
use crate::stats::UsageStats;

/// Null/failure address marker. The underlying allocator signals failure by
/// returning this; the tracker can never register it.
pub const NULL_ADDR: usize = 0;

/// The real allocator behind the tracker.
///
/// Addresses are opaque integer handles; a return value of [`NULL_ADDR`]
/// means the operation failed. The tracker never replaces the allocator's
/// semantics, only observes them, and never invokes it outside an explicit
/// operation.
pub trait NativeAllocator {
    /// Allocates `size` bytes. Returns the new address, or [`NULL_ADDR`].
    fn allocate(&mut self, size: usize) -> usize;

    /// Resizes the block at `addr` to `size` bytes. Returns the (possibly
    /// moved) address, or [`NULL_ADDR`] on failure, in which case the
    /// original block is untouched.
    fn reallocate(&mut self, addr: usize, size: usize) -> usize;

    /// Frees the block at `addr`.
    fn deallocate(&mut self, addr: usize);
}

/// Allocation tracker: registry + usage aggregator + event log over a
/// [`NativeAllocator`].
///
/// One tracker is one tracked session. Construct a fresh one per session so
/// independent test runs do not bleed into each other.
#[derive(Debug)]
pub struct AllocationTracker<A: NativeAllocator> {
    underlying: A,
    registry: PointerRegistry,
    stats: UsageStats,
    log: EventLog,
}

impl<A: NativeAllocator> AllocationTracker<A> {
    /// Creates a tracker with empty bookkeeping over `underlying`.
    #[must_use]
    pub fn new(underlying: A) -> Self {
        Self {
            underlying,
            registry: PointerRegistry::new(),
            stats: UsageStats::new(),
            log: EventLog::new(),
        }
    }

    /// Intercepted allocate.
    ///
    /// Forwards to the underlying allocator and returns its result
    /// unchanged. On success the new address is registered, an `Allocated`
    /// event is appended, and the aggregator is updated. On failure
    /// ([`NULL_ADDR`]) no record is created and no counters change.
    pub fn allocate(&mut self, size: usize) -> Result<usize, ContractViolation> {
        let addr = self.underlying.allocate(size);
        if addr == NULL_ADDR {
            return Ok(NULL_ADDR);
        }
        self.registry.register(addr, size)?;
        self.log
            .append(AllocationEvent::Allocated(PointerRecord::new(addr, size)));
        self.stats.record_allocate(size as u64);
        Ok(addr)
    }

    /// Intercepted reallocate. `addr` must be registered.
    ///
    /// On success the old record is replaced by a fresh (untagged) record at
    /// the returned address and the aggregator is adjusted. On failure the
    /// old record and registry entry are left completely untouched -- the
    /// underlying allocator did not move or free the original block -- but
    /// the attempt is still logged with a `None` new side for audit.
    pub fn reallocate(&mut self, addr: usize, size: usize) -> Result<usize, ContractViolation> {
        let old = self.registry.lookup("reallocate", addr)?.clone();
        let new_addr = self.underlying.reallocate(addr, size);

        if new_addr == NULL_ADDR {
            self.log.append(AllocationEvent::Reallocated {
                old,
                new: None,
            });
            return Ok(NULL_ADDR);
        }

        let new = PointerRecord::new(new_addr, size);
        self.log.append(AllocationEvent::Reallocated {
            old: old.clone(),
            new: Some(new.clone()),
        });
        // The old address goes first; the allocator may return it unchanged.
        self.registry.unregister("reallocate", addr)?;
        self.registry.register(new_addr, size)?;
        self.stats.record_reallocate(old.size as u64, size as u64);
        Ok(new_addr)
    }

    /// Intercepted deallocate. `addr` must be registered.
    ///
    /// The record is captured before removal so the `Deallocated` event
    /// carries its full metadata (including any tag).
    pub fn deallocate(&mut self, addr: usize) -> Result<(), ContractViolation> {
        let record = self.registry.lookup("deallocate", addr)?.clone();
        self.underlying.deallocate(addr);
        self.log.append(AllocationEvent::Deallocated(record.clone()));
        self.registry.unregister("deallocate", addr)?;
        self.stats.record_deallocate(record.size as u64);
        Ok(())
    }

    /// Intercepted debug tag. `addr` must be registered.
    ///
    /// Attaches or overwrites the call-site tag on the existing record.
    /// Appends no event and touches no statistics.
    pub fn tag(
        &mut self,
        addr: usize,
        file: impl Into<String>,
        line: u32,
    ) -> Result<(), ContractViolation> {
        self.registry.tag(addr, file, line)
    }

    /// Snapshot of the usage aggregator.
    #[must_use]
    pub fn stats(&self) -> UsageStats {
        self.stats
    }

    /// The ordered event log.
    #[must_use]
    pub fn events(&self) -> &[AllocationEvent] {
        self.log.entries()
    }

    /// Whether `addr` is currently registered as live.
    #[must_use]
    pub fn is_registered(&self, addr: usize) -> bool {
        self.registry.is_registered(addr)
    }

    /// The live-pointer registry.
    #[must_use]
    pub fn registry(&self) -> &PointerRegistry {
        &self.registry
    }

    /// Live records in unspecified order.
    pub fn live_records(&self) -> impl Iterator<Item = &PointerRecord> {
        self.registry.records()
    }

    /// Whether any allocation is still live.
    #[must_use]
    pub fn has_leaks(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Consumes the tracker, releasing the underlying allocator.
    pub fn into_underlying(self) -> A {
        self.underlying
    }
}
