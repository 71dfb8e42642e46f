//! Live-pointer registry.
//!
//! Maps each live address to its [`PointerRecord`]. The registry is the sole
//! owner of record lifetime: records are created on successful
//! allocate/reallocate and destroyed on deallocate (or the old side of a
//! successful reallocate). Addresses are opaque handles from the underlying
//! allocator and are never dereferenced.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ContractViolation;

/// Marker shown for records that were never tagged with a source file.
pub const UNKNOWN_FILE: &str = "<unknown file>";

/// Marker shown for records that were never tagged with a line number.
pub const UNKNOWN_LINE: &str = "<unknown line>";

/// Call-site attribution attached to a live record by the debug hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTag {
    /// Source file that performed the allocation.
    pub file: String,
    /// Line number within `file`.
    pub line: u32,
}

/// Metadata for one live allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerRecord {
    /// Opaque address returned by the underlying allocator.
    pub addr: usize,
    /// User-requested size in bytes.
    pub size: usize,
    /// Optional call-site attribution; `None` until tagged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<SourceTag>,
}

impl PointerRecord {
    /// Creates an untagged record.
    #[must_use]
    pub fn new(addr: usize, size: usize) -> Self {
        Self {
            addr,
            size,
            tag: None,
        }
    }

    /// Source file from the tag, or the unknown marker.
    #[must_use]
    pub fn file(&self) -> &str {
        self.tag.as_ref().map_or(UNKNOWN_FILE, |t| t.file.as_str())
    }

    /// Line number from the tag, rendered as a string so untagged records
    /// can expose the unknown marker.
    #[must_use]
    pub fn line(&self) -> String {
        self.tag
            .as_ref()
            .map_or_else(|| UNKNOWN_LINE.to_string(), |t| t.line.to_string())
    }
}

impl fmt::Display for PointerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#x} ({} bytes) allocated at {}:{}",
            self.addr,
            self.size,
            self.file(),
            self.line()
        )
    }
}

/// Mapping from live address to its metadata record.
#[derive(Debug, Default)]
pub struct PointerRegistry {
    live: HashMap<usize, PointerRecord>,
}

impl PointerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new live record.
    ///
    /// Fails with [`ContractViolation::DoubleRegister`] if `addr` is already
    /// live; the existing record is left untouched.
    pub fn register(&mut self, addr: usize, size: usize) -> Result<(), ContractViolation> {
        if let Some(existing) = self.live.get(&addr) {
            return Err(ContractViolation::DoubleRegister {
                addr,
                existing: existing.size,
            });
        }
        self.live.insert(addr, PointerRecord::new(addr, size));
        Ok(())
    }

    /// Removes and returns the record for `addr`.
    pub fn unregister(
        &mut self,
        operation: &'static str,
        addr: usize,
    ) -> Result<PointerRecord, ContractViolation> {
        self.live
            .remove(&addr)
            .ok_or(ContractViolation::UnknownAddress { operation, addr })
    }

    /// Looks up the record for `addr` without removing it.
    pub fn lookup(
        &self,
        operation: &'static str,
        addr: usize,
    ) -> Result<&PointerRecord, ContractViolation> {
        self.live
            .get(&addr)
            .ok_or(ContractViolation::UnknownAddress { operation, addr })
    }

    /// Attaches (or overwrites) the source tag on an existing record.
    ///
    /// Never creates a record.
    pub fn tag(
        &mut self,
        addr: usize,
        file: impl Into<String>,
        line: u32,
    ) -> Result<(), ContractViolation> {
        let record = self
            .live
            .get_mut(&addr)
            .ok_or(ContractViolation::UnknownAddress {
                operation: "tag",
                addr,
            })?;
        record.tag = Some(SourceTag {
            file: file.into(),
            line,
        });
        Ok(())
    }

    /// Whether `addr` is currently live.
    #[must_use]
    pub fn is_registered(&self, addr: usize) -> bool {
        self.live.contains_key(&addr)
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether the registry holds no live records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Sum of sizes over all live records.
    #[must_use]
    pub fn live_bytes(&self) -> u64 {
        self.live.values().map(|r| r.size as u64).sum()
    }

    /// Iterates over live records in unspecified order.
    pub fn records(&self) -> impl Iterator<Item = &PointerRecord> {
        self.live.values()
    }
}
