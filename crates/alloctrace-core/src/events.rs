//! Append-only allocation event log.
//!
//! Every intercepted operation appends exactly one event. The log's only
//! ordering guarantee is observation order. Events are immutable once
//! appended and carry full record snapshots so they stay meaningful after
//! the registry entry is gone.

use serde::{Deserialize, Serialize};

use crate::registry::PointerRecord;

/// One allocation-lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum AllocationEvent {
    /// A successful allocation.
    Allocated(PointerRecord),
    /// A deallocation. Carries the record as it was before removal.
    Deallocated(PointerRecord),
    /// A reallocation attempt. `new` is `None` when the underlying
    /// allocator failed; the old record stayed live and untouched.
    Reallocated {
        old: PointerRecord,
        #[serde(skip_serializing_if = "Option::is_none")]
        new: Option<PointerRecord>,
    },
}

/// Chronological record of allocation events.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<AllocationEvent>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event. Events are never reordered or removed.
    pub fn append(&mut self, event: AllocationEvent) {
        self.entries.push(event);
    }

    /// All events in observation order.
    #[must_use]
    pub fn entries(&self) -> &[AllocationEvent] {
        &self.entries
    }

    /// Number of events observed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no events have been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_preserves_observation_order() {
        let mut log = EventLog::new();
        log.append(AllocationEvent::Allocated(PointerRecord::new(0x10, 4)));
        log.append(AllocationEvent::Deallocated(PointerRecord::new(0x10, 4)));
        assert_eq!(log.len(), 2);
        assert!(matches!(log.entries()[0], AllocationEvent::Allocated(_)));
        assert!(matches!(log.entries()[1], AllocationEvent::Deallocated(_)));
    }

    #[test]
    fn test_failed_realloc_event_serializes_without_new_record() {
        let event = AllocationEvent::Reallocated {
            old: PointerRecord::new(0x20, 8),
            new: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"action\":\"reallocated\""));
        assert!(!json.contains("\"new\""));
    }
}
