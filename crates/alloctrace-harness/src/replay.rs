//! Audit-log replay verification.
//!
//! Recomputes the usage statistics and the live-pointer set from an audit
//! log alone. A log that cannot be replayed (free of an address it never
//! allocated, duplicate live address, malformed realloc pair) was not
//! produced by a consistent tracker run and is worthless as evidence.

use std::collections::HashMap;
use std::path::Path;

use alloctrace_core::UsageStats;

use crate::HarnessError;
use crate::audit_log::{AuditAction, AuditEntry, AuditOutcome, validate_log_file};

/// Result of replaying an audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Statistics recomputed from the entries alone.
    pub stats: UsageStats,
    /// Addresses still live at the end of the log, with their sizes.
    pub live: HashMap<usize, usize>,
}

impl ReplaySummary {
    /// Whether the replayed run ended leak-free.
    #[must_use]
    pub fn is_leak_free(&self) -> bool {
        self.live.is_empty() && self.stats.current_bytes == 0
    }

    /// Bytes still live at the end of the log.
    #[must_use]
    pub fn leaked_bytes(&self) -> u64 {
        self.live.values().map(|&size| size as u64).sum()
    }
}

/// Replays validated entries into a fresh shadow model.
pub fn replay_entries(entries: &[AuditEntry]) -> Result<ReplaySummary, HarnessError> {
    let mut stats = UsageStats::new();
    let mut live: HashMap<usize, usize> = HashMap::new();

    let desync = |seq: u64, reason: String| HarnessError::Desync { seq, reason };

    for entry in entries {
        match entry.action {
            AuditAction::Allocated => {
                if live.insert(entry.addr, entry.size).is_some() {
                    return Err(desync(
                        entry.seq,
                        format!("allocation at already-live address {:#x}", entry.addr),
                    ));
                }
                stats.current_bytes += entry.size as u64;
                stats.cumulative_bytes += entry.size as u64;
                stats.max_bytes = stats.max_bytes.max(stats.current_bytes);
                stats.allocate_count += 1;
            }
            AuditAction::Deallocated => {
                let Some(size) = live.remove(&entry.addr) else {
                    return Err(desync(
                        entry.seq,
                        format!("deallocation of unknown address {:#x}", entry.addr),
                    ));
                };
                if size != entry.size {
                    return Err(desync(
                        entry.seq,
                        format!(
                            "deallocation size {} disagrees with live size {size}",
                            entry.size
                        ),
                    ));
                }
                stats.current_bytes -= size as u64;
                stats.deallocate_count += 1;
            }
            AuditAction::Reallocated => {
                let Some(&old_size) = live.get(&entry.addr) else {
                    return Err(desync(
                        entry.seq,
                        format!("reallocation of unknown address {:#x}", entry.addr),
                    ));
                };
                if old_size != entry.size {
                    return Err(desync(
                        entry.seq,
                        format!(
                            "reallocation old size {} disagrees with live size {old_size}",
                            entry.size
                        ),
                    ));
                }
                if entry.outcome == AuditOutcome::Failed {
                    // Logged attempt; state stays untouched.
                    continue;
                }
                let (new_addr, new_size) = match (entry.new_addr, entry.new_size) {
                    (Some(addr), Some(size)) => (addr, size),
                    // validate_log_line rejects this shape already.
                    _ => {
                        return Err(desync(
                            entry.seq,
                            "successful reallocation without new record".into(),
                        ));
                    }
                };
                live.remove(&entry.addr);
                if live.insert(new_addr, new_size).is_some() {
                    return Err(desync(
                        entry.seq,
                        format!("reallocation onto already-live address {new_addr:#x}"),
                    ));
                }
                stats.current_bytes = stats.current_bytes - old_size as u64 + new_size as u64;
                stats.cumulative_bytes += new_size as u64;
                stats.max_bytes = stats.max_bytes.max(stats.current_bytes);
                stats.reallocate_count += 1;
            }
        }
    }

    Ok(ReplaySummary { stats, live })
}

/// Validates and replays a JSONL audit file.
pub fn replay_file(path: &Path) -> Result<ReplaySummary, HarnessError> {
    let entries = validate_log_file(path)?;
    replay_entries(&entries)
}
