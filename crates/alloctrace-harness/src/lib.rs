//! Audit tooling for the allocation tracker.
//!
//! This crate provides:
//! - Audit log: serialize a tracked session's event log as JSONL, validate
//!   it line by line, and index emitted artifacts with SHA-256 integrity
//! - Leak report: human-readable pass/fail verdict over a finished session
//! - Replay: recompute statistics and the live set from an audit log and
//!   check them for self-consistency

#![forbid(unsafe_code)]

pub mod audit_log;
pub mod replay;
pub mod report;

pub use audit_log::{AuditAction, AuditEntry, AuditOutcome, LogEmitter};
pub use replay::{ReplaySummary, replay_entries, replay_file};
pub use report::{LeakReport, Verdict};

use thiserror::Error;

/// Errors from audit-log handling and replay.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line_no}: malformed audit entry: {source}")]
    Malformed {
        line_no: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line_no}: schema violation: {reason}")]
    Schema { line_no: usize, reason: String },

    #[error("replay desync at seq {seq}: {reason}")]
    Desync { seq: u64, reason: String },
}
