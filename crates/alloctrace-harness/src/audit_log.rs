//! JSONL audit log over the tracker's event log.
//!
//! One line per allocation event, in observation order, with a `seq` field
//! so gaps and reordering are detectable after the fact. Emitted files can
//! be validated line by line and indexed with SHA-256 checksums so a CI
//! pipeline can prove the log it archived is the log it audited.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use alloctrace_core::AllocationEvent;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::HarnessError;

/// Event kind of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Allocated,
    Deallocated,
    Reallocated,
}

/// Outcome of the underlying allocator call behind an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    /// Only reallocations can fail and still be logged; failed allocates
    /// leave no record at all.
    Failed,
}

/// One audit log line.
///
/// For reallocations `addr`/`size` describe the old block and
/// `new_addr`/`new_size` the new one (absent when the attempt failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: u64,
    pub action: AuditAction,
    pub addr: usize,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_addr: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub outcome: AuditOutcome,
}

impl AuditEntry {
    /// Converts one tracker event into its audit line.
    #[must_use]
    pub fn from_event(seq: u64, event: &AllocationEvent) -> Self {
        match event {
            AllocationEvent::Allocated(record) => Self {
                seq,
                action: AuditAction::Allocated,
                addr: record.addr,
                size: record.size,
                new_addr: None,
                new_size: None,
                file: record.tag.as_ref().map(|t| t.file.clone()),
                line: record.tag.as_ref().map(|t| t.line),
                outcome: AuditOutcome::Success,
            },
            AllocationEvent::Deallocated(record) => Self {
                seq,
                action: AuditAction::Deallocated,
                addr: record.addr,
                size: record.size,
                new_addr: None,
                new_size: None,
                file: record.tag.as_ref().map(|t| t.file.clone()),
                line: record.tag.as_ref().map(|t| t.line),
                outcome: AuditOutcome::Success,
            },
            AllocationEvent::Reallocated { old, new } => Self {
                seq,
                action: AuditAction::Reallocated,
                addr: old.addr,
                size: old.size,
                new_addr: new.as_ref().map(|r| r.addr),
                new_size: new.as_ref().map(|r| r.size),
                file: old.tag.as_ref().map(|t| t.file.clone()),
                line: old.tag.as_ref().map(|t| t.line),
                outcome: if new.is_some() {
                    AuditOutcome::Success
                } else {
                    AuditOutcome::Failed
                },
            },
        }
    }
}

/// Converts a whole event log into sequential audit entries.
#[must_use]
pub fn audit_entries(events: &[AllocationEvent]) -> Vec<AuditEntry> {
    events
        .iter()
        .enumerate()
        .map(|(i, event)| AuditEntry::from_event(i as u64, event))
        .collect()
}

/// Writes audit entries as JSONL.
pub struct LogEmitter<W: Write> {
    sink: W,
}

impl LogEmitter<File> {
    /// Creates an emitter writing to a fresh file at `path`.
    pub fn create(path: &Path) -> Result<Self, HarnessError> {
        Ok(Self {
            sink: File::create(path)?,
        })
    }
}

impl<W: Write> LogEmitter<W> {
    /// Wraps any writer.
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Emits one entry as a single JSONL line.
    pub fn emit(&mut self, entry: &AuditEntry) -> Result<(), HarnessError> {
        let json = serde_json::to_string(entry).map_err(|source| HarnessError::Malformed {
            line_no: entry.seq as usize + 1,
            source,
        })?;
        writeln!(self.sink, "{json}")?;
        Ok(())
    }

    /// Emits a whole event log in observation order.
    pub fn emit_events(&mut self, events: &[AllocationEvent]) -> Result<(), HarnessError> {
        for entry in audit_entries(events) {
            self.emit(&entry)?;
        }
        Ok(())
    }

    /// Flushes and releases the underlying writer.
    pub fn finish(mut self) -> Result<W, HarnessError> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

/// Validates a single JSONL line against the audit schema.
pub fn validate_log_line(line_no: usize, line: &str) -> Result<AuditEntry, HarnessError> {
    let entry: AuditEntry =
        serde_json::from_str(line).map_err(|source| HarnessError::Malformed { line_no, source })?;

    let schema = |reason: String| HarnessError::Schema { line_no, reason };

    if entry.addr == 0 {
        return Err(schema("null address can never be registered".into()));
    }
    match entry.action {
        AuditAction::Reallocated => {
            match entry.outcome {
                AuditOutcome::Success if entry.new_addr.is_none() || entry.new_size.is_none() => {
                    return Err(schema(
                        "successful reallocation must carry new_addr and new_size".into(),
                    ));
                }
                AuditOutcome::Failed if entry.new_addr.is_some() || entry.new_size.is_some() => {
                    return Err(schema(
                        "failed reallocation must not carry a new record".into(),
                    ));
                }
                _ => {}
            }
            if entry.new_addr == Some(0) {
                return Err(schema("new_addr of 0 must be encoded as a failure".into()));
            }
        }
        AuditAction::Allocated | AuditAction::Deallocated => {
            if entry.new_addr.is_some() || entry.new_size.is_some() {
                return Err(schema(format!(
                    "{:?} entries must not carry new_addr/new_size",
                    entry.action
                )));
            }
            if entry.outcome == AuditOutcome::Failed {
                return Err(schema("only reallocations log failures".into()));
            }
        }
    }
    Ok(entry)
}

/// Validates an entire JSONL audit file, returning the parsed entries.
///
/// Also enforces that `seq` values are dense and start at zero -- a gap
/// means the log was truncated or spliced.
pub fn validate_log_file(path: &Path) -> Result<Vec<AuditEntry>, HarnessError> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let entry = validate_log_line(line_no, &line)?;
        if entry.seq != entries.len() as u64 {
            return Err(HarnessError::Schema {
                line_no,
                reason: format!("expected seq {}, found {}", entries.len(), entry.seq),
            });
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Checksum record for one emitted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub path: String,
    pub sha256: String,
    pub entries: usize,
}

impl ArtifactRecord {
    /// Hashes the file at `path` and counts its non-empty lines.
    pub fn for_file(path: &Path) -> Result<Self, HarnessError> {
        let bytes = std::fs::read(path)?;
        let digest = Sha256::digest(&bytes);
        let mut sha256 = String::with_capacity(64);
        use std::fmt::Write as _;
        for byte in digest {
            let _ = write!(sha256, "{byte:02x}");
        }
        let entries = bytes
            .split(|&b| b == b'\n')
            .filter(|l| !l.is_empty())
            .count();
        Ok(Self {
            path: path.display().to_string(),
            sha256,
            entries,
        })
    }

    /// Re-hashes the file and checks it against the recorded digest.
    pub fn verify(&self) -> Result<bool, HarnessError> {
        let current = Self::for_file(Path::new(&self.path))?;
        Ok(current.sha256 == self.sha256 && current.entries == self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloctrace_core::PointerRecord;

    fn sample_events() -> Vec<AllocationEvent> {
        vec![
            AllocationEvent::Allocated(PointerRecord::new(0x1000, 100)),
            AllocationEvent::Reallocated {
                old: PointerRecord::new(0x1000, 100),
                new: Some(PointerRecord::new(0x2000, 30)),
            },
            AllocationEvent::Reallocated {
                old: PointerRecord::new(0x2000, 30),
                new: None,
            },
            AllocationEvent::Deallocated(PointerRecord::new(0x2000, 30)),
        ]
    }

    #[test]
    fn test_entries_carry_sequence_and_outcome() {
        let entries = audit_entries(&sample_events());
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].seq, 0);
        assert_eq!(entries[1].new_addr, Some(0x2000));
        assert_eq!(entries[2].outcome, AuditOutcome::Failed);
        assert_eq!(entries[2].new_addr, None);
        assert_eq!(entries[3].action, AuditAction::Deallocated);
    }

    #[test]
    fn test_emit_then_validate_round_trip() {
        let mut emitter = LogEmitter::new(Vec::new());
        emitter.emit_events(&sample_events()).unwrap();
        let buffer = emitter.finish().unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let mut parsed = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            parsed.push(validate_log_line(idx + 1, line).unwrap());
        }
        assert_eq!(parsed, audit_entries(&sample_events()));
    }

    #[test]
    fn test_validation_rejects_inconsistent_shapes() {
        // Successful realloc without a new record.
        let bad = r#"{"seq":0,"action":"reallocated","addr":4096,"size":8,"outcome":"success"}"#;
        assert!(matches!(
            validate_log_line(1, bad),
            Err(HarnessError::Schema { line_no: 1, .. })
        ));

        // Allocation claiming failure.
        let bad = r#"{"seq":0,"action":"allocated","addr":4096,"size":8,"outcome":"failed"}"#;
        assert!(validate_log_line(1, bad).is_err());

        // Null subject address.
        let bad = r#"{"seq":0,"action":"allocated","addr":0,"size":8,"outcome":"success"}"#;
        assert!(validate_log_line(1, bad).is_err());

        // Garbage JSON.
        assert!(matches!(
            validate_log_line(3, "not json"),
            Err(HarnessError::Malformed { line_no: 3, .. })
        ));
    }
}
