//! Audit logging — append-only recording of tool invocations.
//!
//! Every tool call produces exactly one entry transition: recorded as
//! `started` before the tool runs, then finished once with a terminal
//! `success` or `error` status. Entries are independent rows keyed by a
//! fresh id, so concurrent requests never contend. A sink failure must
//! never block tool execution — callers degrade to a placeholder id.

use braincast_core::ToolContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// Placeholder id used when the sink could not record the entry.
pub const PLACEHOLDER_AUDIT_ID: &str = "audit-unavailable";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown audit entry: {0}")]
    UnknownEntry(String),
}

/// Lifecycle status of one audited tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Started,
    Success,
    Error,
}

/// A single audit log entry for one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub tool_name: String,
    pub status: AuditStatus,

    /// Raw (unvalidated) arguments as received
    pub args: serde_json::Value,

    /// Tool result on success, absent otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Error description on failure, absent otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    pub org_id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl AuditEntry {
    /// Create a `started` entry for a tool call about to run.
    pub fn started(tool_name: &str, args: serde_json::Value, ctx: &ToolContext) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tool_name: tool_name.into(),
            status: AuditStatus::Started,
            args,
            result: None,
            error: None,
            duration_ms: None,
            org_id: ctx.org_id.clone(),
            session_id: ctx.session_id.clone(),
            user_id: ctx.user_id.clone(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// The terminal outcome applied to a started entry.
#[derive(Debug, Clone)]
pub enum AuditOutcome {
    Success {
        result: serde_json::Value,
        duration_ms: u64,
    },
    Error {
        message: String,
        duration_ms: u64,
    },
}

/// Where audit entries are written.
///
/// `begin` returns the entry id; `finish` transitions that entry exactly
/// once to a terminal status. Implementations must be safe for concurrent
/// use — entries are independent rows.
pub trait AuditSink: Send + Sync {
    fn begin(&self, entry: AuditEntry) -> Result<String, AuditError>;
    fn finish(&self, id: &str, outcome: AuditOutcome) -> Result<(), AuditError>;
}

/// In-memory audit log backed by a mutex-guarded vector.
///
/// Useful for tests and small deployments.
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Entries filtered by terminal status.
    pub fn entries_by_status(&self, status: AuditStatus) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| e.status == status)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl AuditSink for MemoryAuditLog {
    fn begin(&self, entry: AuditEntry) -> Result<String, AuditError> {
        let id = entry.id.clone();
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
        Ok(id)
    }

    fn finish(&self, id: &str, outcome: AuditOutcome) -> Result<(), AuditError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| AuditError::UnknownEntry(id.into()))?;

        match outcome {
            AuditOutcome::Success {
                result,
                duration_ms,
            } => {
                entry.status = AuditStatus::Success;
                entry.result = Some(result);
                entry.duration_ms = Some(duration_ms);
            }
            AuditOutcome::Error {
                message,
                duration_ms,
            } => {
                entry.status = AuditStatus::Error;
                entry.error = Some(message);
                entry.duration_ms = Some(duration_ms);
            }
        }
        entry.finished_at = Some(Utc::now());
        Ok(())
    }
}

/// A sink that logs entries via `tracing::info!`.
///
/// `begin` mints an id and logs the started record; `finish` logs the
/// terminal record. Nothing is retained in memory.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn begin(&self, entry: AuditEntry) -> Result<String, AuditError> {
        tracing::info!(
            audit_id = %entry.id,
            tool = %entry.tool_name,
            org = %entry.org_id,
            session = %entry.session_id,
            status = "started",
            "AUDIT"
        );
        Ok(entry.id)
    }

    fn finish(&self, id: &str, outcome: AuditOutcome) -> Result<(), AuditError> {
        match outcome {
            AuditOutcome::Success { duration_ms, .. } => {
                tracing::info!(audit_id = %id, status = "success", duration_ms, "AUDIT");
            }
            AuditOutcome::Error {
                message,
                duration_ms,
            } => {
                tracing::info!(audit_id = %id, status = "error", error = %message, duration_ms, "AUDIT");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ToolContext {
        ToolContext::new("org_1", "sess_1").with_user("user_1")
    }

    #[test]
    fn begin_and_finish_success() {
        let log = MemoryAuditLog::new();
        let entry = AuditEntry::started(
            "brain.search_items",
            serde_json::json!({"query": "pruning"}),
            &ctx(),
        );
        let id = log.begin(entry).unwrap();

        log.finish(
            &id,
            AuditOutcome::Success {
                result: serde_json::json!({"items": []}),
                duration_ms: 12,
            },
        )
        .unwrap();

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, AuditStatus::Success);
        assert_eq!(entries[0].duration_ms, Some(12));
        assert!(entries[0].finished_at.is_some());
        assert_eq!(entries[0].org_id, "org_1");
    }

    #[test]
    fn finish_error_records_message() {
        let log = MemoryAuditLog::new();
        let id = log
            .begin(AuditEntry::started(
                "brain.create_item",
                serde_json::json!({}),
                &ctx(),
            ))
            .unwrap();

        log.finish(
            &id,
            AuditOutcome::Error {
                message: "store unreachable".into(),
                duration_ms: 3,
            },
        )
        .unwrap();

        let errors = log.entries_by_status(AuditStatus::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error.as_deref(), Some("store unreachable"));
    }

    #[test]
    fn finish_unknown_entry_fails() {
        let log = MemoryAuditLog::new();
        let err = log
            .finish(
                "missing",
                AuditOutcome::Success {
                    result: serde_json::Value::Null,
                    duration_ms: 0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, AuditError::UnknownEntry(_)));
    }

    #[test]
    fn tracing_sink_returns_entry_id() {
        let sink = TracingAuditSink;
        let entry = AuditEntry::started("brain.search_items", serde_json::Value::Null, &ctx());
        let expected = entry.id.clone();
        let id = sink.begin(entry).unwrap();
        assert_eq!(id, expected);
        assert!(
            sink.finish(
                &id,
                AuditOutcome::Success {
                    result: serde_json::Value::Null,
                    duration_ms: 1
                }
            )
            .is_ok()
        );
    }

    #[test]
    fn entry_serialization_roundtrip() {
        let entry = AuditEntry::started(
            "brain.ingest_note",
            serde_json::json!({"content": "water the ferns"}),
            &ctx(),
        );
        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.tool_name, "brain.ingest_note");
        assert_eq!(deserialized.status, AuditStatus::Started);
        assert_eq!(deserialized.user_id.as_deref(), Some("user_1"));
    }
}
