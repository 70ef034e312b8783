//! Per-request tool context.

use serde::{Deserialize, Serialize};

/// The identity and permission envelope for one request.
///
/// Immutable for the lifetime of a request and threaded through every
/// tool invocation. Write-capable tools only execute when `allow_writes`
/// is set — the executor enforces this before argument validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolContext {
    /// Owning organization
    pub org_id: String,

    /// Conversation session
    pub session_id: String,

    /// Acting user, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Whether mutating tools may run
    #[serde(default)]
    pub allow_writes: bool,

    /// Caller-supplied annotations, passed through to the audit log
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ToolContext {
    /// Create a read-only context.
    pub fn new(org_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            session_id: session_id.into(),
            user_id: None,
            allow_writes: false,
            metadata: serde_json::Map::new(),
        }
    }

    /// Set the acting user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Grant or revoke write permission.
    pub fn with_writes(mut self, allow: bool) -> Self {
        self.allow_writes = allow;
        self
    }

    /// Attach caller metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
