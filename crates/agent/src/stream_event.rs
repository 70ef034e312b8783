//! Outbound streaming events and the wire-frame encoder.
//!
//! `StreamEvent` is what the orchestrator produces; the encoder wraps
//! each event in a frame with a monotonically increasing id. Contract:
//! exactly one `final` frame per request, always last — once it has been
//! encoded, the encoder refuses everything else.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Events emitted by the orchestrator during one request.
///
/// Wire protocol:
/// - `delta`       — partial assistant text
/// - `tool_start`  — a tool is about to run (never carries arguments)
/// - `tool_result` — tool execution completed
/// - `final`       — the closing frame, exactly one per request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Partial assistant text.
    Delta { content: String },

    /// A tool is about to execute. Arguments are deliberately absent —
    /// they stay inside the trusted boundary.
    ToolStart { tool: String },

    /// Tool execution completed.
    ToolResult {
        tool: String,
        data: serde_json::Value,
        explainability: serde_json::Value,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        error: bool,
    },

    /// The closing frame.
    Final { payload: FinalPayload },
}

/// Payload of the `final` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalPayload {
    /// Which agent produced this response
    pub agent: String,
    /// The assistant's closing text
    pub content: String,
    /// Suggested follow-up actions
    pub next_actions: Vec<String>,
}

impl StreamEvent {
    /// Wire event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Delta { .. } => "delta",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolResult { .. } => "tool_result",
            Self::Final { .. } => "final",
        }
    }
}

/// An encoded wire frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Monotonically increasing, used for client-side deduplication
    pub id: u64,
    #[serde(flatten)]
    pub event: StreamEvent,
}

/// Serializes events into frames.
///
/// The id-based seen-set is defensive hardening: a correctly driven
/// state machine never produces a duplicate id, but a frame id is never
/// emitted twice regardless.
#[derive(Debug, Default)]
pub struct FrameEncoder {
    next_id: u64,
    seen: HashSet<u64>,
    closed: bool,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode an event into the next frame.
    ///
    /// Returns `None` once the stream is closed — after `final`, nothing
    /// else is encodable.
    pub fn encode(&mut self, event: StreamEvent) -> Option<Frame> {
        if self.closed {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        if !self.seen.insert(id) {
            return None;
        }

        if matches!(event, StreamEvent::Final { .. }) {
            self.closed = true;
        }

        Some(Frame { id, event })
    }

    /// Whether a `final` frame has been encoded.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
