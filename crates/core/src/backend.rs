//! ModelBackend trait — the boundary to the language-model service.
//!
//! A backend takes the message history plus the tool schema and returns a
//! stream of chunks. Each chunk may carry a content fragment and/or
//! indexed tool-call fragments; the stream ends with a finish reason of
//! `stop` or `tool_calls`. Fragment accumulation is the orchestrator's
//! job — backends forward what the wire gives them.

use crate::error::BackendError;
use crate::message::Message;
use crate::tool::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A streaming request to the model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendRequest {
    /// The model to use
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.7
}

/// Why the model stopped emitting chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model produced a complete text answer.
    Stop,
    /// The model wants its buffered tool calls executed.
    ToolCalls,
}

/// One incremental piece of a tool call, keyed by position.
///
/// The first fragment for an index typically carries `id` and `name`;
/// later fragments append argument text. Any field may be absent on any
/// fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallFragment {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Indexed tool-call fragments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallFragment>,

    /// Present on the terminal chunk of a model turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<FinishReason>,
}

impl StreamChunk {
    /// A pure content chunk.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::default()
        }
    }

    /// A terminal chunk.
    pub fn finish(reason: FinishReason) -> Self {
        Self {
            finish: Some(reason),
            ..Self::default()
        }
    }
}

/// The model-backend boundary.
///
/// The core treats this as a black box and never retries it: a fault is
/// caught once at the top of the agent loop and surfaced as an error
/// `final` event with any partial content preserved.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai-compat").
    fn name(&self) -> &str;

    /// Send a request and get a stream of response chunks.
    async fn stream(
        &self,
        request: BackendRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, BackendError>>,
        BackendError,
    >;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reason_wire_names() {
        assert_eq!(
            serde_json::to_string(&FinishReason::Stop).unwrap(),
            r#""stop""#
        );
        assert_eq!(
            serde_json::to_string(&FinishReason::ToolCalls).unwrap(),
            r#""tool_calls""#
        );
    }

    #[test]
    fn chunk_constructors() {
        let c = StreamChunk::content("hel");
        assert_eq!(c.content.as_deref(), Some("hel"));
        assert!(c.finish.is_none());

        let f = StreamChunk::finish(FinishReason::ToolCalls);
        assert_eq!(f.finish, Some(FinishReason::ToolCalls));
        assert!(f.tool_calls.is_empty());
    }

    #[test]
    fn fragment_defaults_to_empty_fields() {
        let frag: ToolCallFragment =
            serde_json::from_str(r#"{"index":0,"arguments":"{\"q\""}"#).unwrap();
        assert_eq!(frag.index, 0);
        assert!(frag.id.is_none());
        assert!(frag.name.is_none());
        assert_eq!(frag.arguments.as_deref(), Some("{\"q\""));
    }
}
