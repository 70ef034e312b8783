//! HTTP API v1 — the exposed surface of the orchestrator.
//!
//! Endpoints:
//!
//! - `POST /v1/chat/stream`  — Send messages, receive an SSE frame stream
//! - `POST /v1/tools/invoke` — Invoke one tool synchronously
//! - `GET  /v1/tools`        — List available tools

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, Sse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use braincast_agent::StreamOrchestrator;
use braincast_core::{Message, ToolContext, ToolExecutionResult};

use crate::SharedState;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat/stream", post(chat_stream_handler))
        .route("/tools", get(list_tools_handler))
        .route("/tools/invoke", post(invoke_tool_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatStreamRequest {
    messages: Vec<ChatMessageDto>,
    #[serde(default)]
    context: Option<ContextDto>,
}

#[derive(Deserialize)]
struct ChatMessageDto {
    role: String,
    content: String,
}

/// The caller-supplied identity and permission envelope.
#[derive(Deserialize, Default)]
struct ContextDto {
    #[serde(default)]
    org_id: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    allow_writes: bool,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ContextDto {
    fn into_tool_context(self) -> ToolContext {
        let mut ctx = ToolContext::new(
            self.org_id.unwrap_or_else(|| "default".into()),
            self.session_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        )
        .with_writes(self.allow_writes);
        if let Some(user_id) = self.user_id {
            ctx = ctx.with_user(user_id);
        }
        if let Some(metadata) = self.metadata {
            ctx = ctx.with_metadata(metadata);
        }
        ctx
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct InvokeToolRequest {
    #[serde(alias = "toolName")]
    tool_name: String,
    #[serde(default)]
    args: serde_json::Value,
    #[serde(default)]
    context: Option<ContextDto>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum InvokeToolResponse {
    Ok {
        ok: bool,
        tool: String,
        data: serde_json::Value,
        explainability: serde_json::Value,
    },
    Err {
        ok: bool,
        tool: String,
        error: InvokeErrorDto,
    },
}

#[derive(Serialize)]
struct InvokeErrorDto {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolDto>,
    count: usize,
}

#[derive(Serialize)]
struct ToolDto {
    name: String,
    description: String,
    writes: bool,
    parameters: serde_json::Value,
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// `POST /v1/chat/stream` — run the agent loop, stream frames over SSE.
///
/// Each SSE event carries the frame id in the `id` field, the event type
/// in the `event` field, and the serialized event as data.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatStreamRequest>,
) -> Result<
    Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>,
    (StatusCode, Json<ErrorResponse>),
> {
    if payload.messages.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "messages must not be empty".into(),
            }),
        ));
    }

    let mut messages = Vec::with_capacity(payload.messages.len());
    for dto in payload.messages {
        messages.push(to_message(dto).map_err(|error| {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
        })?);
    }

    let ctx = payload.context.unwrap_or_default().into_tool_context();
    info!(session = %ctx.session_id, "v1/chat/stream request");

    let orchestrator = StreamOrchestrator::new(
        state.backend.clone(),
        state.config.backend.model.clone(),
        state.config.backend.temperature,
        state.executor.clone(),
    )
    .with_max_tokens(state.config.backend.max_tokens)
    .with_max_tool_calls(state.config.limits.max_tool_calls)
    .with_max_iterations(state.config.limits.max_iterations)
    .with_agent_name(state.config.gateway.agent_name.clone());

    let rx = orchestrator.run(messages, ctx);

    let stream = ReceiverStream::new(rx).map(|frame| {
        let data = serde_json::to_string(&frame.event).unwrap_or_default();
        Ok(SseEvent::default()
            .id(frame.id.to_string())
            .event(frame.event.event_type())
            .data(data))
    });

    Ok(Sse::new(stream))
}

fn to_message(dto: ChatMessageDto) -> Result<Message, String> {
    match dto.role.as_str() {
        "user" => Ok(Message::user(dto.content)),
        "assistant" => Ok(Message::assistant(dto.content)),
        "system" => Ok(Message::system(dto.content)),
        other => Err(format!(
            "Unknown role '{other}'. Use 'user', 'assistant', or 'system'."
        )),
    }
}

/// `POST /v1/tools/invoke` — synchronous tool invocation.
///
/// Tool-level failures come back inside the envelope with HTTP 200; only
/// malformed requests get a 4xx.
async fn invoke_tool_handler(
    State(state): State<SharedState>,
    Json(payload): Json<InvokeToolRequest>,
) -> Json<InvokeToolResponse> {
    let ctx = payload.context.unwrap_or_default().into_tool_context();
    let args = if payload.args.is_null() {
        serde_json::json!({})
    } else {
        payload.args
    };

    info!(tool = %payload.tool_name, session = %ctx.session_id, "v1/tools/invoke request");

    let result = state.executor.execute(&payload.tool_name, args, &ctx).await;

    Json(match result {
        ToolExecutionResult::Success { tool, response } => InvokeToolResponse::Ok {
            ok: true,
            tool,
            data: response.data,
            explainability: response
                .explainability
                .unwrap_or(serde_json::Value::Null),
        },
        ToolExecutionResult::Error {
            tool,
            code,
            message,
            details,
        } => InvokeToolResponse::Err {
            ok: false,
            tool,
            error: InvokeErrorDto {
                code: code.to_string(),
                message,
                details,
            },
        },
    })
}

async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let defs = state.executor.registry().definitions();
    let count = defs.len();

    Json(ToolListResponse {
        tools: defs
            .into_iter()
            .map(|d| ToolDto {
                name: d.name,
                description: d.description,
                writes: d.writes,
                parameters: d.parameters,
            })
            .collect(),
        count,
    })
}
