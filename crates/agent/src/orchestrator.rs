//! The streaming tool-calling agent loop.
//!
//! Drives repeated model calls interleaved with tool execution and
//! streams progress frames to the client. One request moves through
//! awaiting-model, streaming, tool-exec, finalizing, and closed; the
//! closing `final` frame is emitted exactly once on every path except a
//! client abort, where the stream just closes.
//!
//! Two independent circuit breakers bound a request: a per-request tool
//! call budget and a cap on model-call iterations. Tool calls inside a
//! batch run strictly in sequence — the model protocol requires results
//! in call order.

use std::collections::BTreeMap;
use std::sync::Arc;

use braincast_core::{
    BackendRequest, FinishReason, Message, ModelBackend, Role, ToolCallFragment, ToolCallRef,
    ToolContext, ToolErrorCode, ToolExecutionResult,
};
use braincast_tools::ToolExecutor;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::stream_event::{FinalPayload, Frame, FrameEncoder, StreamEvent};
use crate::suggestions;

/// Appended to the final content when the tool budget ran out.
pub const BUDGET_NOTE: &str =
    "Note: the tool call budget for this request was exhausted; remaining calls were skipped.";

/// Appended to the final content when the iteration cap was reached.
pub const ITERATION_NOTE: &str =
    "Note: the reasoning iteration limit for this request was reached.";

/// Annotation for content cut short by an upstream fault.
const INTERRUPTED_ANNOTATION: &str = "[interrupted]";

/// Synthetic tool-result content for budget-rejected calls.
const REJECTED_CALL_MESSAGE: &str =
    "Tool call rejected: the per-request tool budget is exhausted. Answer with what you have; do not request further tool calls.";

const FALLBACK_ERROR_CONTENT: &str =
    "Something went wrong while generating a response. Please try again.";

/// The agent loop: model calls in, frames out.
pub struct StreamOrchestrator {
    backend: Arc<dyn ModelBackend>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    executor: Arc<ToolExecutor>,
    agent_name: String,
    system_prompt: Option<String>,
    /// Per-request tool call budget
    max_tool_calls: u32,
    /// Cap on model-call iterations
    max_iterations: u32,
}

impl StreamOrchestrator {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        model: impl Into<String>,
        temperature: f32,
        executor: Arc<ToolExecutor>,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            temperature,
            max_tokens: None,
            executor,
            agent_name: "braincast".into(),
            system_prompt: None,
            max_tool_calls: 16,
            max_iterations: 8,
        }
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_tool_calls(mut self, max: u32) -> Self {
        self.max_tool_calls = max;
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = name.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Run the loop for one request.
    ///
    /// Returns the receiving end of the frame stream. Dropping the
    /// receiver cancels the request: the loop checks for a closed
    /// channel before each model call, inside the chunk-read loop, and
    /// before each tool invocation, and exits without a `final` frame —
    /// the client is gone, nothing should be written for it.
    pub fn run(&self, mut messages: Vec<Message>, ctx: ToolContext) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel::<Frame>(128);

        if let Some(prompt) = &self.system_prompt
            && !messages.iter().any(|m| m.role == Role::System)
        {
            messages.insert(0, Message::system(prompt));
        }

        let backend = self.backend.clone();
        let executor = self.executor.clone();
        let model = self.model.clone();
        let temperature = self.temperature;
        let max_tokens = self.max_tokens;
        let max_tool_calls = self.max_tool_calls;
        let max_iterations = self.max_iterations;
        let tool_defs = self.executor.registry().definitions();
        let agent_name = self.agent_name.clone();

        tokio::spawn(async move {
            let mut state = RunState {
                tx,
                encoder: FrameEncoder::new(),
                agent_name,
                finalized: false,
            };

            let mut history = messages;
            let mut iterations: u32 = 0;
            let mut tool_calls_used: u32 = 0;
            let mut budget_exhausted = false;
            let mut tools_used: Vec<String> = Vec::new();
            let mut last_text = String::new();

            info!(session = %ctx.session_id, org = %ctx.org_id, "Agent loop starting");

            loop {
                if state.cancelled() {
                    debug!("Client disconnected before model call; closing");
                    return;
                }

                iterations += 1;
                debug!(phase = "awaiting_model", iteration = iterations, "Requesting model turn");

                let request = BackendRequest {
                    model: model.clone(),
                    messages: history.clone(),
                    temperature,
                    max_tokens,
                    tools: tool_defs.clone(),
                };

                let mut chunks = match backend.stream(request).await {
                    Ok(rx) => rx,
                    Err(e) => {
                        warn!(error = %e, "Backend call failed");
                        state.finalize_error(&last_text).await;
                        return;
                    }
                };

                // Consume the model turn: content fragments stream out as
                // deltas, tool-call fragments accumulate by index until a
                // finish reason arrives.
                let mut turn_text = String::new();
                let mut pending: BTreeMap<u32, ToolCallRef> = BTreeMap::new();
                let mut finish: Option<FinishReason> = None;

                while let Some(chunk_result) = chunks.recv().await {
                    if state.cancelled() {
                        debug!("Client disconnected mid-stream; closing");
                        return;
                    }

                    match chunk_result {
                        Ok(chunk) => {
                            for frag in &chunk.tool_calls {
                                accumulate_fragment(&mut pending, frag);
                            }

                            if let Some(text) = &chunk.content
                                && !text.is_empty()
                            {
                                turn_text.push_str(text);
                                if !state
                                    .emit(StreamEvent::Delta {
                                        content: text.clone(),
                                    })
                                    .await
                                {
                                    return;
                                }
                            }

                            if let Some(reason) = chunk.finish {
                                finish = Some(reason);
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Model stream interrupted");
                            state.finalize_error(&turn_text).await;
                            return;
                        }
                    }
                }

                let Some(finish) = finish else {
                    warn!("Model stream ended without a finish reason");
                    state.finalize_error(&turn_text).await;
                    return;
                };

                last_text = turn_text.clone();

                if finish == FinishReason::Stop {
                    history.push(Message::assistant(&turn_text));
                    state
                        .finalize_success(
                            &turn_text,
                            &tools_used,
                            &exhaustion_notes(budget_exhausted, false),
                        )
                        .await;
                    return;
                }

                // Refs without both id and name can never be answered, so
                // they must not enter the model-facing history.
                let calls: Vec<ToolCallRef> = pending
                    .into_values()
                    .filter(|r| {
                        if r.is_valid() {
                            true
                        } else {
                            warn!(id = %r.id, name = %r.name, "Discarding incomplete tool call ref");
                            false
                        }
                    })
                    .collect();

                if calls.is_empty() {
                    // Nothing executable survived: treat like a plain stop.
                    history.push(Message::assistant(&turn_text));
                    state
                        .finalize_success(
                            &turn_text,
                            &tools_used,
                            &exhaustion_notes(budget_exhausted, false),
                        )
                        .await;
                    return;
                }

                history.push(Message::assistant_tool_calls(
                    Some(turn_text.clone()),
                    calls.clone(),
                ));

                for call in &calls {
                    if state.cancelled() {
                        debug!("Client disconnected before tool call; closing");
                        return;
                    }

                    tool_calls_used += 1;
                    if tool_calls_used > max_tool_calls {
                        // The protocol still requires one result per issued
                        // call; synthesize it without running the tool.
                        budget_exhausted = true;
                        debug!(tool = %call.name, "Tool budget exhausted; synthesizing rejection");
                        history.push(Message::tool_result(&call.id, REJECTED_CALL_MESSAGE));
                        continue;
                    }

                    if !state
                        .emit(StreamEvent::ToolStart {
                            tool: call.name.clone(),
                        })
                        .await
                    {
                        return;
                    }

                    // Unparseable arguments are a tool-level failure: the
                    // loop continues so the model can retry corrected.
                    let result = match parse_arguments(&call.arguments) {
                        Ok(raw_args) => executor.execute(&call.name, raw_args, &ctx).await,
                        Err(reason) => ToolExecutionResult::Error {
                            tool: call.name.clone(),
                            code: ToolErrorCode::ValidationError,
                            message: reason,
                            details: Some(serde_json::Value::String(call.arguments.clone())),
                        },
                    };

                    tools_used.push(call.name.clone());

                    let event = match &result {
                        ToolExecutionResult::Success { tool, response } => {
                            StreamEvent::ToolResult {
                                tool: tool.clone(),
                                data: response.data.clone(),
                                explainability: response
                                    .explainability
                                    .clone()
                                    .unwrap_or(serde_json::Value::Null),
                                error: false,
                            }
                        }
                        ToolExecutionResult::Error {
                            tool,
                            code,
                            message,
                            details,
                        } => StreamEvent::ToolResult {
                            tool: tool.clone(),
                            data: serde_json::json!({
                                "code": code,
                                "message": message,
                                "details": details,
                            }),
                            explainability: serde_json::Value::Null,
                            error: true,
                        },
                    };
                    if !state.emit(event).await {
                        return;
                    }

                    history.push(Message::tool_result(&call.id, tool_message_content(&result)));
                }

                if iterations >= max_iterations {
                    warn!(iterations, "Iteration cap reached");
                    state
                        .finalize_success(
                            &turn_text,
                            &tools_used,
                            &exhaustion_notes(budget_exhausted, true),
                        )
                        .await;
                    return;
                }
            }
        });

        rx
    }
}

/// Per-request output state: the frame channel, the encoder, and the
/// finalization guard.
struct RunState {
    tx: mpsc::Sender<Frame>,
    encoder: FrameEncoder,
    agent_name: String,
    finalized: bool,
}

impl RunState {
    fn cancelled(&self) -> bool {
        self.tx.is_closed()
    }

    /// Encode and send one event. Returns false when the client is gone
    /// or the stream is already closed.
    async fn emit(&mut self, event: StreamEvent) -> bool {
        let Some(frame) = self.encoder.encode(event) else {
            return false;
        };
        self.tx.send(frame).await.is_ok()
    }

    /// Close the stream with a success `final`. Idempotent — only the
    /// first call produces output.
    async fn finalize_success(&mut self, content: &str, tools_used: &[String], notes: &[&str]) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        let mut content = content.trim_end().to_string();
        for note in notes {
            if !content.is_empty() {
                content.push_str("\n\n");
            }
            content.push_str(note);
        }

        let payload = FinalPayload {
            agent: self.agent_name.clone(),
            next_actions: suggestions::derive_next_actions(&content, tools_used),
            content,
        };
        let _ = self.emit(StreamEvent::Final { payload }).await;
    }

    /// Close the stream with an error `final`, preserving any partial
    /// content. Idempotent.
    async fn finalize_error(&mut self, partial: &str) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        let content = if partial.trim().is_empty() {
            FALLBACK_ERROR_CONTENT.to_string()
        } else {
            format!("{}\n\n{INTERRUPTED_ANNOTATION}", partial.trim_end())
        };

        let payload = FinalPayload {
            agent: self.agent_name.clone(),
            content,
            next_actions: suggestions::error_next_actions(),
        };
        let _ = self.emit(StreamEvent::Final { payload }).await;
    }
}

/// Fold one indexed fragment into the pending call at its position.
///
/// The first fragment for an index starts the ref; later fragments
/// append whatever pieces they carry.
fn accumulate_fragment(pending: &mut BTreeMap<u32, ToolCallRef>, frag: &ToolCallFragment) {
    let entry = pending.entry(frag.index).or_insert_with(|| ToolCallRef {
        id: String::new(),
        name: String::new(),
        arguments: String::new(),
    });

    if let Some(id) = &frag.id {
        entry.id.push_str(id);
    }
    if let Some(name) = &frag.name {
        entry.name.push_str(name);
    }
    if let Some(args) = &frag.arguments {
        entry.arguments.push_str(args);
    }
}

/// Parse streamed argument text. An empty string means "no arguments".
fn parse_arguments(raw: &str) -> Result<serde_json::Value, String> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw).map_err(|e| format!("tool arguments are not valid JSON: {e}"))
}

/// The tool-result message content the model sees.
fn tool_message_content(result: &ToolExecutionResult) -> String {
    match result {
        ToolExecutionResult::Success { response, .. } => {
            serde_json::to_string(&response.data).unwrap_or_else(|_| "{}".into())
        }
        ToolExecutionResult::Error { code, message, .. } => serde_json::json!({
            "ok": false,
            "error": { "code": code, "message": message },
            "hint": "The call failed; adjust the arguments or try a different tool.",
        })
        .to_string(),
    }
}

fn exhaustion_notes(budget_exhausted: bool, iterations_exhausted: bool) -> Vec<&'static str> {
    let mut notes = Vec::new();
    if budget_exhausted {
        notes.push(BUDGET_NOTE);
    }
    if iterations_exhausted {
        notes.push(ITERATION_NOTE);
    }
    notes
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use braincast_audit::MemoryAuditLog;
    use braincast_core::BackendError;
    use braincast_tools::{BrainItem, InMemoryStore, KnowledgeStore, Sanitizer, default_registry};

    struct Fixture {
        orchestrator: StreamOrchestrator,
        audit: Arc<MemoryAuditLog>,
        backend: Arc<ScriptedBackend>,
        #[allow(dead_code)]
        store: Arc<InMemoryStore>,
    }

    async fn fixture(backend: ScriptedBackend) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert(
                "org_1",
                BrainItem::new("Watering schedule for ferns", vec!["garden".into()], None),
            )
            .await
            .unwrap();

        let audit = Arc::new(MemoryAuditLog::new());
        let executor = Arc::new(ToolExecutor::new(
            Arc::new(default_registry(store.clone())),
            audit.clone(),
            Sanitizer::default(),
        ));

        let backend = Arc::new(backend);
        let orchestrator =
            StreamOrchestrator::new(backend.clone(), "mock-model", 0.7, executor);

        Fixture {
            orchestrator,
            audit,
            backend,
            store,
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::new("org_1", "sess_1")
    }

    async fn collect(mut rx: mpsc::Receiver<Frame>) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    fn finals(frames: &[Frame]) -> Vec<&FinalPayload> {
        frames
            .iter()
            .filter_map(|f| match &f.event {
                StreamEvent::Final { payload } => Some(payload),
                _ => None,
            })
            .collect()
    }

    fn tool_starts(frames: &[Frame]) -> Vec<&str> {
        frames
            .iter()
            .filter_map(|f| match &f.event {
                StreamEvent::ToolStart { tool } => Some(tool.as_str()),
                _ => None,
            })
            .collect()
    }

    fn tool_results(frames: &[Frame]) -> Vec<(&str, bool)> {
        frames
            .iter()
            .filter_map(|f| match &f.event {
                StreamEvent::ToolResult { tool, error, .. } => Some((tool.as_str(), *error)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn streams_text_then_final() {
        let f = fixture(ScriptedBackend::single_text("Hello there")).await;
        let frames = collect(f.orchestrator.run(vec![Message::user("hi")], ctx())).await;

        let text: String = frames
            .iter()
            .filter_map(|f| match &f.event {
                StreamEvent::Delta { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Hello there");

        let finals = finals(&frames);
        assert_eq!(finals.len(), 1, "exactly one final");
        assert_eq!(finals[0].agent, "braincast");
        assert_eq!(finals[0].content, "Hello there");
        assert!(matches!(
            frames.last().unwrap().event,
            StreamEvent::Final { .. }
        ));
    }

    #[tokio::test]
    async fn search_call_then_answer_matches_protocol() {
        let f = fixture(ScriptedBackend::new(vec![
            tool_call_turn(&[("call_1", "brain.search_items", r#"{"query":"ferns"}"#)]),
            text_turn("Found your watering schedule."),
        ]))
        .await;

        let frames = collect(
            f.orchestrator
                .run(vec![Message::user("search for ferns")], ctx()),
        )
        .await;

        assert_eq!(tool_starts(&frames), vec!["brain.search_items"]);
        assert_eq!(tool_results(&frames), vec![("brain.search_items", false)]);
        assert_eq!(finals(&frames).len(), 1);
        assert!(matches!(
            frames.last().unwrap().event,
            StreamEvent::Final { .. }
        ));
        assert_eq!(f.backend.calls(), 2);
    }

    #[tokio::test]
    async fn pairing_invariant_holds_for_batches() {
        let f = fixture(ScriptedBackend::new(vec![
            tool_call_turn(&[
                ("call_1", "brain.search_items", r#"{"query":"ferns"}"#),
                ("call_2", "brain.search_items", r#"{"query":"budget"}"#),
            ]),
            text_turn("Done."),
        ]))
        .await;

        let frames = collect(f.orchestrator.run(vec![Message::user("go")], ctx())).await;

        let starts = tool_starts(&frames);
        let results = tool_results(&frames);
        assert_eq!(starts.len(), results.len());
        for (i, start) in starts.iter().enumerate() {
            assert_eq!(*start, results[i].0, "start/result name mismatch at {i}");
        }

        // Every start precedes its result.
        let mut start_positions = vec![];
        let mut result_positions = vec![];
        for (pos, frame) in frames.iter().enumerate() {
            match &frame.event {
                StreamEvent::ToolStart { .. } => start_positions.push(pos),
                StreamEvent::ToolResult { .. } => result_positions.push(pos),
                _ => {}
            }
        }
        for (s, r) in start_positions.iter().zip(&result_positions) {
            assert!(s < r);
        }
    }

    #[tokio::test]
    async fn invalid_ref_discarded_and_treated_as_stop() {
        // A fragment with arguments but no name can never be executed.
        let f = fixture(ScriptedBackend::new(vec![vec![
            Ok(fragment_chunk(0, Some("call_1"), None, Some(r#"{"query":"x"}"#))),
            Ok(braincast_core::StreamChunk::finish(FinishReason::ToolCalls)),
        ]]))
        .await;

        let frames = collect(f.orchestrator.run(vec![Message::user("go")], ctx())).await;

        assert!(tool_starts(&frames).is_empty());
        assert!(tool_results(&frames).is_empty());
        assert_eq!(finals(&frames).len(), 1);
        assert_eq!(f.backend.calls(), 1, "loop must not re-enter the model");
        assert_eq!(f.audit.count(), 0);
    }

    #[tokio::test]
    async fn write_gated_tool_error_lets_loop_continue() {
        let f = fixture(ScriptedBackend::new(vec![
            tool_call_turn(&[("call_1", "brain.create_item", r#"{"content":"note"}"#)]),
            text_turn("I could not save that."),
        ]))
        .await;

        // allow_writes defaults to false
        let frames = collect(f.orchestrator.run(vec![Message::user("save it")], ctx())).await;

        let results = tool_results(&frames);
        assert_eq!(results, vec![("brain.create_item", true)]);

        let error_frame = frames
            .iter()
            .find_map(|f| match &f.event {
                StreamEvent::ToolResult { data, error, .. } if *error => Some(data.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(error_frame["code"], serde_json::json!("WRITE_NOT_ALLOWED"));

        assert_eq!(finals(&frames).len(), 1);
        assert_eq!(f.backend.calls(), 2, "model gets to react to the failure");
    }

    #[tokio::test]
    async fn non_json_arguments_recovered_locally() {
        let f = fixture(ScriptedBackend::new(vec![
            tool_call_turn(&[("call_1", "brain.search_items", r#"{"query": broken"#)]),
            text_turn("Let me try again later."),
        ]))
        .await;

        let frames = collect(f.orchestrator.run(vec![Message::user("go")], ctx())).await;

        let results = tool_results(&frames);
        assert_eq!(results, vec![("brain.search_items", true)]);

        let error_frame = frames
            .iter()
            .find_map(|f| match &f.event {
                StreamEvent::ToolResult { data, error, .. } if *error => Some(data.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(error_frame["code"], serde_json::json!("VALIDATION_ERROR"));

        // The loop went back to the model and closed normally.
        assert_eq!(finals(&frames).len(), 1);
        assert_eq!(f.backend.calls(), 2);
    }

    #[tokio::test]
    async fn budget_enforced_with_synthetic_rejections() {
        let f = fixture(ScriptedBackend::repeating(tool_call_turn(&[(
            "call_1",
            "brain.search_items",
            r#"{"query":"ferns"}"#,
        )])))
        .await;

        let orchestrator = f
            .orchestrator
            .with_max_tool_calls(2)
            .with_max_iterations(4);

        let frames = collect(orchestrator.run(vec![Message::user("loop")], ctx())).await;

        assert_eq!(
            tool_starts(&frames).len(),
            2,
            "no tool may run past the budget"
        );
        assert_eq!(f.audit.count(), 2, "skipped calls never reach the executor");

        let finals = finals(&frames);
        assert_eq!(finals.len(), 1);
        assert!(finals[0].content.contains("tool call budget"));
    }

    #[tokio::test]
    async fn iteration_cap_bounds_model_calls() {
        let f = fixture(ScriptedBackend::repeating(tool_call_turn(&[(
            "call_1",
            "brain.search_items",
            r#"{"query":"ferns"}"#,
        )])))
        .await;

        let orchestrator = f.orchestrator.with_max_iterations(2);
        let frames = collect(orchestrator.run(vec![Message::user("loop")], ctx())).await;

        assert_eq!(f.backend.calls(), 2);
        let finals = finals(&frames);
        assert_eq!(finals.len(), 1);
        assert!(finals[0].content.contains("iteration limit"));
    }

    #[tokio::test]
    async fn backend_fault_yields_error_final() {
        let f = fixture(ScriptedBackend::new(vec![])).await;
        let frames = collect(f.orchestrator.run(vec![Message::user("hi")], ctx())).await;

        assert_eq!(frames.len(), 1);
        let finals = finals(&frames);
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].next_actions, suggestions::error_next_actions());
        assert!(finals[0].content.contains("try again") || finals[0].content.contains("Try again"));
    }

    #[tokio::test]
    async fn interrupted_stream_preserves_partial_content() {
        let f = fixture(ScriptedBackend::new(vec![vec![
            Ok(braincast_core::StreamChunk::content("Partial answer")),
            Err(BackendError::StreamInterrupted("connection reset".into())),
        ]]))
        .await;

        let frames = collect(f.orchestrator.run(vec![Message::user("hi")], ctx())).await;

        let finals = finals(&frames);
        assert_eq!(finals.len(), 1);
        assert!(finals[0].content.contains("Partial answer"));
        assert!(finals[0].content.contains("[interrupted]"));
    }

    #[tokio::test]
    async fn frame_ids_strictly_increase() {
        let f = fixture(ScriptedBackend::new(vec![
            tool_call_turn(&[("call_1", "brain.search_items", r#"{"query":"ferns"}"#)]),
            text_turn("Done."),
        ]))
        .await;

        let frames = collect(f.orchestrator.run(vec![Message::user("go")], ctx())).await;
        for pair in frames.windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[tokio::test]
    async fn tool_start_frames_never_leak_arguments() {
        let f = fixture(ScriptedBackend::new(vec![
            tool_call_turn(&[(
                "call_1",
                "brain.search_items",
                r#"{"query":"super-secret-needle"}"#,
            )]),
            text_turn("Done."),
        ]))
        .await;

        let frames = collect(f.orchestrator.run(vec![Message::user("go")], ctx())).await;

        for frame in &frames {
            if let StreamEvent::ToolStart { .. } = frame.event {
                let json = serde_json::to_value(&frame.event).unwrap();
                let obj = json.as_object().unwrap();
                assert!(!obj.contains_key("args"));
                assert!(!obj.contains_key("arguments"));
                assert!(!json.to_string().contains("super-secret-needle"));
            }
        }
    }

    #[tokio::test]
    async fn fragments_accumulate_across_chunks() {
        // id, name, and argument text all arrive in pieces.
        let f = fixture(ScriptedBackend::new(vec![
            vec![
                Ok(fragment_chunk(0, Some("call_"), Some("brain.se"), None)),
                Ok(fragment_chunk(0, Some("1"), Some("arch_items"), Some(r#"{"query":"#))),
                Ok(fragment_chunk(0, None, None, Some(r#""ferns"}"#))),
                Ok(braincast_core::StreamChunk::finish(FinishReason::ToolCalls)),
            ],
            text_turn("Assembled."),
        ]))
        .await;

        let frames = collect(f.orchestrator.run(vec![Message::user("go")], ctx())).await;

        assert_eq!(tool_starts(&frames), vec!["brain.search_items"]);
        assert_eq!(tool_results(&frames), vec![("brain.search_items", false)]);
    }

    #[tokio::test]
    async fn system_prompt_prepended_once() {
        let f = fixture(ScriptedBackend::single_text("ok")).await;
        let orchestrator = f.orchestrator.with_system_prompt("You are a brain.");

        // Just exercises the path; history is internal, so assert the
        // stream still behaves.
        let frames = collect(orchestrator.run(vec![Message::user("hi")], ctx())).await;
        assert_eq!(finals(&frames).len(), 1);
    }

    #[test]
    fn argument_parsing_rules() {
        assert_eq!(parse_arguments("").unwrap(), serde_json::json!({}));
        assert_eq!(
            parse_arguments(r#"{"a":1}"#).unwrap(),
            serde_json::json!({"a":1})
        );
        assert!(parse_arguments("{oops").is_err());
    }

    #[test]
    fn exhaustion_note_combinations() {
        assert!(exhaustion_notes(false, false).is_empty());
        assert_eq!(exhaustion_notes(true, false), vec![BUDGET_NOTE]);
        assert_eq!(
            exhaustion_notes(true, true),
            vec![BUDGET_NOTE, ITERATION_NOTE]
        );
    }
}
