//! Shared test helpers for orchestrator tests.

use braincast_core::{
    BackendError, BackendRequest, FinishReason, ModelBackend, StreamChunk, ToolCallFragment,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// One scripted model turn: the chunk sequence a single `stream` call
/// will replay.
pub type Turn = Vec<Result<StreamChunk, BackendError>>;

/// A mock backend that replays scripted turns.
///
/// Each call to `stream` consumes the next turn. An exhausted script
/// fails the call, which exercises the orchestrator's backend-fault
/// path. With `repeating`, the single turn replays forever — useful for
/// circuit-breaker tests.
pub struct ScriptedBackend {
    turns: Mutex<Vec<Turn>>,
    repeat_last: bool,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns: Mutex::new(turns),
            repeat_last: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A backend that replays one turn forever.
    pub fn repeating(turn: Turn) -> Self {
        Self {
            turns: Mutex::new(vec![turn]),
            repeat_last: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// A backend that streams a single text answer.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![text_turn(text)])
    }

    /// How many model calls were made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(
        &self,
        _request: BackendRequest,
    ) -> Result<mpsc::Receiver<Result<StreamChunk, BackendError>>, BackendError> {
        let turn = {
            let mut turns = self.turns.lock().unwrap_or_else(|e| e.into_inner());
            if turns.is_empty() {
                return Err(BackendError::Network("scripted backend exhausted".into()));
            }
            if self.repeat_last {
                turns[0].clone()
            } else {
                turns.remove(0)
            }
        };
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for item in turn {
                if tx.send(item).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

/// A turn that streams text in two deltas and stops.
pub fn text_turn(text: &str) -> Turn {
    let mid = text.len() / 2;
    let (head, tail) = text.split_at(mid);
    let mut chunks: Turn = Vec::new();
    if !head.is_empty() {
        chunks.push(Ok(StreamChunk::content(head)));
    }
    if !tail.is_empty() {
        chunks.push(Ok(StreamChunk::content(tail)));
    }
    chunks.push(Ok(StreamChunk::finish(FinishReason::Stop)));
    chunks
}

/// A turn that issues the given `(id, name, arguments)` calls, splitting
/// each across a header fragment and an arguments fragment the way real
/// backends do, then finishes with `tool_calls`.
pub fn tool_call_turn(calls: &[(&str, &str, &str)]) -> Turn {
    let mut chunks: Turn = Vec::new();
    for (i, (id, name, args)) in calls.iter().enumerate() {
        chunks.push(Ok(fragment_chunk(i as u32, Some(id), Some(name), None)));
        chunks.push(Ok(fragment_chunk(i as u32, None, None, Some(args))));
    }
    chunks.push(Ok(StreamChunk::finish(FinishReason::ToolCalls)));
    chunks
}

/// A chunk carrying a single tool-call fragment.
pub fn fragment_chunk(
    index: u32,
    id: Option<&str>,
    name: Option<&str>,
    arguments: Option<&str>,
) -> StreamChunk {
    StreamChunk {
        content: None,
        tool_calls: vec![ToolCallFragment {
            index,
            id: id.map(String::from),
            name: name.map(String::from),
            arguments: arguments.map(String::from),
        }],
        finish: None,
    }
}
