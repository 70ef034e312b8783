//! The braincast agent loop.
//!
//! Drives streaming model calls interleaved with tool execution and
//! encodes progress into the outbound frame protocol.

pub mod orchestrator;
pub mod stream_event;
pub mod suggestions;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use orchestrator::{BUDGET_NOTE, ITERATION_NOTE, StreamOrchestrator};
pub use stream_event::{FinalPayload, Frame, FrameEncoder, StreamEvent};
