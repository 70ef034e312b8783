//! Core domain types for braincast.
//!
//! Everything that flows between the stream orchestrator, the tool
//! execution layer, and the model backend is defined here: messages,
//! the tool contract and registry, the per-request tool context, the
//! backend streaming types, and the error taxonomy.

pub mod backend;
pub mod context;
pub mod error;
pub mod message;
pub mod tool;

pub use backend::{BackendRequest, FinishReason, ModelBackend, StreamChunk, ToolCallFragment};
pub use context::ToolContext;
pub use error::{BackendError, Error, Result, ToolError, ToolErrorCode};
pub use message::{Message, Role, ToolCallRef};
pub use tool::{Tool, ToolDefinition, ToolExecutionResult, ToolRegistry, ToolResponse};
