//! Error types for the braincast domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all braincast operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model backend errors ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Faults from the language-model backend.
///
/// The orchestrator never retries these; a backend fault is caught once at
/// the top of the loop and surfaced as an error `final` event.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Faults raised by the tool execution layer.
///
/// All four variants map onto a wire-visible [`ToolErrorCode`] and are
/// recovered locally by the executor — they surface to the model as a
/// structured tool-result message, never as an unhandled fault.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Write not allowed: {tool_name} requires write permission")]
    WriteNotAllowed { tool_name: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

impl ToolError {
    /// The wire-protocol error code for this fault.
    pub fn code(&self) -> ToolErrorCode {
        match self {
            Self::NotFound(_) => ToolErrorCode::ToolNotFound,
            Self::WriteNotAllowed { .. } => ToolErrorCode::WriteNotAllowed,
            Self::InvalidArguments(_) => ToolErrorCode::ValidationError,
            Self::ExecutionFailed { .. } => ToolErrorCode::ExecutionError,
        }
    }
}

/// Error codes carried in tool execution results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorCode {
    ToolNotFound,
    WriteNotAllowed,
    ValidationError,
    ExecutionError,
}

impl std::fmt::Display for ToolErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ToolNotFound => "TOOL_NOT_FOUND",
            Self::WriteNotAllowed => "WRITE_NOT_ALLOWED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ExecutionError => "EXECUTION_ERROR",
        };
        write!(f, "{s}")
    }
}
