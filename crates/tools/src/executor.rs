//! Tool execution — the gate every tool call passes through.
//!
//! Order matters here: lookup, then the write-permission gate, then
//! argument validation, then audit, then the tool itself. The write gate
//! sits before validation so a disabled capability never runs even
//! partially-validated write logic. A fault from `run` is recovered
//! locally and surfaced as a structured error result — nothing
//! propagates to the orchestrator as an unhandled failure.

use crate::sanitize::Sanitizer;
use braincast_audit::{AuditEntry, AuditOutcome, AuditSink, PLACEHOLDER_AUDIT_ID};
use braincast_core::{
    ToolContext, ToolErrorCode, ToolExecutionResult, ToolRegistry, ToolResponse,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Validates, gates, runs, audits, and sanitizes tool calls.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    audit: Arc<dyn AuditSink>,
    sanitizer: Sanitizer,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, audit: Arc<dyn AuditSink>, sanitizer: Sanitizer) -> Self {
        Self {
            registry,
            audit,
            sanitizer,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one tool call.
    ///
    /// Exactly one audit entry transition per call (started → terminal),
    /// and at most one underlying mutation when the tool writes. All
    /// client-bound output is sanitized before it leaves here.
    pub async fn execute(
        &self,
        tool_name: &str,
        raw_args: serde_json::Value,
        ctx: &ToolContext,
    ) -> ToolExecutionResult {
        let Some(tool) = self.registry.lookup(tool_name) else {
            return ToolExecutionResult::Error {
                tool: tool_name.into(),
                code: ToolErrorCode::ToolNotFound,
                message: format!("Tool not found: {tool_name}"),
                details: None,
            };
        };

        // Write gate comes before validation: a capability the caller
        // does not hold must not reach any tool logic at all.
        if tool.writes() && !ctx.allow_writes {
            debug!(tool = tool_name, "Write-gated tool rejected");
            return ToolExecutionResult::Error {
                tool: tool_name.into(),
                code: ToolErrorCode::WriteNotAllowed,
                message: format!("Tool '{tool_name}' writes data, but writes are not allowed in this context"),
                details: None,
            };
        }

        let args = match tool.validate(&raw_args) {
            Ok(args) => args,
            Err(e) => {
                return ToolExecutionResult::Error {
                    tool: tool_name.into(),
                    code: ToolErrorCode::ValidationError,
                    message: e.to_string(),
                    details: Some(raw_args),
                };
            }
        };

        // Audit failure degrades to a placeholder id; it never blocks
        // the call.
        let audit_id = match self
            .audit
            .begin(AuditEntry::started(tool_name, raw_args, ctx))
        {
            Ok(id) => id,
            Err(e) => {
                warn!(tool = tool_name, error = %e, "Audit sink rejected start entry");
                PLACEHOLDER_AUDIT_ID.to_string()
            }
        };

        let start = Instant::now();
        let result = tool.run(args, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                // The audit log keeps the raw response; only the
                // client-bound copy is sanitized.
                let raw_result = serde_json::json!({
                    "data": response.data,
                    "explainability": response.explainability,
                });
                if let Err(e) = self.audit.finish(
                    &audit_id,
                    AuditOutcome::Success {
                        result: raw_result,
                        duration_ms,
                    },
                ) {
                    warn!(tool = tool_name, error = %e, "Audit sink rejected success entry");
                }

                ToolExecutionResult::Success {
                    tool: tool_name.into(),
                    response: ToolResponse {
                        data: self.sanitizer.sanitize(&response.data),
                        explainability: response
                            .explainability
                            .as_ref()
                            .map(|e| self.sanitizer.sanitize(e)),
                    },
                }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(tool = tool_name, error = %message, duration_ms, "Tool execution failed");

                if let Err(audit_err) = self.audit.finish(
                    &audit_id,
                    AuditOutcome::Error {
                        message: message.clone(),
                        duration_ms,
                    },
                ) {
                    warn!(tool = tool_name, error = %audit_err, "Audit sink rejected error entry");
                }

                ToolExecutionResult::Error {
                    tool: tool_name.into(),
                    code: ToolErrorCode::ExecutionError,
                    message,
                    details: None,
                }
            }
        }
    }
}
