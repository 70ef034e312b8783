//! Tool trait — the contract every agent capability implements.
//!
//! A tool declares its name, whether it mutates state, a pure argument
//! validator, and an execution function. The registry is assembled once
//! at process start and is lookup-only afterward.

use crate::context::ToolContext;
use crate::error::{ToolError, ToolErrorCode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The payload a tool returns on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Tool-specific result data
    pub data: serde_json::Value,

    /// Free-form audit annotation. Never shown to a client without
    /// passing through the sanitizer first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explainability: Option<serde_json::Value>,
}

impl ToolResponse {
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            data,
            explainability: None,
        }
    }

    pub fn with_explainability(mut self, note: serde_json::Value) -> Self {
        self.explainability = Some(note);
        self
    }
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// Whether this tool mutates state (write-gated).
    pub writes: bool,
    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// The core Tool trait.
///
/// `validate` must be pure: it parses and checks raw arguments without
/// side effects, failing fast with a descriptive error. `run` may mutate
/// state only if `writes()` is true — that separation is what lets the
/// executor gate writes before any business logic executes.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "brain.search_items").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// Whether this tool mutates state.
    fn writes(&self) -> bool {
        false
    }

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Parse and check raw arguments, returning the normalized form
    /// `run` will receive. Pure — no side effects.
    fn validate(&self, raw: &serde_json::Value) -> Result<serde_json::Value, ToolError>;

    /// Execute the tool with validated arguments.
    async fn run(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResponse, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            writes: self.writes(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The registry of available tools.
///
/// Built exactly once via [`ToolRegistry::build`]; no runtime add or
/// remove. Safe to share across concurrent requests without locking.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Assemble a registry from a fixed tool set.
    ///
    /// A later tool with the same name replaces an earlier one.
    pub fn build(tools: Vec<Box<dyn Tool>>) -> Self {
        let mut map = HashMap::new();
        for tool in tools {
            map.insert(tool.name().to_string(), tool);
        }
        Self { tools: map }
    }

    /// Get a tool by name.
    pub fn lookup(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// The outcome of one executor invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolExecutionResult {
    Success {
        tool: String,
        response: ToolResponse,
    },
    Error {
        tool: String,
        code: ToolErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

impl ToolExecutionResult {
    pub fn tool_name(&self) -> &str {
        match self {
            Self::Success { tool, .. } | Self::Error { tool, .. } => tool,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error_code(&self) -> Option<ToolErrorCode> {
        match self {
            Self::Success { .. } => None,
            Self::Error { code, .. } => Some(*code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        fn validate(&self, raw: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
            if raw.get("text").and_then(|t| t.as_str()).is_none() {
                return Err(ToolError::InvalidArguments(
                    "Missing 'text' argument".into(),
                ));
            }
            Ok(raw.clone())
        }
        async fn run(
            &self,
            args: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolResponse, ToolError> {
            Ok(ToolResponse::new(args["text"].clone()))
        }
    }

    #[test]
    fn build_and_lookup() {
        let registry = ToolRegistry::build(vec![Box::new(EchoTool)]);
        assert!(registry.lookup("echo").is_some());
        assert!(registry.lookup("nonexistent").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn definitions_carry_writes_flag() {
        let registry = ToolRegistry::build(vec![Box::new(EchoTool)]);
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert!(!defs[0].writes);
    }

    #[tokio::test]
    async fn run_after_validate() {
        let registry = ToolRegistry::build(vec![Box::new(EchoTool)]);
        let tool = registry.lookup("echo").unwrap();
        let ctx = ToolContext::new("org", "sess");

        let raw = serde_json::json!({"text": "hello"});
        let args = tool.validate(&raw).unwrap();
        let response = tool.run(args, &ctx).await.unwrap();
        assert_eq!(response.data, serde_json::json!("hello"));
    }

    #[test]
    fn validate_rejects_missing_field() {
        let tool = EchoTool;
        let err = tool.validate(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn execution_result_serializes_code() {
        let result = ToolExecutionResult::Error {
            tool: "echo".into(),
            code: ToolErrorCode::ToolNotFound,
            message: "Tool not found: echo".into(),
            details: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("TOOL_NOT_FOUND"));
        assert!(!result.is_success());
        assert_eq!(result.error_code(), Some(ToolErrorCode::ToolNotFound));
    }
}
