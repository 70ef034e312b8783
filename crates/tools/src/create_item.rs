//! brain.create_item — add an item to the knowledge base.

use crate::store::{BrainItem, KnowledgeStore};
use async_trait::async_trait;
use braincast_core::{Tool, ToolContext, ToolError, ToolResponse};
use serde::Deserialize;
use std::sync::Arc;

const MAX_CONTENT_LEN: usize = 20_000;

pub struct CreateItemTool {
    store: Arc<dyn KnowledgeStore>,
}

impl CreateItemTool {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
struct Args {
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[async_trait]
impl Tool for CreateItemTool {
    fn name(&self) -> &str {
        "brain.create_item"
    }

    fn description(&self) -> &str {
        "Create a new item in the knowledge base with optional tags."
    }

    fn writes(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The item content"
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional tags"
                }
            },
            "required": ["content"]
        })
    }

    fn validate(&self, raw: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = serde_json::from_value(raw.clone())
            .map_err(|e| ToolError::InvalidArguments(format!("brain.create_item: {e}")))?;

        if args.content.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "'content' must not be empty".into(),
            ));
        }
        if args.content.chars().count() > MAX_CONTENT_LEN {
            return Err(ToolError::InvalidArguments(format!(
                "'content' exceeds {MAX_CONTENT_LEN} characters"
            )));
        }
        Ok(raw.clone())
    }

    async fn run(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResponse, ToolError> {
        let args: Args = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let item = BrainItem::new(args.content, args.tags, None);
        let id = self
            .store
            .insert(&ctx.org_id, item)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "brain.create_item".into(),
                reason: e.to_string(),
            })?;

        Ok(ToolResponse::new(serde_json::json!({"id": id}))
            .with_explainability(serde_json::json!({"org_id": ctx.org_id})))
    }
}
