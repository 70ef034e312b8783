//! brain.ingest_note — store a free-form note.
//!
//! Notes are stored whole; chunking and embedding belong to the external
//! ingestion pipeline, not this tool.

use crate::store::{BrainItem, KnowledgeStore};
use async_trait::async_trait;
use braincast_core::{Tool, ToolContext, ToolError, ToolResponse};
use serde::Deserialize;
use std::sync::Arc;

pub struct IngestNoteTool {
    store: Arc<dyn KnowledgeStore>,
}

impl IngestNoteTool {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
struct Args {
    content: String,
    #[serde(default)]
    source: Option<String>,
}

#[async_trait]
impl Tool for IngestNoteTool {
    fn name(&self) -> &str {
        "brain.ingest_note"
    }

    fn description(&self) -> &str {
        "Store a free-form note in the knowledge base, optionally tagged with its source."
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
                    "description": "The note text"
                },
                "source": {
                    "type": "string",
                    "description": "Where the note came from (url, document name, ...)"
                }
            },
            "required": ["content"]
        })
    }

    fn validate(&self, raw: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = serde_json::from_value(raw.clone())
            .map_err(|e| ToolError::InvalidArguments(format!("brain.ingest_note: {e}")))?;

        if args.content.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "'content' must not be empty".into(),
            ));
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

        let item = BrainItem::new(args.content, vec!["note".into()], args.source);
        let id = self
            .store
            .insert(&ctx.org_id, item)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "brain.ingest_note".into(),
                reason: e.to_string(),
            })?;

        let item_count = self.store.count(&ctx.org_id).await.unwrap_or(0);

        Ok(ToolResponse::new(serde_json::json!({
            "id": id,
            "item_count": item_count,
        })))
    }
}
