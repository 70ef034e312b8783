//! brain.score_item — adjust an item's relevance score.

use crate::store::{KnowledgeStore, StoreError};
use async_trait::async_trait;
use braincast_core::{Tool, ToolContext, ToolError, ToolResponse};
use serde::Deserialize;
use std::sync::Arc;

pub struct ScoreItemTool {
    store: Arc<dyn KnowledgeStore>,
}

impl ScoreItemTool {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
struct Args {
    item_id: String,
    score: f64,
}

#[async_trait]
impl Tool for ScoreItemTool {
    fn name(&self) -> &str {
        "brain.score_item"
    }

    fn description(&self) -> &str {
        "Set the relevance score of a knowledge base item. Score is between 0 and 1."
    }

    fn writes(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "item_id": {
                    "type": "string",
                    "description": "Id of the item to score"
                },
                "score": {
                    "type": "number",
                    "description": "New score in [0, 1]"
                }
            },
            "required": ["item_id", "score"]
        })
    }

    fn validate(&self, raw: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = serde_json::from_value(raw.clone())
            .map_err(|e| ToolError::InvalidArguments(format!("brain.score_item: {e}")))?;

        if args.item_id.is_empty() {
            return Err(ToolError::InvalidArguments(
                "'item_id' must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&args.score) {
            return Err(ToolError::InvalidArguments(format!(
                "'score' must be in [0, 1], got {}",
                args.score
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

        // An unknown id passes validation (it is well-formed) but fails
        // execution.
        let previous = self
            .store
            .set_score(&ctx.org_id, &args.item_id, args.score)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(id) => ToolError::ExecutionFailed {
                    tool_name: "brain.score_item".into(),
                    reason: format!("no item with id '{id}'"),
                },
                other => ToolError::ExecutionFailed {
                    tool_name: "brain.score_item".into(),
                    reason: other.to_string(),
                },
            })?;

        Ok(ToolResponse::new(serde_json::json!({
            "item_id": args.item_id,
            "previous_score": previous,
            "score": args.score,
        })))
    }
}
