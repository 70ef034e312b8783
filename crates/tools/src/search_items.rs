//! brain.search_items — keyword search over the knowledge base.

use crate::store::KnowledgeStore;
use async_trait::async_trait;
use braincast_core::{Tool, ToolContext, ToolError, ToolResponse};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;
/// Longest content preview returned per item.
const PREVIEW_LEN: usize = 200;

pub struct SearchItemsTool {
    store: Arc<dyn KnowledgeStore>,
}

impl SearchItemsTool {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
struct Args {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[async_trait]
impl Tool for SearchItemsTool {
    fn name(&self) -> &str {
        "brain.search_items"
    }

    fn description(&self) -> &str {
        "Search the knowledge base for items matching a query. Returns item ids, content previews, tags, and scores."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Keywords to search for"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum items to return (default 10, max 50)"
                }
            },
            "required": ["query"]
        })
    }

    fn validate(&self, raw: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = serde_json::from_value(raw.clone())
            .map_err(|e| ToolError::InvalidArguments(format!("brain.search_items: {e}")))?;

        if args.query.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "'query' must not be empty".into(),
            ));
        }
        if let Some(limit) = args.limit
            && !(1..=MAX_LIMIT).contains(&limit)
        {
            return Err(ToolError::InvalidArguments(format!(
                "'limit' must be between 1 and {MAX_LIMIT}, got {limit}"
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
        let limit = args.limit.unwrap_or(DEFAULT_LIMIT);

        let items = self
            .store
            .search(&ctx.org_id, &args.query, limit)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "brain.search_items".into(),
                reason: e.to_string(),
            })?;

        let count = items.len();
        let results: Vec<serde_json::Value> = items
            .into_iter()
            .map(|item| {
                let preview: String = item.content.chars().take(PREVIEW_LEN).collect();
                serde_json::json!({
                    "id": item.id,
                    "content": preview,
                    "tags": item.tags,
                    "score": item.score,
                })
            })
            .collect();

        Ok(
            ToolResponse::new(serde_json::json!({"items": results, "count": count}))
                .with_explainability(serde_json::json!({
                    "mode": "keyword",
                    "query": args.query,
                    "matched": count,
                })),
        )
    }
}
