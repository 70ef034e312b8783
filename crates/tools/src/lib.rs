//! Tool execution layer and built-in tools for braincast.
//!
//! The executor is the single gate every tool call passes through:
//! registry lookup, write-permission enforcement, argument validation,
//! audit recording, and result sanitization. The built-in tools cover
//! the knowledge-base surface: search, create, score, and note
//! ingestion.

pub mod create_item;
pub mod executor;
pub mod ingest_note;
pub mod sanitize;
pub mod score_item;
pub mod search_items;
pub mod store;

pub use executor::ToolExecutor;
pub use sanitize::{DEPTH_MARKER, REDACTED_MARKER, Sanitizer, TRUNCATION_MARKER};
pub use store::{BrainItem, InMemoryStore, KnowledgeStore, StoreError};

use braincast_core::tool::ToolRegistry;
use std::sync::Arc;

/// Build the default registry over a knowledge store.
pub fn default_registry(store: Arc<dyn KnowledgeStore>) -> ToolRegistry {
    ToolRegistry::build(vec![
        Box::new(search_items::SearchItemsTool::new(store.clone())),
        Box::new(create_item::CreateItemTool::new(store.clone())),
        Box::new(score_item::ScoreItemTool::new(store.clone())),
        Box::new(ingest_note::IngestNoteTool::new(store)),
    ])
}
