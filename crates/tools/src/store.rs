//! Knowledge store boundary.
//!
//! The persistent knowledge base lives outside this system; tools reach
//! it through the `KnowledgeStore` trait. An in-memory implementation
//! with simple keyword matching backs tests and single-node deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// One item in the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainItem {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Relevance/priority score in [0, 1]
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BrainItem {
    pub fn new(content: impl Into<String>, tags: Vec<String>, source: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            tags,
            score: 0.5,
            source,
            created_at: Utc::now(),
        }
    }
}

/// The external knowledge base, scoped per organization.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Keyword search over an organization's items.
    async fn search(
        &self,
        org_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<BrainItem>, StoreError>;

    /// Insert an item, returning its id.
    async fn insert(&self, org_id: &str, item: BrainItem) -> Result<String, StoreError>;

    /// Update an item's score, returning the previous value.
    async fn set_score(
        &self,
        org_id: &str,
        item_id: &str,
        score: f64,
    ) -> Result<f64, StoreError>;

    /// Number of items stored for an organization.
    async fn count(&self, org_id: &str) -> Result<usize, StoreError>;
}

/// In-memory store keyed by organization.
#[derive(Default)]
pub struct InMemoryStore {
    items: RwLock<HashMap<String, Vec<BrainItem>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn search(
        &self,
        org_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<BrainItem>, StoreError> {
        let items = self.items.read().await;
        let Some(org_items) = items.get(org_id) else {
            return Ok(vec![]);
        };

        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();

        let mut matched: Vec<(usize, BrainItem)> = org_items
            .iter()
            .filter_map(|item| {
                let haystack = item.content.to_lowercase();
                let hits = terms
                    .iter()
                    .filter(|t| haystack.contains(t.as_str()) || item.tags.iter().any(|tag| tag.eq_ignore_ascii_case(t)))
                    .count();
                (hits > 0).then(|| (hits, item.clone()))
            })
            .collect();

        // Most term hits first, then higher stored score.
        matched.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(b.1.score.partial_cmp(&a.1.score).unwrap_or(std::cmp::Ordering::Equal))
        });

        Ok(matched.into_iter().take(limit).map(|(_, item)| item).collect())
    }

    async fn insert(&self, org_id: &str, item: BrainItem) -> Result<String, StoreError> {
        let id = item.id.clone();
        self.items
            .write()
            .await
            .entry(org_id.to_string())
            .or_default()
            .push(item);
        Ok(id)
    }

    async fn set_score(
        &self,
        org_id: &str,
        item_id: &str,
        score: f64,
    ) -> Result<f64, StoreError> {
        let mut items = self.items.write().await;
        let org_items = items
            .get_mut(org_id)
            .ok_or_else(|| StoreError::NotFound(item_id.into()))?;
        let item = org_items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| StoreError::NotFound(item_id.into()))?;

        let previous = item.score;
        item.score = score;
        Ok(previous)
    }

    async fn count(&self, org_id: &str) -> Result<usize, StoreError> {
        Ok(self
            .items
            .read()
            .await
            .get(org_id)
            .map_or(0, |items| items.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_search() {
        let store = InMemoryStore::new();
        store
            .insert(
                "org_1",
                BrainItem::new("Prune tomato plants in June", vec!["garden".into()], None),
            )
            .await
            .unwrap();
        store
            .insert(
                "org_1",
                BrainItem::new("Quarterly budget review notes", vec![], None),
            )
            .await
            .unwrap();

        let results = store.search("org_1", "prune tomato", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("tomato"));
    }

    #[tokio::test]
    async fn search_is_org_scoped() {
        let store = InMemoryStore::new();
        store
            .insert("org_1", BrainItem::new("shared secret garden", vec![], None))
            .await
            .unwrap();

        let other = store.search("org_2", "garden", 10).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn search_matches_tags() {
        let store = InMemoryStore::new();
        store
            .insert(
                "org_1",
                BrainItem::new("random content", vec!["recipes".into()], None),
            )
            .await
            .unwrap();

        let results = store.search("org_1", "recipes", 10).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn set_score_returns_previous() {
        let store = InMemoryStore::new();
        let id = store
            .insert("org_1", BrainItem::new("scored item", vec![], None))
            .await
            .unwrap();

        let previous = store.set_score("org_1", &id, 0.9).await.unwrap();
        assert!((previous - 0.5).abs() < f64::EPSILON);

        let results = store.search("org_1", "scored", 10).await.unwrap();
        assert!((results[0].score - 0.9).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn set_score_unknown_item() {
        let store = InMemoryStore::new();
        let err = store.set_score("org_1", "missing", 0.1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
