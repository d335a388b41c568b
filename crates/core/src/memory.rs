//! Archival store trait — durable per-agent (content, vector) pairs with
//! cosine nearest-neighbor search.
//!
//! Entries are append-only on the hot path: created by the save tool or by
//! FIFO overflow, deleted only by cascading agent removal. Every query is
//! filtered by agent id; no cross-agent read is reachable through this trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::error::StoreError;

/// A durable archival memory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivalEntry {
    pub id: Uuid,
    pub agent_id: AgentId,
    pub content: String,

    /// Dense embedding of `content`, dimension fixed per deployment
    pub embedding: Vec<f32>,

    /// Optional metadata bag (tags, source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
}

impl ArchivalEntry {
    pub fn new(agent_id: AgentId, content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            content: content.into(),
            embedding,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// One search result: similarity is `1 − cosine_distance`, in [−1, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivalHit {
    pub id: Uuid,
    pub content: String,
    pub similarity: f32,
    pub created_at: DateTime<Utc>,
}

/// The archival store: insert and top-k cosine search, per agent.
#[async_trait::async_trait]
pub trait ArchivalStore: Send + Sync {
    /// The embedding dimension this store accepts.
    fn dim(&self) -> usize;

    /// Insert an entry. Rejects vectors whose dimension differs from
    /// [`ArchivalStore::dim`] before touching the backend.
    async fn insert(&self, entry: &ArchivalEntry) -> std::result::Result<Uuid, StoreError>;

    /// Up to `k` entries for `agent_id`, ordered by descending cosine
    /// similarity to `query`, ties broken by more-recent timestamp.
    async fn search_top_k(
        &self,
        agent_id: AgentId,
        query: &[f32],
        k: usize,
    ) -> std::result::Result<Vec<ArchivalHit>, StoreError>;

    /// Number of entries for an agent.
    async fn count(&self, agent_id: AgentId) -> std::result::Result<u64, StoreError>;
}
