//! In-memory store — brute-force implementation of the persistence traits.
//!
//! Search is exact cosine over every entry, which doubles as the recall
//! reference for the HNSW-backed production store. Not persistent; intended
//! for tests and local experiments.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use engram_core::agent::{AgentId, AgentRecord, AgentStore};
use engram_core::error::StoreError;
use engram_core::memory::{ArchivalEntry, ArchivalHit, ArchivalStore};
use engram_core::turn::{ConversationEntry, ConversationLog};

use crate::vector::cosine_similarity;

#[derive(Default)]
struct Inner {
    agents: HashMap<Uuid, AgentRecord>,
    log: Vec<ConversationEntry>,
    archival: Vec<ArchivalEntry>,
}

/// An in-memory store implementing all persistence traits.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    embedding_dim: usize,
}

impl InMemoryStore {
    pub fn new(embedding_dim: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            embedding_dim,
        }
    }
}

#[async_trait]
impl AgentStore for InMemoryStore {
    async fn create_agent(&self, record: &AgentRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.agents.values().any(|a| a.name == record.name) {
            return Err(StoreError::Query(format!(
                "agent name taken: {}",
                record.name
            )));
        }
        inner.agents.insert(record.id.0, record.clone());
        Ok(())
    }

    async fn get_agent_by_name(&self, name: &str) -> Result<Option<AgentRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.agents.values().find(|a| a.name == name).cloned())
    }

    async fn update_agent_memory(
        &self,
        agent_id: AgentId,
        system_memory: Option<&str>,
        working_memory: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .agents
            .get_mut(&agent_id.0)
            .ok_or_else(|| StoreError::NotFound(format!("agent {agent_id}")))?;
        if let Some(system) = system_memory {
            record.system_memory = system.to_string();
        }
        if let Some(working) = working_memory {
            record.working_memory = working.to_string();
        }
        record.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn delete_agent(&self, agent_id: AgentId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.agents.remove(&agent_id.0);
        inner.log.retain(|e| e.agent_id != agent_id);
        inner.archival.retain(|e| e.agent_id != agent_id);
        Ok(())
    }
}

#[async_trait]
impl ConversationLog for InMemoryStore {
    async fn append(&self, entry: &ConversationEntry) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(entry.clone());
        Ok(entry.id)
    }

    async fn recent(
        &self,
        agent_id: AgentId,
        limit: usize,
    ) -> Result<Vec<ConversationEntry>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let rows: Vec<ConversationEntry> = inner
            .log
            .iter()
            .filter(|e| e.agent_id == agent_id)
            .cloned()
            .collect();
        let skip = rows.len().saturating_sub(limit);
        Ok(rows.into_iter().skip(skip).collect())
    }

    async fn len(&self, agent_id: AgentId) -> Result<u64, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.log.iter().filter(|e| e.agent_id == agent_id).count() as u64)
    }
}

#[async_trait]
impl ArchivalStore for InMemoryStore {
    fn dim(&self) -> usize {
        self.embedding_dim
    }

    async fn insert(&self, entry: &ArchivalEntry) -> Result<Uuid, StoreError> {
        if entry.embedding.len() != self.embedding_dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.embedding_dim,
                actual: entry.embedding.len(),
            });
        }
        let mut inner = self.inner.lock().unwrap();
        inner.archival.push(entry.clone());
        Ok(entry.id)
    }

    async fn search_top_k(
        &self,
        agent_id: AgentId,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ArchivalHit>, StoreError> {
        if query.len() != self.embedding_dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.embedding_dim,
                actual: query.len(),
            });
        }

        let inner = self.inner.lock().unwrap();
        let mut hits: Vec<ArchivalHit> = inner
            .archival
            .iter()
            .filter(|e| e.agent_id == agent_id)
            .map(|e| ArchivalHit {
                id: e.id,
                content: e.content.clone(),
                similarity: cosine_similarity(&e.embedding, query),
                created_at: e.created_at,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.created_at.cmp(&a.created_at))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self, agent_id: AgentId) -> Result<u64, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .archival
            .iter()
            .filter(|e| e.agent_id == agent_id)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn agent_record(name: &str) -> AgentRecord {
        AgentRecord {
            id: AgentId::new(),
            name: name.into(),
            model_id: "test-model".into(),
            system_memory: String::new(),
            working_memory: String::new(),
            fifo_capacity: 50,
            workspace_root: PathBuf::from("/tmp/ws"),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn agent_create_and_lookup() {
        let store = InMemoryStore::new(3);
        let record = agent_record("scribe");
        store.create_agent(&record).await.unwrap();

        let loaded = store.get_agent_by_name("scribe").await.unwrap().unwrap();
        assert_eq!(loaded.id, record.id);
        assert!(store.get_agent_by_name("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_agent_name_rejected() {
        let store = InMemoryStore::new(3);
        store.create_agent(&agent_record("scribe")).await.unwrap();
        assert!(store.create_agent(&agent_record("scribe")).await.is_err());
    }

    #[tokio::test]
    async fn log_recent_returns_chronological_tail() {
        let store = InMemoryStore::new(3);
        let agent = AgentId::new();
        for i in 0..5 {
            store
                .append(&ConversationEntry::user(agent, format!("msg {i}")))
                .await
                .unwrap();
        }

        let recent = store.recent(agent, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "msg 2");
        assert_eq!(recent[2].content, "msg 4");
        assert_eq!(store.len(agent).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn log_is_per_agent() {
        let store = InMemoryStore::new(3);
        let a = AgentId::new();
        let b = AgentId::new();
        store.append(&ConversationEntry::user(a, "a's")).await.unwrap();
        store.append(&ConversationEntry::user(b, "b's")).await.unwrap();

        let recent = store.recent(a, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].content, "a's");
    }

    #[tokio::test]
    async fn archival_dimension_checked() {
        let store = InMemoryStore::new(3);
        let agent = AgentId::new();
        let bad = ArchivalEntry::new(agent, "x", vec![1.0, 0.0]);
        match store.insert(&bad).await {
            Err(StoreError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected DimensionMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn archival_search_ranks_by_similarity() {
        let store = InMemoryStore::new(3);
        let agent = AgentId::new();
        store
            .insert(&ArchivalEntry::new(agent, "orthogonal", vec![0.0, 1.0, 0.0]))
            .await
            .unwrap();
        store
            .insert(&ArchivalEntry::new(agent, "aligned", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();
        store
            .insert(&ArchivalEntry::new(agent, "partial", vec![0.5, 0.5, 0.0]))
            .await
            .unwrap();

        let hits = store
            .search_top_k(agent, &[1.0, 0.0, 0.0], 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "aligned");
        assert!(hits[0].similarity > 0.99);
        assert_eq!(hits[1].content, "partial");
    }

    #[tokio::test]
    async fn archival_search_filters_by_agent() {
        let store = InMemoryStore::new(2);
        let a = AgentId::new();
        let b = AgentId::new();
        store
            .insert(&ArchivalEntry::new(a, "a's secret", vec![1.0, 0.0]))
            .await
            .unwrap();

        let hits = store.search_top_k(b, &[1.0, 0.0], 5).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(store.count(a).await.unwrap(), 1);
        assert_eq!(store.count(b).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_search_returns_empty() {
        let store = InMemoryStore::new(2);
        let hits = store
            .search_top_k(AgentId::new(), &[1.0, 0.0], 5)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn delete_agent_cascades() {
        let store = InMemoryStore::new(2);
        let record = agent_record("doomed");
        let agent = record.id;
        store.create_agent(&record).await.unwrap();
        store.append(&ConversationEntry::user(agent, "hi")).await.unwrap();
        store
            .insert(&ArchivalEntry::new(agent, "fact", vec![1.0, 0.0]))
            .await
            .unwrap();

        store.delete_agent(agent).await.unwrap();
        assert!(store.get_agent_by_name("doomed").await.unwrap().is_none());
        assert_eq!(store.len(agent).await.unwrap(), 0);
        assert_eq!(store.count(agent).await.unwrap(), 0);
    }
}
