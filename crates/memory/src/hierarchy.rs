//! The memory hierarchy coordinator.
//!
//! Owns an agent's four tiers and enforces the overflow discipline:
//! append-to-log first, then mutate the in-memory view; when the view
//! overflows, the single oldest entry is promoted to archival memory
//! (best-effort) and dropped from the view. The log keeps everything.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use engram_core::agent::{AgentId, AgentRecord, AgentStore};
use engram_core::error::MemoryError;
use engram_core::event::{DomainEvent, EventBus};
use engram_core::llm::{ChatMessage, EmbeddingClient, ToolDefinition};
use engram_core::memory::{ArchivalEntry, ArchivalStore};
use engram_core::turn::{ConversationEntry, ConversationLog};

use crate::assembler::assemble_context;
use crate::fifo::FifoView;
use crate::working::WorkingDocument;

/// Snapshot of an agent's memory usage.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MemoryStats {
    pub archival_entries: u64,
    pub log_entries: u64,
    pub fifo_len: usize,
    pub fifo_capacity: usize,
    pub working_bytes: usize,
}

/// Coordinates the four memory tiers for one agent.
pub struct MemoryHierarchy {
    agent_id: AgentId,
    system_memory: String,
    working: Mutex<WorkingDocument>,
    fifo: Mutex<FifoView>,
    log: Arc<dyn ConversationLog>,
    archival: Arc<dyn ArchivalStore>,
    agents: Arc<dyn AgentStore>,
    embedder: Arc<dyn EmbeddingClient>,
    events: Arc<EventBus>,
}

impl MemoryHierarchy {
    /// Build the hierarchy for an agent, seeding the FIFO view with the last
    /// K rows of the conversation log. Seeding never re-runs overflow
    /// promotion: the log order is ground truth.
    pub async fn load(
        record: &AgentRecord,
        log: Arc<dyn ConversationLog>,
        archival: Arc<dyn ArchivalStore>,
        agents: Arc<dyn AgentStore>,
        embedder: Arc<dyn EmbeddingClient>,
        events: Arc<EventBus>,
    ) -> Result<Self, MemoryError> {
        let recent = log
            .recent(record.id, record.fifo_capacity)
            .await
            .map_err(|e| MemoryError::Storage(e.to_string()))?;

        debug!(
            agent_id = %record.id,
            fifo_seeded = recent.len(),
            capacity = record.fifo_capacity,
            "Memory hierarchy loaded"
        );

        Ok(Self {
            agent_id: record.id,
            system_memory: record.system_memory.clone(),
            working: Mutex::new(WorkingDocument::from_text(&record.working_memory)),
            fifo: Mutex::new(FifoView::seed(record.fifo_capacity, recent)),
            log,
            archival,
            agents,
            embedder,
            events,
        })
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub fn system_memory(&self) -> &str {
        &self.system_memory
    }

    pub fn working_memory(&self) -> String {
        self.working.lock().unwrap().as_str().to_string()
    }

    pub fn fifo_len(&self) -> usize {
        self.fifo.lock().unwrap().len()
    }

    pub fn fifo_capacity(&self) -> usize {
        self.fifo.lock().unwrap().capacity()
    }

    /// The current FIFO view, oldest first.
    pub fn items(&self) -> Vec<ConversationEntry> {
        self.fifo.lock().unwrap().to_vec()
    }

    /// Append an entry: commit the log row first, then mutate the view.
    /// An overflowing entry is promoted and dropped.
    pub async fn append(&self, entry: ConversationEntry) -> Result<(), MemoryError> {
        self.log
            .append(&entry)
            .await
            .map_err(|e| MemoryError::Storage(e.to_string()))?;

        let evicted = self.fifo.lock().unwrap().push(entry);
        if let Some(old) = evicted {
            self.promote(old).await;
        }
        Ok(())
    }

    /// Promote an overflowed entry to archival memory. Best-effort: on
    /// embedding or insert failure the entry is still gone from the view
    /// (the log retains it) and a warning is logged.
    async fn promote(&self, entry: ConversationEntry) {
        if !entry.role.archival_eligible() || entry.content.trim().is_empty() {
            return;
        }

        let embedding = match self.embedder.embed(&entry.content).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(
                    agent_id = %self.agent_id,
                    role = %entry.role,
                    error = %e,
                    "Overflow promotion failed: embedding"
                );
                return;
            }
        };

        let archival_entry = ArchivalEntry::new(self.agent_id, &entry.content, embedding)
            .with_metadata(serde_json::json!({
                "source": "fifo_overflow",
                "role": entry.role.as_str(),
            }));

        match self.archival.insert(&archival_entry).await {
            Ok(id) => {
                debug!(agent_id = %self.agent_id, id = %id, "Overflow entry promoted");
                self.events.publish(DomainEvent::EntryPromoted {
                    agent_id: self.agent_id,
                    role: entry.role.as_str().to_string(),
                    timestamp: chrono::Utc::now(),
                });
            }
            Err(e) => {
                warn!(
                    agent_id = %self.agent_id,
                    error = %e,
                    "Overflow promotion failed: insert"
                );
            }
        }
    }

    /// Apply a working-memory update and persist the new document.
    /// The in-memory document only changes once persistence succeeded.
    pub async fn update_working(&self, field: &str, value: &str) -> Result<(), MemoryError> {
        let mut updated = self.working.lock().unwrap().clone();
        updated.set(field, value)?;

        self.agents
            .update_agent_memory(self.agent_id, None, Some(updated.as_str()))
            .await
            .map_err(|e| MemoryError::Storage(e.to_string()))?;

        *self.working.lock().unwrap() = updated;
        debug!(agent_id = %self.agent_id, field, "Working memory updated");
        Ok(())
    }

    /// Assemble the bounded LLM context from the current tier state.
    pub fn assemble(&self, tools: &[ToolDefinition]) -> Vec<ChatMessage> {
        let working = self.working_memory();
        let fifo = self.items();
        assemble_context(&self.system_memory, tools, &working, &fifo)
    }

    pub async fn stats(&self) -> Result<MemoryStats, MemoryError> {
        let archival_entries = self
            .archival
            .count(self.agent_id)
            .await
            .map_err(|e| MemoryError::Storage(e.to_string()))?;
        let log_entries = self
            .log
            .len(self.agent_id)
            .await
            .map_err(|e| MemoryError::Storage(e.to_string()))?;

        Ok(MemoryStats {
            archival_entries,
            log_entries,
            fifo_len: self.fifo_len(),
            fifo_capacity: self.fifo_capacity(),
            working_bytes: self.working.lock().unwrap().size_bytes(),
        })
    }
}
