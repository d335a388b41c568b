//! Agent identity — the record that owns one memory hierarchy.
//!
//! An agent is created once and is stable across restarts. Its system memory
//! is static (only rewritten by the template migration at startup); its
//! working memory is mutated exclusively by the working-memory tool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::StoreError;

/// Default bound on the in-memory FIFO view.
pub const FIFO_CAPACITY_DEFAULT: usize = 50;

/// Size cap on the working-memory document, in bytes.
pub const WORKING_MEMORY_SIZE_MAX: usize = 2048;

/// Opaque agent identifier, stable across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The durable agent record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Stable identifier
    pub id: AgentId,

    /// Display name (unique)
    pub name: String,

    /// Chat model identifier
    pub model_id: String,

    /// Static identity/instruction text
    pub system_memory: String,

    /// Mutable key-value document, size-capped
    pub working_memory: String,

    /// Bound on the in-memory FIFO view
    pub fifo_capacity: usize,

    /// Absolute root of this agent's tool workspace
    pub workspace_root: PathBuf,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Durable agent storage.
///
/// Implementations: PostgreSQL, in-memory (for testing).
#[async_trait::async_trait]
pub trait AgentStore: Send + Sync {
    /// Create a new agent. Fails if the name is taken.
    async fn create_agent(&self, record: &AgentRecord) -> std::result::Result<(), StoreError>;

    /// Look up an agent by its unique name.
    async fn get_agent_by_name(
        &self,
        name: &str,
    ) -> std::result::Result<Option<AgentRecord>, StoreError>;

    /// Update the agent's system and/or working memory. `None` leaves the
    /// field untouched.
    async fn update_agent_memory(
        &self,
        agent_id: AgentId,
        system_memory: Option<&str>,
        working_memory: Option<&str>,
    ) -> std::result::Result<(), StoreError>;

    /// Delete an agent, cascading to all conversation and archival rows.
    async fn delete_agent(&self, agent_id: AgentId) -> std::result::Result<(), StoreError>;
}
