//! PostgreSQL + pgvector backend.
//!
//! Implements [`AgentStore`], [`ConversationLog`], and [`ArchivalStore`]
//! with:
//! - Full CRUD via `sqlx` (PostgreSQL driver)
//! - Vector similarity search using pgvector's `<=>` operator over an
//!   HNSW index (cosine distance)
//! - A bounded connection pool shared across agents
//!
//! # Setup
//!
//! ```sql
//! CREATE EXTENSION IF NOT EXISTS vector;
//! ```
//!
//! Then call [`PgStore::migrate`], which applies
//! `migrations/001_init.sql` with the deployment's embedding dimension.
//!
//! Each conversation append and each archival insert is its own
//! transaction. There is no cross-table transactional invariant: a crash
//! between a conversation append and an archival promotion leaves the
//! promotion undone, which the overflow discipline tolerates.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use engram_core::agent::{AgentId, AgentRecord, AgentStore};
use engram_core::error::StoreError;
use engram_core::memory::{ArchivalEntry, ArchivalHit, ArchivalStore};
use engram_core::turn::{ConversationEntry, ConversationLog, Role};

/// Default pool bounds. Each operation holds at most one connection and
/// releases it before returning.
const POOL_MIN_CONNECTIONS: u32 = 2;
const POOL_MAX_CONNECTIONS: u32 = 10;
const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL store with pgvector-backed archival search.
pub struct PgStore {
    pool: PgPool,
    /// Dimension of embedding vectors, fixed per deployment.
    embedding_dim: usize,
    /// Optional HNSW query-time candidate list size.
    ef_search: Option<u16>,
}

impl PgStore {
    /// Connect to PostgreSQL with the default pool bounds.
    pub async fn connect(database_url: &str, embedding_dim: usize) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(POOL_MIN_CONNECTIONS)
            .max_connections(POOL_MAX_CONNECTIONS)
            .acquire_timeout(POOL_ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(format!("PostgreSQL connection failed: {e}")))?;

        info!(embedding_dim, "Connected to PostgreSQL");
        Ok(Self {
            pool,
            embedding_dim,
            ef_search: None,
        })
    }

    /// Create from an existing connection pool.
    pub fn from_pool(pool: PgPool, embedding_dim: usize) -> Self {
        Self {
            pool,
            embedding_dim,
            ef_search: None,
        }
    }

    /// Set the HNSW `ef_search` parameter used for archival queries.
    pub fn with_ef_search(mut self, ef_search: u16) -> Self {
        self.ef_search = Some(ef_search);
        self
    }

    /// Run the schema migration. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let migration_sql = include_str!("../migrations/001_init.sql")
            .replace("{{EMBEDDING_DIM}}", &self.embedding_dim.to_string());

        sqlx::raw_sql(&migration_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        info!("Schema migration complete");
        Ok(())
    }

    /// Close the pool. Used for clean shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Encode a vector as a pgvector literal: `[0.1,0.2,...]`.
    fn encode_vector(v: &[f32]) -> String {
        let mut out = String::with_capacity(v.len() * 10 + 2);
        out.push('[');
        for (i, x) in v.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&x.to_string());
        }
        out.push(']');
        out
    }

    fn check_dim(&self, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.embedding_dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.embedding_dim,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

fn row_to_agent(row: &PgRow) -> Result<AgentRecord, StoreError> {
    Ok(AgentRecord {
        id: AgentId(row.get("id")),
        name: row.get("name"),
        model_id: row.get("model_id"),
        system_memory: row.get("system_memory"),
        working_memory: row.get("working_memory"),
        fifo_capacity: row.get::<i32, _>("fifo_capacity") as usize,
        workspace_root: row.get::<String, _>("workspace_root").into(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_entry(row: &PgRow) -> Result<ConversationEntry, StoreError> {
    let role_str: String = row.get("role");
    let role = Role::parse(&role_str)
        .ok_or_else(|| StoreError::Query(format!("Unknown role in log: {role_str}")))?;

    Ok(ConversationEntry {
        id: row.get("id"),
        agent_id: AgentId(row.get("agent_id")),
        role,
        content: row.get("content"),
        tool_name: row.get("tool_name"),
        tool_args: row.get("tool_args"),
        tool_call_id: row.get("tool_call_id"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl AgentStore for PgStore {
    async fn create_agent(&self, record: &AgentRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO agents \
             (id, name, model_id, system_memory, working_memory, fifo_capacity, \
              workspace_root, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.id.0)
        .bind(&record.name)
        .bind(&record.model_id)
        .bind(&record.system_memory)
        .bind(&record.working_memory)
        .bind(record.fifo_capacity as i32)
        .bind(record.workspace_root.to_string_lossy().into_owned())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("Failed to create agent: {e}")))?;

        info!(agent_id = %record.id, name = %record.name, "Agent created");
        Ok(())
    }

    async fn get_agent_by_name(&self, name: &str) -> Result<Option<AgentRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM agents WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("Failed to fetch agent: {e}")))?;

        row.as_ref().map(row_to_agent).transpose()
    }

    async fn update_agent_memory(
        &self,
        agent_id: AgentId,
        system_memory: Option<&str>,
        working_memory: Option<&str>,
    ) -> Result<(), StoreError> {
        if system_memory.is_none() && working_memory.is_none() {
            return Ok(());
        }

        let result = sqlx::query(
            "UPDATE agents SET \
               system_memory = COALESCE($2, system_memory), \
               working_memory = COALESCE($3, working_memory), \
               updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(agent_id.0)
        .bind(system_memory)
        .bind(working_memory)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("Failed to update agent memory: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("agent {agent_id}")));
        }
        debug!(agent_id = %agent_id, "Agent memory updated");
        Ok(())
    }

    async fn delete_agent(&self, agent_id: AgentId) -> Result<(), StoreError> {
        // Cascading FKs remove archival and conversation rows.
        sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(agent_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("Failed to delete agent: {e}")))?;

        info!(agent_id = %agent_id, "Agent deleted");
        Ok(())
    }
}

#[async_trait]
impl ConversationLog for PgStore {
    async fn append(&self, entry: &ConversationEntry) -> Result<Uuid, StoreError> {
        sqlx::query(
            "INSERT INTO conversation_history \
             (id, agent_id, role, content, tool_name, tool_args, tool_call_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.id)
        .bind(entry.agent_id.0)
        .bind(entry.role.as_str())
        .bind(&entry.content)
        .bind(&entry.tool_name)
        .bind(&entry.tool_args)
        .bind(&entry.tool_call_id)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("Failed to append conversation entry: {e}")))?;

        debug!(agent_id = %entry.agent_id, role = %entry.role, "Conversation entry appended");
        Ok(entry.id)
    }

    async fn recent(
        &self,
        agent_id: AgentId,
        limit: usize,
    ) -> Result<Vec<ConversationEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, agent_id, role, content, tool_name, tool_args, tool_call_id, created_at \
             FROM conversation_history \
             WHERE agent_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2",
        )
        .bind(agent_id.0)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("Failed to load conversation history: {e}")))?;

        let mut entries = rows
            .iter()
            .map(row_to_entry)
            .collect::<Result<Vec<_>, _>>()?;
        // Chronological order for the FIFO view.
        entries.reverse();
        Ok(entries)
    }

    async fn len(&self, agent_id: AgentId) -> Result<u64, StoreError> {
        let row =
            sqlx::query("SELECT COUNT(*) AS cnt FROM conversation_history WHERE agent_id = $1")
                .bind(agent_id.0)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::Query(format!("Failed to count conversation: {e}")))?;

        Ok(row.get::<i64, _>("cnt") as u64)
    }
}

#[async_trait]
impl ArchivalStore for PgStore {
    fn dim(&self) -> usize {
        self.embedding_dim
    }

    async fn insert(&self, entry: &ArchivalEntry) -> Result<Uuid, StoreError> {
        self.check_dim(&entry.embedding)?;

        sqlx::query(
            "INSERT INTO memory_entries (id, agent_id, content, embedding, metadata, created_at) \
             VALUES ($1, $2, $3, $4::vector, $5, $6)",
        )
        .bind(entry.id)
        .bind(entry.agent_id.0)
        .bind(&entry.content)
        .bind(Self::encode_vector(&entry.embedding))
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("Failed to insert archival entry: {e}")))?;

        debug!(agent_id = %entry.agent_id, id = %entry.id, "Archival entry inserted");
        Ok(entry.id)
    }

    async fn search_top_k(
        &self,
        agent_id: AgentId,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ArchivalHit>, StoreError> {
        self.check_dim(query)?;

        let mut conn = self.pool.acquire().await.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted(e.to_string()),
            other => StoreError::Connection(other.to_string()),
        })?;

        if let Some(ef_search) = self.ef_search {
            sqlx::query(&format!("SET hnsw.ef_search = {ef_search}"))
                .execute(&mut *conn)
                .await
                .map_err(|e| StoreError::Query(format!("Failed to set ef_search: {e}")))?;
        }

        let rows = sqlx::query(
            "SELECT id, content, created_at, \
                    1 - (embedding <=> $2::vector) AS similarity \
             FROM memory_entries \
             WHERE agent_id = $1 \
             ORDER BY embedding <=> $2::vector ASC, created_at DESC \
             LIMIT $3",
        )
        .bind(agent_id.0)
        .bind(Self::encode_vector(query))
        .bind(k as i64)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| StoreError::Query(format!("Archival search failed: {e}")))?;

        Ok(rows
            .iter()
            .map(|row| ArchivalHit {
                id: row.get("id"),
                content: row.get("content"),
                similarity: row.get::<f64, _>("similarity") as f32,
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn count(&self, agent_id: AgentId) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM memory_entries WHERE agent_id = $1")
            .bind(agent_id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count archival entries: {e}")))?;

        Ok(row.get::<i64, _>("cnt") as u64)
    }
}

// ── Unit tests (no DB required) ──────────────────────────────────────────
