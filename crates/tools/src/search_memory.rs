//! Search archival memory by semantic similarity.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use engram_core::agent::AgentId;
use engram_core::error::ToolError;
use engram_core::llm::EmbeddingClient;
use engram_core::memory::ArchivalStore;
use engram_core::tool::{Tool, ToolResult};

const LIMIT_DEFAULT: usize = 5;
const LIMIT_MAX: usize = 20;

pub struct SearchMemoryTool {
    agent_id: AgentId,
    archival: Arc<dyn ArchivalStore>,
    embedder: Arc<dyn EmbeddingClient>,
}

impl SearchMemoryTool {
    pub fn new(
        agent_id: AgentId,
        archival: Arc<dyn ArchivalStore>,
        embedder: Arc<dyn EmbeddingClient>,
    ) -> Self {
        Self {
            agent_id,
            archival,
            embedder,
        }
    }
}

#[async_trait]
impl Tool for SearchMemoryTool {
    fn name(&self) -> &str {
        "search_memory"
    }

    fn description(&self) -> &str {
        "Search your long-term archival memory for relevant information. Use \
         this when asked about things that are no longer in the recent \
         conversation."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum results (default 5, max 20)",
                    "default": LIMIT_DEFAULT
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let limit = arguments["limit"]
            .as_u64()
            .map(|l| l as usize)
            .unwrap_or(LIMIT_DEFAULT)
            .min(LIMIT_MAX);

        let embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => return Ok(ToolResult::error(format!("embedding failed: {e}"))),
        };

        let hits = match self
            .archival
            .search_top_k(self.agent_id, &embedding, limit)
            .await
        {
            Ok(hits) => hits,
            Err(e) => return Ok(ToolResult::error(format!("archival search failed: {e}"))),
        };

        debug!(agent_id = %self.agent_id, results = hits.len(), "Archival search");

        if hits.is_empty() {
            return Ok(ToolResult::ok("No memories found."));
        }

        let mut lines = vec![format!("Found {} memories:", hits.len())];
        for (i, hit) in hits.iter().enumerate() {
            lines.push(format!(
                "{}. {} (similarity: {:.3})",
                i + 1,
                hit.content,
                hit.similarity
            ));
        }
        Ok(ToolResult::ok(lines.join("\n")))
    }
}
