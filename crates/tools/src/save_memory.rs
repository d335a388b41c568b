//! Save content to archival memory (embed + insert).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use engram_core::agent::AgentId;
use engram_core::error::ToolError;
use engram_core::llm::EmbeddingClient;
use engram_core::memory::{ArchivalEntry, ArchivalStore};
use engram_core::tool::{Tool, ToolResult};

pub struct SaveMemoryTool {
    agent_id: AgentId,
    archival: Arc<dyn ArchivalStore>,
    embedder: Arc<dyn EmbeddingClient>,
}

impl SaveMemoryTool {
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
impl Tool for SaveMemoryTool {
    fn name(&self) -> &str {
        "save_memory"
    }

    fn description(&self) -> &str {
        "Save important information to your long-term archival memory so you \
         can recall it later with search_memory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The information to remember"
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional tags for categorization"
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;
        if content.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "'content' must not be empty".into(),
            ));
        }

        let tags: Vec<String> = arguments
            .get("tags")
            .and_then(|t| serde_json::from_value(t.clone()).ok())
            .unwrap_or_default();

        let embedding = match self.embedder.embed(content).await {
            Ok(embedding) => embedding,
            Err(e) => return Ok(ToolResult::error(format!("embedding failed: {e}"))),
        };

        let mut entry = ArchivalEntry::new(self.agent_id, content, embedding);
        entry = entry.with_metadata(serde_json::json!({
            "source": "save_memory",
            "tags": tags,
        }));

        match self.archival.insert(&entry).await {
            Ok(id) => {
                debug!(agent_id = %self.agent_id, id = %id, "Archival save");
                Ok(ToolResult::ok("Saved to archival memory"))
            }
            Err(e) => Ok(ToolResult::error(format!("archival insert failed: {e}"))),
        }
    }
}
