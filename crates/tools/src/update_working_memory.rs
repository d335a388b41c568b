//! Update a field of the agent's working-memory document.

use std::sync::Arc;

use async_trait::async_trait;

use engram_core::error::{MemoryError, ToolError};
use engram_core::tool::{Tool, ToolResult};
use engram_memory::MemoryHierarchy;

pub struct UpdateWorkingMemoryTool {
    hierarchy: Arc<MemoryHierarchy>,
}

impl UpdateWorkingMemoryTool {
    pub fn new(hierarchy: Arc<MemoryHierarchy>) -> Self {
        Self { hierarchy }
    }
}

#[async_trait]
impl Tool for UpdateWorkingMemoryTool {
    fn name(&self) -> &str {
        "update_working_memory"
    }

    fn description(&self) -> &str {
        "Set a field in your working memory, e.g. field 'user_name' to \
         'Todd'. Working memory stays in view across the whole conversation \
         but is limited to 2 KiB."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "field": {
                    "type": "string",
                    "description": "Field name to set"
                },
                "value": {
                    "type": "string",
                    "description": "New value for the field"
                }
            },
            "required": ["field", "value"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let field = arguments["field"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'field' argument".into()))?;
        let value = arguments["value"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'value' argument".into()))?;

        if field.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "'field' must not be empty".into(),
            ));
        }

        match self.hierarchy.update_working(field, value).await {
            Ok(()) => Ok(ToolResult::ok(format!("Updated {field}"))),
            Err(e @ MemoryError::WorkingMemoryTooLarge { .. }) => {
                Ok(ToolResult::error(e.to_string()))
            }
            Err(e) => Ok(ToolResult::error(format!("working memory update failed: {e}"))),
        }
    }
}
