//! Edit a workspace file by exact-string replacement.

use std::sync::Arc;

use async_trait::async_trait;

use engram_core::error::ToolError;
use engram_core::tool::{Tool, ToolResult};
use engram_security::{AuditEvent, AuditOutcome};

use crate::{atomic_write, ToolEnv};

pub struct EditFileTool {
    env: Arc<ToolEnv>,
}

impl EditFileTool {
    pub fn new(env: Arc<ToolEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing an exact string. Use replace_all to replace \
         every occurrence; otherwise the string must appear exactly once."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the workspace root"
                },
                "old": {
                    "type": "string",
                    "description": "Exact text to find"
                },
                "new": {
                    "type": "string",
                    "description": "Replacement text"
                },
                "replace_all": {
                    "type": "boolean",
                    "description": "Replace all occurrences (default false)",
                    "default": false
                }
            },
            "required": ["path", "old", "new"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let old = arguments["old"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'old' argument".into()))?;
        let new = arguments["new"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'new' argument".into()))?;
        let replace_all = arguments["replace_all"].as_bool().unwrap_or(false);

        if old.is_empty() {
            return Err(ToolError::InvalidArguments(
                "'old' must not be empty".into(),
            ));
        }

        let resolved = match self.env.sandbox.resolve_read(path) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.env.audit.log(
                    AuditEvent::PathDenied { path: path.into() },
                    &self.env.agent_name,
                    AuditOutcome::Denied,
                    None,
                    Some(e.to_string()),
                );
                return Err(ToolError::SandboxViolation(e.to_string()));
            }
        };

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => content,
            Err(e) => return Ok(ToolResult::error(format!("failed to read {path}: {e}"))),
        };

        let count = content.matches(old).count();
        if count == 0 {
            return Ok(ToolResult::error(format!("string not found in {path}")));
        }
        if !replace_all && count > 1 {
            return Ok(ToolResult::error(format!(
                "string appears {count} times in {path}; pass replace_all to replace every occurrence"
            )));
        }

        let (updated, replacements) = if replace_all {
            (content.replace(old, new), count)
        } else {
            (content.replacen(old, new, 1), 1)
        };

        match atomic_write(&resolved, updated.as_bytes()).await {
            Ok(()) => Ok(ToolResult::ok(format!(
                "Edited {path} ({replacements} replacements)"
            ))),
            Err(e) => Ok(ToolResult::error(format!("failed to write {path}: {e}"))),
        }
    }
}
