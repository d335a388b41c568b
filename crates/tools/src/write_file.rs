//! Write a workspace file atomically (temp file + rename), creating parents.

use std::sync::Arc;

use async_trait::async_trait;

use engram_core::error::ToolError;
use engram_core::tool::{Tool, ToolResult};
use engram_security::{AuditEvent, AuditOutcome};

use crate::{atomic_write, ToolEnv, FILE_SIZE_MAX};

pub struct WriteFileTool {
    env: Arc<ToolEnv>,
}

impl WriteFileTool {
    pub fn new(env: Arc<ToolEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file in your workspace. Creates the file and any \
         parent directories; overwrites atomically if it exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the workspace root"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        if content.len() > FILE_SIZE_MAX {
            return Ok(ToolResult::error(format!(
                "content too large: {} bytes (max {FILE_SIZE_MAX})",
                content.len()
            )));
        }

        let resolved = match self.env.sandbox.resolve_write(path) {
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

        match atomic_write(&resolved, content.as_bytes()).await {
            Ok(()) => Ok(ToolResult::ok(format!(
                "Wrote {} bytes to {path}",
                content.len()
            ))),
            Err(e) => Ok(ToolResult::error(format!("failed to write {path}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env;

    #[tokio::test]
    async fn write_and_verify() {
        let (_dir, env) = env();
        let tool = WriteFileTool::new(env.clone());

        let result = tool
            .execute(serde_json::json!({"path": "out.txt", "content": "Hello from test!"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "Wrote 16 bytes to out.txt");

        let written = std::fs::read_to_string(env.sandbox.root().join("out.txt")).unwrap();
        assert_eq!(written, "Hello from test!");
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let (_dir, env) = env();
        let tool = WriteFileTool::new(env.clone());

        let result = tool
            .execute(serde_json::json!({"path": "nested/dir/file.txt", "content": "deep"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(env.sandbox.root().join("nested/dir/file.txt").exists());
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let (_dir, env) = env();
        std::fs::write(env.sandbox.root().join("file.txt"), "old").unwrap();

        let tool = WriteFileTool::new(env.clone());
        tool.execute(serde_json::json!({"path": "file.txt", "content": "new"}))
            .await
            .unwrap();

        let written = std::fs::read_to_string(env.sandbox.root().join("file.txt")).unwrap();
        assert_eq!(written, "new");
    }

    #[tokio::test]
    async fn traversal_denied() {
        let (_dir, env) = env();
        let tool = WriteFileTool::new(env);
        let result = tool
            .execute(serde_json::json!({"path": "../escape.txt", "content": "x"}))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_arguments_rejected() {
        let (_dir, env) = env();
        let tool = WriteFileTool::new(env);
        assert!(tool
            .execute(serde_json::json!({"content": "x"}))
            .await
            .is_err());
        assert!(tool
            .execute(serde_json::json!({"path": "a.txt"}))
            .await
            .is_err());
    }
}
