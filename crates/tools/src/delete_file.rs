//! Delete a workspace file or directory (recursive, no confirmation).

use std::sync::Arc;

use async_trait::async_trait;

use engram_core::error::ToolError;
use engram_core::tool::{Tool, ToolResult};
use engram_security::{AuditEvent, AuditOutcome};

use crate::ToolEnv;

pub struct DeleteFileTool {
    env: Arc<ToolEnv>,
}

impl DeleteFileTool {
    pub fn new(env: Arc<ToolEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a file or directory in your workspace. Directories are removed recursively."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to delete, relative to the workspace root"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

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

        // Refuse to delete the workspace root itself.
        if resolved == self.env.sandbox.root() {
            return Ok(ToolResult::error("refusing to delete the workspace root"));
        }

        let outcome = if resolved.is_dir() {
            tokio::fs::remove_dir_all(&resolved).await
        } else {
            tokio::fs::remove_file(&resolved).await
        };

        match outcome {
            Ok(()) => Ok(ToolResult::ok(format!("Deleted {path}"))),
            Err(e) => Ok(ToolResult::error(format!("failed to delete {path}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env;

    #[tokio::test]
    async fn deletes_file() {
        let (_dir, env) = env();
        std::fs::write(env.sandbox.root().join("doomed.txt"), "x").unwrap();

        let tool = DeleteFileTool::new(env.clone());
        let result = tool
            .execute(serde_json::json!({"path": "doomed.txt"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "Deleted doomed.txt");
        assert!(!env.sandbox.root().join("doomed.txt").exists());
    }

    #[tokio::test]
    async fn deletes_directory_recursively() {
        let (_dir, env) = env();
        std::fs::create_dir_all(env.sandbox.root().join("tree/sub")).unwrap();
        std::fs::write(env.sandbox.root().join("tree/sub/leaf.txt"), "x").unwrap();

        let tool = DeleteFileTool::new(env.clone());
        let result = tool
            .execute(serde_json::json!({"path": "tree"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(!env.sandbox.root().join("tree").exists());
    }

    #[tokio::test]
    async fn workspace_root_protected() {
        let (_dir, env) = env();
        let tool = DeleteFileTool::new(env);
        let result = tool.execute(serde_json::json!({"path": "."})).await.unwrap();
        assert!(!result.success);
        assert!(result.output.contains("workspace root"));
    }

    #[tokio::test]
    async fn missing_target_is_denied_by_sandbox() {
        let (_dir, env) = env();
        let tool = DeleteFileTool::new(env);
        // resolve_read fails because the target does not exist
        assert!(tool
            .execute(serde_json::json!({"path": "absent.txt"}))
            .await
            .is_err());
    }
}
