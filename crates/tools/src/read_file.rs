//! Read a workspace file, with a size cap and binary detection.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;

use engram_core::error::ToolError;
use engram_core::tool::{Tool, ToolResult};
use engram_security::{AuditEvent, AuditOutcome};

use crate::{ToolEnv, FILE_SIZE_MAX};

pub struct ReadFileTool {
    env: Arc<ToolEnv>,
}

impl ReadFileTool {
    pub fn new(env: Arc<ToolEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file in your workspace. Binary files are returned base64-encoded."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the workspace root"
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

        let metadata = match tokio::fs::metadata(&resolved).await {
            Ok(metadata) => metadata,
            Err(e) => return Ok(ToolResult::error(format!("failed to read {path}: {e}"))),
        };
        if !metadata.is_file() {
            return Ok(ToolResult::error(format!("{path} is not a file")));
        }
        if metadata.len() > FILE_SIZE_MAX as u64 {
            return Ok(ToolResult::error(format!(
                "file too large: {} bytes (max {FILE_SIZE_MAX})",
                metadata.len()
            )));
        }

        let bytes = match tokio::fs::read(&resolved).await {
            Ok(bytes) => bytes,
            Err(e) => return Ok(ToolResult::error(format!("failed to read {path}: {e}"))),
        };

        match String::from_utf8(bytes) {
            Ok(text) if !text.contains('\0') => Ok(ToolResult::ok(text)),
            Ok(text) => Ok(binary_result(path, text.as_bytes())),
            Err(e) => Ok(binary_result(path, e.as_bytes())),
        }
    }
}

fn binary_result(path: &str, bytes: &[u8]) -> ToolResult {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    ToolResult::ok(format!(
        "[binary file {path}, {} bytes, base64]\n{encoded}",
        bytes.len()
    ))
}
