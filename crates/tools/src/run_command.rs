//! Execute a whitelisted shell command in the agent workspace.
//!
//! The command policy vets the raw string before anything is spawned; on
//! rejection no subprocess is started at all. Execution goes through the
//! bounded runner: no shell interpreter, scrubbed environment, wall-clock
//! timeout, capped output.

use std::sync::Arc;

use async_trait::async_trait;

use engram_core::error::ToolError;
use engram_core::tool::{Tool, ToolResult};
use engram_security::{AuditEvent, AuditOutcome};

use crate::exec::run_bounded;
use crate::ToolEnv;

pub struct RunCommandTool {
    env: Arc<ToolEnv>,
}

impl RunCommandTool {
    pub fn new(env: Arc<ToolEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a whitelisted shell command (ls, cat, grep, find, git log, ...) \
         in your workspace. Shell operators like pipes and redirects are not \
         allowed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command to run"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        let argv = match self.env.policy.vet(command) {
            Ok(argv) => argv,
            Err(e) => {
                self.env.audit.log(
                    AuditEvent::CommandDenied {
                        command: command.into(),
                    },
                    &self.env.agent_name,
                    AuditOutcome::Denied,
                    None,
                    Some(e.to_string()),
                );
                return Err(ToolError::PermissionDenied {
                    tool_name: "run_command".into(),
                    reason: e.to_string(),
                });
            }
        };

        let result = run_bounded(
            &argv,
            self.env.sandbox.root(),
            self.env.policy.timeout(),
            self.env.policy.output_cap(),
        )
        .await;

        match result {
            Ok(bounded) => Ok(ToolResult {
                call_id: String::new(),
                success: bounded.success,
                output: bounded.output,
            }),
            Err(e) => Ok(ToolResult::error(format!("failed to spawn command: {e}"))),
        }
    }
}
