//! Execute a Python snippet via `python3 -c` in the agent workspace.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use engram_core::error::ToolError;
use engram_core::tool::{Tool, ToolResult};

use crate::exec::run_bounded;
use crate::ToolEnv;

/// Wall-clock bound on a snippet run.
const PYTHON_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RunPythonTool {
    env: Arc<ToolEnv>,
}

impl RunPythonTool {
    pub fn new(env: Arc<ToolEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Tool for RunPythonTool {
    fn name(&self) -> &str {
        "run_python"
    }

    fn description(&self) -> &str {
        "Execute Python code with python3. The working directory is your \
         workspace; output is captured and returned."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python code to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let code = arguments["code"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'code' argument".into()))?;

        let argv = vec!["python3".to_string(), "-c".to_string(), code.to_string()];

        let result = run_bounded(
            &argv,
            self.env.sandbox.root(),
            PYTHON_TIMEOUT,
            self.env.policy.output_cap(),
        )
        .await;

        match result {
            Ok(bounded) => {
                let output = if bounded.output.is_empty() && bounded.success {
                    "Code executed successfully (no output)".to_string()
                } else {
                    bounded.output
                };
                Ok(ToolResult {
                    call_id: String::new(),
                    success: bounded.success,
                    output,
                })
            }
            Err(e) => Ok(ToolResult::error(format!("failed to run python3: {e}"))),
        }
    }
}
