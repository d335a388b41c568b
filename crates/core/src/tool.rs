//! Tool trait and registry — the closed set of agent capabilities.
//!
//! Tools are what let the LLM act: read and write workspace files, run
//! whitelisted commands, fetch URLs, and manipulate its own memory. The
//! registry is the dispatch point: it validates the call, executes it, and
//! converts every failure into an error *string* — errors are data to the
//! LLM, never exceptions. Only the engine-facing `Tool::execute` signature
//! uses `ToolError`.

use std::collections::HashMap;

use crate::error::ToolError;
use crate::llm::ToolDefinition;
use crate::turn::ToolCall;

/// Marker prefix for failed tool results. The LLM sees this and may correct.
pub const TOOL_ERROR_PREFIX: &str = "Error:";

/// The result of a tool execution. Always a string payload; `success` only
/// distinguishes outcomes for observability.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolResult {
    /// The call ID this result answers
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output (or error) text
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            call_id: String::new(),
            success: false,
            output: format!("{TOOL_ERROR_PREFIX} {message}"),
        }
    }
}

/// The core Tool trait.
///
/// Each capability (read_file, run_command, save_memory, ...) implements this
/// trait and is registered in the [`ToolRegistry`].
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g. "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools — the closed capability set.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Dispatch a tool call.
    ///
    /// Never fails: unknown names, invalid arguments, and execution errors
    /// all become error-string results carrying the call's correlation id.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let mut result = match self.tools.get(&call.name) {
            None => ToolResult::error(ToolError::NotFound(call.name.clone())),
            Some(tool) => match tool.execute(call.arguments.clone()).await {
                Ok(result) => result,
                Err(e) => ToolResult::error(e),
            },
        };
        result.call_id = call.id.clone();
        result
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
