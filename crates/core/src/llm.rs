//! Chat and embedding client traits — the abstraction over LLM backends.
//!
//! The engine treats inference as two opaque endpoints: `chat` (messages +
//! tool schemas in, text + structured tool calls out) and `embed` (text in,
//! fixed-dimension vector out). Implementations live in `engram-llm`; tests
//! use scripted mocks.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::turn::ToolCall;

/// Message role on the chat wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        }
    }
}

/// A single message handed to the chat client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,

    /// Tool calls carried by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Correlation id carried by a tool message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A complete reply from the chat client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// The assistant's text (may be empty when only tools were called)
    pub text: String,

    /// Structured tool calls, empty for a terminal reply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ChatReply {
    /// A text-only reply terminates the step loop.
    pub fn is_terminal(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// The chat endpoint contract.
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// A human-readable name for this client (e.g. "openai-compat").
    fn name(&self) -> &str;

    /// Send a message list plus tool schemas, receive a reply.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        temperature: f32,
    ) -> std::result::Result<ChatReply, LlmError>;
}

/// The embedding endpoint contract.
///
/// The engine does not normalize vectors; the archival store treats
/// similarity as `1 − cosine_distance`.
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// The fixed dimension of produced vectors.
    fn dim(&self) -> usize;

    /// Produce an embedding for `text`.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, LlmError>;
}
