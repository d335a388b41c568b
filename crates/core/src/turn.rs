//! Conversation entries — the append-only turn log and its roles.
//!
//! Every message that flows through an agent turn is recorded as a
//! `ConversationEntry`: user input, assistant replies, the tool calls the
//! assistant requested, the results those calls produced, and engine-injected
//! announcements. The persisted log is ground truth; the in-memory FIFO view
//! is the last K rows of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::error::StoreError;

/// The role of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The end user
    User,
    /// The assistant's text reply
    Assistant,
    /// A tool invocation requested by the assistant
    ToolCall,
    /// The result of a tool invocation
    ToolResult,
    /// Engine-injected system note (e.g. iteration limit reached)
    SystemAnnouncement,
}

impl Role {
    /// Database / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolCall => "tool_call",
            Role::ToolResult => "tool_result",
            Role::SystemAnnouncement => "system_announcement",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "tool_call" => Some(Role::ToolCall),
            "tool_result" => Some(Role::ToolResult),
            "system_announcement" => Some(Role::SystemAnnouncement),
            _ => None,
        }
    }

    /// Whether entries with this role are promoted to archival memory when
    /// they overflow the FIFO view. Tool call requests and engine
    /// announcements carry no recall value on their own.
    pub fn archival_eligible(&self) -> bool {
        matches!(self, Role::User | Role::Assistant | Role::ToolResult)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool invocation produced by the chat client.
///
/// Transient: consumed by the dispatcher. Its persistence form is the
/// `Role::ToolCall` conversation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id (matches the LLM's tool_call id and the later
    /// tool_result row)
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON object
    pub arguments: serde_json::Value,
}

/// A single entry in an agent's conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Unique entry ID
    pub id: Uuid,

    /// Owning agent
    pub agent_id: AgentId,

    /// Who produced this entry
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool name (when role = tool_call)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Tool arguments (when role = tool_call)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_args: Option<serde_json::Value>,

    /// Correlation id linking a tool_call to its tool_result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub created_at: DateTime<Utc>,
}

impl ConversationEntry {
    fn base(agent_id: AgentId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            role,
            content: content.into(),
            tool_name: None,
            tool_args: None,
            tool_call_id: None,
            created_at: Utc::now(),
        }
    }

    /// Create a user entry.
    pub fn user(agent_id: AgentId, content: impl Into<String>) -> Self {
        Self::base(agent_id, Role::User, content)
    }

    /// Create an assistant entry.
    pub fn assistant(agent_id: AgentId, content: impl Into<String>) -> Self {
        Self::base(agent_id, Role::Assistant, content)
    }

    /// Create a tool_call entry from a chat-client tool call.
    pub fn tool_call(agent_id: AgentId, call: &ToolCall) -> Self {
        let mut entry = Self::base(agent_id, Role::ToolCall, String::new());
        entry.tool_name = Some(call.name.clone());
        entry.tool_args = Some(call.arguments.clone());
        entry.tool_call_id = Some(call.id.clone());
        entry
    }

    /// Create a tool_result entry correlated to a prior tool_call.
    pub fn tool_result(
        agent_id: AgentId,
        call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut entry = Self::base(agent_id, Role::ToolResult, content);
        entry.tool_call_id = Some(call_id.into());
        entry
    }

    /// Create an engine announcement entry.
    pub fn announcement(agent_id: AgentId, content: impl Into<String>) -> Self {
        Self::base(agent_id, Role::SystemAnnouncement, content)
    }
}

/// The append-only conversation log.
///
/// Implementations: PostgreSQL, in-memory (for testing). Every append is its
/// own transaction; the log is never pruned by the engine.
#[async_trait::async_trait]
pub trait ConversationLog: Send + Sync {
    /// Append an entry. Returns the stored entry id.
    async fn append(&self, entry: &ConversationEntry) -> std::result::Result<Uuid, StoreError>;

    /// The last `limit` entries for an agent, in chronological order.
    async fn recent(
        &self,
        agent_id: AgentId,
        limit: usize,
    ) -> std::result::Result<Vec<ConversationEntry>, StoreError>;

    /// Total number of entries for an agent.
    async fn len(&self, agent_id: AgentId) -> std::result::Result<u64, StoreError>;
}
