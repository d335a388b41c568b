//! Context assembly — the deterministic translation from memory tiers to the
//! chat-client message list.
//!
//! Output shape, in order:
//! 1. A system message: the agent's static system memory, the JSON schemas of
//!    all registered tools, and a fixed guideline block
//! 2. A system message: the current working-memory document under a labeled
//!    header
//! 3. The FIFO view, role-translated
//!
//! No reordering, no deduplication, no summarization: all bounding is done by
//! the FIFO capacity. Archival memories are never injected here — recall is
//! an explicit tool action by the LLM.

use engram_core::llm::{ChatMessage, ToolDefinition};
use engram_core::turn::{ConversationEntry, Role, ToolCall};

/// Fixed guidance appended to the first system message.
const GUIDELINES: &str = "\
## Memory Guidelines

Your memory is organized in tiers:
1. System memory: these instructions (read-only)
2. Working memory: current facts about yourself and the conversation \
(edit with update_working_memory)
3. Recent conversation: the last messages (automatic)
4. Archival memory: long-term searchable storage (save_memory / search_memory)

Older conversation falls out of view automatically. Save anything worth \
remembering to archival memory before it is gone, and search archival memory \
when asked about things you no longer see.";

/// Header labeling the working-memory system message.
const WORKING_MEMORY_HEADER: &str = "## Working Memory";

/// Produce the message list handed to the chat client.
pub fn assemble_context(
    system_memory: &str,
    tools: &[ToolDefinition],
    working_memory: &str,
    fifo: &[ConversationEntry],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(fifo.len() + 2);

    let tool_schemas = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".into());
    messages.push(ChatMessage::system(format!(
        "{system_memory}\n\n## Available Tools\n{tool_schemas}\n\n{GUIDELINES}"
    )));

    messages.push(ChatMessage::system(format!(
        "{WORKING_MEMORY_HEADER}\n{working_memory}"
    )));

    for entry in fifo {
        match entry.role {
            Role::User => messages.push(ChatMessage::user(&entry.content)),
            Role::Assistant => messages.push(ChatMessage::assistant(&entry.content)),
            Role::ToolCall => {
                let call = ToolCall {
                    id: entry.tool_call_id.clone().unwrap_or_default(),
                    name: entry.tool_name.clone().unwrap_or_default(),
                    arguments: entry
                        .tool_args
                        .clone()
                        .unwrap_or(serde_json::Value::Null),
                };
                // Fold into the preceding assistant message. When the view
                // boundary cut that message off, synthesize an empty one so
                // the correlation to the following tool result survives.
                let fold = matches!(
                    messages.last(),
                    Some(prev) if prev.role == engram_core::llm::ChatRole::Assistant
                );
                if fold {
                    if let Some(prev) = messages.last_mut() {
                        prev.tool_calls.push(call);
                    }
                } else {
                    messages.push(ChatMessage::assistant_with_calls("", vec![call]));
                }
            }
            Role::ToolResult => messages.push(ChatMessage::tool(
                entry.tool_call_id.clone().unwrap_or_default(),
                &entry.content,
            )),
            Role::SystemAnnouncement => messages.push(ChatMessage::system(&entry.content)),
        }
    }

    messages
}
