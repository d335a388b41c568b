//! The agent step loop — drives a single user turn to a terminal response.
//!
//! State machine: idle → awaiting_model → executing_tools → ... → terminal.
//! Every appended row is committed to the conversation log before the
//! in-memory view changes; a chat-client failure aborts the turn with the
//! user row retained and no half-assistant row. Tool failures never abort:
//! they come back as result strings the model can read.

use std::sync::Arc;

use tracing::{debug, warn};

use engram_core::error::Error;
use engram_core::event::{DomainEvent, EventBus};
use engram_core::llm::ChatClient;
use engram_core::tool::ToolRegistry;
use engram_core::turn::ConversationEntry;
use engram_memory::MemoryHierarchy;
use engram_security::{AuditEvent, AuditLogger, AuditOutcome};

/// Ceiling on tool-execution rounds per user turn.
pub const TOOL_ROUNDS_MAX: u32 = 8;

/// System note injected when the ceiling is reached.
const ITERATION_LIMIT_NOTE: &str =
    "tool iteration limit reached; answer with text only, without calling tools";

/// Loop phases, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepState {
    AwaitingModel,
    ExecutingTools,
    Terminal,
}

/// Orchestrates assemble → chat → execute-tools → persist → repeat.
pub struct StepLoop {
    hierarchy: Arc<MemoryHierarchy>,
    chat: Arc<dyn ChatClient>,
    tools: Arc<ToolRegistry>,
    events: Arc<EventBus>,
    audit: Arc<AuditLogger>,
    agent_name: String,
    temperature: f32,
    max_rounds: u32,
}

impl StepLoop {
    pub fn new(
        hierarchy: Arc<MemoryHierarchy>,
        chat: Arc<dyn ChatClient>,
        tools: Arc<ToolRegistry>,
        events: Arc<EventBus>,
        audit: Arc<AuditLogger>,
        agent_name: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            hierarchy,
            chat,
            tools,
            events,
            audit,
            agent_name: agent_name.into(),
            temperature,
            max_rounds: TOOL_ROUNDS_MAX,
        }
    }

    /// Override the tool-round ceiling.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Process one user turn to its terminal assistant text.
    pub async fn run_turn(&self, user_text: &str) -> Result<String, Error> {
        let agent_id = self.hierarchy.agent_id();
        self.hierarchy
            .append(ConversationEntry::user(agent_id, user_text))
            .await?;

        let definitions = self.tools.definitions();
        let mut rounds: u32 = 0;
        let mut state = StepState::AwaitingModel;

        loop {
            debug!(agent = %self.agent_name, ?state, rounds, "Step loop");

            let forced_final = rounds >= self.max_rounds;
            if forced_final {
                warn!(
                    agent = %self.agent_name,
                    rounds,
                    "Tool iteration ceiling reached, forcing terminal answer"
                );
                self.hierarchy
                    .append(ConversationEntry::announcement(
                        agent_id,
                        ITERATION_LIMIT_NOTE,
                    ))
                    .await?;
            }

            let context = self.hierarchy.assemble(&definitions);
            let reply = self
                .chat
                .chat(&context, &definitions, self.temperature)
                .await?;

            if reply.is_terminal() || forced_final {
                if !reply.tool_calls.is_empty() {
                    warn!(
                        agent = %self.agent_name,
                        dropped = reply.tool_calls.len(),
                        "Dropping tool calls after forced final"
                    );
                }
                state = StepState::Terminal;
                debug!(agent = %self.agent_name, ?state, rounds, "Step loop");

                self.hierarchy
                    .append(ConversationEntry::assistant(agent_id, &reply.text))
                    .await?;
                self.events.publish(DomainEvent::TurnCompleted {
                    agent_id,
                    iterations: rounds,
                    timestamp: chrono::Utc::now(),
                });
                return Ok(reply.text);
            }

            state = StepState::ExecutingTools;
            debug!(
                agent = %self.agent_name,
                ?state,
                tool_calls = reply.tool_calls.len(),
                "Executing tool calls"
            );

            // Assistant row first, then all tool_call rows, then each result:
            // the assembler folds the calls back into the assistant message,
            // and every tool_result's correlation id has a preceding
            // tool_call row.
            self.hierarchy
                .append(ConversationEntry::assistant(agent_id, &reply.text))
                .await?;
            for call in &reply.tool_calls {
                self.hierarchy
                    .append(ConversationEntry::tool_call(agent_id, call))
                    .await?;
            }

            for call in &reply.tool_calls {
                let start = std::time::Instant::now();
                let result = self.tools.dispatch(call).await;
                let duration_ms = start.elapsed().as_millis() as u64;

                self.audit.log(
                    AuditEvent::ToolExecution {
                        tool_name: call.name.clone(),
                    },
                    &self.agent_name,
                    if result.success {
                        AuditOutcome::Success
                    } else {
                        AuditOutcome::Failure
                    },
                    Some(duration_ms),
                    None,
                );
                self.events.publish(DomainEvent::ToolExecuted {
                    agent_id,
                    tool_name: call.name.clone(),
                    success: result.success,
                    duration_ms,
                    timestamp: chrono::Utc::now(),
                });

                self.hierarchy
                    .append(ConversationEntry::tool_result(
                        agent_id,
                        &call.id,
                        &result.output,
                    ))
                    .await?;
            }

            rounds += 1;
            state = StepState::AwaitingModel;
        }
    }
}
