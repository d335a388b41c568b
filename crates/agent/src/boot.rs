//! Agent bootstrap — load-or-create, template migration, and wiring.
//!
//! On load, the stored system memory is compared against the binary's
//! current default template; when the structural markers differ the stored
//! value is replaced. The comparison is on section headers only, so the
//! refresh is idempotent and insensitive to agent-specific text.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use engram_core::agent::{AgentId, AgentRecord, AgentStore, FIFO_CAPACITY_DEFAULT};
use engram_core::error::Error;
use engram_core::event::EventBus;
use engram_core::llm::{ChatClient, EmbeddingClient};
use engram_core::memory::ArchivalStore;
use engram_core::turn::ConversationLog;
use engram_memory::{MemoryHierarchy, MemoryStats};
use engram_security::{AuditLogger, CommandPolicy, WorkspaceSandbox};
use engram_tools::{builtin_registry, ToolEnv};

use crate::step::StepLoop;

/// Options for opening an agent.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Unique agent name
    pub name: String,
    /// Chat model identifier (used at creation; an existing agent keeps its
    /// stored model)
    pub model_id: String,
    /// Workspace root for this agent's tools
    pub workspace_root: PathBuf,
    /// FIFO view capacity (used at creation)
    pub fifo_capacity: usize,
    /// Chat sampling temperature
    pub temperature: f32,
}

impl AgentOptions {
    pub fn new(name: impl Into<String>, model_id: impl Into<String>, workspace_root: PathBuf) -> Self {
        Self {
            name: name.into(),
            model_id: model_id.into(),
            workspace_root,
            fifo_capacity: FIFO_CAPACITY_DEFAULT,
            temperature: 0.7,
        }
    }
}

/// A fully wired agent: memory hierarchy, tool registry, and step loop.
pub struct Agent {
    record: AgentRecord,
    hierarchy: Arc<MemoryHierarchy>,
    step_loop: StepLoop,
}

impl Agent {
    /// Load an agent by name, creating it on first use.
    #[allow(clippy::too_many_arguments)]
    pub async fn open(
        agents: Arc<dyn AgentStore>,
        log: Arc<dyn ConversationLog>,
        archival: Arc<dyn ArchivalStore>,
        chat: Arc<dyn ChatClient>,
        embedder: Arc<dyn EmbeddingClient>,
        events: Arc<EventBus>,
        audit: Arc<AuditLogger>,
        options: AgentOptions,
    ) -> Result<Agent, Error> {
        let record = match agents.get_agent_by_name(&options.name).await? {
            Some(mut record) => {
                // Template migration: refresh system memory when the
                // binary's default changed shape.
                let current = default_system_memory(&record.name);
                if template_markers(&record.system_memory) != template_markers(&current) {
                    info!(agent = %record.name, "System memory template changed, refreshing");
                    agents
                        .update_agent_memory(record.id, Some(&current), None)
                        .await?;
                    record.system_memory = current;
                }
                info!(agent = %record.name, id = %record.id, "Loaded existing agent");
                record
            }
            None => {
                let now = chrono::Utc::now();
                let record = AgentRecord {
                    id: AgentId::new(),
                    name: options.name.clone(),
                    model_id: options.model_id.clone(),
                    system_memory: default_system_memory(&options.name),
                    working_memory: default_working_memory(&options.name),
                    fifo_capacity: options.fifo_capacity,
                    workspace_root: options.workspace_root.clone(),
                    created_at: now,
                    updated_at: now,
                };
                agents.create_agent(&record).await?;
                info!(agent = %record.name, id = %record.id, "Created new agent");
                record
            }
        };

        let hierarchy = Arc::new(
            MemoryHierarchy::load(
                &record,
                log,
                archival.clone(),
                agents,
                embedder.clone(),
                events.clone(),
            )
            .await?,
        );

        let sandbox = WorkspaceSandbox::create(&record.workspace_root)
            .map_err(|e| Error::Config {
                message: format!("workspace unusable: {e}"),
            })?;
        let env = Arc::new(ToolEnv {
            agent_id: record.id,
            agent_name: record.name.clone(),
            sandbox,
            policy: CommandPolicy::new(),
            audit: audit.clone(),
        });

        let tools = Arc::new(builtin_registry(
            env,
            hierarchy.clone(),
            archival,
            embedder,
        ));

        let step_loop = StepLoop::new(
            hierarchy.clone(),
            chat,
            tools,
            events,
            audit,
            record.name.clone(),
            options.temperature,
        );

        Ok(Agent {
            record,
            hierarchy,
            step_loop,
        })
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn record(&self) -> &AgentRecord {
        &self.record
    }

    pub fn hierarchy(&self) -> &Arc<MemoryHierarchy> {
        &self.hierarchy
    }

    /// Process one user message to its terminal response.
    pub async fn process(&self, user_text: &str) -> Result<String, Error> {
        self.step_loop.run_turn(user_text).await
    }

    /// Memory usage across all tiers.
    pub async fn memory_stats(&self) -> Result<MemoryStats, Error> {
        Ok(self.hierarchy.stats().await?)
    }
}

/// The default system-memory template for a new agent.
pub fn default_system_memory(name: &str) -> String {
    format!(
        "You are {name}, a conversational agent with hierarchical memory.\n\
         \n\
         ## Identity\n\
         You learn from the people you talk to and keep what matters. You have \
         a private workspace directory for files, and tools to act on it.\n\
         \n\
         ## Conduct\n\
         Use tools when they help; answer directly when they don't. When a \
         tool fails, read the error and correct your call rather than giving \
         up. Keep working memory current: record durable facts about the user \
         there or in archival memory before they scroll out of view."
    )
}

/// The default working-memory document for a new agent.
pub fn default_working_memory(name: &str) -> String {
    format!("agent: {name}\nstatus: ready\ncontext: fresh start, no prior conversation")
}

/// Structural markers of a system-memory template: its section headers.
fn template_markers(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| line.starts_with("## "))
        .map(str::trim)
        .collect()
}
