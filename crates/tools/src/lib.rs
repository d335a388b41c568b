//! Built-in tool implementations for engram.
//!
//! The closed capability set an agent can drive: workspace file operations,
//! whitelisted command execution, Python snippets, HTTP fetches, and the
//! memory tools (archival save/search, working-memory updates).
//!
//! Every file-path argument passes the workspace sandbox; every command
//! passes the command policy; every tool is bounded in output size and
//! wall-clock time. Failures become result strings, never exceptions — the
//! LLM must be able to see them.

pub mod delete_file;
pub mod edit_file;
pub mod fetch_url;
pub mod find_files;
pub mod read_file;
pub mod run_command;
pub mod run_python;
pub mod save_memory;
pub mod search_in_files;
pub mod search_memory;
pub mod update_working_memory;
pub mod write_file;

mod exec;

use std::sync::Arc;

use engram_core::agent::AgentId;
use engram_core::llm::EmbeddingClient;
use engram_core::memory::ArchivalStore;
use engram_core::tool::ToolRegistry;
use engram_memory::MemoryHierarchy;
use engram_security::{AuditLogger, CommandPolicy, WorkspaceSandbox};

/// Shared environment for the workspace-facing tools.
pub struct ToolEnv {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub sandbox: WorkspaceSandbox,
    pub policy: CommandPolicy,
    pub audit: Arc<AuditLogger>,
}

/// Cap on file reads and writes.
pub const FILE_SIZE_MAX: usize = 10 * 1024 * 1024;

/// Cap on find/search result counts.
pub const RESULTS_MAX: usize = 1000;

/// Create the full builtin registry for one agent.
pub fn builtin_registry(
    env: Arc<ToolEnv>,
    hierarchy: Arc<MemoryHierarchy>,
    archival: Arc<dyn ArchivalStore>,
    embedder: Arc<dyn EmbeddingClient>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Box::new(read_file::ReadFileTool::new(env.clone())));
    registry.register(Box::new(write_file::WriteFileTool::new(env.clone())));
    registry.register(Box::new(edit_file::EditFileTool::new(env.clone())));
    registry.register(Box::new(delete_file::DeleteFileTool::new(env.clone())));
    registry.register(Box::new(find_files::FindFilesTool::new(env.clone())));
    registry.register(Box::new(search_in_files::SearchInFilesTool::new(env.clone())));
    registry.register(Box::new(run_command::RunCommandTool::new(env.clone())));
    registry.register(Box::new(run_python::RunPythonTool::new(env.clone())));
    registry.register(Box::new(fetch_url::FetchUrlTool::new(env)));
    registry.register(Box::new(save_memory::SaveMemoryTool::new(
        hierarchy.agent_id(),
        archival.clone(),
        embedder.clone(),
    )));
    registry.register(Box::new(search_memory::SearchMemoryTool::new(
        hierarchy.agent_id(),
        archival,
        embedder,
    )));
    registry.register(Box::new(
        update_working_memory::UpdateWorkingMemoryTool::new(hierarchy),
    ));

    registry
}

/// Write `bytes` to `path` atomically: temp file in the same directory, then
/// rename over the destination. Parent directories are created first.
pub(crate) async fn atomic_write(
    path: &std::path::Path,
    bytes: &[u8],
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4()));
    tokio::fs::write(&tmp, bytes).await?;
    match tokio::fs::rename(&tmp, path).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            Err(e)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn atomic_write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");

        atomic_write(&path, b"first").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");

        atomic_write(&path, b"second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");

        // No temp files left behind.
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
