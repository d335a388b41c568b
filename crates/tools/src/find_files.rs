//! Find workspace files by glob pattern.

use std::sync::Arc;

use async_trait::async_trait;
use walkdir::WalkDir;

use engram_core::error::ToolError;
use engram_core::tool::{Tool, ToolResult};
use engram_security::{AuditEvent, AuditOutcome};

use crate::{ToolEnv, RESULTS_MAX};

pub struct FindFilesTool {
    env: Arc<ToolEnv>,
}

impl FindFilesTool {
    pub fn new(env: Arc<ToolEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Tool for FindFilesTool {
    fn name(&self) -> &str {
        "find_files"
    }

    fn description(&self) -> &str {
        "Find files in your workspace by glob pattern, e.g. '*.py' or 'src/**/*.rs'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "glob": {
                    "type": "string",
                    "description": "Glob pattern to match file paths against"
                },
                "root": {
                    "type": "string",
                    "description": "Directory to search from (default: workspace root)"
                }
            },
            "required": ["glob"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let pattern_str = arguments["glob"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'glob' argument".into()))?;
        let root_arg = arguments["root"].as_str().unwrap_or(".");

        let pattern = glob::Pattern::new(pattern_str)
            .map_err(|e| ToolError::InvalidArguments(format!("invalid glob: {e}")))?;

        let root = match self.env.sandbox.resolve_read(root_arg) {
            Ok(root) => root,
            Err(e) => {
                self.env.audit.log(
                    AuditEvent::PathDenied {
                        path: root_arg.into(),
                    },
                    &self.env.agent_name,
                    AuditOutcome::Denied,
                    None,
                    Some(e.to_string()),
                );
                return Err(ToolError::SandboxViolation(e.to_string()));
            }
        };

        let mut matches: Vec<String> = Vec::new();
        let mut truncated = false;

        // Symlinks are not followed; escaping entries can't appear.
        for entry in WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path());

            let name_matches = entry
                .path()
                .file_name()
                .map(|n| pattern.matches(&n.to_string_lossy()))
                .unwrap_or(false);
            if pattern.matches_path(rel) || name_matches {
                if matches.len() == RESULTS_MAX {
                    truncated = true;
                    break;
                }
                matches.push(rel.display().to_string());
            }
        }

        if matches.is_empty() {
            return Ok(ToolResult::ok(format!(
                "No files found matching '{pattern_str}'"
            )));
        }

        matches.sort();
        let mut output = matches.join("\n");
        if truncated {
            output.push_str(&format!("\n[truncated at {RESULTS_MAX} results]"));
        }
        Ok(ToolResult::ok(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env;

    fn seed(env: &ToolEnv) {
        let root = env.sandbox.root();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("main.py"), "").unwrap();
        std::fs::write(root.join("notes.txt"), "").unwrap();
        std::fs::write(root.join("src/util.py"), "").unwrap();
    }

    #[tokio::test]
    async fn matches_by_extension_recursively() {
        let (_dir, env) = env();
        seed(&env);

        let tool = FindFilesTool::new(env);
        let result = tool
            .execute(serde_json::json!({"glob": "*.py"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "main.py\nsrc/util.py");
    }

    #[tokio::test]
    async fn matches_nested_glob() {
        let (_dir, env) = env();
        seed(&env);

        let tool = FindFilesTool::new(env);
        let result = tool
            .execute(serde_json::json!({"glob": "src/**/*.py"}))
            .await
            .unwrap();
        assert_eq!(result.output, "src/util.py");
    }

    #[tokio::test]
    async fn no_matches_is_success() {
        let (_dir, env) = env();
        seed(&env);

        let tool = FindFilesTool::new(env);
        let result = tool
            .execute(serde_json::json!({"glob": "*.rs"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("No files found"));
    }

    #[tokio::test]
    async fn truncates_beyond_cap() {
        let (_dir, env) = env();
        for i in 0..(RESULTS_MAX + 1) {
            std::fs::write(env.sandbox.root().join(format!("f{i:04}.log")), "").unwrap();
        }

        let tool = FindFilesTool::new(env);
        let result = tool
            .execute(serde_json::json!({"glob": "*.log"}))
            .await
            .unwrap();
        assert!(result.output.contains("[truncated at 1000 results]"));
        // 1000 paths + 1 marker line
        assert_eq!(result.output.lines().count(), RESULTS_MAX + 1);
    }

    #[tokio::test]
    async fn exactly_cap_results_has_no_marker() {
        let (_dir, env) = env();
        for i in 0..RESULTS_MAX {
            std::fs::write(env.sandbox.root().join(format!("g{i:04}.dat")), "").unwrap();
        }

        let tool = FindFilesTool::new(env);
        let result = tool
            .execute(serde_json::json!({"glob": "*.dat"}))
            .await
            .unwrap();
        assert!(!result.output.contains("truncated"));
        assert_eq!(result.output.lines().count(), RESULTS_MAX);
    }

    #[tokio::test]
    async fn invalid_glob_rejected() {
        let (_dir, env) = env();
        let tool = FindFilesTool::new(env);
        assert!(tool
            .execute(serde_json::json!({"glob": "[unclosed"}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn root_outside_workspace_denied() {
        let (_dir, env) = env();
        let tool = FindFilesTool::new(env);
        assert!(tool
            .execute(serde_json::json!({"glob": "*", "root": "/etc"}))
            .await
            .is_err());
    }
}
