//! Search workspace file contents by regex, grep-style.

use std::sync::Arc;

use async_trait::async_trait;
use walkdir::WalkDir;

use engram_core::error::ToolError;
use engram_core::tool::{Tool, ToolResult};
use engram_security::{AuditEvent, AuditOutcome};

use crate::{ToolEnv, FILE_SIZE_MAX, RESULTS_MAX};

pub struct SearchInFilesTool {
    env: Arc<ToolEnv>,
}

impl SearchInFilesTool {
    pub fn new(env: Arc<ToolEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Tool for SearchInFilesTool {
    fn name(&self) -> &str {
        "search_in_files"
    }

    fn description(&self) -> &str {
        "Search file contents with a regular expression, like grep. \
         Returns path:line:text matches."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "regex": {
                    "type": "string",
                    "description": "Regular expression to search for"
                },
                "file_glob": {
                    "type": "string",
                    "description": "Glob pattern for files to search (default: all files)",
                    "default": "*"
                },
                "root": {
                    "type": "string",
                    "description": "Directory to search from (default: workspace root)"
                }
            },
            "required": ["regex"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let regex_str = arguments["regex"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'regex' argument".into()))?;
        let glob_str = arguments["file_glob"].as_str().unwrap_or("*");
        let root_arg = arguments["root"].as_str().unwrap_or(".");

        let regex = regex::Regex::new(regex_str)
            .map_err(|e| ToolError::InvalidArguments(format!("invalid regex: {e}")))?;
        let pattern = glob::Pattern::new(glob_str)
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

        'files: for entry in WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if entry
                .metadata()
                .map(|m| m.len() > FILE_SIZE_MAX as u64)
                .unwrap_or(true)
            {
                continue;
            }

            let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            let name_matches = entry
                .path()
                .file_name()
                .map(|n| pattern.matches(&n.to_string_lossy()))
                .unwrap_or(false);
            if !pattern.matches_path(rel) && !name_matches {
                continue;
            }

            // Skip unreadable or binary files.
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue;
            };

            for (line_no, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    if matches.len() == RESULTS_MAX {
                        truncated = true;
                        break 'files;
                    }
                    matches.push(format!("{}:{}:{}", rel.display(), line_no + 1, line));
                }
            }
        }

        if matches.is_empty() {
            return Ok(ToolResult::ok(format!("No matches for '{regex_str}'")));
        }

        let mut output = matches.join("\n");
        if truncated {
            output.push_str(&format!("\n[truncated at {RESULTS_MAX} matches]"));
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
        std::fs::write(root.join("app.py"), "def main():\n    print('hi')\n").unwrap();
        std::fs::write(root.join("util.py"), "def helper():\n    pass\n").unwrap();
        std::fs::write(root.join("notes.txt"), "def is not code here\n").unwrap();
    }

    #[tokio::test]
    async fn finds_matches_with_line_numbers() {
        let (_dir, env) = env();
        seed(&env);

        let tool = SearchInFilesTool::new(env);
        let result = tool
            .execute(serde_json::json!({"regex": "def \\w+", "file_glob": "*.py"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("app.py:1:def main():"));
        assert!(result.output.contains("util.py:1:def helper():"));
        assert!(!result.output.contains("notes.txt"));
    }

    #[tokio::test]
    async fn zero_matches_is_success() {
        let (_dir, env) = env();
        seed(&env);

        let tool = SearchInFilesTool::new(env);
        let result = tool
            .execute(serde_json::json!({"regex": "nonexistent_symbol"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("No matches"));
    }

    #[tokio::test]
    async fn binary_files_skipped() {
        let (_dir, env) = env();
        std::fs::write(env.sandbox.root().join("blob.bin"), [0u8, 255, 1, 2]).unwrap();

        let tool = SearchInFilesTool::new(env);
        let result = tool
            .execute(serde_json::json!({"regex": "."}))
            .await
            .unwrap();
        assert!(!result.output.contains("blob.bin"));
    }

    #[tokio::test]
    async fn match_cap_annotated() {
        let (_dir, env) = env();
        let many_lines = "match\n".repeat(RESULTS_MAX + 10);
        std::fs::write(env.sandbox.root().join("big.txt"), many_lines).unwrap();

        let tool = SearchInFilesTool::new(env);
        let result = tool
            .execute(serde_json::json!({"regex": "match"}))
            .await
            .unwrap();
        assert!(result.output.contains("[truncated at 1000 matches]"));
    }

    #[tokio::test]
    async fn invalid_regex_rejected() {
        let (_dir, env) = env();
        let tool = SearchInFilesTool::new(env);
        assert!(tool
            .execute(serde_json::json!({"regex": "(unclosed"}))
            .await
            .is_err());
    }
}
