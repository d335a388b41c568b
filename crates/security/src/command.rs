//! Command policy — decides whether a shell command may execute, and under
//! what bounds.
//!
//! The policy is deliberately conservative: a fixed executable whitelist,
//! read-only git subcommands only, and a raw-string scan for shell operators
//! that rejects them even inside quoted strings. Commands are tokenized with
//! shell-quoting rules but never evaluated by a shell; the executable is
//! spawned directly.

use std::time::Duration;

/// Executables an agent may run.
pub const COMMAND_WHITELIST: &[&str] = &[
    "ls", "cat", "head", "tail", "wc", "grep", "find", "pwd", "whoami", "date", "python3",
    "pytest", "git",
];

/// The only git subcommands allowed (all read-only).
pub const GIT_READONLY_SUBCOMMANDS: &[&str] = &["log", "status", "diff", "show", "ls-files"];

/// Characters that reject a command outright, wherever they appear.
/// `&&` and `||` are covered by their single-character forms.
const SHELL_OPERATORS: &[char] = &['&', '|', ';', '>', '<', '`'];

/// Substring forms of shell expansion, rejected wherever they appear.
const SHELL_EXPANSIONS: &[&str] = &["$(", "${"];

/// Environment variables a spawned command inherits. Everything else is
/// scrubbed.
pub const INHERITED_ENV: &[&str] = &["PATH", "HOME", "LANG"];

/// Default wall-clock timeout for a command.
pub const COMMAND_TIMEOUT_DEFAULT: Duration = Duration::from_secs(30);

/// Cap on combined stdout+stderr returned to the agent.
pub const COMMAND_OUTPUT_CAP: usize = 1024 * 1024;

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("shell operator '{found}' not allowed")]
    ShellOperator { found: String },

    #[error("command '{command}' not in whitelist")]
    NotWhitelisted { command: String },

    #[error("git subcommand '{subcommand}' not allowed (read-only subcommands only)")]
    GitSubcommandDenied { subcommand: String },

    #[error("empty command")]
    Empty,

    #[error("invalid command syntax: {0}")]
    Unparseable(String),
}

/// The command execution policy: validation plus execution bounds.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    timeout: Duration,
    output_cap: usize,
}

impl CommandPolicy {
    pub fn new() -> Self {
        Self {
            timeout: COMMAND_TIMEOUT_DEFAULT,
            output_cap: COMMAND_OUTPUT_CAP,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn output_cap(&self) -> usize {
        self.output_cap
    }

    /// Validate a raw command string. Returns the argv to spawn directly
    /// (no shell interpreter).
    pub fn vet(&self, raw: &str) -> Result<Vec<String>, PolicyError> {
        // Operator scan on the raw string, quoted or not.
        if let Some(found) = raw.chars().find(|c| SHELL_OPERATORS.contains(c)) {
            return Err(PolicyError::ShellOperator {
                found: found.to_string(),
            });
        }
        for expansion in SHELL_EXPANSIONS {
            if raw.contains(expansion) {
                return Err(PolicyError::ShellOperator {
                    found: (*expansion).to_string(),
                });
            }
        }

        let argv = shlex::split(raw)
            .ok_or_else(|| PolicyError::Unparseable("unbalanced quoting".into()))?;
        let executable = argv.first().ok_or(PolicyError::Empty)?;

        if !COMMAND_WHITELIST.contains(&executable.as_str()) {
            return Err(PolicyError::NotWhitelisted {
                command: executable.clone(),
            });
        }

        if executable == "git" {
            // The first argument must be a permitted subcommand; global
            // flags before it are rejected rather than skipped.
            let subcommand = argv.get(1).cloned().unwrap_or_default();
            if !GIT_READONLY_SUBCOMMANDS.contains(&subcommand.as_str()) {
                return Err(PolicyError::GitSubcommandDenied { subcommand });
            }
        }

        Ok(argv)
    }
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vet(raw: &str) -> Result<Vec<String>, PolicyError> {
        CommandPolicy::new().vet(raw)
    }

    #[test]
    fn whitelisted_command_passes() {
        let argv = vet("ls -la src").unwrap();
        assert_eq!(argv, vec!["ls", "-la", "src"]);
    }

    #[test]
    fn quoting_is_honored() {
        let argv = vet("grep \"two words\" notes.txt").unwrap();
        assert_eq!(argv, vec!["grep", "two words", "notes.txt"]);
    }

    #[test]
    fn non_whitelisted_command_rejected() {
        assert_eq!(
            vet("rm -rf /"),
            Err(PolicyError::NotWhitelisted {
                command: "rm".into()
            })
        );
        assert!(matches!(
            vet("sudo ls"),
            Err(PolicyError::NotWhitelisted { .. })
        ));
    }

    #[test]
    fn absolute_path_executable_rejected() {
        assert!(matches!(
            vet("/bin/ls -la"),
            Err(PolicyError::NotWhitelisted { .. })
        ));
    }

    #[test]
    fn shell_operators_rejected() {
        for raw in [
            "ls ; cat /etc/passwd",
            "ls && whoami",
            "cat a | grep b",
            "ls > out.txt",
            "cat < in.txt",
            "ls `whoami`",
            "ls $(whoami)",
            "ls ${HOME}",
        ] {
            assert!(
                matches!(vet(raw), Err(PolicyError::ShellOperator { .. })),
                "should reject: {raw}"
            );
        }
    }

    #[test]
    fn operators_inside_quotes_still_rejected() {
        assert!(matches!(
            vet("grep \"a|b\" notes.txt"),
            Err(PolicyError::ShellOperator { .. })
        ));
    }

    #[test]
    fn git_readonly_subcommands_allowed() {
        for sub in GIT_READONLY_SUBCOMMANDS {
            assert!(vet(&format!("git {sub}")).is_ok(), "git {sub} should pass");
        }
    }

    #[test]
    fn git_write_subcommands_rejected() {
        for raw in ["git push", "git commit -m x", "git checkout main", "git"] {
            assert!(
                matches!(vet(raw), Err(PolicyError::GitSubcommandDenied { .. })),
                "should reject: {raw}"
            );
        }
    }

    #[test]
    fn git_global_flags_before_subcommand_rejected() {
        assert!(matches!(
            vet("git -C /elsewhere log"),
            Err(PolicyError::GitSubcommandDenied { .. })
        ));
    }

    #[test]
    fn empty_and_unparseable_rejected() {
        assert_eq!(vet(""), Err(PolicyError::Empty));
        assert_eq!(vet("   "), Err(PolicyError::Empty));
        assert!(matches!(
            vet("cat \"unterminated"),
            Err(PolicyError::Unparseable(_))
        ));
    }

    #[test]
    fn default_bounds() {
        let policy = CommandPolicy::default();
        assert_eq!(policy.timeout(), Duration::from_secs(30));
        assert_eq!(policy.output_cap(), 1024 * 1024);
    }
}
