//! Security module for engram — filesystem sandboxing, command policy, and
//! audit logging.
//!
//! Provides:
//! - **Workspace sandbox**: every file-path argument resolves to a descendant
//!   of the agent's workspace root, or is rejected
//! - **Command policy**: whitelist + shell-metacharacter rejection + bounds
//!   for subprocess execution
//! - **Audit logging**: structured security event logging

pub mod audit;
pub mod command;
pub mod workspace;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use command::{CommandPolicy, PolicyError, COMMAND_WHITELIST, GIT_READONLY_SUBCOMMANDS};
pub use workspace::{SandboxError, WorkspaceSandbox};
