//! The engram agent runtime.
//!
//! Ties the memory hierarchy, the tool registry, and the chat client into a
//! per-turn step loop, and handles agent bootstrap: load-or-create by name,
//! system-memory template migration, and FIFO seeding from the log.

pub mod boot;
pub mod step;

pub use boot::{Agent, AgentOptions};
pub use step::{StepLoop, TOOL_ROUNDS_MAX};
