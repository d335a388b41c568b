//! Hierarchical memory for engram agents.
//!
//! Four tiers, bounded context:
//!
//! 1. **System memory** — static identity/instruction text, set at creation
//! 2. **Working memory** — a single mutable key-value document, size-capped,
//!    rewritten only through the working-memory tool
//! 3. **FIFO view** — the last K conversation rows, held in memory; overflow
//!    promotes the oldest eligible row to archival and drops it from the view
//! 4. **Archival memory** — the durable, vector-searchable store; recall is
//!    an explicit LLM action, never injected by the assembler
//!
//! The persisted conversation log is ground truth: the FIFO view is a bounded
//! window over it, reseeded from the log on restart.

pub mod assembler;
pub mod fifo;
pub mod hierarchy;
pub mod working;

pub use assembler::assemble_context;
pub use fifo::FifoView;
pub use hierarchy::{MemoryHierarchy, MemoryStats};
pub use working::WorkingDocument;
