//! Persistence layer for engram.
//!
//! Everything durable lives in a relational store: agent records, the
//! append-only conversation log, and archival memory entries with their
//! embeddings. The production backend is PostgreSQL with pgvector (HNSW
//! cosine index); an in-memory store implements the same traits for tests.

pub mod in_memory;
pub mod postgres;
pub mod vector;

pub use in_memory::InMemoryStore;
pub use postgres::PgStore;
pub use vector::cosine_similarity;
