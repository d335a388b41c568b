//! LLM clients for engram.
//!
//! Works with any OpenAI-compatible endpoint (OpenAI, OpenRouter, Ollama,
//! vLLM, Together AI, ...), which covers the vast majority of chat and
//! embedding services. The engine only ever sees the [`engram_core::ChatClient`]
//! and [`engram_core::EmbeddingClient`] traits.

pub mod chat;
pub mod embedding;

pub use chat::OpenAiCompatChat;
pub use embedding::OpenAiCompatEmbedder;
