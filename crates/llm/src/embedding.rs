//! OpenAI-compatible embedding client.
//!
//! Produces fixed-dimension vectors via an `/embeddings` endpoint. The
//! dimension is part of the deployment configuration; a response of any
//! other length is an error, caught here before it can reach the store.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use engram_core::error::LlmError;
use engram_core::llm::EmbeddingClient;

const EMBED_TIMEOUT_SECS: u64 = 30;

/// An embedding client for OpenAI-compatible endpoints.
pub struct OpenAiCompatEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    dim: usize,
    client: reqwest::Client,
}

impl OpenAiCompatEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        dim: usize,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(EMBED_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            dim,
            client,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiCompatEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "encoding_format": "float",
        });

        debug!(model = %self.model, chars = text.len(), "Sending embedding request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(e.to_string())
            } else {
                LlmError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status_code: status,
                message,
            });
        }

        let api_resp: EmbeddingApiResponse = response.json().await.map_err(|e| {
            LlmError::InvalidResponse(format!("Failed to parse embedding response: {e}"))
        })?;

        let embedding = api_resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::InvalidResponse("No embedding in response".into()))?;

        if embedding.len() != self.dim {
            return Err(LlmError::InvalidResponse(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dim,
                embedding.len()
            )));
        }

        Ok(embedding)
    }
}

#[derive(Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
