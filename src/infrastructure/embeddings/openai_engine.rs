use serde::Deserialize;
use serde_json::json;

use crate::{
    application::services::EmbeddingEngine, domain::DomainError,
    infrastructure::http_client::ProviderClient,
};

/// Inputs sent per request; larger pools are split into several calls.
const MAX_BATCH: usize = 256;

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding engine backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedEngine {
    client: ProviderClient,
    dimensions: Option<usize>,
}

impl OpenAiEmbedEngine {
    pub fn new(client: ProviderClient, dimensions: Option<usize>) -> Self {
        Self { client, dimensions }
    }

    fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let mut body = json!({ "input": texts });
        if self.client.sends_model() {
            body["model"] = json!(self.client.model());
        }
        if let Some(dims) = self.dimensions {
            body["dimensions"] = json!(dims);
        }

        let mut response: EmbeddingResponse = self.client.post_json("embeddings", body)?;
        if response.data.len() != texts.len() {
            return Err(DomainError::embedding(format!(
                "provider returned {} embeddings for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }
        response.data.sort_by_key(|item| item.index);

        let vectors: Vec<Vec<f32>> = response.data.into_iter().map(|item| item.embedding).collect();
        if let Some(expected) = self.dimensions {
            if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
                return Err(DomainError::embedding(format!(
                    "unexpected embedding dimension (expected {}, got {})",
                    expected,
                    bad.len()
                )));
            }
        }
        Ok(vectors)
    }
}

impl EmbeddingEngine for OpenAiEmbedEngine {
    fn model(&self) -> &str {
        self.client.model()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::validation("text payload cannot be empty"));
        }
        self.request_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider("provider returned no embedding"))
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            vectors.extend(self.request_batch(batch)?);
        }
        Ok(vectors)
    }
}
