use std::sync::Arc;

use tracing::{debug, warn};

use super::EmbeddingEngine;
use crate::domain::{
    retrieval::{cosine_similarity, extract_keywords, keyword_score, SimilarityError},
    ChunkCandidate, DomainError, ScoringStrategy,
};

/// Relevance scoring capability the retrieval engine depends on.
///
/// `score_pool` returns exactly one score per candidate, in candidate order.
pub trait Scorer: Send + Sync {
    fn strategy(&self) -> ScoringStrategy;

    fn score_pool(&self, query: &str, pool: &[ChunkCandidate]) -> Result<Vec<f32>, DomainError>;
}

/// Term-frequency scoring over extracted query keywords.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer;

impl KeywordScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, chunk_text: &str, terms: &[String]) -> f32 {
        keyword_score(chunk_text, terms)
    }
}

impl Scorer for KeywordScorer {
    fn strategy(&self) -> ScoringStrategy {
        ScoringStrategy::Keyword
    }

    fn score_pool(&self, query: &str, pool: &[ChunkCandidate]) -> Result<Vec<f32>, DomainError> {
        let terms = extract_keywords(query);
        if terms.is_empty() {
            debug!(
                target: "ragdesk::retrieval",
                "query has no significant terms; every chunk scores 0"
            );
        } else {
            debug!(target: "ragdesk::retrieval", terms = terms.len(), "keyword terms extracted");
        }
        Ok(pool
            .iter()
            .map(|candidate| self.score(&candidate.content, &terms))
            .collect())
    }
}

/// Cosine similarity between the query embedding and each chunk embedding.
///
/// Embeddings are recomputed on every call, so provider cost grows linearly
/// with the chunk pool. A cache belongs around the [`EmbeddingEngine`], not
/// in here.
pub struct VectorScorer {
    embedder: Arc<dyn EmbeddingEngine>,
}

impl VectorScorer {
    pub fn new(embedder: Arc<dyn EmbeddingEngine>) -> Self {
        Self { embedder }
    }

    /// Degenerate or mismatched vectors score 0.0 instead of failing the
    /// whole retrieval.
    pub fn score(&self, chunk_embedding: &[f32], query_embedding: &[f32]) -> f32 {
        match cosine_similarity(query_embedding, chunk_embedding) {
            Ok(score) => score,
            Err(SimilarityError::ZeroNorm) => {
                debug!(target: "ragdesk::retrieval", "zero-norm embedding scored as 0");
                0.0
            }
            Err(err @ SimilarityError::DimensionMismatch { .. }) => {
                warn!(target: "ragdesk::retrieval", error = %err, "embedding scored as 0");
                0.0
            }
        }
    }
}

impl Scorer for VectorScorer {
    fn strategy(&self) -> ScoringStrategy {
        ScoringStrategy::Vector
    }

    fn score_pool(&self, query: &str, pool: &[ChunkCandidate]) -> Result<Vec<f32>, DomainError> {
        // Punctuation-only queries carry nothing to embed.
        let query = query.trim();
        if !query.chars().any(char::is_alphanumeric) {
            debug!(target: "ragdesk::retrieval", "blank query; every chunk scores 0");
            return Ok(vec![0.0; pool.len()]);
        }

        let query_vector = self.embedder.embed(query)?;
        let texts: Vec<String> = pool.iter().map(|c| c.content.clone()).collect();
        let chunk_vectors = self.embedder.embed_many(&texts)?;

        if chunk_vectors.len() != pool.len() {
            return Err(DomainError::embedding(format!(
                "provider returned {} embeddings for {} chunks",
                chunk_vectors.len(),
                pool.len()
            )));
        }

        Ok(chunk_vectors
            .iter()
            .map(|vector| self.score(vector, &query_vector))
            .collect())
    }
}
