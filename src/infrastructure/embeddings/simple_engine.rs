use ahash::AHasher;
use std::hash::{Hash, Hasher};

use crate::{application::services::EmbeddingEngine, domain::DomainError};

/// A lightweight, deterministic embedding engine that hashes tokens into a fixed-size vector.
/// This is not meant for production-grade semantic search, but it keeps the vector strategy
/// usable without downloading models or calling a remote provider.
pub struct SimpleEmbedEngine {
    model_name: String,
    dimensions: usize,
}

impl SimpleEmbedEngine {
    pub fn try_new(model_name: impl Into<String>, dimensions: usize) -> Result<Self, DomainError> {
        if dimensions == 0 {
            return Err(DomainError::validation(
                "embedding dimensions must be greater than zero",
            ));
        }
        let dims = dimensions.clamp(8, 4096);
        Ok(Self {
            model_name: model_name.into(),
            dimensions: dims,
        })
    }

    fn tokenize<'a>(&self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
    }

    fn hash_token(&self, token: &str) -> usize {
        let mut hasher = AHasher::default();
        token.hash(&mut hasher);
        hasher.finish() as usize
    }

    /// Tokenless text maps to the zero vector, which cosine scoring treats as
    /// degenerate.
    fn embed_internal(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let mut seen_any = false;

        for token in self.tokenize(text) {
            let idx = self.hash_token(&token) % self.dimensions;
            vector[idx] += 1.0;
            seen_any = true;
        }
        if !seen_any {
            return vector;
        }

        // L2 normalize to keep scores in [-1, 1]
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

impl EmbeddingEngine for SimpleEmbedEngine {
    fn model(&self) -> &str {
        &self.model_name
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::validation("text payload cannot be empty"));
        }
        Ok(self.embed_internal(text))
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        Ok(texts.iter().map(|text| self.embed_internal(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::retrieval::cosine_similarity;

    fn engine() -> SimpleEmbedEngine {
        SimpleEmbedEngine::try_new("ragdesk/simple-hash", 256).unwrap()
    }

    #[test]
    fn zero_dimensions_are_rejected_and_small_ones_clamped() {
        assert!(SimpleEmbedEngine::try_new("m", 0).is_err());
        assert_eq!(SimpleEmbedEngine::try_new("m", 2).unwrap().embed("a b").unwrap().len(), 8);
    }

    #[test]
    fn vectors_are_unit_length_and_deterministic() {
        let engine = engine();
        let a = engine.embed("Vacation days roll over").unwrap();
        let b = engine.embed("vacation DAYS roll over!").unwrap();
        assert_eq!(a.len(), 256);
        assert_eq!(a, b);
        let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_tokens_increase_similarity() {
        let engine = engine();
        let query = engine.embed("remote work policy").unwrap();
        let close = engine.embed("policy for remote work approval").unwrap();
        let far = engine.embed("cafeteria lunch menu").unwrap();
        let close_score = cosine_similarity(&query, &close).unwrap();
        let far_score = cosine_similarity(&query, &far).unwrap();
        assert!(close_score > far_score);
    }

    #[test]
    fn blank_query_is_rejected_but_blank_chunks_embed_to_zero() {
        let engine = engine();
        assert!(engine.embed("   ").is_err());
        let vectors = engine
            .embed_many(&["...".to_string(), "text".to_string()])
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors[0].iter().all(|v| *v == 0.0));
        assert!(vectors[1].iter().any(|v| *v != 0.0));
    }
}
