use std::sync::Arc;

use tracing::debug;

use super::{ChunkStore, Scorer};
use crate::domain::{retrieval::rank, DomainError, ScoredChunk, ScoringStrategy};

/// Settings the retrieval engine is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { default_top_k: 5 }
    }
}

/// Selects and orders the chunks most relevant to a query.
///
/// Every call performs a full scan of the chunk store, scores each candidate
/// with the configured [`Scorer`], and keeps the top K by descending score
/// (ties in scan order). The store is only read. Chunks deleted by a
/// concurrent reprocess after the scan may still be returned for that call.
pub struct RetrievalEngine {
    store: Arc<dyn ChunkStore>,
    scorer: Arc<dyn Scorer>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        scorer: Arc<dyn Scorer>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            scorer,
            config,
        }
    }

    pub fn strategy(&self) -> ScoringStrategy {
        self.scorer.strategy()
    }

    pub fn default_top_k(&self) -> usize {
        self.config.default_top_k
    }

    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, DomainError> {
        let pool = self.store.all_chunks_with_document_metadata()?;
        if pool.is_empty() || k == 0 {
            debug!(target: "ragdesk::retrieval", pool = pool.len(), k, "nothing to rank");
            return Ok(Vec::new());
        }

        let scores = self.scorer.score_pool(query, &pool)?;
        if scores.len() != pool.len() {
            return Err(DomainError::other(format!(
                "scorer returned {} scores for {} candidates",
                scores.len(),
                pool.len()
            )));
        }

        let scored = pool
            .into_iter()
            .zip(scores)
            .map(|(candidate, score)| (candidate, if score.is_finite() { score } else { 0.0 }))
            .collect::<Vec<_>>();
        let pool_size = scored.len();

        let ranked: Vec<ScoredChunk> = rank(scored, k)
            .into_iter()
            .map(|(candidate, score)| candidate.with_score(score))
            .collect();

        debug!(
            target: "ragdesk::retrieval",
            strategy = self.scorer.strategy().as_str(),
            pool = pool_size,
            k,
            returned = ranked.len(),
            top_score = ranked.first().map(|c| c.score).unwrap_or_default(),
            "retrieval complete"
        );

        Ok(ranked)
    }
}
