use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use super::{AnswerGenerator, ChunkStore, GenerationRequest, RetrievalEngine};
use crate::{
    application::dtos::{
        HealthStatusResponse, QueryLogDto, QueryMetadata, QueryRequest, QueryResponse,
        RetrievedChunkDto, SearchResponse,
    },
    domain::{DomainError, NewQueryLog, ScoredChunk},
};

/// Largest top-K a caller may request.
pub const MAX_TOP_K: usize = 100;
const MAX_QUERY_CHARS: usize = 4_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RagServiceConfig {
    /// Temperature used when a request does not carry one.
    pub default_temperature: Option<f32>,
}

impl Default for RagServiceConfig {
    fn default() -> Self {
        Self {
            default_temperature: Some(0.7),
        }
    }
}

/// Retrieve, generate, log: the question-answering pipeline.
pub struct RagService {
    store: Arc<dyn ChunkStore>,
    retrieval: Arc<RetrievalEngine>,
    generator: Arc<dyn AnswerGenerator>,
    config: RagServiceConfig,
}

impl RagService {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        retrieval: Arc<RetrievalEngine>,
        generator: Arc<dyn AnswerGenerator>,
        config: RagServiceConfig,
    ) -> Self {
        Self {
            store,
            retrieval,
            generator,
            config,
        }
    }

    /// Answers `request.query` from the top-K retrieved chunks.
    ///
    /// Embedding and generation failures come back as a response with
    /// `success == false`; only invalid input and storage failures are errors.
    pub fn ask(&self, request: QueryRequest) -> Result<QueryResponse, DomainError> {
        let started = Instant::now();
        let k = self.resolve_k(request.max_chunks)?;
        Self::validate_query(&request.query)?;

        let mut metadata = QueryMetadata {
            model: self.generator.model().to_string(),
            strategy: self.retrieval.strategy(),
            chunks_retrieved: 0,
            tokens_used: None,
            error: None,
        };

        let retrieved = match self.retrieval.retrieve(&request.query, k) {
            Ok(chunks) => chunks,
            Err(err) if err.is_provider_failure() => {
                warn!(target: "ragdesk::rag", error = %err, "retrieval provider failed");
                metadata.error = Some(err.to_string());
                return Ok(QueryResponse {
                    query: request.query,
                    response: format!("Error retrieving context: {err}"),
                    success: false,
                    chunks: None,
                    processing_time: started.elapsed().as_secs_f64(),
                    metadata,
                });
            }
            Err(err) => return Err(err),
        };
        metadata.chunks_retrieved = retrieved.len();

        let generation = GenerationRequest {
            question: request.query.clone(),
            contexts: retrieved.iter().map(|c| c.content.clone()).collect(),
            temperature: request.temperature.or(self.config.default_temperature),
        };

        let (response, success) = match self.generator.generate(&generation) {
            Ok(answer) => {
                metadata.model = answer.model;
                metadata.tokens_used = answer.usage;
                (answer.text, true)
            }
            Err(err) => {
                warn!(
                    target: "ragdesk::rag",
                    error = %err,
                    chunks = retrieved.len(),
                    top_chunk = ?retrieved.first().map(|c| c.chunk_id),
                    "answer generation failed"
                );
                metadata.error = Some(err.to_string());
                (format!("Error generating response: {err}"), false)
            }
        };

        self.log_query(&request.query, &response, &metadata)?;

        info!(
            target: "ragdesk::rag",
            success,
            chunks = metadata.chunks_retrieved,
            strategy = metadata.strategy.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query answered"
        );

        Ok(QueryResponse {
            query: request.query,
            response,
            success,
            chunks: request.include_sources.then(|| Self::present(retrieved)),
            processing_time: started.elapsed().as_secs_f64(),
            metadata,
        })
    }

    /// Retrieval only, without generation or logging.
    pub fn search(&self, query: &str, k: Option<usize>) -> Result<SearchResponse, DomainError> {
        let k = self.resolve_k(k)?;
        let results = self.retrieval.retrieve(query, k)?;
        Ok(SearchResponse {
            query: query.to_string(),
            strategy: self.retrieval.strategy(),
            results: Self::present(results),
        })
    }

    pub fn recent_queries(&self, limit: usize) -> Result<Vec<QueryLogDto>, DomainError> {
        let entries = self.store.recent_queries(limit.clamp(1, 200))?;
        Ok(entries
            .into_iter()
            .map(|entry| QueryLogDto {
                id: entry.id,
                query_text: entry.query_text,
                response_text: entry.response_text,
                metadata: entry
                    .metadata
                    .as_deref()
                    .and_then(|raw| serde_json::from_str(raw).ok()),
                created_at: entry.created_at,
            })
            .collect())
    }

    pub fn health(&self) -> Result<HealthStatusResponse, DomainError> {
        self.store.ping()?;

        Ok(HealthStatusResponse {
            ok: true,
            message: "ready".into(),
            details: Some(format!(
                "strategy: {}, generator: {}, checked_at: {}",
                self.retrieval.strategy().as_str(),
                self.generator.model(),
                Utc::now()
            )),
        })
    }

    fn resolve_k(&self, requested: Option<usize>) -> Result<usize, DomainError> {
        let k = requested.unwrap_or(self.retrieval.default_top_k());
        if k > MAX_TOP_K {
            return Err(DomainError::limit(format!(
                "max_chunks cannot exceed {MAX_TOP_K}"
            )));
        }
        Ok(k)
    }

    fn validate_query(query: &str) -> Result<(), DomainError> {
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(DomainError::limit(format!(
                "query cannot exceed {MAX_QUERY_CHARS} characters"
            )));
        }
        Ok(())
    }

    fn log_query(
        &self,
        query: &str,
        response: &str,
        metadata: &QueryMetadata,
    ) -> Result<(), DomainError> {
        let metadata = serde_json::to_string(metadata)
            .map_err(|err| DomainError::other(format!("failed to encode query metadata: {err}")))?;
        self.store.save_query(NewQueryLog {
            query_text: query.to_string(),
            response_text: response.to_string(),
            metadata: Some(metadata),
        })?;
        Ok(())
    }

    fn present(chunks: Vec<ScoredChunk>) -> Vec<RetrievedChunkDto> {
        chunks.into_iter().map(RetrievedChunkDto::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{
        EmbeddingEngine, GeneratedAnswer, KeywordScorer, RetrievalConfig, VectorScorer,
    };
    use crate::domain::{NewChunk, NewDocument, ScoringStrategy, TokenUsage};
    use crate::infrastructure::InMemoryChunkStore;
    use parking_lot::Mutex;

    /// Records every request and answers with the number of contexts seen.
    #[derive(Default)]
    struct RecordingGenerator {
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl AnswerGenerator for RecordingGenerator {
        fn model(&self) -> &str {
            "recording"
        }

        fn generate(&self, request: &GenerationRequest) -> Result<GeneratedAnswer, DomainError> {
            self.seen.lock().push(request.clone());
            Ok(GeneratedAnswer {
                text: format!("answered from {} contexts", request.contexts.len()),
                model: "recording-v1".into(),
                usage: Some(TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
            })
        }
    }

    struct FailingGenerator;

    impl AnswerGenerator for FailingGenerator {
        fn model(&self) -> &str {
            "failing"
        }

        fn generate(&self, _: &GenerationRequest) -> Result<GeneratedAnswer, DomainError> {
            Err(DomainError::provider("HTTP 503 - upstream unavailable"))
        }
    }

    struct OfflineEmbedder;

    impl EmbeddingEngine for OfflineEmbedder {
        fn model(&self) -> &str {
            "offline"
        }

        fn embed(&self, _: &str) -> Result<Vec<f32>, DomainError> {
            Err(DomainError::provider("connection refused"))
        }
    }

    fn seeded_store() -> Arc<InMemoryChunkStore> {
        let store = Arc::new(InMemoryChunkStore::new());
        let doc = store
            .create_document(NewDocument {
                title: "Leave policy".into(),
                content: "...".into(),
                source: Some("hr".into()),
                document_type: None,
            })
            .unwrap();
        store
            .batch_insert_chunks(vec![
                NewChunk {
                    document_id: doc.id,
                    content: "Vacation days accrue monthly.".into(),
                    chunk_order: 1,
                },
                NewChunk {
                    document_id: doc.id,
                    content: "Sick leave needs a doctor's note after three days.".into(),
                    chunk_order: 2,
                },
                NewChunk {
                    document_id: doc.id,
                    content: "Unused vacation days roll over; vacation caps at 30.".into(),
                    chunk_order: 3,
                },
            ])
            .unwrap();
        store
    }

    fn keyword_service(
        store: Arc<InMemoryChunkStore>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> RagService {
        let retrieval = Arc::new(RetrievalEngine::new(
            store.clone(),
            Arc::new(KeywordScorer::new()),
            RetrievalConfig { default_top_k: 2 },
        ));
        RagService::new(store, retrieval, generator, RagServiceConfig::default())
    }

    #[test]
    fn ask_passes_ranked_contexts_and_logs_the_query() {
        let store = seeded_store();
        let generator = Arc::new(RecordingGenerator::default());
        let service = keyword_service(store.clone(), generator.clone());

        let response = service.ask(QueryRequest::new("How do vacation days work?")).unwrap();

        assert!(response.success);
        assert_eq!(response.response, "answered from 2 contexts");
        assert_eq!(response.metadata.model, "recording-v1");
        assert_eq!(response.metadata.chunks_retrieved, 2);
        assert_eq!(response.metadata.tokens_used.map(|u| u.total_tokens), Some(15));

        let chunks = response.chunks.unwrap();
        assert_eq!(chunks[0].chunk_order, 3);
        assert_eq!(chunks[1].chunk_order, 1);
        assert!(chunks[0].relevance_score > chunks[1].relevance_score);

        let seen = generator.seen.lock();
        assert_eq!(seen[0].contexts[0], chunks[0].content);
        assert_eq!(seen[0].temperature, Some(0.7));

        let history = service.recent_queries(10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].query_text, "How do vacation days work?");
        assert_eq!(
            history[0].metadata.as_ref().map(|m| m.chunks_retrieved),
            Some(2)
        );
    }

    #[test]
    fn sources_can_be_omitted_and_temperature_overridden() {
        let generator = Arc::new(RecordingGenerator::default());
        let service = keyword_service(seeded_store(), generator.clone());

        let mut request = QueryRequest::new("sick leave");
        request.include_sources = false;
        request.temperature = Some(0.1);
        request.max_chunks = Some(1);

        let response = service.ask(request).unwrap();
        assert!(response.chunks.is_none());
        assert_eq!(response.metadata.chunks_retrieved, 1);
        assert_eq!(generator.seen.lock()[0].temperature, Some(0.1));
    }

    #[test]
    fn generation_failure_is_reported_not_raised() {
        let store = seeded_store();
        let service = keyword_service(store.clone(), Arc::new(FailingGenerator));

        let response = service.ask(QueryRequest::new("vacation")).unwrap();

        assert!(!response.success);
        assert!(response.response.starts_with("Error generating response:"));
        assert!(response.metadata.error.is_some());
        // The retrieval outcome stays inspectable.
        assert_eq!(response.chunks.map(|c| c.len()), Some(2));
        assert_eq!(store.recent_queries(5).unwrap().len(), 1);
    }

    #[test]
    fn embedding_failure_is_reported_not_raised() {
        let store = seeded_store();
        let retrieval = Arc::new(RetrievalEngine::new(
            store.clone(),
            Arc::new(VectorScorer::new(Arc::new(OfflineEmbedder))),
            RetrievalConfig::default(),
        ));
        let service = RagService::new(
            store.clone(),
            retrieval,
            Arc::new(RecordingGenerator::default()),
            RagServiceConfig::default(),
        );

        let response = service.ask(QueryRequest::new("vacation")).unwrap();
        assert!(!response.success);
        assert_eq!(response.metadata.strategy, ScoringStrategy::Vector);
        assert!(response.metadata.error.unwrap().contains("connection refused"));
        assert!(store.recent_queries(5).unwrap().is_empty());
    }

    #[test]
    fn empty_pool_still_generates() {
        let generator = Arc::new(RecordingGenerator::default());
        let service = keyword_service(Arc::new(InMemoryChunkStore::new()), generator.clone());

        let response = service.ask(QueryRequest::new("anything")).unwrap();
        assert!(response.success);
        assert_eq!(response.chunks.map(|c| c.len()), Some(0));
        assert!(generator.seen.lock()[0].contexts.is_empty());
    }

    #[test]
    fn oversized_k_is_rejected() {
        let service = keyword_service(seeded_store(), Arc::new(RecordingGenerator::default()));
        let mut request = QueryRequest::new("vacation");
        request.max_chunks = Some(MAX_TOP_K + 1);
        assert!(matches!(
            service.ask(request),
            Err(DomainError::LimitExceeded(_))
        ));
    }

    #[test]
    fn search_returns_ranked_results_without_logging() {
        let store = seeded_store();
        let service = keyword_service(store.clone(), Arc::new(RecordingGenerator::default()));

        let response = service.search("doctor note", Some(5)).unwrap();
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.results[0].chunk_order, 2);
        assert!(store.recent_queries(5).unwrap().is_empty());
    }

    #[test]
    fn health_reports_strategy() {
        let service = keyword_service(seeded_store(), Arc::new(RecordingGenerator::default()));
        let health = service.health().unwrap();
        assert!(health.ok);
        assert!(health.details.unwrap().contains("strategy: keyword"));
    }
}
