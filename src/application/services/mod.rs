//! Service layer orchestrating domain operations and infrastructure adapters.

mod contracts;
mod document_service;
mod rag_service;
mod retrieval_engine;
mod scorers;

pub use contracts::{
    AnswerGenerator, ChunkStore, EmbeddingEngine, GeneratedAnswer, GenerationRequest,
};
pub use document_service::{ChunkingConfig, DocumentService};
pub use rag_service::{RagService, RagServiceConfig, MAX_TOP_K};
pub use retrieval_engine::{RetrievalConfig, RetrievalEngine};
pub use scorers::{KeywordScorer, Scorer, VectorScorer};
