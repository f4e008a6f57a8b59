//! Domain layer: knowledge-base entities and the retrieval primitives.

pub mod chunking;
pub mod errors;
pub mod models;
pub mod prompt;
pub mod retrieval;

pub use chunking::{ChunkSpan, TextSplitter};
pub use errors::DomainError;
pub use models::{
    claim_chunk_positions, Chunk, ChunkCandidate, ChunkId, ChunkPosition, Document, DocumentId,
    DocumentPatch, NewChunk, NewDocument, NewQueryLog, QueryLogEntry, ScoredChunk,
    ScoringStrategy, TokenUsage,
};
