use crate::domain::{
    Chunk, ChunkCandidate, Document, DocumentId, DocumentPatch, DomainError, NewChunk,
    NewDocument, NewQueryLog, QueryLogEntry, TokenUsage,
};

/// Persistence boundary for documents, chunks and the query log.
///
/// Implementations are expected to be cheap to share behind an `Arc`; the
/// retrieval path only ever calls [`ChunkStore::all_chunks_with_document_metadata`].
pub trait ChunkStore: Send + Sync {
    fn create_document(&self, draft: NewDocument) -> Result<Document, DomainError>;

    fn document(&self, id: DocumentId) -> Result<Option<Document>, DomainError>;

    /// Newest first.
    fn documents(&self, skip: usize, limit: usize) -> Result<Vec<Document>, DomainError>;

    fn update_document(
        &self,
        id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<Option<Document>, DomainError>;

    /// Removes the document and every chunk that references it.
    fn delete_document(&self, id: DocumentId) -> Result<bool, DomainError>;

    /// Ordered by `chunk_order`.
    fn chunks_for_document(&self, id: DocumentId) -> Result<Vec<Chunk>, DomainError>;

    /// Fails with `NotFound` when the document is missing and with
    /// `Validation` when its `chunk_order` is already taken.
    fn create_chunk(&self, draft: NewChunk) -> Result<Chunk, DomainError>;

    /// All or nothing, with the same checks as [`ChunkStore::create_chunk`].
    fn batch_insert_chunks(&self, drafts: Vec<NewChunk>) -> Result<usize, DomainError>;

    /// Swaps every chunk of document `id` for `drafts` in one atomic write and
    /// returns `(removed, created)`. On error the old chunks stay in place.
    fn replace_chunks_for_document(
        &self,
        id: DocumentId,
        drafts: Vec<NewChunk>,
    ) -> Result<(usize, usize), DomainError>;

    /// Full scan of every chunk joined with its document, in insertion order.
    fn all_chunks_with_document_metadata(&self) -> Result<Vec<ChunkCandidate>, DomainError>;

    fn save_query(&self, draft: NewQueryLog) -> Result<QueryLogEntry, DomainError>;

    /// Newest first.
    fn recent_queries(&self, limit: usize) -> Result<Vec<QueryLogEntry>, DomainError>;

    fn ping(&self) -> Result<(), DomainError>;
}

/// Abstraction over any embedding engine (hash, FastEmbed, remote HTTP).
pub trait EmbeddingEngine: Send + Sync {
    fn model(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// One vector per input, same dimensionality as [`EmbeddingEngine::embed`].
    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub question: String,
    /// Chunk texts in retrieval order.
    pub contexts: Vec<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// Produces an answer grounded in the supplied contexts.
pub trait AnswerGenerator: Send + Sync {
    fn model(&self) -> &str;

    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedAnswer, DomainError>;
}
