use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ChunkId, DocumentId, DocumentPatch, NewDocument, ScoredChunk, ScoringStrategy, TokenUsage,
};

/// Payload for creating a knowledge-base document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
}

impl From<CreateDocumentRequest> for NewDocument {
    fn from(value: CreateDocumentRequest) -> Self {
        Self {
            title: value.title,
            content: value.content,
            source: value.source,
            document_type: value.document_type,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDocumentRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
}

impl From<UpdateDocumentRequest> for DocumentPatch {
    fn from(value: UpdateDocumentRequest) -> Self {
        Self {
            title: value.title,
            content: value.content,
            source: value.source,
            document_type: value.document_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChunkRequest {
    pub document_id: DocumentId,
    pub content: String,
    pub chunk_order: u32,
}

/// Chunking options for (re)processing a document. Missing values fall back to
/// the configured defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProcessDocumentRequest {
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub chunk_overlap: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDocumentResponse {
    pub document_id: DocumentId,
    pub document_title: String,
    pub chunks_created: usize,
    pub chunks_removed: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub status: String,
    pub message: String,
}

/// A RAG question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Top-K; the configured default applies when absent.
    #[serde(default)]
    pub max_chunks: Option<usize>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_include_sources")]
    pub include_sources: bool,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_chunks: None,
            temperature: None,
            include_sources: default_include_sources(),
        }
    }
}

/// Retrieved chunk as presented to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunkDto {
    pub chunk_id: ChunkId,
    pub document_id: DocumentId,
    pub chunk_order: u32,
    pub content: String,
    pub document_title: String,
    pub document_source: Option<String>,
    pub relevance_score: f32,
}

impl From<ScoredChunk> for RetrievedChunkDto {
    fn from(value: ScoredChunk) -> Self {
        Self {
            chunk_id: value.chunk_id,
            document_id: value.document_id,
            chunk_order: value.chunk_order,
            content: value.content,
            document_title: value.document_title,
            document_source: value.document_source,
            relevance_score: value.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub model: String,
    pub strategy: ScoringStrategy,
    pub chunks_retrieved: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a RAG question. Provider failures surface here with
/// `success == false` rather than as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub response: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<RetrievedChunkDto>>,
    /// Seconds spent in retrieval and generation.
    pub processing_time: f64,
    pub metadata: QueryMetadata,
}

/// Retrieval-only result, useful for inspecting ranking without generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub strategy: ScoringStrategy,
    pub results: Vec<RetrievedChunkDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogDto {
    pub id: u64,
    pub query_text: String,
    pub response_text: String,
    pub metadata: Option<QueryMetadata>,
    pub created_at: DateTime<Utc>,
}

/// Health/readiness report for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatusResponse {
    pub ok: bool,
    pub message: String,
    pub details: Option<String>,
}

const fn default_include_sources() -> bool {
    true
}
