use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DomainError;

pub type DocumentId = u64;
pub type ChunkId = u64;
pub type QueryId = u64;

/// A stored knowledge-base document. Chunking is an explicit step, so edits to
/// `content` leave existing chunks untouched until the document is reprocessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
    pub source: Option<String>,
    pub document_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: DocumentId, draft: NewDocument) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: sanitize_single_line(draft.title),
            content: draft.content,
            source: draft.source.and_then(non_blank),
            document_type: draft.document_type.and_then(non_blank),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the supplied fields and bumps `updated_at`. Returns false when
    /// the patch carried nothing to change.
    pub fn apply(&mut self, patch: DocumentPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        if let Some(title) = patch.title {
            self.title = sanitize_single_line(title);
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(source) = patch.source {
            self.source = non_blank(source);
        }
        if let Some(document_type) = patch.document_type {
            self.document_type = non_blank(document_type);
        }
        self.updated_at = Utc::now();
        true
    }
}

/// Fields required to create a document; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub source: Option<String>,
    pub document_type: Option<String>,
}

/// Partial update for a document. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub source: Option<String>,
    pub document_type: Option<String>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.source.is_none()
            && self.document_type.is_none()
    }
}

/// A contiguous slice of a document's text. `chunk_order` starts at 1 and is
/// unique within the owning document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: DocumentId,
    pub content: String,
    pub chunk_order: u32,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(id: ChunkId, draft: NewChunk) -> Self {
        Self {
            id,
            document_id: draft.document_id,
            content: draft.content,
            chunk_order: draft.chunk_order,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChunk {
    pub document_id: DocumentId,
    pub content: String,
    pub chunk_order: u32,
}

/// A chunk's slot within its document.
pub type ChunkPosition = (DocumentId, u32);

/// Claims a position for every draft in `taken`, failing on the first draft
/// whose `(document_id, chunk_order)` is already taken, including by an
/// earlier draft of the same call. `taken` is left partially updated on error.
pub fn claim_chunk_positions(
    taken: &mut HashSet<ChunkPosition>,
    drafts: &[NewChunk],
) -> Result<(), DomainError> {
    for draft in drafts {
        if !taken.insert((draft.document_id, draft.chunk_order)) {
            return Err(DomainError::validation(format!(
                "document {} already has a chunk at order {}",
                draft.document_id, draft.chunk_order
            )));
        }
    }
    Ok(())
}

/// A chunk joined with the presentation metadata of its document, as read
/// during a full pool scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkCandidate {
    pub chunk_id: ChunkId,
    pub document_id: DocumentId,
    pub content: String,
    pub chunk_order: u32,
    pub document_title: String,
    pub document_source: Option<String>,
}

impl ChunkCandidate {
    pub fn from_parts(chunk: &Chunk, document: &Document) -> Self {
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            content: chunk.content.clone(),
            chunk_order: chunk.chunk_order,
            document_title: document.title.clone(),
            document_source: document.source.clone(),
        }
    }

    pub fn with_score(self, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk_id: self.chunk_id,
            document_id: self.document_id,
            content: self.content,
            chunk_order: self.chunk_order,
            document_title: self.document_title,
            document_source: self.document_source,
            score,
        }
    }
}

/// Retrieval output: a candidate plus its relevance for one query. Never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: ChunkId,
    pub document_id: DocumentId,
    pub content: String,
    pub chunk_order: u32,
    pub document_title: String,
    pub document_source: Option<String>,
    pub score: f32,
}

/// Persisted record of an answered query. `metadata` holds the serialized
/// JSON of the response metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub id: QueryId,
    pub query_text: String,
    pub response_text: String,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QueryLogEntry {
    pub fn new(id: QueryId, draft: NewQueryLog) -> Self {
        Self {
            id,
            query_text: draft.query_text,
            response_text: draft.response_text,
            metadata: draft.metadata,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQueryLog {
    pub query_text: String,
    pub response_text: String,
    pub metadata: Option<String>,
}

/// How chunk relevance is computed. Fixed when the retrieval engine is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringStrategy {
    #[default]
    Keyword,
    Vector,
}

impl ScoringStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringStrategy::Keyword => "keyword",
            ScoringStrategy::Vector => "vector",
        }
    }
}

/// Token accounting reported by a generation provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

fn sanitize_single_line(input: impl Into<String>) -> String {
    input
        .into()
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
