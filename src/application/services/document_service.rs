use std::sync::Arc;

use tracing::info;

use super::ChunkStore;
use crate::{
    application::dtos::{
        CreateChunkRequest, CreateDocumentRequest, ProcessDocumentRequest,
        ProcessDocumentResponse, UpdateDocumentRequest,
    },
    domain::{Chunk, Document, DocumentId, DocumentPatch, DomainError, NewChunk, TextSplitter},
};

const MAX_TITLE_CHARS: usize = 512;
const MAX_PAGE_SIZE: usize = 100;

/// Chunking defaults applied when a process request leaves them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Document and chunk management on top of a [`ChunkStore`].
pub struct DocumentService {
    store: Arc<dyn ChunkStore>,
    chunking: ChunkingConfig,
}

impl DocumentService {
    pub fn new(store: Arc<dyn ChunkStore>, chunking: ChunkingConfig) -> Self {
        Self { store, chunking }
    }

    pub fn create(&self, payload: CreateDocumentRequest) -> Result<Document, DomainError> {
        Self::validate_title(&payload.title)?;
        if payload.content.trim().is_empty() {
            return Err(DomainError::validation("content is required"));
        }

        let document = self.store.create_document(payload.into())?;
        info!(
            target: "ragdesk::documents",
            id = document.id,
            title = %document.title,
            "document created"
        );
        Ok(document)
    }

    pub fn get(&self, id: DocumentId) -> Result<Document, DomainError> {
        self.store
            .document(id)?
            .ok_or_else(|| Self::missing(id))
    }

    pub fn list(&self, skip: usize, limit: usize) -> Result<Vec<Document>, DomainError> {
        self.store.documents(skip, limit.clamp(1, MAX_PAGE_SIZE))
    }

    /// Updates the supplied fields. Existing chunks are left as they are
    /// until the document is processed again.
    pub fn update(
        &self,
        id: DocumentId,
        payload: UpdateDocumentRequest,
    ) -> Result<Document, DomainError> {
        let patch = DocumentPatch::from(payload);
        if patch.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if let Some(title) = &patch.title {
            Self::validate_title(title)?;
        }
        if matches!(&patch.content, Some(content) if content.trim().is_empty()) {
            return Err(DomainError::validation("content cannot be blank"));
        }

        self.store
            .update_document(id, patch)?
            .ok_or_else(|| Self::missing(id))
    }

    pub fn delete(&self, id: DocumentId) -> Result<(), DomainError> {
        if !self.store.delete_document(id)? {
            return Err(Self::missing(id));
        }
        info!(target: "ragdesk::documents", id, "document deleted");
        Ok(())
    }

    pub fn chunks(&self, id: DocumentId) -> Result<Vec<Chunk>, DomainError> {
        self.get(id)?;
        self.store.chunks_for_document(id)
    }

    pub fn add_chunk(&self, payload: CreateChunkRequest) -> Result<Chunk, DomainError> {
        self.get(payload.document_id)?;
        if payload.content.trim().is_empty() {
            return Err(DomainError::validation("chunk content is required"));
        }
        if payload.chunk_order == 0 {
            return Err(DomainError::validation("chunk_order starts at 1"));
        }

        self.store.create_chunk(NewChunk {
            document_id: payload.document_id,
            content: payload.content,
            chunk_order: payload.chunk_order,
        })
    }

    /// Replaces the document's chunks with a fresh split of its content.
    pub fn process(
        &self,
        id: DocumentId,
        options: ProcessDocumentRequest,
    ) -> Result<ProcessDocumentResponse, DomainError> {
        let chunk_size = options.chunk_size.unwrap_or(self.chunking.chunk_size);
        let chunk_overlap = options.chunk_overlap.unwrap_or(self.chunking.chunk_overlap);
        let splitter = TextSplitter::new(chunk_size, chunk_overlap)?;

        let document = self.get(id)?;
        let drafts = splitter
            .split(&document.content)
            .into_iter()
            .enumerate()
            .map(|(idx, content)| {
                Ok(NewChunk {
                    document_id: id,
                    content,
                    chunk_order: chunk_order_at(idx)?,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        let (removed, created) = self.store.replace_chunks_for_document(id, drafts)?;

        info!(
            target: "ragdesk::documents",
            id,
            removed,
            created,
            chunk_size,
            chunk_overlap,
            "document processed"
        );

        Ok(ProcessDocumentResponse {
            document_id: id,
            document_title: document.title,
            chunks_created: created,
            chunks_removed: removed,
            chunk_size,
            chunk_overlap,
            status: "success".into(),
            message: format!("Successfully processed document and created {created} chunks"),
        })
    }

    fn validate_title(title: &str) -> Result<(), DomainError> {
        if title.trim().is_empty() {
            return Err(DomainError::validation("title is required"));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(DomainError::limit(format!(
                "title cannot exceed {} characters",
                MAX_TITLE_CHARS
            )));
        }
        Ok(())
    }

    fn missing(id: DocumentId) -> DomainError {
        DomainError::not_found(format!("document with id {id} not found"))
    }
}

/// One-based order of the chunk at position `idx` of a split.
fn chunk_order_at(idx: usize) -> Result<u32, DomainError> {
    idx.checked_add(1)
        .and_then(|order| u32::try_from(order).ok())
        .ok_or_else(|| DomainError::limit(format!("chunk {idx} exceeds the chunk order range")))
}
