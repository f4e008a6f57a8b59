use std::collections::{BTreeMap, HashSet};

use parking_lot::RwLock;

use crate::{
    application::services::ChunkStore,
    domain::{
        claim_chunk_positions, Chunk, ChunkCandidate, ChunkId, ChunkPosition, Document,
        DocumentId, DocumentPatch, DomainError, NewChunk, NewDocument, NewQueryLog,
        QueryLogEntry,
    },
};

#[derive(Default)]
struct MemoryState {
    last_id: u64,
    documents: BTreeMap<DocumentId, Document>,
    chunks: BTreeMap<ChunkId, Chunk>,
    queries: Vec<QueryLogEntry>,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn ensure_documents(&self, drafts: &[NewChunk]) -> Result<(), DomainError> {
        match drafts
            .iter()
            .find(|draft| !self.documents.contains_key(&draft.document_id))
        {
            Some(orphan) => Err(DomainError::not_found(format!(
                "document with id {} not found",
                orphan.document_id
            ))),
            None => Ok(()),
        }
    }

    /// Positions taken by stored chunks, skipping those of `except`.
    fn positions(&self, except: Option<DocumentId>) -> HashSet<ChunkPosition> {
        self.chunks
            .values()
            .filter(|chunk| Some(chunk.document_id) != except)
            .map(|chunk| (chunk.document_id, chunk.chunk_order))
            .collect()
    }

    fn insert_all(&mut self, drafts: Vec<NewChunk>) -> usize {
        let count = drafts.len();
        for draft in drafts {
            let chunk = Chunk::new(self.next_id(), draft);
            self.chunks.insert(chunk.id, chunk);
        }
        count
    }
}

/// Volatile chunk store for ephemeral sessions and tests. Ids are shared
/// across entity kinds and increase monotonically, so chunk id order is
/// insertion order.
#[derive(Default)]
pub struct InMemoryChunkStore {
    state: RwLock<MemoryState>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkStore for InMemoryChunkStore {
    fn create_document(&self, draft: NewDocument) -> Result<Document, DomainError> {
        let mut state = self.state.write();
        let document = Document::new(state.next_id(), draft);
        state.documents.insert(document.id, document.clone());
        Ok(document)
    }

    fn document(&self, id: DocumentId) -> Result<Option<Document>, DomainError> {
        Ok(self.state.read().documents.get(&id).cloned())
    }

    fn documents(&self, skip: usize, limit: usize) -> Result<Vec<Document>, DomainError> {
        let state = self.state.read();
        let mut items: Vec<Document> = state.documents.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items.into_iter().skip(skip).take(limit).collect())
    }

    fn update_document(
        &self,
        id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<Option<Document>, DomainError> {
        let mut state = self.state.write();
        Ok(state
            .documents
            .get_mut(&id)
            .and_then(|document| document.apply(patch).then(|| document.clone())))
    }

    fn delete_document(&self, id: DocumentId) -> Result<bool, DomainError> {
        let mut state = self.state.write();
        state.chunks.retain(|_, chunk| chunk.document_id != id);
        Ok(state.documents.remove(&id).is_some())
    }

    fn chunks_for_document(&self, id: DocumentId) -> Result<Vec<Chunk>, DomainError> {
        let state = self.state.read();
        let mut chunks: Vec<Chunk> = state
            .chunks
            .values()
            .filter(|chunk| chunk.document_id == id)
            .cloned()
            .collect();
        chunks.sort_by(|a, b| a.chunk_order.cmp(&b.chunk_order).then(a.id.cmp(&b.id)));
        Ok(chunks)
    }

    fn create_chunk(&self, draft: NewChunk) -> Result<Chunk, DomainError> {
        let mut state = self.state.write();
        let drafts = [draft];
        state.ensure_documents(&drafts)?;
        claim_chunk_positions(&mut state.positions(None), &drafts)?;

        let [draft] = drafts;
        let chunk = Chunk::new(state.next_id(), draft);
        state.chunks.insert(chunk.id, chunk.clone());
        Ok(chunk)
    }

    fn batch_insert_chunks(&self, drafts: Vec<NewChunk>) -> Result<usize, DomainError> {
        let mut state = self.state.write();
        state.ensure_documents(&drafts)?;
        claim_chunk_positions(&mut state.positions(None), &drafts)?;
        Ok(state.insert_all(drafts))
    }

    fn replace_chunks_for_document(
        &self,
        id: DocumentId,
        drafts: Vec<NewChunk>,
    ) -> Result<(usize, usize), DomainError> {
        let mut state = self.state.write();
        if !state.documents.contains_key(&id) {
            return Err(DomainError::not_found(format!(
                "document with id {id} not found"
            )));
        }
        if let Some(stray) = drafts.iter().find(|draft| draft.document_id != id) {
            return Err(DomainError::validation(format!(
                "chunk for document {} cannot replace chunks of document {id}",
                stray.document_id
            )));
        }
        claim_chunk_positions(&mut state.positions(Some(id)), &drafts)?;

        let before = state.chunks.len();
        state.chunks.retain(|_, chunk| chunk.document_id != id);
        let removed = before - state.chunks.len();
        let created = state.insert_all(drafts);
        Ok((removed, created))
    }

    fn all_chunks_with_document_metadata(&self) -> Result<Vec<ChunkCandidate>, DomainError> {
        let state = self.state.read();
        Ok(state
            .chunks
            .values()
            .filter_map(|chunk| {
                state
                    .documents
                    .get(&chunk.document_id)
                    .map(|document| ChunkCandidate::from_parts(chunk, document))
            })
            .collect())
    }

    fn save_query(&self, draft: NewQueryLog) -> Result<QueryLogEntry, DomainError> {
        let mut state = self.state.write();
        let entry = QueryLogEntry::new(state.next_id(), draft);
        state.queries.push(entry.clone());
        Ok(entry)
    }

    fn recent_queries(&self, limit: usize) -> Result<Vec<QueryLogEntry>, DomainError> {
        let state = self.state.read();
        Ok(state.queries.iter().rev().take(limit).cloned().collect())
    }

    fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
