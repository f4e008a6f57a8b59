use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use bincode::Options;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use sled::{Batch, Config, Db, IVec, Tree};
use tracing::debug;

use crate::{
    application::services::ChunkStore,
    domain::{
        claim_chunk_positions, Chunk, ChunkCandidate, ChunkPosition, Document, DocumentId,
        DocumentPatch, DomainError, NewChunk, NewDocument, NewQueryLog, QueryLogEntry,
    },
};

const DOCUMENTS_TREE: &str = "documents";
const CHUNKS_TREE: &str = "chunks";
const QUERIES_TREE: &str = "queries";

/// Embedded chunk store backed by `sled`.
///
/// Documents, chunks and query log entries live in three trees keyed by
/// big-endian ids taken from sled's monotonic id generator, so iterating a
/// tree yields insertion order. Chunk lookups by document and the retrieval
/// pool are full scans, which is fine for a small knowledge base.
pub struct SledChunkStore {
    db: Db,
    documents: Tree,
    chunks: Tree,
    queries: Tree,
    _data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl SledChunkStore {
    /// Opens (or creates) a sled database rooted at `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|err| {
            DomainError::storage(format!("failed to create data directory {:?}: {err}", dir))
        })?;

        let db = Config::default()
            .path(&dir)
            .cache_capacity(64 * 1024 * 1024)
            .mode(sled::Mode::HighThroughput)
            .open()
            .map_err(|err| DomainError::storage(format!("failed to open sled db: {err}")))?;

        let open_tree = |name: &str| {
            db.open_tree(name)
                .map_err(|err| DomainError::storage(format!("failed to open {name} tree: {err}")))
        };
        let documents = open_tree(DOCUMENTS_TREE)?;
        let chunks = open_tree(CHUNKS_TREE)?;
        let queries = open_tree(QUERIES_TREE)?;

        Ok(Self {
            db,
            documents,
            chunks,
            queries,
            _data_dir: dir,
            write_lock: Mutex::new(()),
        })
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .serialize(value)
            .map_err(|err| DomainError::storage(format!("serialization error: {err}")))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .deserialize(bytes)
            .map_err(|err| DomainError::storage(format!("deserialization error: {err}")))
    }

    fn encode_key(id: u64) -> [u8; 8] {
        id.to_be_bytes()
    }

    /// Ids start at 1.
    fn next_id(&self) -> Result<u64, DomainError> {
        self.db
            .generate_id()
            .map(|id| id + 1)
            .map_err(|err| DomainError::storage(format!("failed to generate id: {err}")))
    }

    fn scan<T: DeserializeOwned>(tree: &Tree) -> Result<Vec<T>, DomainError> {
        tree.iter()
            .values()
            .map(|value| {
                let value: IVec = value.map_err(|err| {
                    DomainError::storage(format!("failed to read record: {err}"))
                })?;
                Self::deserialize(value.as_ref())
            })
            .collect()
    }

    fn load_document(&self, id: DocumentId) -> Result<Option<Document>, DomainError> {
        self.documents
            .get(Self::encode_key(id))
            .map_err(|err| DomainError::storage(format!("failed to read document: {err}")))?
            .map(|bytes| Self::deserialize(bytes.as_ref()))
            .transpose()
    }

    fn chunk_keys_for(&self, id: DocumentId) -> Result<Vec<IVec>, DomainError> {
        let mut keys = Vec::new();
        for entry in self.chunks.iter() {
            let (key, value) = entry
                .map_err(|err| DomainError::storage(format!("failed to read chunk: {err}")))?;
            let chunk: Chunk = Self::deserialize(value.as_ref())?;
            if chunk.document_id == id {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Every document referenced by `drafts` must exist. Call under `write_lock`.
    fn ensure_documents(&self, drafts: &[NewChunk]) -> Result<(), DomainError> {
        let ids: BTreeSet<DocumentId> = drafts.iter().map(|draft| draft.document_id).collect();
        for id in ids {
            if self.load_document(id)?.is_none() {
                return Err(DomainError::not_found(format!(
                    "document with id {id} not found"
                )));
            }
        }
        Ok(())
    }

    /// Positions already taken by stored chunks of the documents in `drafts`.
    fn taken_positions(
        &self,
        drafts: &[NewChunk],
    ) -> Result<HashSet<ChunkPosition>, DomainError> {
        let ids: BTreeSet<DocumentId> = drafts.iter().map(|draft| draft.document_id).collect();
        let mut taken = HashSet::new();
        for chunk in Self::scan::<Chunk>(&self.chunks)? {
            if ids.contains(&chunk.document_id) {
                taken.insert((chunk.document_id, chunk.chunk_order));
            }
        }
        Ok(taken)
    }

    fn insert_into(&self, batch: &mut Batch, drafts: Vec<NewChunk>) -> Result<usize, DomainError> {
        let count = drafts.len();
        for draft in drafts {
            let chunk = Chunk::new(self.next_id()?, draft);
            batch.insert(Self::encode_key(chunk.id).to_vec(), Self::serialize(&chunk)?);
        }
        Ok(count)
    }

    fn flush(tree: &Tree, what: &str) -> Result<(), DomainError> {
        tree.flush()
            .map_err(|err| DomainError::storage(format!("failed to flush {what}: {err}")))?;
        Ok(())
    }
}

impl ChunkStore for SledChunkStore {
    fn create_document(&self, draft: NewDocument) -> Result<Document, DomainError> {
        let _guard = self.write_lock.lock();

        let document = Document::new(self.next_id()?, draft);
        self.documents
            .insert(Self::encode_key(document.id), Self::serialize(&document)?)
            .map_err(|err| DomainError::storage(format!("failed to persist document: {err}")))?;
        Self::flush(&self.documents, "documents")?;

        Ok(document)
    }

    fn document(&self, id: DocumentId) -> Result<Option<Document>, DomainError> {
        self.load_document(id)
    }

    fn documents(&self, skip: usize, limit: usize) -> Result<Vec<Document>, DomainError> {
        let mut items: Vec<Document> = Self::scan(&self.documents)?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items.into_iter().skip(skip).take(limit).collect())
    }

    fn update_document(
        &self,
        id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<Option<Document>, DomainError> {
        let _guard = self.write_lock.lock();

        let Some(mut document) = self.load_document(id)? else {
            return Ok(None);
        };
        if !document.apply(patch) {
            return Ok(None);
        }

        self.documents
            .insert(Self::encode_key(id), Self::serialize(&document)?)
            .map_err(|err| DomainError::storage(format!("failed to update document: {err}")))?;
        Self::flush(&self.documents, "documents")?;

        Ok(Some(document))
    }

    fn delete_document(&self, id: DocumentId) -> Result<bool, DomainError> {
        let _guard = self.write_lock.lock();

        let mut batch = Batch::default();
        for key in self.chunk_keys_for(id)? {
            batch.remove(key);
        }
        self.chunks
            .apply_batch(batch)
            .map_err(|err| DomainError::storage(format!("failed to delete chunks: {err}")))?;

        let removed = self
            .documents
            .remove(Self::encode_key(id))
            .map_err(|err| DomainError::storage(format!("failed to delete document: {err}")))?;

        Self::flush(&self.chunks, "chunks")?;
        Self::flush(&self.documents, "documents")?;

        Ok(removed.is_some())
    }

    fn chunks_for_document(&self, id: DocumentId) -> Result<Vec<Chunk>, DomainError> {
        let mut chunks: Vec<Chunk> = Self::scan::<Chunk>(&self.chunks)?
            .into_iter()
            .filter(|chunk| chunk.document_id == id)
            .collect();
        chunks.sort_by(|a, b| a.chunk_order.cmp(&b.chunk_order).then(a.id.cmp(&b.id)));
        Ok(chunks)
    }

    fn create_chunk(&self, draft: NewChunk) -> Result<Chunk, DomainError> {
        let _guard = self.write_lock.lock();

        let drafts = [draft];
        self.ensure_documents(&drafts)?;
        claim_chunk_positions(&mut self.taken_positions(&drafts)?, &drafts)?;

        let [draft] = drafts;
        let chunk = Chunk::new(self.next_id()?, draft);
        self.chunks
            .insert(Self::encode_key(chunk.id), Self::serialize(&chunk)?)
            .map_err(|err| DomainError::storage(format!("failed to persist chunk: {err}")))?;
        Self::flush(&self.chunks, "chunks")?;

        Ok(chunk)
    }

    fn batch_insert_chunks(&self, drafts: Vec<NewChunk>) -> Result<usize, DomainError> {
        if drafts.is_empty() {
            return Ok(0);
        }
        let _guard = self.write_lock.lock();

        self.ensure_documents(&drafts)?;
        claim_chunk_positions(&mut self.taken_positions(&drafts)?, &drafts)?;

        let mut batch = Batch::default();
        let count = self.insert_into(&mut batch, drafts)?;
        self.chunks
            .apply_batch(batch)
            .map_err(|err| DomainError::storage(format!("failed to insert chunks: {err}")))?;
        Self::flush(&self.chunks, "chunks")?;

        debug!(target: "ragdesk::storage", count, "chunks inserted");
        Ok(count)
    }

    fn replace_chunks_for_document(
        &self,
        id: DocumentId,
        drafts: Vec<NewChunk>,
    ) -> Result<(usize, usize), DomainError> {
        let _guard = self.write_lock.lock();

        if self.load_document(id)?.is_none() {
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
        // Old positions are all freed, so only the drafts can collide.
        claim_chunk_positions(&mut HashSet::new(), &drafts)?;

        let mut batch = Batch::default();
        let keys = self.chunk_keys_for(id)?;
        let removed = keys.len();
        for key in keys {
            batch.remove(key);
        }
        let created = self.insert_into(&mut batch, drafts)?;

        self.chunks
            .apply_batch(batch)
            .map_err(|err| DomainError::storage(format!("failed to replace chunks: {err}")))?;
        Self::flush(&self.chunks, "chunks")?;

        debug!(target: "ragdesk::storage", document_id = id, removed, created, "chunks replaced");
        Ok((removed, created))
    }

    fn all_chunks_with_document_metadata(&self) -> Result<Vec<ChunkCandidate>, DomainError> {
        let mut pool = Vec::new();

        for entry in self.chunks.iter() {
            let (_, value) = entry
                .map_err(|err| DomainError::storage(format!("failed to read chunk: {err}")))?;
            let chunk: Chunk = Self::deserialize(value.as_ref())?;

            // A chunk whose document vanished mid-scan is skipped, like an
            // inner join would.
            if let Some(document) = self.load_document(chunk.document_id)? {
                pool.push(ChunkCandidate::from_parts(&chunk, &document));
            }
        }

        Ok(pool)
    }

    fn save_query(&self, draft: NewQueryLog) -> Result<QueryLogEntry, DomainError> {
        let _guard = self.write_lock.lock();

        let entry = QueryLogEntry::new(self.next_id()?, draft);
        self.queries
            .insert(Self::encode_key(entry.id), Self::serialize(&entry)?)
            .map_err(|err| DomainError::storage(format!("failed to persist query: {err}")))?;
        Self::flush(&self.queries, "queries")?;

        Ok(entry)
    }

    fn recent_queries(&self, limit: usize) -> Result<Vec<QueryLogEntry>, DomainError> {
        let mut entries = Vec::new();
        for value in self.queries.iter().values().rev().take(limit) {
            let value = value
                .map_err(|err| DomainError::storage(format!("failed to read query: {err}")))?;
            entries.push(Self::deserialize(value.as_ref())?);
        }
        Ok(entries)
    }

    fn ping(&self) -> Result<(), DomainError> {
        self.db
            .flush()
            .map_err(|err| DomainError::storage(format!("failed to flush db: {err}")))?;

        Ok(())
    }
}
