//! Infrastructure layer wiring concrete adapters (storage, embeddings, generation).

pub mod embeddings;
pub mod generation;
pub mod http_client;
pub mod storage;

#[cfg(feature = "fastembed-engine")]
pub use embeddings::FastEmbedEngine;
pub use embeddings::{OpenAiEmbedEngine, SimpleEmbedEngine};
pub use generation::{ExtractiveGenerator, OpenAiChatGenerator};
pub use http_client::ProviderClient;
pub use storage::{InMemoryChunkStore, SledChunkStore};
