//! Storage adapters for ragdesk.
//!
//! The sled-backed store is the durable default; the in-memory store backs
//! ephemeral sessions and tests.

pub mod memory_store;
pub mod sled_store;

pub use memory_store::InMemoryChunkStore;
pub use sled_store::SledChunkStore;
