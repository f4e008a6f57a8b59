//! Application layer wiring DTOs and services for ragdesk.

pub mod dtos;
pub mod services;

pub use dtos::{
    CreateChunkRequest, CreateDocumentRequest, HealthStatusResponse, ProcessDocumentRequest,
    ProcessDocumentResponse, QueryLogDto, QueryMetadata, QueryRequest, QueryResponse,
    RetrievedChunkDto, SearchResponse, UpdateDocumentRequest,
};
pub use services::{DocumentService, RagService, RetrievalEngine};
