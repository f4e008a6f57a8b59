use std::sync::Arc;

use ragdesk::application::services::ChunkStore;
use ragdesk::application::{
    CreateChunkRequest, CreateDocumentRequest, ProcessDocumentRequest, QueryRequest,
};
use ragdesk::domain::{DomainError, ScoringStrategy};
use ragdesk::infrastructure::InMemoryChunkStore;
use ragdesk::settings::{AppConfig, StorageBackend};
use ragdesk::{build_environment, build_services, Services};

fn memory_services(strategy: ScoringStrategy) -> Services {
    let mut config = AppConfig {
        storage: StorageBackend::Memory,
        ..AppConfig::default()
    };
    config.retrieval.strategy = strategy;
    let store: Arc<dyn ChunkStore> = Arc::new(InMemoryChunkStore::new());
    build_services(&config, store).expect("services")
}

fn seed(services: &Services) {
    let handbook = services
        .documents
        .create(CreateDocumentRequest {
            title: "Employee handbook".into(),
            content: "Employees receive twenty vacation days per year. \
                      Unused vacation days expire at the end of March."
                .into(),
            source: Some("hr-wiki".into()),
            document_type: Some("policy".into()),
        })
        .unwrap();
    services
        .documents
        .process(handbook.id, ProcessDocumentRequest::default())
        .unwrap();

    let it = services
        .documents
        .create(CreateDocumentRequest {
            title: "IT onboarding".into(),
            content: "placeholder".into(),
            source: None,
            document_type: None,
        })
        .unwrap();
    services
        .documents
        .add_chunk(CreateChunkRequest {
            document_id: it.id,
            content: "Laptops are issued on the first day by the IT desk.".into(),
            chunk_order: 1,
        })
        .unwrap();
}

#[test]
fn keyword_ask_ranks_matching_chunk_first_and_logs_query() {
    let services = memory_services(ScoringStrategy::Keyword);
    seed(&services);

    let response = services
        .rag
        .ask(QueryRequest::new("How many vacation days do employees get?"))
        .unwrap();

    assert!(response.success);
    assert_eq!(response.metadata.strategy, ScoringStrategy::Keyword);
    let chunks = response.chunks.expect("sources included by default");
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].document_title, "Employee handbook");
    assert!(chunks[0].relevance_score > chunks[1].relevance_score);
    assert!(response.response.contains("vacation days"));

    let history = services.rag.recent_queries(10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].query_text, "How many vacation days do employees get?");
    let logged = history[0].metadata.as_ref().expect("metadata is logged");
    assert_eq!(logged.chunks_retrieved, 2);
}

#[test]
fn top_k_bounds_are_enforced() {
    let services = memory_services(ScoringStrategy::Keyword);
    seed(&services);

    let mut request = QueryRequest::new("laptops");
    request.max_chunks = Some(1);
    request.include_sources = false;
    let response = services.rag.ask(request).unwrap();
    assert!(response.chunks.is_none());
    assert_eq!(response.metadata.chunks_retrieved, 1);

    let search = services.rag.search("laptops", Some(0)).unwrap();
    assert!(search.results.is_empty());

    let err = services.rag.search("laptops", Some(101)).unwrap_err();
    assert!(matches!(err, DomainError::LimitExceeded(_)));
}

#[test]
fn vector_search_prefers_lexically_closer_chunk() {
    let services = memory_services(ScoringStrategy::Vector);
    seed(&services);

    let search = services
        .rag
        .search("laptops issued by the IT desk", Some(2))
        .unwrap();
    assert_eq!(search.strategy, ScoringStrategy::Vector);
    assert_eq!(search.results.len(), 2);
    assert_eq!(search.results[0].document_title, "IT onboarding");
}

#[test]
fn empty_knowledge_base_still_answers() {
    let services = memory_services(ScoringStrategy::Keyword);
    let response = services.rag.ask(QueryRequest::new("anything at all")).unwrap();
    assert!(response.success);
    assert_eq!(response.metadata.chunks_retrieved, 0);
    assert_eq!(response.chunks.map(|c| c.len()), Some(0));
}

#[test]
fn sled_environment_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let doc_id = {
        let handles = build_environment(Some(dir.path().to_path_buf())).unwrap();
        let doc = handles
            .documents
            .create(CreateDocumentRequest {
                title: "Expenses".into(),
                content: "Receipts must be submitted within thirty days.".into(),
                source: None,
                document_type: None,
            })
            .unwrap();
        handles
            .documents
            .process(doc.id, ProcessDocumentRequest::default())
            .unwrap();
        handles.rag.ask(QueryRequest::new("receipts deadline")).unwrap();
        doc.id
    };

    let handles = build_environment(Some(dir.path().to_path_buf())).unwrap();
    assert_eq!(handles.documents.get(doc_id).unwrap().title, "Expenses");
    assert_eq!(handles.documents.chunks(doc_id).unwrap().len(), 1);
    assert_eq!(handles.rag.recent_queries(5).unwrap().len(), 1);
}
