use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::info;

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod settings;

use application::services::{
    AnswerGenerator, ChunkStore, ChunkingConfig, EmbeddingEngine, KeywordScorer,
    RagServiceConfig, RetrievalConfig, Scorer, VectorScorer,
};
use application::{DocumentService, RagService, RetrievalEngine};
use domain::ScoringStrategy;
#[cfg(feature = "fastembed-engine")]
use infrastructure::FastEmbedEngine;
use infrastructure::{
    ExtractiveGenerator, InMemoryChunkStore, OpenAiChatGenerator, OpenAiEmbedEngine,
    ProviderClient, SimpleEmbedEngine, SledChunkStore,
};
use settings::{AppConfig, ConfigManager, EmbeddingBackend, GenerationBackend, StorageBackend};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "RAGDESK_DATA_DIR";
/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "RAGDESK_LOG";

/// Everything a front end needs to serve requests.
pub struct AppHandles {
    pub documents: Arc<DocumentService>,
    pub rag: Arc<RagService>,
    pub store: Arc<dyn ChunkStore>,
    pub config: Arc<ConfigManager>,
    pub data_dir: PathBuf,
}

/// The two services built over one store.
pub struct Services {
    pub documents: Arc<DocumentService>,
    pub rag: Arc<RagService>,
}

/// Installs the global subscriber once. `RAGDESK_LOG` wins over
/// `default_filter`. Output goes to stderr so stdout stays machine-readable.
pub fn init_tracing(default_filter: &str) {
    init_tracing_with_writer(default_filter, std::io::stderr);
}

fn init_tracing_with_writer<W>(default_filter: &str, make_writer: fn() -> W)
where
    W: std::io::Write + Send + Sync + 'static,
{
    static INIT: std::sync::OnceLock<()> = std::sync::OnceLock::new();

    let _ = INIT.get_or_init(|| {
        let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| default_filter.into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(make_writer)
            .compact()
            .try_init();
    });
}

/// Loads config from the data directory, opens the configured store and wires
/// the services.
pub fn build_environment(data_dir: Option<PathBuf>) -> Result<AppHandles> {
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => resolve_data_dir()?,
    };
    std::fs::create_dir_all(&data_dir).context("failed to create data directory")?;

    let config = Arc::new(ConfigManager::load(&data_dir).context("failed to load config file")?);
    let active_config = config.current();

    let store = open_store(active_config.storage, &data_dir)?;
    let services = build_services(&active_config, Arc::clone(&store))?;

    info!(
        target: "ragdesk::startup",
        data_dir = %data_dir.display(),
        storage = ?active_config.storage,
        strategy = active_config.retrieval.strategy.as_str(),
        embedding = active_config.embedding.id(),
        embedding_model = active_config.embedding.model_name(),
        generator = active_config.generation.id(),
        "environment ready"
    );

    Ok(AppHandles {
        documents: services.documents,
        rag: services.rag,
        store,
        config,
        data_dir,
    })
}

/// Wires document management and the ask pipeline over an existing store.
pub fn build_services(config: &AppConfig, store: Arc<dyn ChunkStore>) -> Result<Services> {
    let documents = Arc::new(DocumentService::new(
        Arc::clone(&store),
        ChunkingConfig {
            chunk_size: config.chunking.chunk_size,
            chunk_overlap: config.chunking.chunk_overlap,
        },
    ));

    let scorer = init_scorer(config).context("failed to initialise scorer")?;
    let retrieval = Arc::new(RetrievalEngine::new(
        Arc::clone(&store),
        scorer,
        RetrievalConfig {
            default_top_k: config.retrieval.default_top_k,
        },
    ));

    let generator =
        init_generator(&config.generation).context("failed to initialise answer generator")?;
    let rag = Arc::new(RagService::new(
        store,
        retrieval,
        generator,
        RagServiceConfig {
            default_temperature: config.generation.default_temperature(),
        },
    ));

    Ok(Services { documents, rag })
}

fn open_store(backend: StorageBackend, data_dir: &Path) -> Result<Arc<dyn ChunkStore>> {
    match backend {
        StorageBackend::Sled => {
            let store = SledChunkStore::open(data_dir.join("store"))
                .context("failed to open embedded store")?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => Ok(Arc::new(InMemoryChunkStore::new())),
    }
}

fn init_scorer(config: &AppConfig) -> Result<Arc<dyn Scorer>> {
    match config.retrieval.strategy {
        ScoringStrategy::Keyword => Ok(Arc::new(KeywordScorer::new())),
        ScoringStrategy::Vector => {
            let embedder = init_embedder(&config.embedding)
                .context("failed to initialise embedding backend")?;
            Ok(Arc::new(VectorScorer::new(embedder)))
        }
    }
}

fn init_embedder(backend: &EmbeddingBackend) -> Result<Arc<dyn EmbeddingEngine>> {
    match backend {
        EmbeddingBackend::Simple { model, dimensions } => {
            let engine = SimpleEmbedEngine::try_new(model.clone(), *dimensions)?;
            Ok(Arc::new(engine))
        }
        EmbeddingBackend::OpenAi {
            endpoint,
            dimensions,
        } => {
            let client = ProviderClient::from_endpoint(endpoint.clone())?;
            Ok(Arc::new(OpenAiEmbedEngine::new(client, *dimensions)))
        }
        #[cfg(feature = "fastembed-engine")]
        EmbeddingBackend::FastEmbed { model } => {
            let engine = FastEmbedEngine::try_new(model)?;
            Ok(Arc::new(engine))
        }
    }
}

fn init_generator(backend: &GenerationBackend) -> Result<Arc<dyn AnswerGenerator>> {
    match backend {
        GenerationBackend::Extractive => Ok(Arc::new(ExtractiveGenerator::new())),
        GenerationBackend::OpenAi {
            endpoint,
            temperature,
            max_tokens,
        } => {
            let client = ProviderClient::from_endpoint(endpoint.clone())?;
            Ok(Arc::new(OpenAiChatGenerator::new(
                client,
                *temperature,
                *max_tokens,
            )))
        }
    }
}

/// `RAGDESK_DATA_DIR` if set, otherwise the platform data directory.
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let dirs = directories::ProjectDirs::from("dev", "ragdesk", "Ragdesk")
        .ok_or_else(|| anyhow!("unable to determine OS data dir"))?;
    Ok(dirs.data_dir().to_path_buf())
}
