use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::ScoringStrategy;

/// Default filename used to persist configuration within the data directory.
const CONFIG_FILENAME: &str = "config.json";

/// Wire flavour of an OpenAI-compatible provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiFlavor {
    #[default]
    OpenAi,
    Azure,
}

/// Connection details for a remote embedding or chat endpoint.
///
/// The API key itself is never stored; `api_key_env` names the environment
/// variable that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    #[serde(default)]
    pub flavor: ApiFlavor,
    pub base_url: String,
    /// Model name, or deployment name for Azure.
    pub model: String,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Declarative list of embedding backends compiled into the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum EmbeddingBackend {
    /// Lightweight deterministic hash embedder (always available).
    Simple {
        #[serde(default = "default_simple_model")]
        model: String,
        #[serde(default = "default_simple_dim")]
        dimensions: usize,
    },
    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAi {
        endpoint: ProviderEndpoint,
        #[serde(default)]
        dimensions: Option<usize>,
    },
    /// Local semantic embeddings powered by FastEmbed (feature gated).
    #[cfg(feature = "fastembed-engine")]
    FastEmbed { model: String },
}

impl EmbeddingBackend {
    pub fn id(&self) -> &'static str {
        match self {
            EmbeddingBackend::Simple { .. } => "simple",
            EmbeddingBackend::OpenAi { .. } => "open-ai",
            #[cfg(feature = "fastembed-engine")]
            EmbeddingBackend::FastEmbed { .. } => "fast-embed",
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            EmbeddingBackend::Simple { model, .. } => model,
            EmbeddingBackend::OpenAi { endpoint, .. } => &endpoint.model,
            #[cfg(feature = "fastembed-engine")]
            EmbeddingBackend::FastEmbed { model } => model,
        }
    }
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        EmbeddingBackend::Simple {
            model: default_simple_model(),
            dimensions: default_simple_dim(),
        }
    }
}

/// Which answer generator the ask pipeline uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum GenerationBackend {
    /// Offline: answers with the best retrieved context.
    Extractive,
    /// OpenAI-compatible `/chat/completions` endpoint.
    OpenAi {
        endpoint: ProviderEndpoint,
        #[serde(default = "default_temperature")]
        temperature: f32,
        #[serde(default = "default_max_tokens")]
        max_tokens: u32,
    },
}

impl GenerationBackend {
    pub fn id(&self) -> &'static str {
        match self {
            GenerationBackend::Extractive => "extractive",
            GenerationBackend::OpenAi { .. } => "open-ai",
        }
    }

    pub fn default_temperature(&self) -> Option<f32> {
        match self {
            GenerationBackend::Extractive => None,
            GenerationBackend::OpenAi { temperature, .. } => Some(*temperature),
        }
    }
}

impl Default for GenerationBackend {
    fn default() -> Self {
        GenerationBackend::Extractive
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    #[default]
    Sled,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalSettings {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default)]
    pub strategy: ScoringStrategy,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            strategy: ScoringStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Complete persisted configuration payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageBackend,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub chunking: ChunkingSettings,
    #[serde(default)]
    pub embedding: EmbeddingBackend,
    #[serde(default)]
    pub generation: GenerationBackend,
}

/// Loads `AppConfig` once and hands out snapshots. Settings are fixed for the
/// lifetime of a session; components receive them through their constructors.
pub struct ConfigManager {
    path: PathBuf,
    config: AppConfig,
}

impl ConfigManager {
    /// Create a manager rooted at `data_dir`. The JSON file will be located at
    /// `<data_dir>/config.json`; a missing or unreadable file yields defaults.
    pub fn load(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = data_dir.as_ref().join(CONFIG_FILENAME);
        let config = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice::<AppConfig>(&bytes).unwrap_or_else(|err| {
                warn!(
                    target: "ragdesk::config",
                    path = %path.display(),
                    error = %err,
                    "ignoring unreadable config file"
                );
                AppConfig::default()
            })
        } else {
            AppConfig::default()
        };

        Ok(Self { path, config })
    }

    /// Snapshot of the current configuration.
    pub fn current(&self) -> AppConfig {
        self.config.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Ensure the backing directory exists and write the JSON payload.
    pub fn persist(&self, config: &AppConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(config)?;
        fs::write(&self.path, payload)
    }
}

const fn default_simple_dim() -> usize {
    256
}

fn default_simple_model() -> String {
    "ragdesk/simple-hash".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    1000
}

const fn default_top_k() -> usize {
    5
}

const fn default_chunk_size() -> usize {
    500
}

const fn default_chunk_overlap() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::load(dir.path()).unwrap();
        let config = manager.current();
        assert!(!manager.exists());
        assert_eq!(config.retrieval.default_top_k, 5);
        assert_eq!(config.retrieval.strategy, ScoringStrategy::Keyword);
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.storage, StorageBackend::Sled);
        assert_eq!(config.generation, GenerationBackend::Extractive);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{
                "retrieval": { "strategy": "vector" },
                "generation": {
                    "backend": "open-ai",
                    "endpoint": {
                        "flavor": "azure",
                        "base_url": "https://kb.openai.azure.com",
                        "model": "gpt-4o-mini",
                        "api_version": "2024-12-01-preview"
                    }
                }
            }"#,
        )
        .unwrap();

        let config = ConfigManager::load(dir.path()).unwrap().current();
        assert_eq!(config.retrieval.strategy, ScoringStrategy::Vector);
        assert_eq!(config.retrieval.default_top_k, 5);
        match config.generation {
            GenerationBackend::OpenAi {
                endpoint,
                temperature,
                max_tokens,
            } => {
                assert_eq!(endpoint.flavor, ApiFlavor::Azure);
                assert_eq!(endpoint.api_key_env, "OPENAI_API_KEY");
                assert_eq!(endpoint.timeout_secs, 30);
                assert!((temperature - 0.7).abs() < 1e-6);
                assert_eq!(max_tokens, 1000);
            }
            other => panic!("unexpected generation backend {other:?}"),
        }
    }

    #[test]
    fn unreadable_json_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "{ not json").unwrap();
        let config = ConfigManager::load(dir.path()).unwrap().current();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn persisted_config_loads_back() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::load(dir.path()).unwrap();
        let mut config = AppConfig::default();
        config.storage = StorageBackend::Memory;
        config.chunking.chunk_size = 800;
        manager.persist(&config).unwrap();

        let reloaded = ConfigManager::load(dir.path()).unwrap();
        assert!(reloaded.exists());
        assert_eq!(reloaded.current(), config);
    }
}
