// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for versegrep
//!
//! Loads configuration from .versegreprc.toml in the data root (or current
//! directory) or ~/.config/versegrep/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::embedding::DEFAULT_EMBEDDING_DIM;

/// Config file name looked up in the data root and current directory.
pub const CONFIG_FILE: &str = ".versegreprc.toml";

/// Default number of results per query.
pub const DEFAULT_K: usize = 5;

/// Embedding provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    /// In-process fastembed model
    #[default]
    Builtin,
    /// External process speaking JSON on stdin/stdout
    Command,
    /// Deterministic feature hashing, no model download
    Hashing,
}

/// Search configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of results returned when `-k` is not given
    pub default_k: Option<usize>,
}

impl SearchConfig {
    /// Get default k (defaults to 5, never zero)
    pub fn default_k(&self) -> usize {
        self.default_k.filter(|&k| k > 0).unwrap_or(DEFAULT_K)
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider type (builtin, command, hashing)
    pub provider: Option<EmbeddingProviderType>,
    /// Model identifier for the embedding provider
    pub model: Option<String>,
    /// Command to execute for command provider
    pub command: Option<String>,
    /// Texts per embedding batch
    pub batch_size: Option<usize>,
    /// Characters kept per text before embedding
    pub max_chars: Option<usize>,
    /// Whether builtin vectors are L2-normalized
    pub normalize: Option<bool>,
    /// Vector dimension for the hashing provider
    pub dimension: Option<usize>,
}

impl EmbeddingConfig {
    /// Get provider type (defaults to Builtin)
    pub fn provider(&self) -> EmbeddingProviderType {
        self.provider.unwrap_or_default()
    }

    /// Get model identifier (defaults to "all-minilm-l6-v2")
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("all-minilm-l6-v2")
    }

    /// Get command (defaults to "embedder")
    pub fn command(&self) -> &str {
        self.command.as_deref().unwrap_or("embedder")
    }

    /// Get batch size (defaults to 512)
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(512)
    }

    /// Get max chars (defaults to 2000)
    pub fn max_chars(&self) -> usize {
        self.max_chars.unwrap_or(2000)
    }

    /// Get normalize (defaults to true)
    pub fn normalize(&self) -> bool {
        self.normalize.unwrap_or(true)
    }

    /// Get hashing dimension (defaults to 384)
    pub fn dimension(&self) -> usize {
        self.dimension.unwrap_or(DEFAULT_EMBEDDING_DIM)
    }
}

/// Storage locations. Relative paths resolve against the data root's parent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Corpus database path
    pub corpus_path: Option<PathBuf>,
    /// Vector index file path
    pub index_path: Option<PathBuf>,
}

/// Configuration loaded from .versegreprc.toml or ~/.config/versegrep/config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .versegreprc.toml in `dir`
    /// 2. ~/.config/versegrep/config.toml
    pub fn load_for_dir(dir: &Path) -> Self {
        if let Some(config) = Self::load_from_path(&dir.join(CONFIG_FILE)) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("versegrep").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge CLI k with config (CLI wins)
    pub fn merge_k(&self, cli_value: Option<usize>) -> usize {
        cli_value.unwrap_or_else(|| self.search.default_k())
    }

    /// Get the search configuration
    pub fn search(&self) -> &SearchConfig {
        &self.search
    }

    /// Get the embedding configuration
    pub fn embeddings(&self) -> &EmbeddingConfig {
        &self.embeddings
    }

    /// Get the storage configuration
    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }
}
