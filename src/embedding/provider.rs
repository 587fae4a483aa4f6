// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider interface and implementations.
//!
//! Providers are constructed once at startup by [`create_provider`] and handed
//! to the index builder and the query pipeline. Every provider returns `f32`
//! vectors regardless of its native precision.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::borrow::Cow;
use std::env;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{info, warn};

use crate::config::{EmbeddingConfig, EmbeddingProviderType};

const DEFAULT_BATCH_SIZE: usize = 512;
const MAX_BATCH_SIZE: usize = 1024;
const DEFAULT_MAX_CHARS: usize = 2000;

/// Default embedding dimension for sentence-transformers/all-MiniLM-L6-v2.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Tuning for the embedding provider, resolved from config plus environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingProviderConfig {
    pub model: String,
    pub batch_size: usize,
    pub max_chars: usize,
    pub normalize: bool,
    pub dimension: usize,
}

impl EmbeddingProviderConfig {
    /// Resolves provider tuning from the `[embeddings]` config section.
    ///
    /// `VERSEGREP_EMBED_BATCH_SIZE`, `VERSEGREP_EMBED_MAX_CHARS` and
    /// `VERSEGREP_EMBED_NORMALIZE` override the file values.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let mut batch_size = parse_usize_env("VERSEGREP_EMBED_BATCH_SIZE", config.batch_size())?;
        if batch_size == 0 {
            batch_size = DEFAULT_BATCH_SIZE;
        }
        if batch_size > MAX_BATCH_SIZE {
            warn!(
                "Embedding batch size {} exceeds max {}; clamping.",
                batch_size, MAX_BATCH_SIZE
            );
            batch_size = MAX_BATCH_SIZE;
        }

        let mut max_chars = parse_usize_env("VERSEGREP_EMBED_MAX_CHARS", config.max_chars())?;
        if max_chars == 0 {
            max_chars = DEFAULT_MAX_CHARS;
        }

        let normalize = parse_bool_env("VERSEGREP_EMBED_NORMALIZE", config.normalize())?;

        Ok(Self {
            model: config.model().to_string(),
            batch_size,
            max_chars,
            normalize,
            dimension: config.dimension(),
        })
    }
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        Self {
            model: "all-minilm-l6-v2".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_chars: DEFAULT_MAX_CHARS,
            normalize: true,
            dimension: DEFAULT_EMBEDDING_DIM,
        }
    }
}

/// Trait for embedding providers.
pub trait EmbeddingProvider: Send {
    /// Returns the model identifier. Indexes record it so queries can refuse
    /// a mismatched provider.
    fn model_id(&self) -> &str;

    /// Returns the batch size used by the provider.
    fn batch_size(&self) -> usize;

    /// Generates embeddings for the given texts, one vector per text, in order.
    fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generates an embedding for a single text.
    fn embed_one(&mut self, text: &str) -> Result<Vec<f32>> {
        let mut result = self.embed_texts(&[text.to_string()])?;
        result
            .pop()
            .ok_or_else(|| anyhow::anyhow!("No embedding returned"))
    }
}

/// Constructs the provider named by the `[embeddings]` config section.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    let tuning = EmbeddingProviderConfig::from_config(config)?;
    info!("Loading {:?} embedding provider ({})", config.provider(), tuning.model);

    let provider: Box<dyn EmbeddingProvider> = match config.provider() {
        EmbeddingProviderType::Builtin => Box::new(builtin(tuning)?),
        EmbeddingProviderType::Command => Box::new(CommandProvider::new(
            config.command().to_string(),
            tuning.model,
            tuning.batch_size,
        )),
        EmbeddingProviderType::Hashing => Box::new(HashingProvider::new(tuning.dimension)),
    };
    Ok(provider)
}

#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
fn builtin(tuning: EmbeddingProviderConfig) -> Result<FastEmbedder> {
    FastEmbedder::new(tuning)
}

#[cfg(all(target_os = "macos", target_arch = "x86_64"))]
fn builtin(_tuning: EmbeddingProviderConfig) -> Result<HashingProvider> {
    bail!("The builtin embedding provider is not available on this platform; set embeddings.provider to \"command\" or \"hashing\"")
}

#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
pub use fast::FastEmbedder;

#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
mod fast {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    /// FastEmbed provider using sentence-transformers/all-MiniLM-L6-v2.
    pub struct FastEmbedder {
        embedder: TextEmbedding,
        config: EmbeddingProviderConfig,
        model_id: String,
    }

    impl FastEmbedder {
        pub fn new(config: EmbeddingProviderConfig) -> Result<Self> {
            let model = parse_model(&config.model)?;
            let model_id = model.to_string();
            let init = InitOptions::new(model);
            let embedder =
                TextEmbedding::try_new(init).context("Failed to initialize fastembed model")?;

            Ok(Self {
                embedder,
                config,
                model_id,
            })
        }
    }

    impl EmbeddingProvider for FastEmbedder {
        fn model_id(&self) -> &str {
            &self.model_id
        }

        fn batch_size(&self) -> usize {
            self.config.batch_size
        }

        fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let prepared = truncate_texts(texts, self.config.max_chars);
            let mut embeddings = self
                .embedder
                .embed(&prepared, Some(self.config.batch_size))?;

            if self.config.normalize {
                for embedding in embeddings.iter_mut() {
                    l2_normalize(embedding);
                }
            }

            Ok(embeddings)
        }
    }

    fn parse_model(raw: &str) -> Result<EmbeddingModel> {
        match raw.trim().to_lowercase().as_str() {
            "" | "minilm"
            | "all-minilm-l6-v2"
            | "allminilm-l6-v2"
            | "sentence-transformers/all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "multilingual-minilm"
            | "paraphrase-multilingual-minilm-l12-v2"
            | "sentence-transformers/paraphrase-multilingual-minilm-l12-v2" => {
                Ok(EmbeddingModel::ParaphraseMLMiniLML12V2)
            }
            other => bail!(
                "Unsupported embeddings.model '{}'. Supported values: all-minilm-l6-v2, multilingual-minilm",
                other
            ),
        }
    }
}

/// Command provider that shells out to an external process.
///
/// The process receives `{"model": ..., "texts": [...]}` on stdin and answers
/// with a JSON array of vectors (or an object holding one under `embeddings`,
/// `vectors` or `data`).
pub struct CommandProvider {
    command: String,
    model: String,
    batch_size: usize,
}

impl CommandProvider {
    pub fn new(command: String, model: String, batch_size: usize) -> Self {
        Self {
            command,
            model,
            batch_size: batch_size.max(1),
        }
    }

    fn run_command(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let payload = serde_json::json!({
            "model": self.model,
            "texts": texts,
        });

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn embedding command: {}", self.command))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload.to_string().as_bytes())
                .context("Failed to write embeddings payload to stdin")?;
        }

        let output = child
            .wait_with_output()
            .context("Failed to read embeddings command output")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "Embedding command failed (status {}): {}",
                output.status,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_command_output(stdout.trim())
    }
}

impl EmbeddingProvider for CommandProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.run_command(texts)?;
        if vectors.len() != texts.len() {
            bail!(
                "Embedding command returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            );
        }
        Ok(vectors)
    }
}

/// Narrows each value to `f32`; callers may send double precision.
fn parse_command_output(raw: &str) -> Result<Vec<Vec<f32>>> {
    let parsed: Value = serde_json::from_str(raw)
        .context("Failed to parse embeddings command output as JSON")?;

    let embeddings_value = match parsed {
        Value::Array(arr) => Value::Array(arr),
        Value::Object(ref obj) => {
            if let Some(value) = obj.get("embeddings") {
                value.clone()
            } else if let Some(value) = obj.get("vectors") {
                value.clone()
            } else if let Some(value) = obj.get("data") {
                value.clone()
            } else {
                bail!("Embeddings command output missing 'embeddings' field");
            }
        }
        _ => bail!("Embeddings command output must be JSON array or object"),
    };

    embeddings_value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Embeddings output must be a JSON array"))?
        .iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| anyhow::anyhow!("Embedding row must be an array"))?
                .iter()
                .map(|value| {
                    value
                        .as_f64()
                        .ok_or_else(|| anyhow::anyhow!("Embedding value must be a number"))
                        .map(|v| v as f32)
                })
                .collect::<Result<Vec<f32>>>()
        })
        .collect()
}

/// Deterministic feature-hashing provider.
///
/// Each lowercase word token is hashed with blake3 into one signed bucket and
/// the result is L2-normalized, so texts with the same words map to the same
/// vector. Needs no model download; used for tests and offline runs.
pub struct HashingProvider {
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl HashingProvider {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            model: format!("hashing-{}", dimension),
            dimension,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = blake3::hash(token.to_lowercase().as_bytes());
            let bytes = hash.as_bytes();
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&bytes[..8]);
            let idx = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl EmbeddingProvider for HashingProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

#[cfg_attr(all(target_os = "macos", target_arch = "x86_64"), allow(dead_code))]
fn truncate_texts(texts: &[String], max_chars: usize) -> Vec<Cow<'_, str>> {
    texts
        .iter()
        .map(|text| truncate_to_chars(text.as_str(), max_chars))
        .collect()
}

fn truncate_to_chars(input: &str, max_chars: usize) -> Cow<'_, str> {
    if max_chars == 0 {
        return Cow::Borrowed("");
    }

    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(input[..idx].to_string()),
        None => Cow::Borrowed(input),
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

fn parse_usize_env(name: &str, default: usize) -> Result<usize> {
    match env::var(name) {
        Ok(raw) => {
            let value = raw.trim();
            if value.is_empty() {
                Ok(default)
            } else {
                value
                    .parse::<usize>()
                    .with_context(|| format!("Invalid {} value: {}", name, value))
            }
        }
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", name)),
    }
}

fn parse_bool_env(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(raw) => {
            let value = raw.trim().to_lowercase();
            if value.is_empty() {
                return Ok(default);
            }
            match value.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => bail!("Invalid {} value: {}", name, other),
            }
        }
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", name)),
    }
}
