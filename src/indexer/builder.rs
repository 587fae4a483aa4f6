// SPDX-License-Identifier: MIT OR Apache-2.0

//! Index builder: corpus store -> embedding provider -> flat vector index.
//!
//! Every build is a full rebuild. The new index is assembled in memory and only
//! written once every verse has been embedded, and the write itself replaces
//! the old file atomically, so a failed build never clobbers a working index.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::corpus::{CorpusStore, VerseId};
use crate::embedding::EmbeddingProvider;
use crate::errors::BuildError;
use crate::index::{FlatIndex, IndexMeta};

/// Summary of a successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    /// Number of verses embedded into the index
    pub indexed: usize,
    /// Embedding dimensionality
    pub dimension: usize,
    /// Model id of the provider used
    pub model_id: String,
    /// Corpus epoch the index was built against
    pub corpus_epoch: u64,
    /// Where the index was written
    pub index_path: PathBuf,
}

/// Builds and persists the vector index
pub struct IndexBuilder<'a> {
    store: &'a CorpusStore,
    provider: &'a mut dyn EmbeddingProvider,
    index_path: PathBuf,
    batch_size: Option<usize>,
    show_progress: bool,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(
        store: &'a CorpusStore,
        provider: &'a mut dyn EmbeddingProvider,
        index_path: impl AsRef<Path>,
    ) -> Self {
        Self {
            store,
            provider,
            index_path: index_path.as_ref().to_path_buf(),
            batch_size: None,
            show_progress: false,
        }
    }

    /// Overrides the provider's batch size. Affects throughput only.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Shows a progress bar on stderr while embedding.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Rebuilds the index from every verse currently in the store.
    pub fn build(&mut self) -> Result<BuildResult, BuildError> {
        info!("Starting vector index build");

        let (corpus_epoch, verses) = self.store.indexing_snapshot()?;
        if verses.is_empty() {
            return Err(BuildError::EmptyCorpus);
        }

        let batch_size = self
            .batch_size
            .unwrap_or_else(|| self.provider.batch_size())
            .max(1);
        let entries = self.embed_all(&verses, batch_size)?;

        let index = FlatIndex::from_entries(
            entries,
            IndexMeta {
                model_id: self.provider.model_id().to_string(),
                corpus_epoch,
            },
        )?;
        index.save(&self.index_path)?;

        let result = BuildResult {
            indexed: index.len(),
            dimension: index.dimension(),
            model_id: index.meta().model_id.clone(),
            corpus_epoch,
            index_path: self.index_path.clone(),
        };
        info!(
            "Vector index built: {} verses, dimension {}, model {}",
            result.indexed, result.dimension, result.model_id
        );
        Ok(result)
    }

    /// Embeds verses batch by batch, keeping each vector paired with the
    /// identity it came from.
    fn embed_all(
        &mut self,
        verses: &[(VerseId, String)],
        batch_size: usize,
    ) -> Result<Vec<(VerseId, Vec<f32>)>, BuildError> {
        let pb = if self.show_progress {
            let pb = ProgressBar::new(verses.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{bar:40.cyan/blue}] {pos}/{len} verses | Embedding")
                    .map_err(|e| BuildError::Embedding(e.into()))?
                    .progress_chars("##."),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut entries = Vec::with_capacity(verses.len());
        for (batch_no, batch) in verses.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
            let vectors = self
                .provider
                .embed_texts(&texts)
                .map_err(BuildError::Embedding)?;

            if vectors.len() != batch.len() {
                return Err(BuildError::Embedding(anyhow::anyhow!(
                    "provider returned {} vectors for a batch of {} verses",
                    vectors.len(),
                    batch.len()
                )));
            }

            entries.extend(batch.iter().map(|(id, _)| *id).zip(vectors));
            debug!("Embedded batch {} ({} verses)", batch_no + 1, batch.len());
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();

        Ok(entries)
    }
}
