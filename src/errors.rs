// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed errors for the corpus store, vector index, and both pipelines.
//!
//! Each error reports a stable `kind()` name so the command layer can tell the
//! user exactly which failure occurred instead of a bare "error".

use std::path::PathBuf;
use thiserror::Error;

use crate::corpus::VerseId;

/// Errors raised by the corpus store.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// A malformed ingestion record. Recovered per record by ingestion.
    #[error("invalid verse record: {0}")]
    Validation(String),

    /// An identity that does not resolve to a live verse.
    #[error("no verse with identity {0}")]
    NotFound(VerseId),

    #[error("corpus storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("corpus I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl CorpusError {
    pub fn kind(&self) -> &'static str {
        match self {
            CorpusError::Validation(_) => "ValidationError",
            CorpusError::NotFound(_) => "NotFound",
            CorpusError::Storage(_) | CorpusError::Io(_) => "StorageError",
        }
    }
}

/// Errors raised while searching, saving, or loading a vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no vector index at {}; run `versegrep build-index` first", .0.display())]
    NotFound(PathBuf),

    #[error("vector index is corrupt ({0}); run `versegrep build-index` to rebuild it")]
    Corrupt(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("result count k must be a positive integer")]
    InvalidK,

    #[error("vector index I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    pub fn kind(&self) -> &'static str {
        match self {
            IndexError::NotFound(_) => "IndexNotFoundError",
            IndexError::Corrupt(_) => "CorruptIndexError",
            IndexError::DimensionMismatch { .. } => "DimensionMismatchError",
            IndexError::InvalidK => "InvalidKError",
            IndexError::Io(_) => "IndexIoError",
        }
    }
}

/// Errors that abort a full index rebuild.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("the corpus holds no verses; ingest data before building the index")]
    EmptyCorpus,

    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl BuildError {
    pub fn kind(&self) -> &'static str {
        match self {
            BuildError::EmptyCorpus => "EmptyCorpusError",
            BuildError::Embedding(_) => "EmbeddingError",
            BuildError::Corpus(err) => err.kind(),
            BuildError::Index(err) => err.kind(),
        }
    }
}

/// Errors that abort a single query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query text is empty")]
    InvalidQuery,

    #[error("search is not ready: {0}")]
    IndexUnavailable(String),

    #[error(
        "vector index was built against corpus epoch {index_epoch} but the corpus is at epoch \
         {store_epoch}; run `versegrep build-index` to rebuild it"
    )]
    StaleIndex { index_epoch: u64, store_epoch: u64 },

    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

impl QueryError {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::InvalidQuery => "InvalidQueryError",
            QueryError::IndexUnavailable(_) => "IndexUnavailableError",
            QueryError::StaleIndex { .. } => "StaleIndexError",
            QueryError::Embedding(_) => "EmbeddingError",
            QueryError::Index(err) => err.kind(),
            QueryError::Corpus(err) => err.kind(),
        }
    }
}

/// Finds the most specific typed error kind in an `anyhow` chain.
pub fn error_kind(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<QueryError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<BuildError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<IndexError>() {
            Some(e.kind())
        } else {
            cause.downcast_ref::<CorpusError>().map(CorpusError::kind)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn nested_kinds_surface_the_inner_failure() {
        let err = BuildError::Index(IndexError::Corrupt("bad magic".into()));
        assert_eq!(err.kind(), "CorruptIndexError");

        let err = QueryError::Corpus(CorpusError::NotFound(VerseId(7)));
        assert_eq!(err.kind(), "NotFound");
    }

    #[test]
    fn error_kind_walks_context_chain() {
        let result: Result<(), QueryError> = Err(QueryError::InvalidQuery);
        let err = result.context("search failed").unwrap_err();
        assert_eq!(error_kind(&err), Some("InvalidQueryError"));

        let plain = anyhow::anyhow!("plain failure");
        assert_eq!(error_kind(&plain), None);
    }

    #[test]
    fn rebuild_hint_in_index_messages() {
        let msg = IndexError::NotFound(PathBuf::from("/tmp/x.index")).to_string();
        assert!(msg.contains("build-index"));
        let msg = IndexError::Corrupt("truncated".into()).to_string();
        assert!(msg.contains("build-index"));
    }
}
