// SPDX-License-Identifier: MIT OR Apache-2.0

//! Corpus module - the book/chapter/verse store and its ingestion path
//!
//! The store owns verse identity. Every vector index entry is keyed by a
//! [`VerseId`] handed out here, and query results are joined back through
//! [`CorpusStore::get_by_identity`].

pub mod ingest;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use ingest::{ingest_json_file, ingest_values, IngestReport};
pub use store::{CorpusStore, Verse, VerseRecord};

/// Store-assigned identity of a verse, distinct from its composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerseId(pub i64);

impl fmt::Display for VerseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
