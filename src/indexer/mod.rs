// SPDX-License-Identifier: MIT OR Apache-2.0

//! Indexer module - full rebuilds of the vector index from the corpus

pub mod builder;

pub use builder::{BuildResult, IndexBuilder};
