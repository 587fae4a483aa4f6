// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding module - turns verse and query text into vectors
//!
//! The same provider and configuration must be used for building the index and
//! for embedding queries; the index records the provider's model id so a
//! mismatch is caught before searching.

pub mod provider;

#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
pub use provider::FastEmbedder;
pub use provider::{
    create_provider, CommandProvider, EmbeddingProvider, EmbeddingProviderConfig,
    HashingProvider, DEFAULT_EMBEDDING_DIM,
};
