// SPDX-License-Identifier: MIT OR Apache-2.0

//! versegrep - Local semantic verse search library
//!
//! Shared modules for the versegrep CLI tool: the book/chapter/verse corpus
//! store, embedding providers, the flat vector index, and the build and query
//! pipelines that keep the two stores joined on verse identity.

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod errors;
pub mod index;
pub mod indexer;
pub mod output;
pub mod query;
pub mod utils;
