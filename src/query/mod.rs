// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query module - embeds a query, searches the index, joins back to the corpus

pub mod pipeline;

pub use pipeline::{QueryOutcome, QueryPipeline, VerseResult};
