// SPDX-License-Identifier: MIT OR Apache-2.0

//! `search` and `shell` commands

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufRead, Write};
use versegrep::corpus::CorpusStore;
use versegrep::embedding::create_provider;
use versegrep::errors::QueryError;
use versegrep::index::FlatIndex;
use versegrep::output::{colorize_heading, format_results};
use versegrep::query::{QueryOutcome, QueryPipeline};

use super::{report_error, RunContext};
use crate::cli::OutputFormat;

/// Search response for JSON output
#[derive(Debug, Serialize)]
struct SearchResponse<'a> {
    query: &'a str,
    k: usize,
    #[serde(flatten)]
    outcome: QueryOutcome,
}

/// Loads the index and provider once; both are reused for every query.
fn load_pipeline<'s>(ctx: &RunContext, store: &'s CorpusStore) -> Result<QueryPipeline<'s>> {
    let index = FlatIndex::load(&ctx.paths.index)?;
    let provider =
        create_provider(ctx.config.embeddings()).context("Failed to load embedding provider")?;
    Ok(QueryPipeline::new(store)
        .with_index(index)
        .with_provider(provider))
}

fn print_outcome(ctx: &RunContext, query: &str, k: usize, outcome: QueryOutcome) -> Result<()> {
    match ctx.format {
        OutputFormat::Json => {
            let response = SearchResponse { query, k, outcome };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            if outcome.results.is_empty() {
                println!("No similar verses found.");
            } else {
                println!("{}", colorize_heading("--- Search Results ---", ctx.use_color()));
                print!("{}", format_results(&outcome.results, ctx.use_color()));
            }
            if outcome.dangling > 0 {
                eprintln!(
                    "Note: skipped {} verses missing from the corpus; run `versegrep build-index`.",
                    outcome.dangling
                );
            }
        }
    }
    Ok(())
}

/// Run the search command
pub fn run(ctx: &RunContext, query: &str, k: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        return Err(QueryError::InvalidQuery.into());
    }

    let k = ctx.config.merge_k(k);
    let store = ctx.open_store()?;
    let mut pipeline = load_pipeline(ctx, &store)?;

    let outcome = pipeline.answer_with_stats(query, k)?;
    print_outcome(ctx, query, k, outcome)
}

/// Run the interactive search shell
pub fn shell(ctx: &RunContext, k: Option<usize>) -> Result<()> {
    let k = ctx.config.merge_k(k);
    let store = ctx.open_store()?;
    let mut pipeline = load_pipeline(ctx, &store)?;

    println!("{}", colorize_heading("--- Verse Search Shell ---", ctx.use_color()));
    println!("Enter your search query (e.g., 'love your neighbor').");
    println!("Type 'exit' or 'quit' to leave.");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nSearch> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let query = line?;
        let query = query.trim();

        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            println!("Exiting search shell.");
            break;
        }
        if query.is_empty() {
            continue;
        }

        match pipeline.answer_with_stats(query, k) {
            Ok(outcome) => print_outcome(ctx, query, k, outcome)?,
            Err(err) => report_error(&err.into()),
        }
    }

    Ok(())
}
