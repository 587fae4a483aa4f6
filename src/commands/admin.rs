// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrative commands: `list-books`, `clear`, `stats`

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufRead, Write};
use versegrep::errors::IndexError;
use versegrep::index::{FlatIndex, IndexMeta};
use versegrep::output::{colorize_heading, colorize_warning};

use super::RunContext;
use crate::cli::OutputFormat;

/// Run the list-books command
pub fn list_books(ctx: &RunContext) -> Result<()> {
    let store = ctx.open_store()?;
    let books = store.list_books()?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&books)?),
        OutputFormat::Text => {
            if books.is_empty() {
                println!("No books found in the corpus.");
            } else {
                println!("{}", colorize_heading("Registered Books:", ctx.use_color()));
                for book in &books {
                    println!("- {}", book);
                }
            }
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Run the clear command. Confirmation is asked here; the store clears
/// unconditionally.
pub fn clear(ctx: &RunContext, force: bool) -> Result<()> {
    eprintln!(
        "{}",
        colorize_warning(
            "WARNING: This will delete ALL verses, chapters and books in the corpus!",
            ctx.use_color()
        )
    );

    if !force && !confirm("Are you absolutely sure you want to clear the entire corpus?")? {
        println!("Clear operation cancelled.");
        return Ok(());
    }

    let mut store = ctx.open_store()?;
    store.clear_all()?;
    println!("Corpus cleared. Rebuild the index after inserting new data.");
    Ok(())
}

#[derive(Debug, Serialize)]
struct IndexStats {
    entries: usize,
    dimension: usize,
    #[serde(flatten)]
    meta: IndexMeta,
    stale: bool,
}

#[derive(Debug, Serialize)]
struct Stats {
    verses: u64,
    books: u64,
    corpus_epoch: u64,
    index: Option<IndexStats>,
}

/// Run the stats command
pub fn stats(ctx: &RunContext) -> Result<()> {
    let store = ctx.open_store()?;
    let corpus_epoch = store.epoch()?;

    let index = match FlatIndex::load(&ctx.paths.index) {
        Ok(index) => Some(IndexStats {
            entries: index.len(),
            dimension: index.dimension(),
            stale: index.meta().corpus_epoch != corpus_epoch,
            meta: index.meta().clone(),
        }),
        Err(IndexError::NotFound(_)) => None,
        Err(err) => return Err(err.into()),
    };

    let stats = Stats {
        verses: store.count_verses()?,
        books: store.count_books()?,
        corpus_epoch,
        index,
    };

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!(
                "Corpus: {} verses in {} books (epoch {})",
                stats.verses, stats.books, stats.corpus_epoch
            );
            match &stats.index {
                Some(index) => println!(
                    "Index: {} entries, dimension {}, model {}{}",
                    index.entries,
                    index.dimension,
                    index.meta.model_id,
                    if index.stale { " (stale, rebuild required)" } else { "" }
                ),
                None => println!("Index: not built"),
            }
        }
    }
    Ok(())
}
