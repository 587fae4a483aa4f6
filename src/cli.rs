// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// versegrep - Local semantic verse search
///
/// Stores a book/chapter/verse corpus, embeds every verse into a flat vector
/// index, and answers natural-language queries with the closest verses.
#[derive(Parser, Debug)]
#[command(name = "versegrep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// Directory holding (or that will hold) the .versegrep data folder.
    /// Defaults to the nearest parent with one, else the current directory.
    #[arg(short, long, global = true)]
    pub path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Insert verses from a JSON file into the corpus
    ///
    /// Expected format: [{"book": "Genesis", "chapter": 1, "verse": 1, "text": "..."}, ...]
    Insert {
        /// Path to the JSON verse file
        json_file: PathBuf,
    },

    /// Rebuild the vector index from every verse in the corpus
    #[command(name = "build-index")]
    BuildIndex {
        /// Texts per embedding batch (defaults to the provider's batch size)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Search verses by meaning
    Search {
        /// Free-text query
        query: String,

        /// Number of results to return
        #[arg(short = 'k', long = "top-k")]
        k: Option<usize>,
    },

    /// Interactive search shell (type `exit` or `quit` to leave)
    Shell {
        /// Number of results per query
        #[arg(short = 'k', long = "top-k")]
        k: Option<usize>,
    },

    /// List every book in the corpus
    #[command(name = "list-books")]
    ListBooks,

    /// Delete all corpus data
    Clear {
        /// Skip confirmation prompt (use with caution!)
        #[arg(long)]
        force: bool,
    },

    /// Show corpus and index statistics
    Stats,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
