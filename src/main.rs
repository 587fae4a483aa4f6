// SPDX-License-Identifier: MIT OR Apache-2.0

//! versegrep - Local semantic verse search tool
//!
//! Ingests a book/chapter/verse corpus into SQLite, embeds every verse into a
//! flat vector index, and answers free-text queries with the nearest verses.

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands};
use commands::RunContext;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Initialize tracing with VERSEGREP_LOG env var (e.g., VERSEGREP_LOG=debug versegrep search "query")
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VERSEGREP_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            commands::report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let format = cli.format.unwrap_or_default();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "versegrep", &mut std::io::stdout());
        return Ok(());
    }

    let ctx = RunContext::resolve(cli.path.as_deref(), format)?;

    match cli.command {
        Commands::Insert { json_file } => commands::ingest::run(&ctx, &json_file),
        Commands::BuildIndex { batch_size } => commands::build::run(&ctx, batch_size),
        Commands::Search { query, k } => commands::search::run(&ctx, &query, k),
        Commands::Shell { k } => commands::search::shell(&ctx, k),
        Commands::ListBooks => commands::admin::list_books(&ctx),
        Commands::Clear { force } => commands::admin::clear(&ctx, force),
        Commands::Stats => commands::admin::stats(&ctx),
        Commands::Completions { .. } => Ok(()),
    }
}
