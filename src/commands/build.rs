// SPDX-License-Identifier: MIT OR Apache-2.0

//! `build-index` command

use anyhow::{Context, Result};
use colored::Colorize;
use versegrep::embedding::create_provider;
use versegrep::indexer::IndexBuilder;

use super::RunContext;
use crate::cli::OutputFormat;

/// Run the build-index command
pub fn run(ctx: &RunContext, batch_size: Option<usize>) -> Result<()> {
    let store = ctx.open_store()?;
    let mut provider =
        create_provider(ctx.config.embeddings()).context("Failed to load embedding provider")?;

    let mut builder = IndexBuilder::new(&store, provider.as_mut(), &ctx.paths.index)
        .with_progress(ctx.format == OutputFormat::Text);
    if let Some(batch_size) = batch_size {
        builder = builder.with_batch_size(batch_size);
    }
    let result = builder.build()?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            let check = if ctx.use_color() {
                "✓".green().to_string()
            } else {
                "✓".to_string()
            };
            println!(
                "{} Indexed {} verses (dimension {}, model {}) into {}",
                check,
                result.indexed,
                result.dimension,
                result.model_id,
                result.index_path.display()
            );
        }
    }
    Ok(())
}
