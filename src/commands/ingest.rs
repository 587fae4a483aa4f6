// SPDX-License-Identifier: MIT OR Apache-2.0

//! `insert` command

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use versegrep::corpus::ingest_json_file;

use super::RunContext;
use crate::cli::OutputFormat;

/// Run the insert command
pub fn run(ctx: &RunContext, json_file: &Path) -> Result<()> {
    let mut store = ctx.open_store()?;
    let report = ingest_json_file(&mut store, json_file, ctx.format == OutputFormat::Text)?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            let check = if ctx.use_color() {
                "✓".green().to_string()
            } else {
                "✓".to_string()
            };
            println!(
                "{} Inserted {} verses ({} skipped)",
                check, report.inserted, report.skipped
            );
        }
    }
    Ok(())
}
