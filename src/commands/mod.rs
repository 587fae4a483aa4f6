// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command implementations for the versegrep binary

pub mod admin;
pub mod build;
pub mod ingest;
pub mod search;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use versegrep::config::Config;
use versegrep::corpus::CorpusStore;
use versegrep::errors::error_kind;
use versegrep::output::{colorize_warning, use_colors};
use versegrep::utils::{find_data_root, get_root_with_data, DataPaths};

use crate::cli::OutputFormat;

/// Resolved locations and configuration shared by every command.
pub struct RunContext {
    pub config: Config,
    pub paths: DataPaths,
    pub format: OutputFormat,
}

impl RunContext {
    pub fn resolve(path: Option<&Path>, format: OutputFormat) -> Result<Self> {
        let requested = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::current_dir().context("Cannot determine current directory")?,
        };

        if let Some(found) = find_data_root(&requested) {
            if found.is_parent {
                eprintln!("Using data from: {}", found.root.display());
            }
        }
        let root: PathBuf = get_root_with_data(&requested);

        let config = Config::load_for_dir(&root);
        let paths = DataPaths::resolve(&root, config.storage());
        Ok(Self {
            config,
            paths,
            format,
        })
    }

    pub fn use_color(&self) -> bool {
        use_colors() && self.format == OutputFormat::Text
    }

    pub fn open_store(&self) -> Result<CorpusStore> {
        CorpusStore::open(&self.paths.corpus).with_context(|| {
            format!("Failed to open corpus store {}", self.paths.corpus.display())
        })
    }
}

/// Prints a failure naming its typed error kind.
pub fn report_error(err: &anyhow::Error) {
    let kind = error_kind(err).unwrap_or("Error");
    let label = format!("error[{}]:", kind);
    eprintln!("{} {:#}", colorize_warning(&label, use_colors()), err);
}
