// SPDX-License-Identifier: MIT OR Apache-2.0

//! Utility functions for versegrep

use std::path::{Path, PathBuf};

use crate::config::StorageConfig;

/// The name of the data directory
pub const DATA_DIR: &str = ".versegrep";

/// Corpus database file name inside the data directory
pub const CORPUS_FILE: &str = "corpus.sqlite";

/// Vector index file name inside the data directory
pub const INDEX_FILE: &str = "verses.index";

/// Result of finding a data root
#[derive(Debug)]
pub struct DataRoot {
    /// The directory containing the .versegrep folder
    pub root: PathBuf,
    /// Whether this is the current directory or a parent
    pub is_parent: bool,
}

/// Find the nearest .versegrep directory by walking up from the given path.
/// Returns None if no .versegrep directory is found.
pub fn find_data_root(start: impl AsRef<Path>) -> Option<DataRoot> {
    let mut current = start.as_ref().to_path_buf();

    if let Ok(canonical) = current.canonicalize() {
        current = canonical;
    }

    let original = current.clone();

    loop {
        if current.join(DATA_DIR).is_dir() {
            return Some(DataRoot {
                root: current.clone(),
                is_parent: current != original,
            });
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Resolved on-disk locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    /// Directory that holds (or will hold) the .versegrep folder
    pub root: PathBuf,
    pub corpus: PathBuf,
    pub index: PathBuf,
}

impl DataPaths {
    /// Resolves storage paths for `root`, applying config overrides.
    ///
    /// Relative overrides are taken relative to `root`.
    pub fn resolve(root: impl AsRef<Path>, storage: &StorageConfig) -> Self {
        let root = root.as_ref().to_path_buf();
        let data_dir = root.join(DATA_DIR);
        let anchor = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            }
        };

        let corpus = storage
            .corpus_path
            .as_deref()
            .map(anchor)
            .unwrap_or_else(|| data_dir.join(CORPUS_FILE));
        let index = storage
            .index_path
            .as_deref()
            .map(anchor)
            .unwrap_or_else(|| data_dir.join(INDEX_FILE));

        Self {
            root,
            corpus,
            index,
        }
    }
}

/// Get the root directory that holds the data directory, walking up from `path`.
/// Falls back to the given path if no data directory is found.
pub fn get_root_with_data(path: impl AsRef<Path>) -> PathBuf {
    match find_data_root(&path) {
        Some(root) => root.root,
        None => path.as_ref().to_path_buf(),
    }
}
