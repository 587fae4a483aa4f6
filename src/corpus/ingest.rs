// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON ingestion into the corpus store.
//!
//! Expected document: `[{"book": "Genesis", "chapter": 1, "verse": 1, "text": "..."}, ...]`.
//! Records are decoded one at a time so a malformed record is skipped and
//! counted instead of aborting the load.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

use super::store::{CorpusStore, VerseRecord};

const INGEST_CHUNK: usize = 1000;

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Records written (created or updated)
    pub inserted: usize,
    /// Records rejected as malformed
    pub skipped: usize,
}

impl IngestReport {
    fn absorb(&mut self, other: IngestReport) {
        self.inserted += other.inserted;
        self.skipped += other.skipped;
    }
}

/// Reads a JSON array of verse records from disk and upserts them.
pub fn ingest_json_file(
    store: &mut CorpusStore,
    path: &Path,
    show_progress: bool,
) -> Result<IngestReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} as JSON", path.display()))?;

    let Value::Array(values) = document else {
        bail!("{} must contain a JSON array of verse records", path.display());
    };
    info!("Loaded {} records from {}", values.len(), path.display());

    ingest_values(store, values, show_progress)
}

/// Upserts already-parsed JSON values, skipping any that are malformed.
pub fn ingest_values(
    store: &mut CorpusStore,
    values: Vec<Value>,
    show_progress: bool,
) -> Result<IngestReport> {
    let pb = if show_progress {
        let pb = ProgressBar::new(values.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos}/{len} verses | Inserting")
                .context("invalid progress bar template")?
                .progress_chars("##."),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut report = IngestReport::default();
    let mut pending = Vec::with_capacity(INGEST_CHUNK);

    for value in values {
        match serde_json::from_value::<VerseRecord>(value) {
            Ok(record) => pending.push(record),
            Err(err) => {
                warn!("Skipping malformed verse record: {}", err);
                report.skipped += 1;
                pb.inc(1);
            }
        }

        if pending.len() == INGEST_CHUNK {
            report.absorb(store.upsert_many(&pending)?);
            pb.inc(pending.len() as u64);
            pending.clear();
        }
    }

    if !pending.is_empty() {
        report.absorb(store.upsert_many(&pending)?);
        pb.inc(pending.len() as u64);
    }
    pb.finish_and_clear();

    info!(
        "Ingestion complete. Inserted: {}, Skipped: {}",
        report.inserted, report.skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_ingest_values_counts_skips() {
        let mut store = CorpusStore::open_in_memory().unwrap();
        let values = vec![
            json!({"book": "Gen", "chapter": 1, "verse": 1, "text": "In the beginning"}),
            json!({"book": "Gen", "chapter": "one", "verse": 2, "text": "bad type"}),
            json!({"book": "Gen", "chapter": 1, "text": "no verse"}),
            json!("not an object"),
            json!({"book": "Gen", "chapter": 1, "verse": 2, "text": "And the earth"}),
        ];

        let report = ingest_values(&mut store, values, false).unwrap();
        assert_eq!(report, IngestReport { inserted: 2, skipped: 3 });
        assert_eq!(store.count_verses().unwrap(), 2);
    }

    #[test]
    fn test_ingest_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bible.json");
        std::fs::write(
            &path,
            r#"[
                {"book": "Gen", "chapter": 1, "verse": 1, "text": "In the beginning"},
                {"book": "Exo", "chapter": 1, "verse": 1, "text": "Now these are the names"}
            ]"#,
        )
        .unwrap();

        let mut store = CorpusStore::open_in_memory().unwrap();
        let report = ingest_json_file(&mut store, &path, false).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(store.list_books().unwrap(), vec!["Exo", "Gen"]);
    }

    #[test]
    fn test_ingest_rejects_non_array_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bible.json");
        std::fs::write(&path, r#"{"book": "Gen"}"#).unwrap();

        let mut store = CorpusStore::open_in_memory().unwrap();
        assert!(ingest_json_file(&mut store, &path, false).is_err());
    }

    #[test]
    fn test_ingest_spans_multiple_chunks() {
        let mut store = CorpusStore::open_in_memory().unwrap();
        let values: Vec<Value> = (1..=(INGEST_CHUNK as i64 + 5))
            .map(|n| json!({"book": "Psa", "chapter": 119, "verse": n, "text": format!("verse {}", n)}))
            .collect();

        let report = ingest_values(&mut store, values, false).unwrap();
        assert_eq!(report.inserted, INGEST_CHUNK + 5);
        assert_eq!(store.count_verses().unwrap(), (INGEST_CHUNK + 5) as u64);
    }
}
