// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-based storage for the book/chapter/verse hierarchy.
//!
//! Books, chapters and verses live in three tables linked by foreign keys.
//! A verse's identity is its `AUTOINCREMENT` rowid, which SQLite persists and
//! never reuses, so identities stay valid across restarts for as long as the
//! verse exists. `clear_all` bumps a corpus epoch recorded in `meta`; vector
//! indexes remember the epoch they were built against.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::ingest::IngestReport;
use super::VerseId;
use crate::errors::CorpusError;

const SCHEMA_VERSION: &str = "1";

/// A fully qualified verse, resolved through its chapter and book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verse {
    pub id: VerseId,
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

/// A raw ingestion record. Every field is optional so that missing values are
/// reported as validation failures rather than parse failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerseRecord {
    pub book: Option<String>,
    pub chapter: Option<i64>,
    pub verse: Option<i64>,
    pub text: Option<String>,
}

impl VerseRecord {
    pub fn new(book: &str, chapter: i64, verse: i64, text: &str) -> Self {
        Self {
            book: Some(book.to_string()),
            chapter: Some(chapter),
            verse: Some(verse),
            text: Some(text.to_string()),
        }
    }

    fn validate(&self) -> Result<ValidRecord<'_>, CorpusError> {
        let book = self
            .book
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| CorpusError::Validation("missing book name".into()))?;
        let chapter = positive(self.chapter, "chapter")?;
        let verse = positive(self.verse, "verse")?;
        let text = self
            .text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                CorpusError::Validation(format!("missing text for {} {}:{}", book, chapter, verse))
            })?;

        Ok(ValidRecord {
            book,
            chapter,
            verse,
            text,
        })
    }
}

struct ValidRecord<'a> {
    book: &'a str,
    chapter: u32,
    verse: u32,
    text: &'a str,
}

fn positive(value: Option<i64>, field: &str) -> Result<u32, CorpusError> {
    let value = value.ok_or_else(|| CorpusError::Validation(format!("missing {} number", field)))?;
    if value <= 0 {
        return Err(CorpusError::Validation(format!(
            "{} number must be positive, got {}",
            field, value
        )));
    }
    u32::try_from(value)
        .map_err(|_| CorpusError::Validation(format!("{} number {} is out of range", field, value)))
}

/// SQLite-backed corpus store.
///
/// Stores the corpus in `.versegrep/corpus.sqlite` by default.
pub struct CorpusStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl CorpusStore {
    /// Opens or creates a corpus store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        let store = Self {
            conn,
            path: Some(path),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> Result<Self, CorpusError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn, path: None };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), CorpusError> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS chapters (
                id INTEGER PRIMARY KEY,
                book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                number INTEGER NOT NULL,
                UNIQUE (book_id, number)
            );

            CREATE TABLE IF NOT EXISTS verses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chapter_id INTEGER NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
                number INTEGER NOT NULL,
                text TEXT NOT NULL,
                UNIQUE (chapter_id, number)
            );
            "#,
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('corpus_epoch', '0')",
            [],
        )?;
        Ok(())
    }

    /// Returns the path to the database file, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Closes the store connection explicitly.
    pub fn close(self) -> Result<(), CorpusError> {
        self.conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }

    /// Creates the book, chapter and verse as needed and sets the verse text.
    ///
    /// Re-upserting an existing composite key overwrites its text and keeps
    /// its identity.
    pub fn upsert(&mut self, record: &VerseRecord) -> Result<VerseId, CorpusError> {
        let valid = record.validate()?;
        let tx = self.conn.transaction()?;
        let id = upsert_in(&tx, &valid)?;
        tx.commit()?;
        Ok(id)
    }

    /// Upserts a batch of records in a single transaction.
    ///
    /// Records that fail validation are skipped and counted; a storage failure
    /// rolls back the whole batch.
    pub fn upsert_many<'r, I>(&mut self, records: I) -> Result<IngestReport, CorpusError>
    where
        I: IntoIterator<Item = &'r VerseRecord>,
    {
        let mut report = IngestReport::default();
        let tx = self.conn.transaction()?;
        for record in records {
            match record.validate() {
                Ok(valid) => {
                    upsert_in(&tx, &valid)?;
                    report.inserted += 1;
                }
                Err(err) => {
                    warn!("Skipping verse record: {}", err);
                    report.skipped += 1;
                }
            }
        }
        tx.commit()?;
        Ok(report)
    }

    /// Resolves a verse by its store-assigned identity.
    pub fn get_by_identity(&self, id: VerseId) -> Result<Verse, CorpusError> {
        self.conn
            .query_row(
                r#"
                SELECT v.id, b.name, c.number, v.number, v.text
                FROM verses v
                JOIN chapters c ON c.id = v.chapter_id
                JOIN books b ON b.id = c.book_id
                WHERE v.id = ?1
                "#,
                params![id.0],
                |row| {
                    Ok(Verse {
                        id: VerseId(row.get(0)?),
                        book: row.get(1)?,
                        chapter: row.get(2)?,
                        verse: row.get(3)?,
                        text: row.get(4)?,
                    })
                },
            )
            .optional()?
            .ok_or(CorpusError::NotFound(id))
    }

    /// Lists every verse as `(identity, text)`, ordered by identity.
    ///
    /// Runs inside one read transaction so the result is a single snapshot.
    pub fn list_all_verses_for_indexing(&self) -> Result<Vec<(VerseId, String)>, CorpusError> {
        self.indexing_snapshot().map(|(_, verses)| verses)
    }

    /// Reads the corpus epoch together with every `(identity, text)` pair in
    /// one read transaction.
    pub fn indexing_snapshot(&self) -> Result<(u64, Vec<(VerseId, String)>), CorpusError> {
        let tx = self.conn.unchecked_transaction()?;
        let epoch = read_epoch(&tx)?;
        let verses = {
            let mut stmt = tx.prepare("SELECT id, text FROM verses ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| Ok((VerseId(row.get(0)?), row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        tx.commit()?;
        Ok((epoch, verses))
    }

    /// Lists book names in lexicographic order.
    pub fn list_books(&self) -> Result<Vec<String>, CorpusError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM books ORDER BY name COLLATE BINARY")?;
        let books = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(books)
    }

    /// Removes a single verse by composite key. Returns whether it existed.
    ///
    /// Any index built before the removal now holds a dangling identity.
    pub fn remove_verse(&mut self, book: &str, chapter: u32, verse: u32) -> Result<bool, CorpusError> {
        let removed = self.conn.execute(
            r#"
            DELETE FROM verses
            WHERE number = ?3
              AND chapter_id = (
                SELECT c.id FROM chapters c
                JOIN books b ON b.id = c.book_id
                WHERE b.name = ?1 AND c.number = ?2
              )
            "#,
            params![book, chapter, verse],
        )?;
        Ok(removed > 0)
    }

    /// Destroys every book, chapter and verse unconditionally.
    ///
    /// Confirmation belongs to the caller. Bumps the corpus epoch so indexes
    /// built before the clear are recognized as stale.
    pub fn clear_all(&mut self) -> Result<(), CorpusError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            r#"
            DELETE FROM verses;
            DELETE FROM chapters;
            DELETE FROM books;
            UPDATE meta SET value = CAST(CAST(value AS INTEGER) + 1 AS TEXT)
                WHERE key = 'corpus_epoch';
            "#,
        )?;
        tx.commit()?;
        warn!("Cleared all corpus data (epoch now {})", self.epoch()?);
        Ok(())
    }

    /// Counts stored verses.
    pub fn count_verses(&self) -> Result<u64, CorpusError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM verses", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Counts stored books.
    pub fn count_books(&self) -> Result<u64, CorpusError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Current corpus epoch; incremented by every `clear_all`.
    pub fn epoch(&self) -> Result<u64, CorpusError> {
        read_epoch(&self.conn)
    }
}

fn read_epoch(conn: &Connection) -> Result<u64, CorpusError> {
    let raw: String = conn.query_row(
        "SELECT value FROM meta WHERE key = 'corpus_epoch'",
        [],
        |row| row.get(0),
    )?;
    raw.parse::<u64>()
        .map_err(|_| CorpusError::Validation(format!("corrupt corpus epoch '{}'", raw)))
}

fn upsert_in(conn: &Connection, record: &ValidRecord<'_>) -> Result<VerseId, CorpusError> {
    conn.execute(
        "INSERT INTO books (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![record.book],
    )?;
    let book_id: i64 = conn.query_row(
        "SELECT id FROM books WHERE name = ?1",
        params![record.book],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT INTO chapters (book_id, number) VALUES (?1, ?2) ON CONFLICT(book_id, number) DO NOTHING",
        params![book_id, record.chapter],
    )?;
    let chapter_id: i64 = conn.query_row(
        "SELECT id FROM chapters WHERE book_id = ?1 AND number = ?2",
        params![book_id, record.chapter],
        |row| row.get(0),
    )?;

    let id: i64 = conn.query_row(
        r#"
        INSERT INTO verses (chapter_id, number, text)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(chapter_id, number) DO UPDATE SET text = excluded.text
        RETURNING id
        "#,
        params![chapter_id, record.verse, record.text],
        |row| row.get(0),
    )?;

    debug!(
        "Upserted {} {}:{} as verse {}",
        record.book, record.chapter, record.verse, id
    );
    Ok(VerseId(id))
}
