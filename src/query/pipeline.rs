// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query pipeline: embed the query, search the flat index, resolve each hit
//! through the corpus store.
//!
//! Hits whose identity no longer resolves (the verse was removed after the
//! index was built) are dropped and counted. When that leaves fewer than `k`
//! results the index is searched again with a wider window, so the caller
//! still sees the next-best live verses.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::corpus::{CorpusStore, VerseId};
use crate::embedding::EmbeddingProvider;
use crate::errors::{CorpusError, IndexError, QueryError};
use crate::index::{FlatIndex, Neighbor};

/// One ranked, fully qualified search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerseResult {
    pub id: VerseId,
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    /// Squared L2 distance to the query; smaller is closer
    pub distance: f32,
}

/// Results plus the number of dangling identities that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub results: Vec<VerseResult>,
    pub dangling: usize,
}

/// Answers free-text queries against a loaded index.
///
/// The index and provider are loaded once by the caller and reused for every
/// query; neither is mutated by searching.
pub struct QueryPipeline<'a> {
    store: &'a CorpusStore,
    index: Option<FlatIndex>,
    provider: Option<Box<dyn EmbeddingProvider>>,
}

impl<'a> QueryPipeline<'a> {
    pub fn new(store: &'a CorpusStore) -> Self {
        Self {
            store,
            index: None,
            provider: None,
        }
    }

    pub fn with_index(mut self, index: FlatIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_provider(mut self, provider: Box<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Returns up to `k` verses ordered by ascending distance.
    pub fn answer(&mut self, query: &str, k: usize) -> Result<Vec<VerseResult>, QueryError> {
        self.answer_with_stats(query, k).map(|outcome| outcome.results)
    }

    /// Like [`answer`](Self::answer), also reporting skipped dangling identities.
    pub fn answer_with_stats(&mut self, query: &str, k: usize) -> Result<QueryOutcome, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::InvalidQuery);
        }

        let store = self.store;
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| QueryError::IndexUnavailable("no vector index is loaded".into()))?;
        let provider = self
            .provider
            .as_mut()
            .ok_or_else(|| QueryError::IndexUnavailable("no embedding provider is loaded".into()))?;

        let meta = index.meta();
        if meta.model_id != provider.model_id() {
            return Err(QueryError::IndexUnavailable(format!(
                "index was built with model '{}' but the loaded provider is '{}'; run `versegrep build-index` to rebuild it",
                meta.model_id,
                provider.model_id()
            )));
        }
        let store_epoch = store.epoch()?;
        if meta.corpus_epoch != store_epoch {
            return Err(QueryError::StaleIndex {
                index_epoch: meta.corpus_epoch,
                store_epoch,
            });
        }
        if k == 0 {
            return Err(IndexError::InvalidK.into());
        }

        info!("Encoding search query: '{}'", query);
        let vector = provider.embed_one(query).map_err(QueryError::Embedding)?;

        let mut window = k;
        loop {
            let hits = index.search(&vector, window)?;
            let exhausted = hits.len() < window || window >= index.len();
            let (mut results, dangling) = resolve(store, &hits)?;

            if results.len() >= k || exhausted {
                results.truncate(k);
                for id in &dangling {
                    warn!("Skipping dangling verse identity {} (rebuild the index)", id);
                }
                debug!(
                    "Query resolved {} results, {} dangling",
                    results.len(),
                    dangling.len()
                );
                return Ok(QueryOutcome {
                    results,
                    dangling: dangling.len(),
                });
            }

            window = window.saturating_add(dangling.len()).min(index.len());
        }
    }
}

fn resolve(
    store: &CorpusStore,
    hits: &[Neighbor],
) -> Result<(Vec<VerseResult>, Vec<VerseId>), QueryError> {
    let mut results = Vec::with_capacity(hits.len());
    let mut dangling = Vec::new();

    for hit in hits {
        match store.get_by_identity(hit.id) {
            Ok(verse) => results.push(VerseResult {
                id: verse.id,
                book: verse.book,
                chapter: verse.chapter,
                verse: verse.verse,
                text: verse.text,
                distance: hit.distance,
            }),
            Err(CorpusError::NotFound(id)) => dangling.push(id),
            Err(err) => return Err(err.into()),
        }
    }

    Ok((results, dangling))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::VerseRecord;
    use crate::embedding::HashingProvider;
    use crate::index::IndexMeta;

    const DIM: usize = 256;

    fn build(store: &CorpusStore) -> FlatIndex {
        let mut provider = HashingProvider::new(DIM);
        let verses = store.list_all_verses_for_indexing().unwrap();
        let texts: Vec<String> = verses.iter().map(|(_, t)| t.clone()).collect();
        let vectors = provider.embed_texts(&texts).unwrap();
        FlatIndex::from_entries(
            verses.iter().map(|(id, _)| *id).zip(vectors).collect(),
            IndexMeta {
                model_id: provider.model_id().to_string(),
                corpus_epoch: store.epoch().unwrap(),
            },
        )
        .unwrap()
    }

    fn store() -> CorpusStore {
        let mut store = CorpusStore::open_in_memory().unwrap();
        let verses = [
            ("Gen", 1, 1, "In the beginning God created the heaven and the earth"),
            ("Gen", 1, 3, "And God said Let there be light and there was light"),
            ("Psa", 23, 1, "The Lord is my shepherd I shall not want"),
            ("John", 11, 35, "Jesus wept"),
        ];
        for (book, chapter, verse, text) in verses {
            store
                .upsert(&VerseRecord::new(book, chapter, verse, text))
                .unwrap();
        }
        store
    }

    fn pipeline(store: &CorpusStore) -> QueryPipeline<'_> {
        QueryPipeline::new(store)
            .with_index(build(store))
            .with_provider(Box::new(HashingProvider::new(DIM)))
    }

    #[test]
    fn empty_query_is_invalid() {
        let store = store();
        let mut pipeline = pipeline(&store);
        for query in ["", "   ", "\n\t"] {
            let err = pipeline.answer(query, 3).unwrap_err();
            assert_eq!(err.kind(), "InvalidQueryError");
        }
    }

    #[test]
    fn missing_dependencies_are_unavailable() {
        let store = store();

        let mut no_index =
            QueryPipeline::new(&store).with_provider(Box::new(HashingProvider::new(DIM)));
        assert_eq!(
            no_index.answer("light", 1).unwrap_err().kind(),
            "IndexUnavailableError"
        );

        let mut no_provider = QueryPipeline::new(&store).with_index(build(&store));
        assert_eq!(
            no_provider.answer("light", 1).unwrap_err().kind(),
            "IndexUnavailableError"
        );
    }

    #[test]
    fn mismatched_model_is_unavailable() {
        let store = store();
        let mut pipeline = QueryPipeline::new(&store)
            .with_index(build(&store))
            .with_provider(Box::new(HashingProvider::new(DIM * 2)));

        let err = pipeline.answer("light", 1).unwrap_err();
        assert_eq!(err.kind(), "IndexUnavailableError");
    }

    #[test]
    fn results_are_ranked_and_joined() {
        let store = store();
        let mut pipeline = pipeline(&store);

        let results = pipeline.answer("the lord is my shepherd", 4).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(
            (results[0].book.as_str(), results[0].chapter, results[0].verse),
            ("Psa", 23, 1)
        );
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn zero_k_is_rejected() {
        let store = store();
        let mut pipeline = pipeline(&store);
        assert_eq!(
            pipeline.answer("light", 0).unwrap_err().kind(),
            "InvalidKError"
        );
    }

    #[test]
    fn empty_index_yields_no_results() {
        let store = store();
        let empty = FlatIndex::from_entries(
            Vec::new(),
            IndexMeta {
                model_id: format!("hashing-{}", DIM),
                corpus_epoch: 0,
            },
        )
        .unwrap();
        let mut pipeline = QueryPipeline::new(&store)
            .with_index(empty)
            .with_provider(Box::new(HashingProvider::new(DIM)));

        assert!(pipeline.answer("light", 5).unwrap().is_empty());
    }

    #[test]
    fn dangling_top_hit_is_replaced_by_next_best() {
        let mut store = store();
        let index = build(&store);
        assert!(store.remove_verse("Psa", 23, 1).unwrap());

        let mut pipeline = QueryPipeline::new(&store)
            .with_index(index)
            .with_provider(Box::new(HashingProvider::new(DIM)));
        let outcome = pipeline
            .answer_with_stats("The Lord is my shepherd I shall not want", 1)
            .unwrap();

        assert_eq!(outcome.dangling, 1);
        assert_eq!(outcome.results.len(), 1);
        assert_ne!(outcome.results[0].book, "Psa");
    }

    #[test]
    fn all_dangling_yields_empty() {
        let mut store = store();
        let index = build(&store);
        for (book, chapter, verse) in [("Gen", 1, 1), ("Gen", 1, 3), ("Psa", 23, 1), ("John", 11, 35)] {
            store.remove_verse(book, chapter, verse).unwrap();
        }

        let mut pipeline = QueryPipeline::new(&store)
            .with_index(index)
            .with_provider(Box::new(HashingProvider::new(DIM)));
        let outcome = pipeline.answer_with_stats("light", 2).unwrap();

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.dangling, 4);
    }

    #[test]
    fn cleared_store_makes_index_stale() {
        let mut store = store();
        let index = build(&store);
        store.clear_all().unwrap();

        let mut pipeline = QueryPipeline::new(&store)
            .with_index(index)
            .with_provider(Box::new(HashingProvider::new(DIM)));
        let err = pipeline.answer("light", 1).unwrap_err();
        assert!(matches!(
            err,
            QueryError::StaleIndex {
                index_epoch: 0,
                store_epoch: 1
            }
        ));
    }
}
