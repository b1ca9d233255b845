//! Parse-once, evaluate-many query facade.

use crate::index::FieldIndices;
use crate::query::{parse_query, AstNode, QueryParams};
use crate::search::searcher::BasicSearch;
use crate::search::SearchResult;

/// Sort hint extracted from a KNN query root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnnScoreSortOption {
    /// Alias under which callers surface distances, empty when unset.
    pub score_alias: String,
    /// The KNN limit.
    pub limit: usize,
}

/// Holds one parsed query and evaluates it against registry snapshots.
///
/// # Examples
///
/// ```
/// use falx::index::{FieldIndices, IndicesOptions};
/// use falx::query::QueryParams;
/// use falx::schema::{Schema, SchemaField};
/// use falx::search::SearchAlgorithm;
/// use std::sync::Arc;
///
/// let schema = Schema::builder()
///     .field("title", SchemaField::text())
///     .build()
///     .unwrap();
/// let indices = FieldIndices::new(Arc::new(schema), Arc::new(IndicesOptions::default()), None);
///
/// let mut algo = SearchAlgorithm::new();
/// assert!(algo.init("@title:hello", &QueryParams::default()));
/// let result = algo.search(&indices);
/// assert!(result.ids.is_empty());
/// assert!(result.error.is_none());
/// ```
#[derive(Debug, Default)]
pub struct SearchAlgorithm {
    query: Option<AstNode>,
    profiling_enabled: bool,
}

impl SearchAlgorithm {
    /// Create a facade with no parsed query.
    pub fn new() -> Self {
        SearchAlgorithm::default()
    }

    /// Parse a query, returns false on a syntax error or an empty parse.
    ///
    /// Parse failures are logged, not surfaced; a false return simply means
    /// there is nothing to evaluate.
    pub fn init(&mut self, query: &str, params: &QueryParams) -> bool {
        match parse_query(query, params) {
            Ok(node) => {
                self.query = Some(node);
                true
            }
            Err(err) => {
                log::info!("failed to parse query {query:?}: {err}");
                self.query = None;
                false
            }
        }
    }

    /// Evaluate the parsed query against a registry snapshot.
    pub fn search(&self, indices: &FieldIndices) -> SearchResult {
        let Some(query) = self.query.as_ref() else {
            debug_assert!(false, "search before successful init");
            return SearchResult {
                error: Some("Query was not initialized".to_string()),
                ..SearchResult::default()
            };
        };

        let mut search = BasicSearch::new(indices);
        if self.profiling_enabled {
            search.enable_profiling();
        }
        search.search(query)
    }

    /// Capture per-node profiles on subsequent searches.
    pub fn enable_profiling(&mut self) {
        self.profiling_enabled = true;
    }

    /// The score alias and limit of the query root, when it is a KNN clause.
    pub fn knn_score_sort_option(&self) -> Option<KnnScoreSortOption> {
        match self.query.as_ref() {
            Some(AstNode::Knn(knn)) => Some(KnnScoreSortOption {
                score_alias: knn.score_alias.clone(),
                limit: knn.limit,
            }),
            _ => None,
        }
    }
}
