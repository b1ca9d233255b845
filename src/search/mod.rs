//! Query evaluation: result algebra, evaluator, profiling and the facade.

pub mod engine;
pub mod profile;
pub mod result;
pub mod searcher;

pub use self::engine::{KnnScoreSortOption, SearchAlgorithm};
pub use self::profile::{AlgorithmProfile, ProfileEvent};
pub use self::result::IndexResult;
pub use self::searcher::BasicSearch;

use serde::{Deserialize, Serialize};

use crate::index::DocId;

/// The outcome of one query evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Number of matching documents.
    pub total: usize,
    /// Matching document ids. Sorted ascending, except when the query root is
    /// a KNN clause, then ordered by ascending distance.
    pub ids: Vec<DocId>,
    /// Per-document distances parallel to `ids` when the root is KNN.
    pub knn_scores: Vec<(DocId, f32)>,
    /// Cardinality of the KNN pre-filter before ranking, 0 without KNN.
    pub preagg_total: usize,
    /// Per-node execution profile, present when profiling was enabled.
    pub profile: Option<AlgorithmProfile>,
    /// Evaluation error, `None` on success. A set error implies empty `ids`.
    pub error: Option<String>,
}
