//! The query syntax tree produced by the parser.

use serde::{Deserialize, Serialize};

/// Logical combination operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    /// Set intersection.
    And,
    /// Set union.
    Or,
}

/// A single value inside a `{...}` tag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    /// Exact tag.
    Term(String),
    /// Tags starting with the affix.
    Prefix(String),
    /// Tags ending with the affix.
    Suffix(String),
    /// Tags containing the affix.
    Infix(String),
}

/// A `=>[KNN ...]` clause at the query root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnNode {
    /// Number of neighbors to return.
    pub limit: usize,
    /// The vector field to search.
    pub field: String,
    /// The query vector.
    pub vec: Vec<f32>,
    /// Optional per-query HNSW search breadth override.
    pub ef_runtime: Option<usize>,
    /// Name under which callers surface distances, empty when unset.
    pub score_alias: String,
    /// Pre-filter; `Star` when the clause applies to the whole corpus.
    pub filter: AstNode,
}

/// A node of the parsed query tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstNode {
    /// `*`, every document. Only valid without an active field.
    Star,
    /// `@field:*`, every document with a value in the active field.
    StarField,
    /// A full-text term, subject to synonym substitution.
    Term(String),
    /// `affix*`
    Prefix(String),
    /// `*affix`
    Suffix(String),
    /// `*affix*`
    Infix(String),
    /// `@field:[lo hi]`, inclusive numeric range.
    Range {
        /// Lower bound.
        lo: f64,
        /// Upper bound.
        hi: f64,
    },
    /// `-expr`, complement against all documents.
    Negate(Box<AstNode>),
    /// Conjunction or disjunction of two or more children.
    Logical {
        /// The combining operator.
        op: LogicOp,
        /// The children, at least two.
        nodes: Vec<AstNode>,
    },
    /// `@field:expr`, binds the active field for the subtree.
    Field {
        /// Field name as written in the query.
        field: String,
        /// The scoped subtree.
        node: Box<AstNode>,
    },
    /// `@field:{a|b}`, disjunction of tag values.
    Tags(Vec<TagValue>),
    /// `filter =>[KNN k @field $vec]`, top-k nearest neighbors.
    Knn(Box<KnnNode>),
}

impl AstNode {
    /// Whether this node is a KNN clause.
    pub fn is_knn(&self) -> bool {
        matches!(self, AstNode::Knn(_))
    }
}
