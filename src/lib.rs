//! # Falx
//!
//! An in-memory search engine core combining full-text, numeric, tag and
//! vector indexes behind a single query language.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Typed per-field indexes driven by a declarative schema
//! - Recursive-descent query parser with field scoping, negation and grouping
//! - Borrowed-or-owned result sets for allocation-light set algebra
//! - KNN search over flat or HNSW vector indexes with pre-filtering
//! - Optional per-node execution profiling
//!
//! ## Example
//!
//! ```
//! use falx::document::Document;
//! use falx::index::{FieldIndices, IndicesOptions};
//! use falx::query::QueryParams;
//! use falx::schema::{Schema, SchemaField};
//! use falx::search::SearchAlgorithm;
//! use std::sync::Arc;
//!
//! let schema = Schema::builder()
//!     .field("title", SchemaField::text())
//!     .field("price", SchemaField::numeric().sortable())
//!     .build()
//!     .unwrap();
//!
//! let mut indices = FieldIndices::new(Arc::new(schema), Arc::new(IndicesOptions::default()), None);
//! let doc = Document::builder()
//!     .text("title", "hello world")
//!     .numeric("price", 10.0)
//!     .build();
//! assert!(indices.add(1, &doc));
//!
//! let mut algo = SearchAlgorithm::new();
//! assert!(algo.init("hello @price:[5 15]", &QueryParams::default()));
//! let result = algo.search(&indices);
//! assert_eq!(result.ids, vec![1]);
//! ```

pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod schema;
pub mod search;
pub mod synonyms;
pub mod vector;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
