//! Schema module for Falx.
//!
//! This module provides the field definitions and the immutable schema that
//! drives index construction and query field resolution.

pub mod field;
#[allow(clippy::module_inception)]
pub mod schema;

// Re-export commonly used types
pub use field::{FieldType, HnswParams, SchemaField, TagParams, TextParams, VectorParams};
pub use schema::{Schema, SchemaBuilder};
