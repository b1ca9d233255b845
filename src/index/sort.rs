//! Per-document sortable values for SORTABLE fields.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::document::DocumentAccessor;
use crate::index::DocId;

/// A value retrieved from a sort index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SortableValue {
    /// The document has no value in the field.
    Null,
    /// String value.
    Str(String),
    /// Numeric value.
    Num(f64),
}

/// A sort index over string or numeric values.
///
/// Sort indexes keep one value per document (the first value of a multi-value
/// field) and a sorted view of the documents that have one, which also backs
/// the `@field:*` query form.
#[derive(Debug)]
pub enum SortIndex {
    /// For TEXT and TAG fields.
    Str(AHashMap<DocId, String>, Vec<DocId>),
    /// For NUMERIC fields.
    Num(AHashMap<DocId, f64>, Vec<DocId>),
}

impl SortIndex {
    /// Create a string sort index.
    pub fn string() -> Self {
        SortIndex::Str(AHashMap::new(), Vec::new())
    }

    /// Create a numeric sort index.
    pub fn numeric() -> Self {
        SortIndex::Num(AHashMap::new(), Vec::new())
    }

    /// Record a document's sortable value. Returns false when the stored
    /// value cannot be interpreted for the index type.
    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        match self {
            SortIndex::Str(values, docs) => {
                let Some(strings) = access.strings(field) else {
                    return false;
                };
                if let Some(value) = strings.into_iter().next() {
                    values.insert(doc, value);
                    if let Err(pos) = docs.binary_search(&doc) {
                        docs.insert(pos, doc);
                    }
                }
                true
            }
            SortIndex::Num(values, docs) => {
                let Some(numbers) = access.numbers(field) else {
                    return false;
                };
                if let Some(value) = numbers.into_iter().next() {
                    values.insert(doc, value);
                    if let Err(pos) = docs.binary_search(&doc) {
                        docs.insert(pos, doc);
                    }
                }
                true
            }
        }
    }

    /// Forget a document's value.
    pub fn remove(&mut self, doc: DocId) {
        match self {
            SortIndex::Str(values, docs) => {
                if values.remove(&doc).is_some() {
                    if let Ok(pos) = docs.binary_search(&doc) {
                        docs.remove(pos);
                    }
                }
            }
            SortIndex::Num(values, docs) => {
                if values.remove(&doc).is_some() {
                    if let Ok(pos) = docs.binary_search(&doc) {
                        docs.remove(pos);
                    }
                }
            }
        }
    }

    /// The sortable value recorded for a document.
    pub fn lookup(&self, doc: DocId) -> SortableValue {
        match self {
            SortIndex::Str(values, _) => values
                .get(&doc)
                .map(|v| SortableValue::Str(v.clone()))
                .unwrap_or(SortableValue::Null),
            SortIndex::Num(values, _) => values
                .get(&doc)
                .map(|v| SortableValue::Num(*v))
                .unwrap_or(SortableValue::Null),
        }
    }

    /// Sorted ids of documents with a value in this field.
    pub fn all_docs(&self) -> &[DocId] {
        match self {
            SortIndex::Str(_, docs) => docs,
            SortIndex::Num(_, docs) => docs,
        }
    }
}
