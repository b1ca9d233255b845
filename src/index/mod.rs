//! Typed per-field indexes and the registry that owns them.
//!
//! [`FieldIndices`] walks an immutable [`Schema`](crate::schema::Schema) and
//! instantiates one content index per indexed field, plus sort indexes for
//! sortable fields. Document addition is all-or-nothing across every index.

pub mod numeric;
pub mod sort;
pub mod tag;
pub mod text;
pub mod vector_index;

use std::collections::HashSet;
use std::sync::Arc;

use ahash::AHashMap;

use crate::document::DocumentAccessor;
use crate::error::{FalxError, Result};
use crate::index::numeric::NumericIndex;
use crate::index::sort::{SortIndex, SortableValue};
use crate::index::tag::TagIndex;
use crate::index::text::TextIndex;
use crate::index::vector_index::VectorIndex;
use crate::schema::{FieldType, Schema};
use crate::synonyms::Synonyms;

/// Opaque unsigned document identifier, densely but not contiguously
/// allocated by the caller.
pub type DocId = u32;

/// Process-wide indexing tunables.
#[derive(Debug, Clone)]
pub struct IndicesOptions {
    /// Tokens excluded from text indexing and matching.
    pub stopwords: HashSet<String>,
}

impl Default for IndicesOptions {
    fn default() -> Self {
        const DEFAULT_STOPWORDS: &[&str] = &[
            "a", "is", "the", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in",
            "into", "it", "no", "not", "of", "on", "or", "such", "that", "their", "then", "there",
            "these", "they", "this", "to", "was", "will", "with",
        ];

        IndicesOptions {
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A content index of one of the four field types.
#[derive(Debug)]
pub enum FieldIndex {
    /// Tokenized full-text index.
    Text(TextIndex),
    /// Value-ordered numeric index.
    Numeric(NumericIndex),
    /// Exact-match tag index.
    Tag(TagIndex),
    /// Flat or HNSW vector index.
    Vector(VectorIndex),
}

impl FieldIndex {
    fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        match self {
            FieldIndex::Text(index) => index.add(doc, access, field),
            FieldIndex::Numeric(index) => index.add(doc, access, field),
            FieldIndex::Tag(index) => index.add(doc, access, field),
            FieldIndex::Vector(index) => index.add(doc, access, field),
        }
    }

    fn remove(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) {
        match self {
            FieldIndex::Text(index) => index.remove(doc, access, field),
            FieldIndex::Numeric(index) => index.remove(doc, access, field),
            FieldIndex::Tag(index) => index.remove(doc, access, field),
            FieldIndex::Vector(index) => index.remove(doc, access, field),
        }
    }

    /// Sorted ids of documents with a non-null value in the field.
    pub fn all_docs(&self) -> &[DocId] {
        match self {
            FieldIndex::Text(index) => index.all_docs(),
            FieldIndex::Numeric(index) => index.all_docs(),
            FieldIndex::Tag(index) => index.all_docs(),
            FieldIndex::Vector(index) => index.all_docs(),
        }
    }

    /// The contained text index, if this is one.
    pub fn as_text(&self) -> Option<&TextIndex> {
        match self {
            FieldIndex::Text(index) => Some(index),
            _ => None,
        }
    }

    /// The contained numeric index, if this is one.
    pub fn as_numeric(&self) -> Option<&NumericIndex> {
        match self {
            FieldIndex::Numeric(index) => Some(index),
            _ => None,
        }
    }

    /// The contained tag index, if this is one.
    pub fn as_tag(&self) -> Option<&TagIndex> {
        match self {
            FieldIndex::Tag(index) => Some(index),
            _ => None,
        }
    }

    /// The contained vector index, if this is one.
    pub fn as_vector(&self) -> Option<&VectorIndex> {
        match self {
            FieldIndex::Vector(index) => Some(index),
            _ => None,
        }
    }
}

/// The registry of typed indexes for one corpus.
///
/// Holds a content index per indexed schema field, sort indexes for sortable
/// fields and the sorted set of all present document ids. Mutation must not
/// overlap with evaluation; searches take `&FieldIndices` and never mutate.
#[derive(Debug)]
pub struct FieldIndices {
    schema: Arc<Schema>,
    #[allow(dead_code)]
    options: Arc<IndicesOptions>,
    synonyms: Option<Arc<Synonyms>>,
    indices: AHashMap<String, FieldIndex>,
    sort_indices: AHashMap<String, SortIndex>,
    /// Strictly increasing list of every present document id.
    all_ids: Vec<DocId>,
}

impl FieldIndices {
    /// Create the indexes described by the schema.
    pub fn new(
        schema: Arc<Schema>,
        options: Arc<IndicesOptions>,
        synonyms: Option<Arc<Synonyms>>,
    ) -> Self {
        let mut indices = AHashMap::new();
        let mut sort_indices = AHashMap::new();

        for (identifier, field) in schema.iter_fields() {
            if !field.no_index {
                let index = match &field.field_type {
                    FieldType::Text(params) => FieldIndex::Text(TextIndex::new(
                        Arc::clone(&options),
                        synonyms.clone(),
                        params.with_suffixtrie,
                    )),
                    FieldType::Numeric => FieldIndex::Numeric(NumericIndex::new()),
                    FieldType::Tag(params) => FieldIndex::Tag(TagIndex::new(params.clone())),
                    FieldType::Vector(params) => {
                        FieldIndex::Vector(VectorIndex::from_params(params))
                    }
                };
                indices.insert(identifier.to_string(), index);
            }

            if field.sortable {
                let sort_index = match &field.field_type {
                    FieldType::Text(_) | FieldType::Tag(_) => Some(SortIndex::string()),
                    FieldType::Numeric => Some(SortIndex::numeric()),
                    FieldType::Vector(_) => None,
                };
                if let Some(sort_index) = sort_index {
                    sort_indices.insert(identifier.to_string(), sort_index);
                }
            }
        }

        FieldIndices {
            schema,
            options,
            synonyms,
            indices,
            sort_indices,
            all_ids: Vec::new(),
        }
    }

    /// Add a document to every applicable index, all-or-nothing.
    ///
    /// On the first index that rejects the document, every already-applied
    /// index is rolled back in reverse order and false is returned; the
    /// registry is then unchanged.
    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor) -> bool {
        debug_assert!(self.all_ids.binary_search(&doc).is_err());
        let schema = Arc::clone(&self.schema);

        enum Kind {
            Content,
            Sort,
        }
        let mut applied: Vec<(&str, Kind)> = Vec::new();
        let mut was_added = true;

        for identifier in schema.field_order() {
            if let Some(index) = self.indices.get_mut(identifier.as_str()) {
                if index.add(doc, access, identifier) {
                    applied.push((identifier.as_str(), Kind::Content));
                } else {
                    was_added = false;
                    break;
                }
            }
        }

        if was_added {
            for identifier in schema.field_order() {
                if let Some(sort_index) = self.sort_indices.get_mut(identifier.as_str()) {
                    if sort_index.add(doc, access, identifier) {
                        applied.push((identifier.as_str(), Kind::Sort));
                    } else {
                        was_added = false;
                        break;
                    }
                }
            }
        }

        if !was_added {
            for (identifier, kind) in applied.iter().rev() {
                match kind {
                    Kind::Content => {
                        if let Some(index) = self.indices.get_mut(*identifier) {
                            index.remove(doc, access, identifier);
                        }
                    }
                    Kind::Sort => {
                        if let Some(sort_index) = self.sort_indices.get_mut(*identifier) {
                            sort_index.remove(doc);
                        }
                    }
                }
            }
            return false;
        }

        let pos = self.all_ids.partition_point(|&id| id <= doc);
        self.all_ids.insert(pos, doc);
        true
    }

    /// Remove a document from every index. Best effort, never fails.
    pub fn remove(&mut self, doc: DocId, access: &dyn DocumentAccessor) {
        let schema = Arc::clone(&self.schema);
        for identifier in schema.field_order() {
            if let Some(index) = self.indices.get_mut(identifier.as_str()) {
                index.remove(doc, access, identifier);
            }
            if let Some(sort_index) = self.sort_indices.get_mut(identifier.as_str()) {
                sort_index.remove(doc);
            }
        }

        let pos = self.all_ids.binary_search(&doc);
        debug_assert!(pos.is_ok());
        if let Ok(pos) = pos {
            self.all_ids.remove(pos);
        }
    }

    /// The content index for a field, resolving aliases first.
    pub fn get_index(&self, field: &str) -> Option<&FieldIndex> {
        self.indices.get(self.schema.lookup_alias(field))
    }

    /// The sort index for a field, resolving aliases first.
    pub fn get_sort_index(&self, field: &str) -> Option<&SortIndex> {
        self.sort_indices.get(self.schema.lookup_alias(field))
    }

    /// Every text index of a non-NOINDEX TEXT field, in schema order.
    pub fn all_text_indices(&self) -> Vec<&TextIndex> {
        self.schema
            .iter_fields()
            .filter(|(_, field)| field.field_type.is_text() && !field.no_index)
            .filter_map(|(identifier, _)| self.indices.get(identifier)?.as_text())
            .collect()
    }

    /// Sorted ids of every present document.
    pub fn all_docs(&self) -> &[DocId] {
        &self.all_ids
    }

    /// The schema the indexes were built from.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The synonyms table shared with the text indexes, if any.
    pub fn synonyms(&self) -> Option<&Synonyms> {
        self.synonyms.as_deref()
    }

    /// The sortable value of a document in a field.
    ///
    /// Fields without a sort index yield an error.
    pub fn sort_index_value(&self, doc: DocId, field: &str) -> Result<SortableValue> {
        match self.get_sort_index(field) {
            Some(sort_index) => Ok(sort_index.lookup(doc)),
            None => Err(FalxError::field(format!("No sort index for field: {field}"))),
        }
    }
}
