//! Field types for schema definition.

use serde::{Deserialize, Serialize};

use crate::vector::DistanceMetric;

/// Options for TEXT fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextParams {
    /// Maintain a suffix table for accelerated suffix and infix matching.
    pub with_suffixtrie: bool,
}

/// Options for TAG fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagParams {
    /// Character separating individual tags inside a field value.
    pub separator: char,
    /// Whether tag values are matched case-sensitively.
    pub case_sensitive: bool,
}

impl Default for TagParams {
    fn default() -> Self {
        TagParams {
            separator: ',',
            case_sensitive: false,
        }
    }
}

/// Construction and search parameters for an HNSW vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Maximum number of connections per node in layer 0.
    pub m: usize,
    /// Size of the candidate set during construction.
    pub ef_construction: usize,
    /// Default size of the candidate set during search, overridable per query.
    pub ef_runtime: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        HnswParams {
            m: 16,
            ef_construction: 200,
            ef_runtime: 10,
        }
    }
}

/// Options for VECTOR fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorParams {
    /// Graph-based index parameters, or `None` for brute-force flat storage.
    pub hnsw: Option<HnswParams>,
    /// Vector dimension.
    pub dim: usize,
    /// Distance metric to use.
    pub metric: DistanceMetric,
}

impl VectorParams {
    /// Flat (brute force) vector storage.
    pub fn flat(dim: usize, metric: DistanceMetric) -> Self {
        VectorParams {
            hnsw: None,
            dim,
            metric,
        }
    }

    /// HNSW graph index with default construction parameters.
    pub fn hnsw(dim: usize, metric: DistanceMetric) -> Self {
        VectorParams {
            hnsw: Some(HnswParams::default()),
            dim,
            metric,
        }
    }
}

/// The type of a schema field together with its type-specific options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    /// Tokenized full-text field.
    Text(TextParams),
    /// Double-precision numeric field.
    Numeric,
    /// Exact-match tag field.
    Tag(TagParams),
    /// Dense vector field.
    Vector(VectorParams),
}

impl FieldType {
    /// Whether this is a TEXT field.
    pub fn is_text(&self) -> bool {
        matches!(self, FieldType::Text(_))
    }

    /// Whether this is a VECTOR field.
    pub fn is_vector(&self) -> bool {
        matches!(self, FieldType::Vector(_))
    }
}

/// A single field definition inside a [`Schema`](crate::schema::Schema).
///
/// The field is registered under an internal identifier; `short_name` is the
/// user-visible name reported back in results and defaults to the identifier
/// unless an alias is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    /// User-visible name of the field.
    pub short_name: String,
    /// Field type and type-specific parameters.
    pub field_type: FieldType,
    /// Excluded from content indexing.
    pub no_index: bool,
    /// Maintains a sort index (ignored for VECTOR fields).
    pub sortable: bool,
}

impl SchemaField {
    fn with_type(field_type: FieldType) -> Self {
        SchemaField {
            short_name: String::new(),
            field_type,
            no_index: false,
            sortable: false,
        }
    }

    /// A TEXT field with default options.
    pub fn text() -> Self {
        Self::with_type(FieldType::Text(TextParams::default()))
    }

    /// A NUMERIC field.
    pub fn numeric() -> Self {
        Self::with_type(FieldType::Numeric)
    }

    /// A TAG field with default options.
    pub fn tag() -> Self {
        Self::with_type(FieldType::Tag(TagParams::default()))
    }

    /// A TAG field with explicit options.
    pub fn tag_with(params: TagParams) -> Self {
        Self::with_type(FieldType::Tag(params))
    }

    /// A VECTOR field.
    pub fn vector(params: VectorParams) -> Self {
        Self::with_type(FieldType::Vector(params))
    }

    /// Set the user-visible alias for this field.
    pub fn with_alias<S: Into<String>>(mut self, alias: S) -> Self {
        self.short_name = alias.into();
        self
    }

    /// Exclude the field from content indexing.
    pub fn no_index(mut self) -> Self {
        self.no_index = true;
        self
    }

    /// Maintain a sort index for the field.
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Enable the suffix table on a TEXT field.
    ///
    /// Has no effect on other field types.
    pub fn with_suffixtrie(mut self) -> Self {
        if let FieldType::Text(ref mut params) = self.field_type {
            params.with_suffixtrie = true;
        }
        self
    }
}
