//! Document values and typed field access.
//!
//! Indexes never see a document type directly. They read field values through
//! the [`DocumentAccessor`] trait, which lets callers index their own document
//! representations without conversion. [`Document`] is the crate's concrete
//! implementation for tests and simple embedders.
//!
//! # Examples
//!
//! ```
//! use falx::document::Document;
//!
//! let doc = Document::builder()
//!     .text("title", "hello world")
//!     .numeric("price", 10.0)
//!     .vector("emb", vec![1.0, 0.0, 0.0])
//!     .build();
//!
//! assert!(doc.has_field("title"));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{FalxError, Result};

/// Typed access to a document's field values during indexing.
///
/// Each method distinguishes three cases: a present value (non-empty result),
/// an absent field (empty result), and a value that cannot be interpreted for
/// the requested type (`None`). The last case makes the enclosing
/// [`FieldIndices::add`](crate::index::FieldIndices::add) fail and roll back.
pub trait DocumentAccessor {
    /// String values for a field.
    fn strings(&self, field: &str) -> Option<Vec<String>>;

    /// Numeric values for a field.
    fn numbers(&self, field: &str) -> Option<Vec<f64>>;

    /// Dense vector value for a field. An empty vector means the field is
    /// absent.
    fn vector(&self, field: &str) -> Option<Vec<f32>>;
}

/// Represents a value for a field in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Text value
    Text(String),
    /// Floating point value
    Numeric(f64),
    /// Dense vector value
    Vector(Vec<f32>),
}

/// A document represents a single item to be indexed.
///
/// Fields are stored in a map keyed by the schema field identifier. Duplicate
/// field names overwrite previous values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The field values for this document
    fields: HashMap<String, FieldValue>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Document::default()
    }

    /// Create a builder for fluent document construction.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    /// Set a field value, replacing any previous value.
    pub fn set_field<S: Into<String>>(&mut self, field: S, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    /// Get a field value by name.
    pub fn get_field(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Check if a field is present.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Number of fields in the document.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a document from a JSON object.
    ///
    /// Strings become text values, numbers become numeric values and arrays
    /// of numbers become vectors. Any other value type is rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| FalxError::document("expected a JSON object"))?;

        let mut doc = Document::new();
        for (field, value) in object {
            let field_value = match value {
                serde_json::Value::String(s) => FieldValue::Text(s.clone()),
                serde_json::Value::Number(n) => {
                    let num = n
                        .as_f64()
                        .ok_or_else(|| FalxError::document(format!("field '{field}' is not a representable number")))?;
                    FieldValue::Numeric(num)
                }
                serde_json::Value::Array(items) => {
                    let mut vec = Vec::with_capacity(items.len());
                    for item in items {
                        match item.as_f64() {
                            Some(num) => vec.push(num as f32),
                            None => {
                                return Err(FalxError::document(format!(
                                    "field '{field}' contains a non-numeric array element"
                                )))
                            }
                        }
                    }
                    FieldValue::Vector(vec)
                }
                _ => {
                    return Err(FalxError::document(format!(
                        "field '{field}' has an unsupported value type"
                    )))
                }
            };
            doc.set_field(field.clone(), field_value);
        }
        Ok(doc)
    }
}

impl DocumentAccessor for Document {
    fn strings(&self, field: &str) -> Option<Vec<String>> {
        match self.fields.get(field) {
            Some(FieldValue::Text(s)) => Some(vec![s.clone()]),
            Some(FieldValue::Numeric(n)) => Some(vec![n.to_string()]),
            Some(FieldValue::Vector(_)) => None,
            None => Some(Vec::new()),
        }
    }

    fn numbers(&self, field: &str) -> Option<Vec<f64>> {
        match self.fields.get(field) {
            Some(FieldValue::Numeric(n)) if n.is_finite() => Some(vec![*n]),
            Some(FieldValue::Numeric(_)) => None,
            Some(FieldValue::Text(s)) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Some(vec![n]),
                _ => None,
            },
            Some(FieldValue::Vector(_)) => None,
            None => Some(Vec::new()),
        }
    }

    fn vector(&self, field: &str) -> Option<Vec<f32>> {
        match self.fields.get(field) {
            Some(FieldValue::Vector(v)) => Some(v.clone()),
            Some(_) => None,
            None => Some(Vec::new()),
        }
    }
}

/// Builder for creating documents in a fluent manner.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    doc: Document,
}

impl DocumentBuilder {
    /// Add a text field.
    pub fn text<S: Into<String>, V: Into<String>>(mut self, field: S, value: V) -> Self {
        self.doc.set_field(field, FieldValue::Text(value.into()));
        self
    }

    /// Add a numeric field.
    pub fn numeric<S: Into<String>>(mut self, field: S, value: f64) -> Self {
        self.doc.set_field(field, FieldValue::Numeric(value));
        self
    }

    /// Add a vector field.
    pub fn vector<S: Into<String>>(mut self, field: S, value: Vec<f32>) -> Self {
        self.doc.set_field(field, FieldValue::Vector(value));
        self
    }

    /// Build the document.
    pub fn build(self) -> Document {
        self.doc
    }
}
