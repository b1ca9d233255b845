//! Schema management for document structure definition.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{FalxError, Result};
use crate::schema::field::SchemaField;

/// An immutable schema describing the indexed fields of a corpus.
///
/// Fields are registered under an internal *identifier* and may carry a
/// user-visible alias (the field's `short_name`). Queries can reference either
/// name; [`Schema::lookup_alias`] resolves aliases back to identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Map of field identifiers to their definitions.
    fields: HashMap<String, SchemaField>,
    /// Field identifiers in declaration order. Iteration order is observable
    /// through index construction and multi-field text queries.
    field_order: Vec<String>,
    /// Map of user-visible aliases to field identifiers.
    field_names: HashMap<String, String>,
}

impl Schema {
    /// Create a builder for constructing schemas.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Get a field definition by identifier.
    pub fn field(&self, identifier: &str) -> Option<&SchemaField> {
        self.fields.get(identifier)
    }

    /// Check if a field identifier exists.
    pub fn has_field(&self, identifier: &str) -> bool {
        self.fields.contains_key(identifier)
    }

    /// Field identifiers in declaration order.
    pub fn field_order(&self) -> &[String] {
        &self.field_order
    }

    /// Iterate field definitions in declaration order.
    pub fn iter_fields(&self) -> impl Iterator<Item = (&str, &SchemaField)> {
        self.field_order
            .iter()
            .map(|ident| (ident.as_str(), &self.fields[ident]))
    }

    /// Resolve a user-visible alias to a field identifier.
    ///
    /// Unknown names resolve to themselves.
    pub fn lookup_alias<'a>(&'a self, alias: &'a str) -> &'a str {
        match self.field_names.get(alias) {
            Some(identifier) => identifier,
            None => alias,
        }
    }

    /// Resolve a field identifier to its user-visible name.
    ///
    /// Unknown identifiers resolve to themselves.
    pub fn lookup_identifier<'a>(&'a self, identifier: &'a str) -> &'a str {
        match self.fields.get(identifier) {
            Some(field) => &field.short_name,
            None => identifier,
        }
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A builder for constructing schemas in a fluent manner.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, SchemaField)>,
}

impl SchemaBuilder {
    /// Create a new empty schema builder.
    pub fn new() -> Self {
        SchemaBuilder::default()
    }

    /// Add a field under the given identifier.
    pub fn field<S: Into<String>>(mut self, identifier: S, field: SchemaField) -> Self {
        self.fields.push((identifier.into(), field));
        self
    }

    /// Build the schema, validating identifiers and aliases.
    pub fn build(self) -> Result<Schema> {
        let mut fields = HashMap::with_capacity(self.fields.len());
        let mut field_order = Vec::with_capacity(self.fields.len());
        let mut field_names = HashMap::new();

        for (identifier, mut field) in self.fields {
            if identifier.is_empty() {
                return Err(FalxError::schema("Field identifier cannot be empty"));
            }
            if fields.contains_key(&identifier) {
                return Err(FalxError::schema(format!(
                    "Field '{identifier}' already exists"
                )));
            }

            if field.short_name.is_empty() {
                field.short_name = identifier.clone();
            }
            if field.short_name != identifier {
                if field_names.contains_key(&field.short_name) {
                    return Err(FalxError::schema(format!(
                        "Alias '{}' already exists",
                        field.short_name
                    )));
                }
                field_names.insert(field.short_name.clone(), identifier.clone());
            }

            field_order.push(identifier.clone());
            fields.insert(identifier, field);
        }

        Ok(Schema {
            fields,
            field_order,
            field_names,
        })
    }
}
