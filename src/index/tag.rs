//! Exact-match inverted index for TAG fields.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::document::DocumentAccessor;
use crate::index::DocId;
use crate::schema::TagParams;

/// An in-memory tag index.
///
/// Field values are split on the configured separator and trimmed; unless the
/// field is case-sensitive, tags are lowercased on both the index and the
/// query side. Unlike the text index there is no tokenization beyond the
/// separator split, a tag may contain whitespace.
#[derive(Debug)]
pub struct TagIndex {
    params: TagParams,
    /// Tag to sorted-unique posting list.
    postings: BTreeMap<String, Vec<DocId>>,
    /// Sorted ids of documents with a value in this field.
    docs: Vec<DocId>,
}

impl TagIndex {
    /// Create a new tag index.
    pub fn new(params: TagParams) -> Self {
        TagIndex {
            params,
            postings: BTreeMap::new(),
            docs: Vec::new(),
        }
    }

    fn normalize(&self, tag: &str) -> String {
        let tag = tag.trim();
        if self.params.case_sensitive {
            tag.to_string()
        } else {
            tag.to_lowercase()
        }
    }

    fn split_tags(&self, value: &str) -> Vec<String> {
        value
            .split(self.params.separator)
            .map(|tag| self.normalize(tag))
            .filter(|tag| !tag.is_empty())
            .collect()
    }

    /// Index a document's tags. Returns false when the stored value cannot be
    /// interpreted as text.
    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        let Some(values) = access.strings(field) else {
            return false;
        };
        if values.is_empty() {
            return true;
        }

        for value in &values {
            for tag in self.split_tags(value) {
                let list = self.postings.entry(tag).or_default();
                if let Err(pos) = list.binary_search(&doc) {
                    list.insert(pos, doc);
                }
            }
        }

        if let Err(pos) = self.docs.binary_search(&doc) {
            self.docs.insert(pos, doc);
        }
        true
    }

    /// Remove a document's tags. Tags are recomputed from the accessor.
    pub fn remove(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) {
        let Some(values) = access.strings(field) else {
            return;
        };

        for value in &values {
            for tag in self.split_tags(value) {
                if let Some(list) = self.postings.get_mut(&tag) {
                    if let Ok(pos) = list.binary_search(&doc) {
                        list.remove(pos);
                    }
                    if list.is_empty() {
                        self.postings.remove(&tag);
                    }
                }
            }
        }

        if let Ok(pos) = self.docs.binary_search(&doc) {
            self.docs.remove(pos);
        }
    }

    /// The posting list for a single tag.
    pub fn matching(&self, tag: &str) -> Option<&[DocId]> {
        self.postings.get(&self.normalize(tag)).map(Vec::as_slice)
    }

    /// Invoke `f` once per posting list whose tag starts with `affix`.
    pub fn match_prefix<'s>(&'s self, affix: &str, f: &mut dyn FnMut(&'s [DocId])) {
        let affix = self.normalize(affix);
        for (tag, list) in self
            .postings
            .range::<str, _>((Bound::Included(affix.as_str()), Bound::Unbounded))
        {
            if !tag.starts_with(&affix) {
                break;
            }
            f(list);
        }
    }

    /// Invoke `f` once per posting list whose tag ends with `affix`.
    pub fn match_suffix<'s>(&'s self, affix: &str, f: &mut dyn FnMut(&'s [DocId])) {
        let affix = self.normalize(affix);
        for (tag, list) in &self.postings {
            if tag.ends_with(&affix) {
                f(list);
            }
        }
    }

    /// Invoke `f` once per posting list whose tag contains `affix`.
    pub fn match_infix<'s>(&'s self, affix: &str, f: &mut dyn FnMut(&'s [DocId])) {
        let affix = self.normalize(affix);
        for (tag, list) in &self.postings {
            if tag.contains(&affix) {
                f(list);
            }
        }
    }

    /// Sorted ids of documents with a value in this field.
    pub fn all_docs(&self) -> &[DocId] {
        &self.docs
    }
}
