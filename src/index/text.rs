//! Tokenized inverted index for TEXT fields.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::Arc;

use crate::document::DocumentAccessor;
use crate::index::{DocId, IndicesOptions};
use crate::synonyms::Synonyms;

/// An in-memory inverted index mapping tokens to sorted posting lists.
///
/// Tokens are produced by lowercasing and splitting field values on
/// non-alphanumeric characters, then dropping stopwords. When a synonyms table
/// is present, every indexed token that belongs to a group is additionally
/// posted under the group token.
///
/// Prefix matching walks the ordered token map directly. Suffix and infix
/// matching either scan all tokens linearly or, when the suffix table is
/// enabled, look up an auxiliary map holding every suffix of every token.
#[derive(Debug)]
pub struct TextIndex {
    options: Arc<IndicesOptions>,
    synonyms: Option<Arc<Synonyms>>,
    /// Token to sorted-unique posting list.
    postings: BTreeMap<String, Vec<DocId>>,
    /// Suffix of a token to the tokens carrying it. `None` when disabled.
    suffixes: Option<BTreeMap<String, Vec<String>>>,
    /// Sorted ids of documents with a value in this field.
    docs: Vec<DocId>,
}

impl TextIndex {
    /// Create a new text index.
    pub fn new(
        options: Arc<IndicesOptions>,
        synonyms: Option<Arc<Synonyms>>,
        with_suffixtrie: bool,
    ) -> Self {
        TextIndex {
            options,
            synonyms,
            postings: BTreeMap::new(),
            suffixes: with_suffixtrie.then(BTreeMap::new),
            docs: Vec::new(),
        }
    }

    /// Split a field value into normalized index tokens.
    fn tokenize(&self, value: &str) -> Vec<String> {
        value
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .filter(|token| !self.options.stopwords.contains(token))
            .collect()
    }

    fn insert_posting(&mut self, token: &str, doc: DocId) {
        let list = self.postings.entry(token.to_string()).or_default();
        if let Err(pos) = list.binary_search(&doc) {
            list.insert(pos, doc);
        }
    }

    fn insert_suffixes(&mut self, token: &str) {
        let Some(suffixes) = self.suffixes.as_mut() else {
            return;
        };
        for (start, _) in token.char_indices() {
            let suffix = &token[start..];
            let words = suffixes.entry(suffix.to_string()).or_default();
            if !words.iter().any(|w| w == token) {
                words.push(token.to_string());
            }
        }
    }

    fn remove_posting(&mut self, token: &str, doc: DocId) {
        let Some(list) = self.postings.get_mut(token) else {
            return;
        };
        if let Ok(pos) = list.binary_search(&doc) {
            list.remove(pos);
        }
        if list.is_empty() {
            self.postings.remove(token);
            if let Some(suffixes) = self.suffixes.as_mut() {
                for (start, _) in token.char_indices() {
                    let suffix = &token[start..];
                    if let Some(words) = suffixes.get_mut(suffix) {
                        words.retain(|w| w != token);
                        if words.is_empty() {
                            suffixes.remove(suffix);
                        }
                    }
                }
            }
        }
    }

    /// Index a document's field value. Returns false when the value cannot be
    /// interpreted as text.
    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        let Some(values) = access.strings(field) else {
            return false;
        };
        if values.is_empty() {
            return true;
        }

        for value in &values {
            for token in self.tokenize(value) {
                self.insert_posting(&token, doc);
                self.insert_suffixes(&token);
                if let Some(group) = self
                    .synonyms
                    .as_ref()
                    .and_then(|s| s.group_token(&token))
                    .map(str::to_string)
                {
                    self.insert_posting(&group, doc);
                }
            }
        }

        if let Err(pos) = self.docs.binary_search(&doc) {
            self.docs.insert(pos, doc);
        }
        true
    }

    /// Remove a document's postings. Tokens are recomputed from the accessor.
    pub fn remove(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) {
        let Some(values) = access.strings(field) else {
            return;
        };

        for value in &values {
            for token in self.tokenize(value) {
                if let Some(group) = self
                    .synonyms
                    .as_ref()
                    .and_then(|s| s.group_token(&token))
                    .map(str::to_string)
                {
                    self.remove_posting(&group, doc);
                }
                self.remove_posting(&token, doc);
            }
        }

        if let Ok(pos) = self.docs.binary_search(&doc) {
            self.docs.remove(pos);
        }
    }

    /// The posting list for a single term.
    ///
    /// With `strip_whitespace` the term is trimmed and lowercased before
    /// lookup; group tokens are passed through untouched.
    pub fn matching(&self, term: &str, strip_whitespace: bool) -> Option<&[DocId]> {
        let needle;
        let key = if strip_whitespace {
            needle = term.trim().to_lowercase();
            needle.as_str()
        } else {
            term
        };
        self.postings.get(key).map(Vec::as_slice)
    }

    /// Invoke `f` once per posting list whose token starts with `affix`.
    pub fn match_prefix<'s>(&'s self, affix: &str, f: &mut dyn FnMut(&'s [DocId])) {
        let affix = affix.trim().to_lowercase();
        for (token, list) in self
            .postings
            .range::<str, _>((Bound::Included(affix.as_str()), Bound::Unbounded))
        {
            if !token.starts_with(&affix) {
                break;
            }
            f(list);
        }
    }

    /// Invoke `f` once per posting list whose token ends with `affix`.
    pub fn match_suffix<'s>(&'s self, affix: &str, f: &mut dyn FnMut(&'s [DocId])) {
        let affix = affix.trim().to_lowercase();
        match self.suffixes.as_ref() {
            Some(suffixes) => {
                if let Some(words) = suffixes.get(&affix) {
                    for word in words {
                        if let Some(list) = self.postings.get(word) {
                            f(list);
                        }
                    }
                }
            }
            None => {
                for (token, list) in &self.postings {
                    if token.ends_with(&affix) {
                        f(list);
                    }
                }
            }
        }
    }

    /// Invoke `f` once per posting list whose token contains `affix`.
    pub fn match_infix<'s>(&'s self, affix: &str, f: &mut dyn FnMut(&'s [DocId])) {
        let affix = affix.trim().to_lowercase();
        match self.suffixes.as_ref() {
            Some(suffixes) => {
                // Tokens containing the affix are exactly the tokens with a
                // suffix that starts with it. Collect first, a token can show
                // up under several matching suffix keys.
                let mut matched: BTreeSet<&String> = BTreeSet::new();
                for (suffix, words) in
                    suffixes.range::<str, _>((Bound::Included(affix.as_str()), Bound::Unbounded))
                {
                    if !suffix.starts_with(&affix) {
                        break;
                    }
                    matched.extend(words.iter());
                }
                for word in matched {
                    if let Some(list) = self.postings.get(word) {
                        f(list);
                    }
                }
            }
            None => {
                for (token, list) in &self.postings {
                    if token.contains(&affix) {
                        f(list);
                    }
                }
            }
        }
    }

    /// Sorted ids of documents with a value in this field.
    pub fn all_docs(&self) -> &[DocId] {
        &self.docs
    }

    /// Number of distinct tokens in the index.
    pub fn token_count(&self) -> usize {
        self.postings.len()
    }
}
