//! Synonym groups for full-text matching.
//!
//! Terms belonging to the same group share an internal *group token*. The text
//! index stores an extra posting under the group token for every member term it
//! indexes, and the evaluator substitutes a queried member term with its group
//! token, so a query for any member matches documents containing any other.

use ahash::AHashMap;

/// An immutable table of synonym groups.
///
/// Build the table up front and share it between the text indexes and the
/// evaluator; groups cannot be changed once documents are indexed.
#[derive(Debug, Default)]
pub struct Synonyms {
    /// Member term (lowercase) to group token.
    term_to_token: AHashMap<String, String>,
    /// Number of registered groups.
    group_count: usize,
}

impl Synonyms {
    /// Create an empty synonyms table.
    pub fn new() -> Self {
        Synonyms::default()
    }

    /// Register a group of synonymous terms and return its group token.
    ///
    /// Terms are matched case-insensitively. A term already belonging to a
    /// group is reassigned to the new one.
    pub fn add_group<I, S>(&mut self, terms: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Group tokens start with '$' so they can never collide with tokens
        // produced by the tokenizer.
        let token = format!("${}", self.group_count);
        self.group_count += 1;

        for term in terms {
            self.term_to_token
                .insert(term.as_ref().to_lowercase(), token.clone());
        }
        token
    }

    /// The group token for a term, if the term belongs to any group.
    pub fn group_token(&self, term: &str) -> Option<&str> {
        self.term_to_token
            .get(&term.to_lowercase())
            .map(String::as_str)
    }

    /// Number of registered groups.
    pub fn group_count(&self) -> usize {
        self.group_count
    }
}
