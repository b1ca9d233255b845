//! Synonym substitution end to end.

use std::sync::Arc;

use falx::document::Document;
use falx::index::{FieldIndices, IndicesOptions};
use falx::query::QueryParams;
use falx::schema::{Schema, SchemaField};
use falx::search::SearchAlgorithm;
use falx::synonyms::Synonyms;

fn corpus() -> FieldIndices {
    let schema = Arc::new(
        Schema::builder()
            .field("title", SchemaField::text())
            .build()
            .unwrap(),
    );

    let mut synonyms = Synonyms::new();
    synonyms.add_group(["car", "automobile", "vehicle"]);

    let mut indices = FieldIndices::new(
        schema,
        Arc::new(IndicesOptions::default()),
        Some(Arc::new(synonyms)),
    );
    assert!(indices.add(1, &Document::builder().text("title", "red car").build()));
    assert!(indices.add(2, &Document::builder().text("title", "fast automobile").build()));
    assert!(indices.add(3, &Document::builder().text("title", "slow bicycle").build()));
    indices
}

fn search(indices: &FieldIndices, query: &str) -> Vec<u32> {
    let mut algo = SearchAlgorithm::new();
    assert!(algo.init(query, &QueryParams::default()));
    let result = algo.search(indices);
    assert_eq!(result.error, None);
    result.ids
}

#[test]
fn test_any_group_member_matches_all_members() {
    let indices = corpus();
    assert_eq!(search(&indices, "car"), vec![1, 2]);
    assert_eq!(search(&indices, "automobile"), vec![1, 2]);
    // "vehicle" was never indexed directly but belongs to the group.
    assert_eq!(search(&indices, "vehicle"), vec![1, 2]);
}

#[test]
fn test_substitution_is_term_only() {
    let indices = corpus();
    // Affix variants bypass the synonyms table, "car*" matches only the
    // literal token.
    assert_eq!(search(&indices, "car*"), vec![1]);
    assert_eq!(search(&indices, "*mobile"), vec![2]);
}

#[test]
fn test_non_members_are_unaffected() {
    let indices = corpus();
    assert_eq!(search(&indices, "bicycle"), vec![3]);
    assert_eq!(search(&indices, "red"), vec![1]);
}

#[test]
fn test_synonyms_under_field_scope() {
    let indices = corpus();
    assert_eq!(search(&indices, "@title:vehicle"), vec![1, 2]);
}
