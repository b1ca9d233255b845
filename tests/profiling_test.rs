//! Execution profile capture and event ordering.

use std::sync::Arc;

use falx::document::Document;
use falx::index::{FieldIndices, IndicesOptions};
use falx::query::QueryParams;
use falx::schema::{Schema, SchemaField};
use falx::search::SearchAlgorithm;

fn corpus() -> FieldIndices {
    let schema = Arc::new(
        Schema::builder()
            .field("title", SchemaField::text())
            .field("price", SchemaField::numeric())
            .build()
            .unwrap(),
    );
    let mut indices = FieldIndices::new(schema, Arc::new(IndicesOptions::default()), None);
    for (id, title, price) in [(1, "hello world", 10.0), (2, "hello dragon", 20.0)] {
        let doc = Document::builder()
            .text("title", title)
            .numeric("price", price)
            .build();
        assert!(indices.add(id, &doc));
    }
    indices
}

#[test]
fn test_no_profile_without_opt_in() {
    let indices = corpus();
    let mut algo = SearchAlgorithm::new();
    assert!(algo.init("hello", &QueryParams::default()));
    assert!(algo.search(&indices).profile.is_none());
}

#[test]
fn test_profile_is_root_first() {
    let indices = corpus();
    let mut algo = SearchAlgorithm::new();
    assert!(algo.init("hello -world", &QueryParams::default()));
    algo.enable_profiling();
    let result = algo.search(&indices);

    assert_eq!(result.ids, vec![2]);
    let profile = result.profile.expect("profiling was enabled");

    // Recorded post-order and reversed: root, then negate before the term it
    // wraps, with the first AND child last.
    let descriptions: Vec<&str> = profile
        .events
        .iter()
        .map(|e| e.description.as_str())
        .collect();
    assert_eq!(
        descriptions,
        vec!["Logical{n=2,o=and}", "Negate{}", "Term{world}", "Term{hello}"]
    );

    let depths: Vec<usize> = profile.events.iter().map(|e| e.depth).collect();
    assert_eq!(depths, vec![0, 1, 2, 1]);
}

#[test]
fn test_profile_result_sizes() {
    let indices = corpus();
    let mut algo = SearchAlgorithm::new();
    assert!(algo.init("hello -world", &QueryParams::default()));
    algo.enable_profiling();
    let result = algo.search(&indices);

    let profile = result.profile.unwrap();
    let size_of = |description: &str| {
        profile
            .events
            .iter()
            .find(|e| e.description == description)
            .map(|e| e.result_size)
            .unwrap()
    };

    assert_eq!(size_of("Term{hello}"), 2);
    assert_eq!(size_of("Term{world}"), 1);
    assert_eq!(size_of("Negate{}"), 1);
    assert_eq!(size_of("Logical{n=2,o=and}"), 1);
}

#[test]
fn test_profile_stays_complete_on_error() {
    let indices = corpus();
    let mut algo = SearchAlgorithm::new();
    assert!(algo.init("@unknown:hello world", &QueryParams::default()));
    algo.enable_profiling();
    let result = algo.search(&indices);

    assert_eq!(result.error.as_deref(), Some("Invalid field: unknown"));
    // The failing subtree and the root are profiled; the sibling evaluated
    // after the error short-circuits before instrumentation.
    let profile = result.profile.unwrap();
    let descriptions: Vec<&str> = profile
        .events
        .iter()
        .map(|e| e.description.as_str())
        .collect();
    assert_eq!(
        descriptions,
        vec!["Logical{n=2,o=and}", "Field{unknown}", "Term{hello}"]
    );
    assert_eq!(profile.events[0].result_size, 0);
}

#[test]
fn test_profile_range_descriptor() {
    let indices = corpus();
    let mut algo = SearchAlgorithm::new();
    assert!(algo.init("@price:[15 35]", &QueryParams::default()));
    algo.enable_profiling();
    let result = algo.search(&indices);

    let profile = result.profile.unwrap();
    let descriptions: Vec<&str> = profile
        .events
        .iter()
        .map(|e| e.description.as_str())
        .collect();
    assert_eq!(descriptions, vec!["Field{price}", "Range{15<>35}"]);
}
