//! End-to-end query scenarios over a small mixed-type corpus.

use std::sync::Arc;

use falx::document::Document;
use falx::index::{FieldIndices, IndicesOptions};
use falx::query::QueryParams;
use falx::schema::{Schema, SchemaField, VectorParams};
use falx::search::SearchAlgorithm;
use falx::vector::DistanceMetric;

fn corpus_schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .field("title", SchemaField::text())
            .field("price", SchemaField::numeric())
            .field("tags", SchemaField::tag())
            .field(
                "emb",
                SchemaField::vector(VectorParams::flat(3, DistanceMetric::Cosine)),
            )
            .build()
            .unwrap(),
    )
}

fn corpus_doc(title: &str, price: f64, tags: &str, emb: Vec<f32>) -> Document {
    Document::builder()
        .text("title", title)
        .numeric("price", price)
        .text("tags", tags)
        .vector("emb", emb)
        .build()
}

fn corpus() -> FieldIndices {
    let mut indices = FieldIndices::new(
        corpus_schema(),
        Arc::new(IndicesOptions::default()),
        None,
    );
    assert!(indices.add(1, &corpus_doc("hello world", 10.0, "red,sale", vec![1.0, 0.0, 0.0])));
    assert!(indices.add(2, &corpus_doc("hello dragon", 20.0, "blue,sale", vec![0.0, 1.0, 0.0])));
    assert!(indices.add(3, &corpus_doc("world peace", 30.0, "red", vec![0.0, 0.0, 1.0])));
    assert!(indices.add(4, &corpus_doc("quiet", 40.0, "blue", vec![1.0, 1.0, 0.0])));
    indices
}

fn search(indices: &FieldIndices, query: &str) -> Vec<u32> {
    let mut algo = SearchAlgorithm::new();
    assert!(algo.init(query, &QueryParams::default()), "query: {query}");
    let result = algo.search(indices);
    assert_eq!(result.error, None, "query: {query}");
    result.ids
}

#[test]
fn test_single_term() {
    let indices = corpus();
    assert_eq!(search(&indices, "hello"), vec![1, 2]);
}

#[test]
fn test_implicit_and() {
    let indices = corpus();
    assert_eq!(search(&indices, "hello world"), vec![1]);
}

#[test]
fn test_numeric_range() {
    let indices = corpus();
    assert_eq!(search(&indices, "@price:[15 35]"), vec![2, 3]);
}

#[test]
fn test_tag_match() {
    let indices = corpus();
    assert_eq!(search(&indices, "@tags:{red}"), vec![1, 3]);
}

#[test]
fn test_negation() {
    let indices = corpus();
    assert_eq!(search(&indices, "-@tags:{sale}"), vec![3, 4]);
}

#[test]
fn test_field_term_and_tag_union() {
    let indices = corpus();
    assert_eq!(search(&indices, "@title:hello @tags:{red|blue}"), vec![1, 2]);
}

#[test]
fn test_star_returns_all_documents() {
    let indices = corpus();
    assert_eq!(search(&indices, "*"), vec![1, 2, 3, 4]);
}

#[test]
fn test_star_field() {
    let indices = corpus();
    assert_eq!(search(&indices, "@title:*"), vec![1, 2, 3, 4]);
}

#[test]
fn test_or_of_terms() {
    let indices = corpus();
    assert_eq!(search(&indices, "dragon | peace"), vec![2, 3]);
    assert_eq!(search(&indices, "@title:(dragon | quiet)"), vec![2, 4]);
}

#[test]
fn test_prefix_suffix_infix() {
    let indices = corpus();
    assert_eq!(search(&indices, "drag*"), vec![2]);
    assert_eq!(search(&indices, "*gon"), vec![2]);
    assert_eq!(search(&indices, "*rago*"), vec![2]);
    assert_eq!(search(&indices, "@title:wor*"), vec![1, 3]);
}

#[test]
fn test_tag_affixes() {
    let indices = corpus();
    assert_eq!(search(&indices, "@tags:{sal*}"), vec![1, 2]);
    assert_eq!(search(&indices, "@tags:{*lue}"), vec![2, 4]);
    assert_eq!(search(&indices, "@tags:{*al*}"), vec![1, 2]);
}

#[test]
fn test_open_ended_ranges() {
    let indices = corpus();
    assert_eq!(search(&indices, "@price:[-inf 15]"), vec![1]);
    assert_eq!(search(&indices, "@price:[35 +inf]"), vec![4]);
    assert_eq!(search(&indices, "@price:[-inf +inf]"), vec![1, 2, 3, 4]);
}

#[test]
fn test_inverted_range_is_empty() {
    let indices = corpus();
    assert_eq!(search(&indices, "@price:[35 15]"), Vec::<u32>::new());
}

#[test]
fn test_and_or_commutativity() {
    let indices = corpus();
    assert_eq!(search(&indices, "hello world"), search(&indices, "world hello"));
    assert_eq!(
        search(&indices, "dragon | peace"),
        search(&indices, "peace | dragon")
    );
}

#[test]
fn test_and_distributes_over_or() {
    let indices = corpus();
    assert_eq!(
        search(&indices, "hello (world | dragon)"),
        search(&indices, "(hello world) | (hello dragon)")
    );
}

#[test]
fn test_double_negation_is_identity() {
    let indices = corpus();
    assert_eq!(search(&indices, "--hello"), search(&indices, "hello"));
    assert_eq!(
        search(&indices, "--@tags:{sale}"),
        search(&indices, "@tags:{sale}")
    );
}

#[test]
fn test_negation_of_star_is_empty() {
    let indices = corpus();
    assert_eq!(search(&indices, "-*"), Vec::<u32>::new());
}

#[test]
fn test_stopwords_never_match() {
    let indices = corpus();
    // "the" is a stopword, it was dropped at indexing time.
    assert_eq!(search(&indices, "the"), Vec::<u32>::new());
}

#[test]
fn test_empty_query_is_rejected() {
    let mut algo = SearchAlgorithm::new();
    assert!(!algo.init("", &QueryParams::default()));
    assert!(!algo.init("   ", &QueryParams::default()));
}

#[test]
fn test_unknown_field_is_an_error() {
    let indices = corpus();
    let mut algo = SearchAlgorithm::new();
    assert!(algo.init("@unknown:hello", &QueryParams::default()));
    let result = algo.search(&indices);

    assert_eq!(result.error.as_deref(), Some("Invalid field: unknown"));
    assert!(result.ids.is_empty());
}

#[test]
fn test_wrong_access_type_is_an_error() {
    let indices = corpus();
    let mut algo = SearchAlgorithm::new();
    assert!(algo.init("@title:[10 20]", &QueryParams::default()));
    let result = algo.search(&indices);

    assert_eq!(
        result.error.as_deref(),
        Some("Wrong access type for field: title")
    );
    assert!(result.ids.is_empty());
}

#[test]
fn test_first_error_wins() {
    let indices = corpus();
    let mut algo = SearchAlgorithm::new();
    assert!(algo.init("@unknown:hello @title:[10 20]", &QueryParams::default()));
    let result = algo.search(&indices);

    assert_eq!(result.error.as_deref(), Some("Invalid field: unknown"));
}

#[test]
fn test_empty_corpus_returns_empty_without_error() {
    let indices = FieldIndices::new(
        corpus_schema(),
        Arc::new(IndicesOptions::default()),
        None,
    );

    for query in ["hello", "*", "@price:[0 100]", "-@tags:{red}", "@title:*"] {
        assert_eq!(search(&indices, query), Vec::<u32>::new(), "query: {query}");
    }
}

#[test]
fn test_removal_restores_query_results() {
    let mut with_extra = corpus();
    let extra = corpus_doc("hello extra", 25.0, "red", vec![0.5, 0.5, 0.0]);
    assert!(with_extra.add(5, &extra));
    assert_eq!(search(&with_extra, "hello"), vec![1, 2, 5]);

    with_extra.remove(5, &extra);

    let baseline = corpus();
    for query in ["hello", "*", "@price:[15 35]", "@tags:{red}", "-@tags:{sale}"] {
        assert_eq!(
            search(&with_extra, query),
            search(&baseline, query),
            "query: {query}"
        );
    }
}

#[test]
fn test_failed_add_leaves_no_trace() {
    let mut indices = corpus();
    // The vector has the wrong dimension, so the whole add must be rolled
    // back even though title and price were already applied.
    let bad = Document::builder()
        .text("title", "hello bad")
        .numeric("price", 50.0)
        .vector("emb", vec![1.0])
        .build();
    assert!(!indices.add(5, &bad));

    assert_eq!(search(&indices, "hello"), vec![1, 2]);
    assert_eq!(search(&indices, "bad"), Vec::<u32>::new());
    assert_eq!(search(&indices, "@price:[45 55]"), Vec::<u32>::new());
    assert_eq!(indices.all_docs(), &[1, 2, 3, 4]);
}

#[test]
fn test_text_param_substitution() {
    let indices = corpus();
    let mut params = QueryParams::new();
    params.set_text("t", "dragon");

    let mut algo = SearchAlgorithm::new();
    assert!(algo.init("@title:$t", &params));
    let result = algo.search(&indices);
    assert_eq!(result.ids, vec![2]);
}

#[test]
fn test_unfielded_query_spans_all_text_fields() {
    let schema = Arc::new(
        Schema::builder()
            .field("title", SchemaField::text())
            .field("body", SchemaField::text())
            .build()
            .unwrap(),
    );
    let mut indices =
        FieldIndices::new(schema, Arc::new(IndicesOptions::default()), None);
    assert!(indices.add(1, &Document::builder().text("title", "alpha").build()));
    assert!(indices.add(2, &Document::builder().text("body", "alpha").build()));

    assert_eq!(search(&indices, "alpha"), vec![1, 2]);
    assert_eq!(search(&indices, "@title:alpha"), vec![1]);
    assert_eq!(search(&indices, "@body:alpha"), vec![2]);
}

#[test]
fn test_field_alias_resolution() {
    let schema = Arc::new(
        Schema::builder()
            .field("$.title", SchemaField::text().with_alias("title"))
            .build()
            .unwrap(),
    );
    let mut indices =
        FieldIndices::new(schema, Arc::new(IndicesOptions::default()), None);
    assert!(indices.add(1, &Document::builder().text("$.title", "hello").build()));

    assert_eq!(search(&indices, "@title:hello"), vec![1]);
}
