//! Per-node execution profiling.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::query::{AstNode, LogicOp, TagValue};

/// One profiled query node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEvent {
    /// Short node descriptor, e.g. `Term{hello}` or `Logical{n=2,o=and}`.
    pub description: String,
    /// Wall time spent evaluating the node, microseconds.
    pub micros: u64,
    /// Nesting depth of the node, root is 0.
    pub depth: usize,
    /// Cardinality of the node's result set.
    pub result_size: usize,
}

/// The profile of one query evaluation.
///
/// Events are recorded when a node finishes (post-order) and reversed on
/// [`ProfileBuilder::take`], which puts the root first. Depth values are
/// therefore not monotonic when scanning the list forward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmProfile {
    /// Profiled nodes, root first.
    pub events: Vec<ProfileEvent>,
}

fn tag_affix(value: &TagValue) -> &str {
    match value {
        TagValue::Term(affix)
        | TagValue::Prefix(affix)
        | TagValue::Suffix(affix)
        | TagValue::Infix(affix) => affix,
    }
}

fn node_info(node: &AstNode) -> String {
    match node {
        AstNode::Star => "Star{}".to_string(),
        AstNode::StarField => "StarField{}".to_string(),
        AstNode::Term(affix) => format!("Term{{{affix}}}"),
        AstNode::Prefix(affix) => format!("Prefix{{{affix}}}"),
        AstNode::Suffix(affix) => format!("Suffix{{{affix}}}"),
        AstNode::Infix(affix) => format!("Infix{{{affix}}}"),
        AstNode::Range { lo, hi } => format!("Range{{{lo}<>{hi}}}"),
        AstNode::Negate(_) => "Negate{}".to_string(),
        AstNode::Logical { op, nodes } => {
            let op = match op {
                LogicOp::And => "and",
                LogicOp::Or => "or",
            };
            format!("Logical{{n={},o={op}}}", nodes.len())
        }
        AstNode::Field { field, .. } => format!("Field{{{field}}}"),
        AstNode::Tags(values) => {
            let joined = values
                .iter()
                .map(tag_affix)
                .collect::<Vec<_>>()
                .join(",");
            format!("Tags{{{joined}}}")
        }
        AstNode::Knn(knn) => format!("KNN{{l={}}}", knn.limit),
    }
}

/// Collects one [`ProfileEvent`] per evaluated node.
#[derive(Debug, Default)]
pub struct ProfileBuilder {
    depth: usize,
    events: Vec<ProfileEvent>,
}

impl ProfileBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        ProfileBuilder::default()
    }

    /// Enter a node; returns the timestamp to pass to [`ProfileBuilder::finish`].
    pub fn start(&mut self) -> Instant {
        self.depth += 1;
        Instant::now()
    }

    /// Leave a node, recording its descriptor, elapsed time and result size.
    pub fn finish(&mut self, start: Instant, node: &AstNode, result_size: usize) {
        debug_assert!(self.depth >= 1);
        let micros = start.elapsed().as_micros() as u64;
        self.events.push(ProfileEvent {
            description: node_info(node),
            micros,
            depth: self.depth - 1,
            result_size,
        });
        self.depth -= 1;
    }

    /// Finalize into a root-first profile.
    pub fn take(mut self) -> AlgorithmProfile {
        self.events.reverse();
        AlgorithmProfile {
            events: self.events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::KnnNode;

    #[test]
    fn test_node_descriptors() {
        assert_eq!(node_info(&AstNode::Star), "Star{}");
        assert_eq!(node_info(&AstNode::StarField), "StarField{}");
        assert_eq!(node_info(&AstNode::Term("hello".into())), "Term{hello}");
        assert_eq!(node_info(&AstNode::Prefix("he".into())), "Prefix{he}");
        assert_eq!(node_info(&AstNode::Suffix("lo".into())), "Suffix{lo}");
        assert_eq!(node_info(&AstNode::Infix("ll".into())), "Infix{ll}");
        assert_eq!(
            node_info(&AstNode::Range { lo: 15.0, hi: 35.0 }),
            "Range{15<>35}"
        );
        assert_eq!(
            node_info(&AstNode::Negate(Box::new(AstNode::Star))),
            "Negate{}"
        );
        assert_eq!(
            node_info(&AstNode::Logical {
                op: LogicOp::And,
                nodes: vec![AstNode::Star, AstNode::Star],
            }),
            "Logical{n=2,o=and}"
        );
        assert_eq!(
            node_info(&AstNode::Field {
                field: "title".into(),
                node: Box::new(AstNode::Star),
            }),
            "Field{title}"
        );
        assert_eq!(
            node_info(&AstNode::Tags(vec![
                TagValue::Term("red".into()),
                TagValue::Prefix("blu".into()),
            ])),
            "Tags{red,blu}"
        );
        assert_eq!(
            node_info(&AstNode::Knn(Box::new(KnnNode {
                limit: 2,
                field: "emb".into(),
                vec: vec![1.0],
                ef_runtime: None,
                score_alias: String::new(),
                filter: AstNode::Star,
            }))),
            "KNN{l=2}"
        );
    }

    #[test]
    fn test_events_are_reversed_on_take() {
        let mut builder = ProfileBuilder::new();

        let outer = builder.start();
        let inner = builder.start();
        builder.finish(inner, &AstNode::Term("a".into()), 1);
        builder.finish(outer, &AstNode::Negate(Box::new(AstNode::Term("a".into()))), 2);

        let profile = builder.take();
        assert_eq!(profile.events.len(), 2);
        assert_eq!(profile.events[0].description, "Negate{}");
        assert_eq!(profile.events[0].depth, 0);
        assert_eq!(profile.events[1].description, "Term{a}");
        assert_eq!(profile.events[1].depth, 1);
    }
}
