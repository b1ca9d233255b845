//! Recursive query evaluation against a field-index registry.

use crate::index::numeric::NumericIndex;
use crate::index::tag::TagIndex;
use crate::index::text::TextIndex;
use crate::index::vector_index::{FlatVectorIndex, HnswVectorIndex, VectorIndex};
use crate::index::{DocId, FieldIndex, FieldIndices};
use crate::query::{AstNode, KnnNode, LogicOp, TagValue};
use crate::search::profile::ProfileBuilder;
use crate::search::result::{set_intersection, set_union, IndexResult};
use crate::search::SearchResult;
use crate::vector::{vector_distance, DistanceMetric};

/// Single-use evaluator for one query against one registry snapshot.
///
/// Evaluation is synchronous and never mutates the registry. Errors do not
/// unwind; the first error recorded sticks, every subsequent node evaluates
/// to an empty result, and the error string ends up on the returned
/// [`SearchResult`]. This keeps the recursion (and the profile, when enabled)
/// structurally complete even for failing queries.
pub struct BasicSearch<'a> {
    indices: &'a FieldIndices,

    error: Option<String>,
    profile_builder: Option<ProfileBuilder>,

    /// Cardinality of the KNN pre-filter before ranking.
    preagg_total: usize,
    knn_scores: Vec<(DocId, f32)>,

    /// Scratch buffer reused by every merge within this query.
    tmp_vec: Vec<DocId>,
    knn_distances: Vec<(f32, DocId)>,
}

impl<'a> BasicSearch<'a> {
    /// Create an evaluator over the given registry.
    pub fn new(indices: &'a FieldIndices) -> Self {
        BasicSearch {
            indices,
            error: None,
            profile_builder: None,
            preagg_total: 0,
            knn_scores: Vec::new(),
            tmp_vec: Vec::new(),
            knn_distances: Vec::new(),
        }
    }

    /// Capture a per-node profile during the next search.
    pub fn enable_profiling(&mut self) {
        self.profile_builder = Some(ProfileBuilder::new());
    }

    /// Evaluate a parsed query.
    pub fn search(mut self, query: &AstNode) -> SearchResult {
        let result = self.search_generic(query, None, true);

        let profile = self.profile_builder.take().map(ProfileBuilder::take);
        let ids = result.into_vec();
        SearchResult {
            total: ids.len(),
            ids,
            knn_scores: self.knn_scores,
            preagg_total: self.preagg_total,
            profile,
            error: self.error,
        }
    }

    fn set_error(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    fn base_index(&mut self, field: &str) -> Option<&'a FieldIndex> {
        match self.indices.get_index(field) {
            Some(index) => Some(index),
            None => {
                self.set_error(format!("Invalid field: {field}"));
                None
            }
        }
    }

    fn text_index(&mut self, field: &str) -> Option<&'a TextIndex> {
        let index = self.base_index(field)?;
        match index.as_text() {
            Some(index) => Some(index),
            None => {
                self.set_error(format!("Wrong access type for field: {field}"));
                None
            }
        }
    }

    fn numeric_index(&mut self, field: &str) -> Option<&'a NumericIndex> {
        let index = self.base_index(field)?;
        match index.as_numeric() {
            Some(index) => Some(index),
            None => {
                self.set_error(format!("Wrong access type for field: {field}"));
                None
            }
        }
    }

    fn tag_index(&mut self, field: &str) -> Option<&'a TagIndex> {
        let index = self.base_index(field)?;
        match index.as_tag() {
            Some(index) => Some(index),
            None => {
                self.set_error(format!("Wrong access type for field: {field}"));
                None
            }
        }
    }

    fn vector_index(&mut self, field: &str) -> Option<&'a VectorIndex> {
        let index = self.base_index(field)?;
        match index.as_vector() {
            Some(index) => Some(index),
            None => {
                self.set_error(format!("Wrong access type for field: {field}"));
                None
            }
        }
    }

    /// Merge `matched` into `current` under `op`, reusing the scratch buffer.
    fn merge(&mut self, matched: IndexResult<'a>, current: &mut IndexResult<'a>, op: LogicOp) {
        self.tmp_vec.clear();
        match op {
            LogicOp::And => {
                self.tmp_vec.reserve(matched.len().min(current.len()));
                set_intersection(matched.iter(), current.iter(), &mut self.tmp_vec);
            }
            LogicOp::Or => {
                self.tmp_vec.reserve(matched.len() + current.len());
                set_union(matched.iter(), current.iter(), &mut self.tmp_vec);
            }
        }
        current.assign_from(&mut self.tmp_vec);
    }

    /// Fold all sub results into one.
    ///
    /// Unifying from smallest to largest is more efficient. AND only shrinks,
    /// so starting with the smallest caps the working set; for OR, merging
    /// small sets first reduces the average traversal length. The result set
    /// itself does not depend on the order.
    fn unify_results(&mut self, mut subs: Vec<IndexResult<'a>>, op: LogicOp) -> IndexResult<'a> {
        if subs.is_empty() {
            return IndexResult::default();
        }

        subs.sort_by_key(IndexResult::len);
        let mut iter = subs.into_iter();
        let mut out = iter.next().unwrap();
        for matched in iter {
            self.merge(matched, &mut out, op);
        }
        out
    }

    /// OR together every posting list an affix matcher reports.
    fn collect_matches<F>(&mut self, collect: F) -> IndexResult<'a>
    where
        F: FnOnce(&mut dyn FnMut(&'a [DocId])),
    {
        let mut lists: Vec<&'a [DocId]> = Vec::new();
        collect(&mut |list| lists.push(list));

        let mut result = IndexResult::default();
        for list in lists {
            self.merge(IndexResult::Borrowed(list), &mut result, LogicOp::Or);
        }
        result
    }

    fn search_star(&mut self, active_field: Option<&str>) -> IndexResult<'a> {
        debug_assert!(active_field.is_none());
        IndexResult::Borrowed(self.indices.all_docs())
    }

    fn search_star_field(&mut self, active_field: Option<&str>) -> IndexResult<'a> {
        let field = active_field.unwrap_or_default();

        // Prefer the sort index view; for sortable fields it tracks non-null
        // values regardless of the content index layout.
        if let Some(sort_index) = self.indices.get_sort_index(field) {
            return IndexResult::Borrowed(sort_index.all_docs());
        }

        match self.base_index(field) {
            Some(index) => IndexResult::Borrowed(index.all_docs()),
            None => IndexResult::default(),
        }
    }

    // "term": access the field's text index, or unify over all text indices
    // when no field is active.
    fn search_term(&mut self, affix: &str, active_field: Option<&str>) -> IndexResult<'a> {
        let mut term = affix.to_string();
        let mut strip_whitespace = true;

        if let Some(synonyms) = self.indices.synonyms() {
            if let Some(group_token) = synonyms.group_token(&term) {
                term = group_token.to_string();
                strip_whitespace = false;
            }
        }

        if let Some(field) = active_field {
            let Some(index) = self.text_index(field) else {
                return IndexResult::default();
            };
            return match index.matching(&term, strip_whitespace) {
                Some(list) => IndexResult::Borrowed(list),
                None => IndexResult::default(),
            };
        }

        let selected = self.indices.all_text_indices();
        let mut subs = Vec::with_capacity(selected.len());
        for index in selected {
            subs.push(match index.matching(&term, strip_whitespace) {
                Some(list) => IndexResult::Borrowed(list),
                None => IndexResult::default(),
            });
        }
        self.unify_results(subs, LogicOp::Or)
    }

    fn search_affix(
        &mut self,
        node: &AstNode,
        affix: &str,
        active_field: Option<&str>,
    ) -> IndexResult<'a> {
        let selected: Vec<&'a TextIndex> = if let Some(field) = active_field {
            match self.text_index(field) {
                Some(index) => vec![index],
                None => return IndexResult::default(),
            }
        } else {
            self.indices.all_text_indices()
        };

        let mut subs = Vec::with_capacity(selected.len());
        for index in selected {
            let sub = match node {
                AstNode::Prefix(_) => self.collect_matches(|f| index.match_prefix(affix, f)),
                AstNode::Suffix(_) => self.collect_matches(|f| index.match_suffix(affix, f)),
                AstNode::Infix(_) => self.collect_matches(|f| index.match_infix(affix, f)),
                _ => unreachable!("not an affix node"),
            };
            subs.push(sub);
        }
        self.unify_results(subs, LogicOp::Or)
    }

    // [range]: access the field's numeric index.
    fn search_range(&mut self, lo: f64, hi: f64, active_field: Option<&str>) -> IndexResult<'a> {
        debug_assert!(active_field.is_some());
        let field = active_field.unwrap_or_default();
        match self.numeric_index(field) {
            Some(index) => IndexResult::from(index.range(lo, hi)),
            None => IndexResult::default(),
        }
    }

    // negate -(*subquery*): explicit complement against all documents.
    fn search_negate(&mut self, node: &AstNode, active_field: Option<&str>) -> IndexResult<'a> {
        let matched = self.search_generic(node, active_field, false).into_vec();

        let mut all = self.indices.all_docs().to_vec();
        all.retain(|doc| matched.binary_search(doc).is_err());
        IndexResult::Owned(all)
    }

    // logical query: unify all sub results.
    fn search_logical(
        &mut self,
        op: LogicOp,
        nodes: &[AstNode],
        active_field: Option<&str>,
    ) -> IndexResult<'a> {
        let mut subs = Vec::with_capacity(nodes.len());
        for node in nodes {
            subs.push(self.search_generic(node, active_field, false));
        }
        self.unify_results(subs, op)
    }

    // @field: bind the active field for the subtree.
    fn search_field(&mut self, field: &str, node: &AstNode, active_field: Option<&str>) -> IndexResult<'a> {
        debug_assert!(active_field.is_none());
        self.search_generic(node, Some(field), false)
    }

    // {tag | ...}: unify results for all tag values.
    fn search_tags(&mut self, values: &[TagValue], active_field: Option<&str>) -> IndexResult<'a> {
        let field = active_field.unwrap_or_default();
        let Some(index) = self.tag_index(field) else {
            return IndexResult::default();
        };

        let mut subs = Vec::with_capacity(values.len());
        for value in values {
            let sub = match value {
                TagValue::Term(tag) => match index.matching(tag) {
                    Some(list) => IndexResult::Borrowed(list),
                    None => IndexResult::default(),
                },
                TagValue::Prefix(affix) => self.collect_matches(|f| index.match_prefix(affix, f)),
                TagValue::Suffix(affix) => self.collect_matches(|f| index.match_suffix(affix, f)),
                TagValue::Infix(affix) => self.collect_matches(|f| index.match_infix(affix, f)),
            };
            subs.push(sub);
        }
        self.unify_results(subs, LogicOp::Or)
    }

    fn search_knn_flat(
        &mut self,
        index: &FlatVectorIndex,
        knn: &KnnNode,
        metric: DistanceMetric,
        sub_results: IndexResult<'a>,
    ) {
        self.knn_distances.clear();
        self.knn_distances.reserve(sub_results.len());

        for doc in sub_results.iter() {
            // Filtered documents without a vector cannot be ranked.
            if let Some(vector) = index.get(doc) {
                let distance = vector_distance(&knn.vec, vector, metric);
                self.knn_distances.push((distance, doc));
            }
        }

        let prefix = knn.limit.min(self.knn_distances.len());
        let by_distance = |a: &(f32, DocId), b: &(f32, DocId)| {
            a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1))
        };
        if prefix > 0 && prefix < self.knn_distances.len() {
            self.knn_distances.select_nth_unstable_by(prefix - 1, by_distance);
        }
        self.knn_distances.truncate(prefix);
        self.knn_distances.sort_unstable_by(by_distance);
    }

    fn search_knn_hnsw(
        &mut self,
        index: &HnswVectorIndex,
        knn: &KnnNode,
        sub_results: IndexResult<'a>,
    ) {
        if self.indices.all_docs().len() == sub_results.len() {
            self.knn_distances = index.knn(&knn.vec, knn.limit, knn.ef_runtime);
        } else {
            let allowed = sub_results.into_vec();
            self.knn_distances = index.knn_filtered(&knn.vec, knn.limit, knn.ef_runtime, &allowed);
        }
    }

    // [KNN limit @field $vec]: rank the filtered documents by distance to the
    // query vector, keep the closest `limit`.
    fn search_knn(&mut self, knn: &KnnNode, active_field: Option<&str>) -> IndexResult<'a> {
        debug_assert!(active_field.is_none());
        let sub_results = self.search_generic(&knn.filter, active_field, false);

        let Some(vec_index) = self.vector_index(&knn.field) else {
            return IndexResult::default();
        };

        let (dim, metric) = vec_index.info();
        if dim != knn.vec.len() {
            self.set_error(format!(
                "Wrong vector index dimensions, got: {}, expected: {}",
                knn.vec.len(),
                dim
            ));
            return IndexResult::default();
        }

        self.preagg_total = sub_results.len();
        self.knn_scores.clear();
        match vec_index {
            VectorIndex::Hnsw(index) => self.search_knn_hnsw(index, knn, sub_results),
            VectorIndex::Flat(index) => self.search_knn_flat(index, knn, metric, sub_results),
        }

        let mut out = Vec::with_capacity(self.knn_distances.len());
        self.knn_scores.reserve(self.knn_distances.len());
        for &(distance, doc) in &self.knn_distances {
            self.knn_scores.push((doc, distance));
            out.push(doc);
        }
        IndexResult::Owned(out)
    }

    /// Determine the node type and call the specific search function.
    fn search_generic(
        &mut self,
        node: &AstNode,
        active_field: Option<&str>,
        top_level: bool,
    ) -> IndexResult<'a> {
        if self.error.is_some() {
            return IndexResult::default();
        }

        let start = self.profile_builder.as_mut().map(ProfileBuilder::start);

        let result = match node {
            AstNode::Star => self.search_star(active_field),
            AstNode::StarField => self.search_star_field(active_field),
            AstNode::Term(affix) => self.search_term(affix, active_field),
            AstNode::Prefix(affix) | AstNode::Suffix(affix) | AstNode::Infix(affix) => {
                self.search_affix(node, affix, active_field)
            }
            AstNode::Range { lo, hi } => self.search_range(*lo, *hi, active_field),
            AstNode::Negate(inner) => self.search_negate(inner, active_field),
            AstNode::Logical { op, nodes } => self.search_logical(*op, nodes, active_field),
            AstNode::Field { field, node } => self.search_field(field, node, active_field),
            AstNode::Tags(values) => self.search_tags(values, active_field),
            AstNode::Knn(knn) => self.search_knn(knn, active_field),
        };

        // Top level results stay unsorted; they are consumed as-is or ordered
        // by KNN distance.
        debug_assert!(top_level || node.is_knn() || result.is_sorted());

        if let Some(start) = start {
            let result_size = result.len();
            if let Some(builder) = self.profile_builder.as_mut() {
                builder.finish(start, node, result_size);
            }
        }

        result
    }
}
