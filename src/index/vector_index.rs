//! Flat and HNSW indexes for VECTOR fields.
//!
//! The flat index stores raw vectors and leaves scoring to the caller. The
//! HNSW index builds a multi-layer proximity graph for sub-linear approximate
//! nearest-neighbor search, with an optional allow-list restricting which
//! documents may appear in the result.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use rand::prelude::*;

use crate::document::DocumentAccessor;
use crate::index::DocId;
use crate::schema::{HnswParams, VectorParams};
use crate::vector::{vector_distance, DistanceMetric};

/// A typed vector index, flat or HNSW.
#[derive(Debug)]
pub enum VectorIndex {
    /// Brute-force storage.
    Flat(FlatVectorIndex),
    /// Hierarchical navigable small world graph.
    Hnsw(HnswVectorIndex),
}

impl VectorIndex {
    /// Build the index variant requested by the schema parameters.
    pub fn from_params(params: &VectorParams) -> Self {
        match &params.hnsw {
            Some(hnsw) => VectorIndex::Hnsw(HnswVectorIndex::new(
                params.dim,
                params.metric,
                hnsw.clone(),
            )),
            None => VectorIndex::Flat(FlatVectorIndex::new(params.dim, params.metric)),
        }
    }

    /// Vector dimension and distance metric.
    pub fn info(&self) -> (usize, DistanceMetric) {
        match self {
            VectorIndex::Flat(index) => (index.dim, index.metric),
            VectorIndex::Hnsw(index) => (index.dim, index.metric),
        }
    }

    /// Index a document's vector. Returns false when the stored value is not
    /// a vector or its dimension disagrees with the schema.
    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        match self {
            VectorIndex::Flat(index) => index.add(doc, access, field),
            VectorIndex::Hnsw(index) => index.add(doc, access, field),
        }
    }

    /// Remove a document's vector.
    pub fn remove(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) {
        match self {
            VectorIndex::Flat(index) => index.remove(doc, access, field),
            VectorIndex::Hnsw(index) => index.remove(doc, access, field),
        }
    }

    /// Sorted ids of documents with a vector in this field.
    pub fn all_docs(&self) -> &[DocId] {
        match self {
            VectorIndex::Flat(index) => &index.docs,
            VectorIndex::Hnsw(index) => &index.docs,
        }
    }
}

/// Brute-force vector storage.
///
/// Lookup only; distance computation and ranking happen in the KNN driver,
/// which iterates its pre-filter over [`FlatVectorIndex::get`].
#[derive(Debug)]
pub struct FlatVectorIndex {
    dim: usize,
    metric: DistanceMetric,
    vectors: AHashMap<DocId, Box<[f32]>>,
    docs: Vec<DocId>,
}

impl FlatVectorIndex {
    /// Create a new flat index.
    pub fn new(dim: usize, metric: DistanceMetric) -> Self {
        FlatVectorIndex {
            dim,
            metric,
            vectors: AHashMap::new(),
            docs: Vec::new(),
        }
    }

    fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        let Some(vector) = access.vector(field) else {
            return false;
        };
        if vector.is_empty() {
            return true;
        }
        if vector.len() != self.dim {
            return false;
        }

        self.vectors.insert(doc, vector.into_boxed_slice());
        if let Err(pos) = self.docs.binary_search(&doc) {
            self.docs.insert(pos, doc);
        }
        true
    }

    fn remove(&mut self, doc: DocId, _access: &dyn DocumentAccessor, _field: &str) {
        if self.vectors.remove(&doc).is_some() {
            if let Ok(pos) = self.docs.binary_search(&doc) {
                self.docs.remove(pos);
            }
        }
    }

    /// The stored vector for a document.
    pub fn get(&self, doc: DocId) -> Option<&[f32]> {
        self.vectors.get(&doc).map(|v| &**v)
    }
}

/// Priority queue entry for graph search, ordered by distance.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    distance: f32,
    node_id: usize,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

/// A node in the HNSW graph.
#[derive(Debug)]
struct HnswNode {
    doc: DocId,
    vector: Box<[f32]>,
    /// Connections per layer; index 0 is the base layer.
    links: Vec<Vec<usize>>,
}

impl HnswNode {
    fn max_layer(&self) -> usize {
        self.links.len() - 1
    }

    fn neighbors(&self, layer: usize) -> &[usize] {
        self.links.get(layer).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// When a pre-filter is this small relative to the search breadth, scanning it
/// directly beats navigating the graph around excluded nodes.
const FILTERED_SCAN_FACTOR: usize = 8;

/// An HNSW vector index.
///
/// Layer assignment uses a seeded RNG so index construction is reproducible.
/// Vectors are stored unnormalized; the distance metric is applied to raw
/// values on both the build and the query path.
#[derive(Debug)]
pub struct HnswVectorIndex {
    dim: usize,
    metric: DistanceMetric,
    params: HnswParams,
    nodes: Vec<Option<HnswNode>>,
    doc_to_node: AHashMap<DocId, usize>,
    entry_point: Option<usize>,
    top_layer: usize,
    /// Multiplier controlling the layer assignment distribution.
    ml: f64,
    rng: StdRng,
    docs: Vec<DocId>,
}

impl HnswVectorIndex {
    /// Create a new empty HNSW index.
    pub fn new(dim: usize, metric: DistanceMetric, params: HnswParams) -> Self {
        let ml = 1.0 / (params.m.max(2) as f64).ln();
        HnswVectorIndex {
            dim,
            metric,
            params,
            nodes: Vec::new(),
            doc_to_node: AHashMap::new(),
            entry_point: None,
            top_layer: 0,
            ml,
            rng: StdRng::seed_from_u64(0x5eed),
            docs: Vec::new(),
        }
    }

    /// The stored vector for a document.
    pub fn get(&self, doc: DocId) -> Option<&[f32]> {
        let node_id = *self.doc_to_node.get(&doc)?;
        self.nodes[node_id].as_ref().map(|node| &*node.vector)
    }

    fn select_layer(&mut self) -> usize {
        let uniform: f64 = self.rng.random();
        (-uniform.ln() * self.ml).floor() as usize
    }

    fn distance_to_node(&self, query: &[f32], node_id: usize) -> Option<f32> {
        self.nodes[node_id]
            .as_ref()
            .map(|node| vector_distance(query, &node.vector, self.metric))
    }

    /// Greedy beam search within one layer.
    ///
    /// Returns up to `ef` candidates sorted by ascending distance. With an
    /// `allowed` list the traversal still visits every reachable node but only
    /// allowed documents enter the result set.
    fn search_layer(
        &self,
        query: &[f32],
        entries: &[usize],
        ef: usize,
        layer: usize,
        allowed: Option<&[DocId]>,
    ) -> Vec<Candidate> {
        let mut visited: AHashSet<usize> = AHashSet::new();
        // Min-heap of nodes still to expand.
        let mut frontier: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
        // Max-heap of the best results so far; peek is the current worst.
        let mut results: BinaryHeap<Candidate> = BinaryHeap::new();

        let admits = |doc: DocId| match allowed {
            Some(list) => list.binary_search(&doc).is_ok(),
            None => true,
        };

        for &entry in entries {
            if !visited.insert(entry) {
                continue;
            }
            let Some(distance) = self.distance_to_node(query, entry) else {
                continue;
            };
            let candidate = Candidate {
                distance,
                node_id: entry,
            };
            frontier.push(Reverse(candidate));
            if admits(self.nodes[entry].as_ref().unwrap().doc) {
                results.push(candidate);
            }
        }

        while let Some(Reverse(current)) = frontier.pop() {
            if results.len() >= ef {
                if let Some(worst) = results.peek() {
                    if current.distance > worst.distance {
                        break;
                    }
                }
            }

            let Some(node) = self.nodes[current.node_id].as_ref() else {
                continue;
            };
            for &neighbor_id in node.neighbors(layer) {
                if !visited.insert(neighbor_id) {
                    continue;
                }
                let Some(neighbor) = self.nodes[neighbor_id].as_ref() else {
                    continue;
                };
                let distance = vector_distance(query, &neighbor.vector, self.metric);
                let candidate = Candidate {
                    distance,
                    node_id: neighbor_id,
                };

                let worst = results.peek().map(|c| c.distance);
                if results.len() < ef || worst.is_some_and(|w| distance < w) {
                    frontier.push(Reverse(candidate));
                    if admits(neighbor.doc) {
                        results.push(candidate);
                        if results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        let mut out = results.into_sorted_vec();
        out.dedup_by_key(|c| c.node_id);
        out
    }

    /// Drop the farthest connections of a node until it is within `cap`.
    fn prune_links(&mut self, node_id: usize, layer: usize, cap: usize) {
        let (vector, links) = {
            let Some(node) = self.nodes[node_id].as_ref() else {
                return;
            };
            if node.neighbors(layer).len() <= cap {
                return;
            }
            (node.vector.clone(), node.links[layer].clone())
        };

        let mut ranked: Vec<Candidate> = links
            .iter()
            .filter_map(|&neighbor_id| {
                self.distance_to_node(&vector, neighbor_id)
                    .map(|distance| Candidate {
                        distance,
                        node_id: neighbor_id,
                    })
            })
            .collect();
        ranked.sort_unstable();
        ranked.truncate(cap);

        if let Some(node) = self.nodes[node_id].as_mut() {
            node.links[layer] = ranked.into_iter().map(|c| c.node_id).collect();
        }
    }

    fn layer_cap(&self, layer: usize) -> usize {
        if layer == 0 {
            self.params.m
        } else {
            (self.params.m / 2).max(1)
        }
    }

    fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        let Some(vector) = access.vector(field) else {
            return false;
        };
        if vector.is_empty() {
            return true;
        }
        if vector.len() != self.dim {
            return false;
        }
        debug_assert!(!self.doc_to_node.contains_key(&doc));

        let node_layer = self.select_layer();
        let node_id = self.nodes.len();
        self.nodes.push(Some(HnswNode {
            doc,
            vector: vector.clone().into_boxed_slice(),
            links: vec![Vec::new(); node_layer + 1],
        }));
        self.doc_to_node.insert(doc, node_id);
        if let Err(pos) = self.docs.binary_search(&doc) {
            self.docs.insert(pos, doc);
        }

        let Some(entry) = self.entry_point else {
            self.entry_point = Some(node_id);
            self.top_layer = node_layer;
            return true;
        };

        // Greedy descent through the layers above the new node.
        let mut current = vec![entry];
        for layer in ((node_layer + 1)..=self.top_layer).rev() {
            let closest = self.search_layer(&vector, &current, 1, layer, None);
            if let Some(best) = closest.first() {
                current = vec![best.node_id];
            }
        }

        // Connect on every layer the new node participates in.
        for layer in (0..=node_layer.min(self.top_layer)).rev() {
            let candidates =
                self.search_layer(&vector, &current, self.params.ef_construction, layer, None);
            let cap = self.layer_cap(layer);
            let selected: Vec<usize> = candidates
                .iter()
                .filter(|c| c.node_id != node_id)
                .take(cap)
                .map(|c| c.node_id)
                .collect();

            for &neighbor_id in &selected {
                if let Some(node) = self.nodes[node_id].as_mut() {
                    node.links[layer].push(neighbor_id);
                }
                if let Some(neighbor) = self.nodes[neighbor_id].as_mut() {
                    if neighbor.links.len() > layer {
                        neighbor.links[layer].push(node_id);
                    }
                }
                self.prune_links(neighbor_id, layer, self.layer_cap(layer));
            }

            if !selected.is_empty() {
                current = selected;
            }
        }

        if node_layer > self.top_layer {
            self.entry_point = Some(node_id);
            self.top_layer = node_layer;
        }
        true
    }

    fn remove(&mut self, doc: DocId, _access: &dyn DocumentAccessor, _field: &str) {
        let Some(node_id) = self.doc_to_node.remove(&doc) else {
            return;
        };

        let links = match self.nodes[node_id].take() {
            Some(node) => node.links,
            None => Vec::new(),
        };
        for (layer, neighbors) in links.iter().enumerate() {
            for &neighbor_id in neighbors {
                if let Some(neighbor) = self.nodes[neighbor_id].as_mut() {
                    if let Some(layer_links) = neighbor.links.get_mut(layer) {
                        layer_links.retain(|&id| id != node_id);
                    }
                }
            }
        }

        if let Ok(pos) = self.docs.binary_search(&doc) {
            self.docs.remove(pos);
        }

        if self.entry_point == Some(node_id) {
            self.entry_point = None;
            self.top_layer = 0;
            for (id, node) in self.nodes.iter().enumerate() {
                if let Some(node) = node {
                    if self.entry_point.is_none() || node.max_layer() > self.top_layer {
                        self.entry_point = Some(id);
                        self.top_layer = node.max_layer();
                    }
                }
            }
        }
    }

    /// K nearest neighbors over the whole corpus.
    ///
    /// Results are sorted by ascending distance and truncated to `limit`.
    pub fn knn(&self, query: &[f32], limit: usize, ef_runtime: Option<usize>) -> Vec<(f32, DocId)> {
        self.knn_inner(query, limit, ef_runtime, None)
    }

    /// K nearest neighbors restricted to an allow-list of sorted doc ids.
    pub fn knn_filtered(
        &self,
        query: &[f32],
        limit: usize,
        ef_runtime: Option<usize>,
        allowed: &[DocId],
    ) -> Vec<(f32, DocId)> {
        let ef = ef_runtime.unwrap_or(self.params.ef_runtime).max(limit);
        if allowed.len() <= ef.saturating_mul(FILTERED_SCAN_FACTOR) {
            // Selective filter, score the allowed documents directly.
            let mut scored: Vec<(f32, DocId)> = allowed
                .iter()
                .filter_map(|&doc| {
                    self.get(doc)
                        .map(|vector| (vector_distance(query, vector, self.metric), doc))
                })
                .collect();
            scored.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
            scored.truncate(limit);
            return scored;
        }

        self.knn_inner(query, limit, ef_runtime, Some(allowed))
    }

    fn knn_inner(
        &self,
        query: &[f32],
        limit: usize,
        ef_runtime: Option<usize>,
        allowed: Option<&[DocId]>,
    ) -> Vec<(f32, DocId)> {
        let Some(entry) = self.entry_point else {
            return Vec::new();
        };
        let ef = ef_runtime.unwrap_or(self.params.ef_runtime).max(limit);

        let mut current = vec![entry];
        for layer in (1..=self.top_layer).rev() {
            let closest = self.search_layer(query, &current, 1, layer, None);
            if let Some(best) = closest.first() {
                current = vec![best.node_id];
            }
        }

        let candidates = self.search_layer(query, &current, ef, 0, allowed);
        let mut out: Vec<(f32, DocId)> = candidates
            .into_iter()
            .filter_map(|c| {
                self.nodes[c.node_id]
                    .as_ref()
                    .map(|node| (c.distance, node.doc))
            })
            .take(limit)
            .collect();
        out.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn doc(vector: Vec<f32>) -> Document {
        Document::builder().vector("emb", vector).build()
    }

    fn hnsw(dim: usize) -> HnswVectorIndex {
        HnswVectorIndex::new(dim, DistanceMetric::Euclidean, HnswParams::default())
    }

    #[test]
    fn test_flat_add_and_get() {
        let mut idx = FlatVectorIndex::new(3, DistanceMetric::Cosine);
        assert!(idx.add(1, &doc(vec![1.0, 0.0, 0.0]), "emb"));
        assert_eq!(idx.get(1), Some(&[1.0, 0.0, 0.0][..]));
        assert_eq!(idx.get(2), None);
        assert_eq!(idx.docs, vec![1]);
    }

    #[test]
    fn test_flat_rejects_wrong_dimension() {
        let mut idx = FlatVectorIndex::new(3, DistanceMetric::Cosine);
        assert!(!idx.add(1, &doc(vec![1.0, 0.0]), "emb"));
        assert!(idx.docs.is_empty());
    }

    #[test]
    fn test_flat_missing_field_is_not_an_error() {
        let mut idx = FlatVectorIndex::new(3, DistanceMetric::Cosine);
        assert!(idx.add(1, &Document::new(), "emb"));
        assert!(idx.docs.is_empty());
    }

    #[test]
    fn test_hnsw_knn_small() {
        let mut idx = hnsw(2);
        idx.add(1, &doc(vec![0.0, 0.0]), "emb");
        idx.add(2, &doc(vec![1.0, 0.0]), "emb");
        idx.add(3, &doc(vec![5.0, 5.0]), "emb");

        let result = idx.knn(&[0.1, 0.0], 2, None);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].1, 1);
        assert_eq!(result[1].1, 2);
        assert!(result[0].0 <= result[1].0);
    }

    #[test]
    fn test_hnsw_recall_on_grid() {
        let mut idx = hnsw(2);
        let mut id = 1;
        for x in 0..10 {
            for y in 0..10 {
                idx.add(id, &doc(vec![x as f32, y as f32]), "emb");
                id += 1;
            }
        }

        // The nearest neighbor of an on-grid query is the point itself.
        let result = idx.knn(&[4.0, 7.0], 1, Some(100));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].1, 4 * 10 + 7 + 1);
        assert!(result[0].0 < 1e-6);
    }

    #[test]
    fn test_hnsw_filtered_knn() {
        let mut idx = hnsw(2);
        idx.add(1, &doc(vec![0.0, 0.0]), "emb");
        idx.add(2, &doc(vec![1.0, 0.0]), "emb");
        idx.add(3, &doc(vec![2.0, 0.0]), "emb");
        idx.add(4, &doc(vec![3.0, 0.0]), "emb");

        let result = idx.knn_filtered(&[0.0, 0.0], 2, None, &[3, 4]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].1, 3);
        assert_eq!(result[1].1, 4);
    }

    #[test]
    fn test_hnsw_remove() {
        let mut idx = hnsw(2);
        idx.add(1, &doc(vec![0.0, 0.0]), "emb");
        idx.add(2, &doc(vec![1.0, 0.0]), "emb");

        idx.remove(1, &doc(vec![0.0, 0.0]), "emb");
        assert_eq!(idx.get(1), None);
        assert_eq!(idx.docs, vec![2]);

        let result = idx.knn(&[0.0, 0.0], 2, None);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].1, 2);
    }

    #[test]
    fn test_hnsw_empty() {
        let idx = hnsw(2);
        assert!(idx.knn(&[0.0, 0.0], 3, None).is_empty());
    }

    #[test]
    fn test_vector_index_from_params() {
        let flat = VectorIndex::from_params(&VectorParams::flat(4, DistanceMetric::Cosine));
        assert!(matches!(flat, VectorIndex::Flat(_)));
        assert_eq!(flat.info(), (4, DistanceMetric::Cosine));

        let graph = VectorIndex::from_params(&VectorParams::hnsw(8, DistanceMetric::Euclidean));
        assert!(matches!(graph, VectorIndex::Hnsw(_)));
        assert_eq!(graph.info(), (8, DistanceMetric::Euclidean));
    }
}
