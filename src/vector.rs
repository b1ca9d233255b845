//! Distance metrics for dense vector similarity.
//!
//! This module provides the distance computations shared by the flat and HNSW
//! vector indexes.

use serde::{Deserialize, Serialize};

use crate::error::{FalxError, Result};

/// Distance metrics for vector similarity calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DistanceMetric {
    /// Cosine distance (1 - cosine similarity)
    #[default]
    Cosine,
    /// Euclidean (L2) distance
    Euclidean,
    /// Dot product similarity, negated so that smaller is closer
    DotProduct,
}

impl DistanceMetric {
    /// Get the name of this distance metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::DotProduct => "dot_product",
        }
    }

    /// Parse a distance metric from a string.
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "dot_product" | "dot" | "ip" => Ok(DistanceMetric::DotProduct),
            _ => Err(FalxError::invalid_operation(format!(
                "Unknown distance metric: {s}"
            ))),
        }
    }
}

/// Calculate the distance between two vectors of equal length.
///
/// Both slices must have the same length; the caller is expected to have
/// validated dimensions beforehand.
pub fn vector_distance(a: &[f32], b: &[f32], metric: DistanceMetric) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    match metric {
        DistanceMetric::Cosine => {
            let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
            let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

            if norm_a == 0.0 || norm_b == 0.0 {
                1.0 // maximum distance for zero vectors
            } else {
                1.0 - (dot / (norm_a * norm_b))
            }
        }
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f32>()
            .sqrt(),
        DistanceMetric::DotProduct => -a.iter().zip(b.iter()).map(|(x, y)| x * y).sum::<f32>(),
    }
}
