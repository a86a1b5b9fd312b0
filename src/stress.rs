//! # Stress Objective
//!
//! Sum of squared residuals between modeled pairwise Euclidean distances
//! and the target dissimilarity matrix. Pure functions — no mutation,
//! deterministic given identical floating-point inputs.

use crate::model::{DissimilarityMatrix, Point3};

/// Stress of a candidate configuration against the target matrix.
///
/// Accumulates `(‖cᵢ − cⱼ‖ − D[i][j])²` over every pair `i < j`. When
/// `active` is given, only pairs with both endpoints in the set
/// participate — used for restricted solves over a subset of the matrix.
///
/// # Panics
/// Panics if `coords.len() != target.len()` or an active index is out of
/// range.
pub fn stress(coords: &[Point3], target: &DissimilarityMatrix, active: Option<&[usize]>) -> f64 {
    assert_eq!(
        coords.len(),
        target.len(),
        "coordinate count must match matrix dimension"
    );
    match active {
        None => {
            let mut sum = 0.0;
            for i in 0..coords.len() {
                for j in (i + 1)..coords.len() {
                    let residual = coords[i].distance(&coords[j]) - target.get(i, j);
                    sum += residual * residual;
                }
            }
            sum
        }
        Some(indices) => {
            let mut sum = 0.0;
            for (a, &i) in indices.iter().enumerate() {
                for &j in &indices[(a + 1)..] {
                    let residual = coords[i].distance(&coords[j]) - target.get(i, j);
                    sum += residual * residual;
                }
            }
            sum
        }
    }
}

/// Single-point stress: one free candidate against fixed anchors.
///
/// `anchors` holds (reference position, observed distance) pairs — only
/// observed pairs, never imputed fills, so a missing observation simply
/// contributes nothing instead of pulling the candidate toward an anchor.
pub fn single_point_stress(candidate: Point3, anchors: &[(Point3, f64)]) -> f64 {
    anchors
        .iter()
        .map(|(anchor, target)| {
            let residual = candidate.distance(anchor) - target;
            residual * residual
        })
        .sum()
}

/// View a flattened coordinate vector as points.
///
/// # Panics
/// Panics if the length is not a multiple of 3.
pub(crate) fn points_from_flat(flat: &[f64]) -> Vec<Point3> {
    assert_eq!(flat.len() % 3, 0, "flat vector length must be 3×N");
    flat.chunks_exact(3).map(Point3::from_slice).collect()
}
