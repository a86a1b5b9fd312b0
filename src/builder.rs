//! # Dissimilarity Matrix Builder
//!
//! Turns sparse, possibly one-sided pairwise observations into a dense
//! symmetric matrix with an explicit policy for missing entries.
//!
//! The missing-entry policy matters: filling unobserved pairs with 0 pulls
//! unrelated nodes toward the same point during a joint solve. The fill is
//! therefore a selectable [`MissingPolicy`], never an implicit default —
//! [`MissingPolicy::TwiceMaxFinite`] keeps unobserved pairs "far" instead
//! of "coincident".

use hashbrown::HashMap;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::model::{DissimilarityMatrix, NodeIndex, Observation};
use crate::{Error, Result};

// ============================================================================
// Policies
// ============================================================================

/// How duplicate observations of one unordered pair combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Keep the larger of the observed values (default — conservative for
    /// asymmetric measurements).
    #[default]
    Max,
    /// Keep whichever observation appears last in the input.
    LastSeen,
}

/// Fill for unordered pairs with no observation in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingPolicy {
    /// Fill with 0. Legacy behavior for inputs where unobserved pairs are
    /// never fitted directly; collapses unrelated nodes in a joint solve.
    Zero,
    /// Fill with `2 × max(observed distance)` so unobserved pairs stay far
    /// apart (default). Falls back to 2.0 when nothing finite was observed.
    #[default]
    TwiceMaxFinite,
    /// Reject inputs with any unobserved pair.
    Fail,
}

// ============================================================================
// Builder
// ============================================================================

/// Builds a [`DissimilarityMatrix`] plus its [`NodeIndex`] from raw
/// observations.
#[derive(Debug, Clone, Default)]
pub struct MatrixBuilder {
    merge: MergePolicy,
    missing: MissingPolicy,
}

impl MatrixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(mut self, policy: MergePolicy) -> Self {
        self.merge = policy;
        self
    }

    pub fn missing(mut self, policy: MissingPolicy) -> Self {
        self.missing = policy;
        self
    }

    /// Build the dense symmetric matrix.
    ///
    /// Errors with [`Error::InvalidInput`] when fewer than 2 distinct nodes
    /// appear, any distance is negative or non-finite, or a self-observation
    /// carries a nonzero distance. Every entry of the returned matrix is
    /// finite: observed pairs hold the merged value symmetrically, missing
    /// pairs hold the configured fill.
    pub fn build(&self, observations: &[Observation]) -> Result<(NodeIndex, DissimilarityMatrix)> {
        validate_observations(observations)?;

        let index = NodeIndex::from_names(
            observations
                .iter()
                .flat_map(|o| [o.from.as_str(), o.to.as_str()]),
        );
        let n = index.len();
        if n < 2 {
            return Err(Error::InvalidInput(format!(
                "need at least 2 distinct nodes, got {n}"
            )));
        }

        // Merge observations per unordered pair, then mirror.
        let mut observed: HashMap<(usize, usize), f64> = HashMap::new();
        for obs in observations {
            let i = index.get(&obs.from).expect("endpoint indexed");
            let j = index.get(&obs.to).expect("endpoint indexed");
            if i == j {
                continue;
            }
            let key = (i.min(j), i.max(j));
            match self.merge {
                MergePolicy::Max => {
                    let entry = observed.entry(key).or_insert(obs.distance);
                    *entry = entry.max(obs.distance);
                }
                MergePolicy::LastSeen => {
                    observed.insert(key, obs.distance);
                }
            }
        }

        let max_finite = observed
            .values()
            .fold(0.0f64, |acc, &d| acc.max(d));
        let fill = match self.missing {
            MissingPolicy::Zero => 0.0,
            // No finite observation at all: fall back to 2 × 1.0.
            MissingPolicy::TwiceMaxFinite => {
                if max_finite > 0.0 {
                    2.0 * max_finite
                } else {
                    2.0
                }
            }
            MissingPolicy::Fail => f64::NAN,
        };

        let mut matrix = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                let value = match observed.get(&(i, j)) {
                    Some(&d) => d,
                    None if self.missing == MissingPolicy::Fail => {
                        return Err(Error::InvalidInput(format!(
                            "no observed distance between '{}' and '{}'",
                            index.name(i),
                            index.name(j)
                        )));
                    }
                    None => fill,
                };
                matrix[(i, j)] = value;
                matrix[(j, i)] = value;
            }
        }

        tracing::debug!(
            nodes = n,
            observed_pairs = observed.len(),
            merge = ?self.merge,
            missing = ?self.missing,
            "built dissimilarity matrix"
        );
        Ok((index, DissimilarityMatrix::from_dense(matrix)))
    }
}

/// Reject negative, non-finite, and nonzero self distances.
pub(crate) fn validate_observations(observations: &[Observation]) -> Result<()> {
    for obs in observations {
        if !obs.distance.is_finite() {
            return Err(Error::InvalidInput(format!(
                "non-finite distance {} between '{}' and '{}'",
                obs.distance, obs.from, obs.to
            )));
        }
        if obs.distance < 0.0 {
            return Err(Error::InvalidInput(format!(
                "negative distance {} between '{}' and '{}'",
                obs.distance, obs.from, obs.to
            )));
        }
        if obs.from == obs.to && obs.distance != 0.0 {
            return Err(Error::InvalidInput(format!(
                "self-distance {} for '{}' (must be 0)",
                obs.distance, obs.from
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn obs(from: &str, to: &str, d: f64) -> Observation {
        Observation::new(from, to, d)
    }

    #[test]
    fn test_symmetric_storage() {
        let (index, matrix) = MatrixBuilder::new()
            .build(&[obs("a", "b", 3.0), obs("b", "c", 4.0)])
            .unwrap();
        let (a, b, c) = (
            index.get("a").unwrap(),
            index.get("b").unwrap(),
            index.get("c").unwrap(),
        );
        assert_eq!(matrix.get(a, b), 3.0);
        assert_eq!(matrix.get(b, a), 3.0);
        assert_eq!(matrix.get(b, c), 4.0);
        assert_eq!(matrix.get(c, b), 4.0);
    }

    #[test]
    fn test_merge_max_takes_larger_direction() {
        let (index, matrix) = MatrixBuilder::new()
            .build(&[obs("a", "b", 3.0), obs("b", "a", 5.0), obs("a", "c", 1.0)])
            .unwrap();
        let (a, b) = (index.get("a").unwrap(), index.get("b").unwrap());
        assert_eq!(matrix.get(a, b), 5.0);
    }

    #[test]
    fn test_merge_last_seen() {
        let (index, matrix) = MatrixBuilder::new()
            .merge(MergePolicy::LastSeen)
            .build(&[obs("a", "b", 3.0), obs("b", "a", 5.0), obs("a", "b", 2.0), obs("a", "c", 1.0)])
            .unwrap();
        let (a, b) = (index.get("a").unwrap(), index.get("b").unwrap());
        assert_eq!(matrix.get(a, b), 2.0);
    }

    #[test]
    fn test_missing_fill_twice_max() {
        // a-b observed at 5, a-c observed at 2; b-c missing.
        let (index, matrix) = MatrixBuilder::new()
            .missing(MissingPolicy::TwiceMaxFinite)
            .build(&[obs("a", "b", 5.0), obs("a", "c", 2.0)])
            .unwrap();
        let (b, c) = (index.get("b").unwrap(), index.get("c").unwrap());
        assert_eq!(matrix.get(b, c), 10.0);
    }

    #[test]
    fn test_missing_fill_zero() {
        let (index, matrix) = MatrixBuilder::new()
            .missing(MissingPolicy::Zero)
            .build(&[obs("a", "b", 5.0), obs("a", "c", 2.0)])
            .unwrap();
        let (b, c) = (index.get("b").unwrap(), index.get("c").unwrap());
        assert_eq!(matrix.get(b, c), 0.0);
    }

    #[test]
    fn test_missing_fail_policy() {
        let err = MatrixBuilder::new()
            .missing(MissingPolicy::Fail)
            .build(&[obs("a", "b", 5.0), obs("a", "c", 2.0)])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_diagonal_is_zero() {
        let (index, matrix) = MatrixBuilder::new()
            .build(&[obs("a", "b", 5.0), obs("a", "a", 0.0)])
            .unwrap();
        for i in 0..index.len() {
            assert_eq!(matrix.get(i, i), 0.0);
        }
    }

    #[test]
    fn test_rejects_negative_distance() {
        let err = MatrixBuilder::new().build(&[obs("a", "b", -1.0)]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_non_finite_distance() {
        for bad in [f64::NAN, f64::INFINITY] {
            let err = MatrixBuilder::new().build(&[obs("a", "b", bad)]).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
        }
    }

    #[test]
    fn test_rejects_nonzero_self_distance() {
        let err = MatrixBuilder::new().build(&[obs("a", "a", 1.0), obs("a", "b", 1.0)]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_fewer_than_two_nodes() {
        let err = MatrixBuilder::new().build(&[obs("a", "a", 0.0)]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = MatrixBuilder::new().build(&[]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    proptest! {
        // Every entry of a built matrix is finite, whatever subset of pairs
        // was observed.
        #[test]
        fn prop_no_nan_survives(
            distances in proptest::collection::vec(0.0f64..1e6, 1..12),
            policy_zero in proptest::bool::ANY,
        ) {
            let names = ["a", "b", "c", "d", "e"];
            let observations: Vec<Observation> = distances
                .iter()
                .enumerate()
                .map(|(k, &d)| {
                    let i = k % names.len();
                    let j = (k / names.len() + i + 1) % names.len();
                    Observation::new(names[i], names[j], d)
                })
                .filter(|o| o.from != o.to)
                .collect();
            prop_assume!(!observations.is_empty());

            let policy = if policy_zero { MissingPolicy::Zero } else { MissingPolicy::TwiceMaxFinite };
            let (index, matrix) = MatrixBuilder::new().missing(policy).build(&observations).unwrap();
            for i in 0..index.len() {
                for j in 0..index.len() {
                    prop_assert!(matrix.get(i, j).is_finite());
                    prop_assert!(matrix.get(i, j) >= 0.0);
                    prop_assert_eq!(matrix.get(i, j), matrix.get(j, i));
                }
            }
        }
    }
}
