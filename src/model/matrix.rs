//! Node index and the dense dissimilarity matrix.

use hashbrown::HashMap;
use nalgebra::DMatrix;

/// Deterministic name → dense-index mapping.
///
/// Covers every name appearing as either endpoint of an observation,
/// ordered lexicographically so a rebuild from the same observation set
/// always assigns the same indices.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeIndex {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl NodeIndex {
    /// Build an index from a set of names. Duplicates collapse; order of the
    /// input does not matter.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self { names, index }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Name at the given index.
    ///
    /// # Panics
    /// Panics if `i >= len()`.
    pub fn name(&self, i: usize) -> &str {
        &self.names[i]
    }

    /// All names in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Dense symmetric N×N matrix of target pairwise distances.
///
/// Invariants, enforced by the builder: zero diagonal, `get(i, j) ==
/// get(j, i)`, every entry finite and ≥ 0. No NaN or infinity survives
/// construction — missing pairs are imputed per the configured policy
/// before this type exists.
#[derive(Debug, Clone, PartialEq)]
pub struct DissimilarityMatrix {
    inner: DMatrix<f64>,
}

impl DissimilarityMatrix {
    /// Wrap a fully-imputed dense matrix. Builder-only: callers go through
    /// [`crate::MatrixBuilder`], which validates the invariants.
    pub(crate) fn from_dense(inner: DMatrix<f64>) -> Self {
        debug_assert_eq!(inner.nrows(), inner.ncols());
        Self { inner }
    }

    /// Number of nodes (matrix is N×N).
    pub fn len(&self) -> usize {
        self.inner.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nrows() == 0
    }

    /// Target distance between nodes `i` and `j`.
    ///
    /// # Panics
    /// Panics if an index is out of range.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.inner[(i, j)]
    }

    /// Largest off-diagonal entry, or 0.0 for matrices smaller than 2×2.
    pub fn max_distance(&self) -> f64 {
        let n = self.len();
        let mut max = 0.0f64;
        for i in 0..n {
            for j in (i + 1)..n {
                max = max.max(self.inner[(i, j)]);
            }
        }
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_sorted_and_deduped() {
        let idx = NodeIndex::from_names(["vega", "altair", "vega", "deneb"]);
        assert_eq!(idx.names(), &["altair", "deneb", "vega"]);
        assert_eq!(idx.get("deneb"), Some(1));
        assert_eq!(idx.get("sirius"), None);
        assert_eq!(idx.name(2), "vega");
    }

    #[test]
    fn test_index_order_independent_of_input_order() {
        let a = NodeIndex::from_names(["b", "a", "c"]);
        let b = NodeIndex::from_names(["c", "b", "a"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_max_distance() {
        let m = DissimilarityMatrix::from_dense(DMatrix::from_row_slice(
            3,
            3,
            &[0.0, 1.0, 4.0, 1.0, 0.0, 2.0, 4.0, 2.0, 0.0],
        ));
        assert_eq!(m.max_distance(), 4.0);
    }
}
