//! A single pairwise distance observation.

use serde::{Deserialize, Serialize};

/// An ordered pairwise distance observation between two named nodes.
///
/// Source data may supply only one direction; the builder enforces symmetry
/// when it assembles the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub from: String,
    pub to: String,
    pub distance: f64,
}

impl Observation {
    pub fn new(from: impl Into<String>, to: impl Into<String>, distance: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            distance,
        }
    }

    /// Flatten an adjacency map (node → neighbor → distance) into an
    /// observation list.
    ///
    /// This is the shape external loaders supply: one entry per node, each
    /// holding that node's observed neighbor distances. Output is sorted by
    /// (from, to) so downstream builds are independent of map iteration
    /// order.
    pub fn from_adjacency<I, J, S, T>(map: I) -> Vec<Observation>
    where
        I: IntoIterator<Item = (S, J)>,
        J: IntoIterator<Item = (T, f64)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut observations: Vec<Observation> = map
            .into_iter()
            .flat_map(|(from, neighbors)| {
                let from = from.into();
                neighbors
                    .into_iter()
                    .map(move |(to, distance)| Observation::new(from.clone(), to.into(), distance))
                    .collect::<Vec<_>>()
            })
            .collect();
        observations.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        observations
    }
}
