//! Embedding output: the node → coordinate table.

use serde::{Deserialize, Serialize};

use super::Point3;

/// One embedded node: name plus solved position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedNode {
    pub node: String,
    pub position: Point3,
}

/// A node whose placement solve did not converge. Recovered locally — the
/// node is omitted from the table — but always reported, never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementFailure {
    pub node: String,
    pub reason: String,
}

/// The embedding output table.
///
/// `nodes` holds one row per node that had at least one usable distance,
/// in deterministic node-index order (not solve-completion order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    pub nodes: Vec<EmbeddedNode>,
    pub failures: Vec<PlacementFailure>,
}

impl EmbeddingResult {
    /// Position of a node by name, if it was embedded.
    pub fn position_of(&self, name: &str) -> Option<Point3> {
        self.nodes
            .iter()
            .find(|n| n.node == name)
            .map(|n| n.position)
    }

    /// Render the `node, x, y, z` table with fixed 2-decimal precision.
    pub fn to_table(&self) -> String {
        let mut out = String::from("node, x, y, z\n");
        for row in &self.nodes {
            let p = row.position;
            out.push_str(&format!(
                "{}, {:.2}, {:.2}, {:.2}\n",
                row.node, p.x, p.y, p.z
            ));
        }
        out
    }
}
