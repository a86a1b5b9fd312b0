//! # Embedding Data Model
//!
//! Clean DTOs that define the distance-embedding domain. These types cross
//! every boundary: builder ↔ solver ↔ orchestrator ↔ user.
//!
//! Design rule: NO solver types, NO rayon types here.
//! This module is pure data — no I/O, no state, no optimization logic.

pub mod point;
pub mod observation;
pub mod matrix;
pub mod result;

pub use point::Point3;
pub use observation::Observation;
pub use matrix::{NodeIndex, DissimilarityMatrix};
pub use result::{EmbeddedNode, PlacementFailure, EmbeddingResult};
