//! # spacemap — 3D coordinates from sparse pairwise distances
//!
//! Recovers a 3D position for every named node in a distance graph, given
//! only pairwise distance observations — some missing, some one-sided.
//!
//! ## Design Principles
//!
//! 1. **Model is pure data**: `Observation`, `Point3`, `DissimilarityMatrix`
//!    cross all boundaries and carry no I/O or solver state
//! 2. **Solver is a seam**: `Solver` is the contract between the embedding
//!    pipeline and any local minimizer
//! 3. **No ambient state**: the pipeline takes observations as input and
//!    returns a coordinate table — it never reads files or globals
//! 4. **Deterministic by default**: fixed seed clouds, centroid initial
//!    guesses, seeded retries — identical inputs give identical outputs
//!
//! ## Quick Start
//!
//! ```rust
//! use spacemap::{Embedder, Observation};
//!
//! # fn example() -> spacemap::Result<()> {
//! let observations = vec![
//!     Observation::new("alpha", "beta", 1.0),
//!     Observation::new("alpha", "gamma", 1.0),
//!     Observation::new("alpha", "delta", 1.0),
//!     Observation::new("beta", "gamma", 1.0),
//!     Observation::new("beta", "delta", 1.0),
//!     Observation::new("gamma", "delta", 1.0),
//!     Observation::new("outpost", "alpha", 0.6124),
//! ];
//!
//! let embedder = Embedder::lbfgs();
//! let result = embedder.embed(&observations, &["alpha", "beta", "gamma", "delta"])?;
//!
//! println!("{}", result.to_table());
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline Phases
//!
//! | Phase | Input | Output |
//! |-------|-------|--------|
//! | BuildMatrix | control-point observations | symmetric K×K matrix |
//! | SolveControlFrame | matrix + fixed seed cloud | control coordinates |
//! | SolveRemainingNodes | per-node control distances | coordinate table |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod builder;
pub mod stress;
pub mod solver;
pub mod orchestrator;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Point3, Observation, NodeIndex, DissimilarityMatrix,
    EmbeddedNode, PlacementFailure, EmbeddingResult,
};

// ============================================================================
// Re-exports: Builder
// ============================================================================

pub use builder::{MatrixBuilder, MergePolicy, MissingPolicy};

// ============================================================================
// Re-exports: Solver
// ============================================================================

pub use solver::{Solver, SolverConfig, Minimum, Bounds, Lbfgs, NelderMead};

// ============================================================================
// Re-exports: Orchestration
// ============================================================================

pub use orchestrator::{EmbedOptions, RetryPolicy, Phase};

// ============================================================================
// Top-level Embedder handle
// ============================================================================

/// The primary entry point. An `Embedder` wraps a solver and drives the
/// three-phase embedding pipeline.
pub struct Embedder<S: Solver> {
    solver: S,
    options: EmbedOptions,
}

impl Embedder<Lbfgs> {
    /// Create an embedder with the default L-BFGS solver.
    pub fn lbfgs() -> Self {
        Self::with_solver(Lbfgs::default())
    }
}

impl<S: Solver> Embedder<S> {
    /// Create an embedder with the given solver.
    pub fn with_solver(solver: S) -> Self {
        Self {
            solver,
            options: EmbedOptions::default(),
        }
    }

    /// Replace the embedding options.
    pub fn with_options(mut self, options: EmbedOptions) -> Self {
        self.options = options;
        self
    }

    /// Embed every node relative to a solved control-point frame.
    ///
    /// Phase 1 builds the control-point dissimilarity matrix, phase 2 solves
    /// the control frame jointly, phase 3 places every remaining node that
    /// has at least one recorded distance to a control point. Per-node
    /// failures land in [`EmbeddingResult::failures`]; only phase 1–2 errors
    /// abort the pipeline.
    pub fn embed(&self, observations: &[Observation], control: &[&str]) -> Result<EmbeddingResult> {
        orchestrator::run(&self.solver, observations, control, &self.options)
    }

    /// Embed the whole graph in one joint solve (MDS-style layout).
    ///
    /// Builds the full N×N matrix — unobserved pairs imputed per the
    /// configured [`MissingPolicy`] — and solves all 3N coordinates at once.
    /// No control frame, no per-node phase.
    pub fn embed_global(&self, observations: &[Observation]) -> Result<EmbeddingResult> {
        orchestrator::run_global(&self.solver, observations, &self.options)
    }

    /// Access the underlying solver (for advanced use).
    pub fn solver(&self) -> &S {
        &self.solver
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or insufficient observations. Fatal — no partial result.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The control-frame solve failed to converge. Fatal — without a
    /// reference frame no node can be placed.
    #[error("Optimization failed: {0}")]
    Optimization(String),

    /// Solver contract violation (empty guess, non-finite objective).
    #[error("Solver error: {0}")]
    Solver(String),
}

pub type Result<T> = std::result::Result<T, Error>;
