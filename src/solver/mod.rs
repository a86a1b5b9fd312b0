//! # Solver Seam
//!
//! This is THE contract between the embedding pipeline and any local
//! minimizer. The pipeline never sees solver internals — it hands an
//! objective and an initial guess to [`Solver::minimize`] and gets back a
//! [`Minimum`] with an explicit `converged` flag.
//!
//! ## Implementations
//!
//! | Solver | Module | Description |
//! |--------|--------|-------------|
//! | `Lbfgs` | `lbfgs` | Limited-memory BFGS, numerical gradients (default) |
//! | `NelderMead` | `nelder_mead` | Derivative-free simplex fallback |

pub mod lbfgs;
pub mod nelder_mead;

pub use lbfgs::Lbfgs;
pub use nelder_mead::NelderMead;

use serde::{Deserialize, Serialize};

use crate::Result;

// ============================================================================
// Solver configuration
// ============================================================================

/// Shared stopping criteria and budgets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Hard iteration budget. Exhausting it yields `converged = false`,
    /// never a hang.
    pub max_iterations: usize,
    /// Stop when the gradient infinity-norm drops below this (gradient-based
    /// solvers only).
    pub gradient_tolerance: f64,
    /// Stop when the relative objective decrease drops below this.
    pub value_tolerance: f64,
    /// History length for limited-memory quasi-Newton updates.
    pub memory: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            gradient_tolerance: 1e-6,
            value_tolerance: 1e-12,
            memory: 10,
        }
    }
}

// ============================================================================
// Box constraints
// ============================================================================

/// Per-coordinate box constraints, honored by projection.
///
/// Unused by the embedding pipeline's defaults, but part of the solver
/// contract so constrained variants can be swapped in without touching the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    limits: Vec<(f64, f64)>,
}

impl Bounds {
    /// One `(lo, hi)` pair per coordinate. `lo > hi` anywhere is a caller
    /// bug and panics.
    pub fn new(limits: Vec<(f64, f64)>) -> Self {
        assert!(
            limits.iter().all(|&(lo, hi)| lo <= hi),
            "each bound must satisfy lo <= hi"
        );
        Self { limits }
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    /// Project a point into the box, coordinate-wise.
    pub fn project(&self, x: &mut [f64]) {
        for (xi, &(lo, hi)) in x.iter_mut().zip(&self.limits) {
            *xi = xi.clamp(lo, hi);
        }
    }
}

// ============================================================================
// Minimization result
// ============================================================================

/// Outcome of a minimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Minimum {
    /// Best point found (flattened coordinate vector).
    pub point: Vec<f64>,
    /// Objective value at `point`.
    pub value: f64,
    /// Iterations consumed.
    pub iterations: usize,
    /// Whether a stopping tolerance was satisfied within budget. `false`
    /// means the budget ran out — the caller decides whether to retry or
    /// fail.
    pub converged: bool,
}

// ============================================================================
// Solver trait
// ============================================================================

/// The universal local-minimizer contract.
///
/// Implementations must honor their iteration budget and report budget
/// exhaustion as `Ok` with `converged = false`; `Err` is reserved for
/// contract violations (empty initial guess, non-finite objective at the
/// start). Gradients, if needed, are the implementation's problem — the
/// objective is a plain black-box function.
pub trait Solver: Send + Sync {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        initial: &[f64],
        bounds: Option<&Bounds>,
    ) -> Result<Minimum>;
}

// ============================================================================
// Shared numerics
// ============================================================================

/// Central-difference gradient estimate.
///
/// Step size scales with the coordinate magnitude: `h = ∛ε · max(1, |xᵢ|)`,
/// the usual optimum for central differences on a twice-differentiable
/// objective.
pub(crate) fn numerical_gradient(
    objective: &dyn Fn(&[f64]) -> f64,
    x: &[f64],
) -> nalgebra::DVector<f64> {
    let h_base = f64::EPSILON.cbrt();
    let mut work = x.to_vec();
    let mut grad = nalgebra::DVector::zeros(x.len());
    for i in 0..x.len() {
        let h = h_base * x[i].abs().max(1.0);
        work[i] = x[i] + h;
        let f_plus = objective(&work);
        work[i] = x[i] - h;
        let f_minus = objective(&work);
        work[i] = x[i];
        grad[i] = (f_plus - f_minus) / (2.0 * h);
    }
    grad
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numerical_gradient_quadratic() {
        // f(x, y) = x² + 3y² → ∇f = (2x, 6y)
        let f = |x: &[f64]| x[0] * x[0] + 3.0 * x[1] * x[1];
        let g = numerical_gradient(&f, &[1.0, -2.0]);
        assert!((g[0] - 2.0).abs() < 1e-6);
        assert!((g[1] + 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_project() {
        let bounds = Bounds::new(vec![(0.0, 1.0), (-1.0, 1.0)]);
        let mut x = [2.0, -3.0];
        bounds.project(&mut x);
        assert_eq!(x, [1.0, -1.0]);
    }

    #[test]
    #[should_panic]
    fn test_bounds_reject_inverted() {
        Bounds::new(vec![(1.0, 0.0)]);
    }
}
