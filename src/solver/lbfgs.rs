//! Limited-memory BFGS with numerical gradients.
//!
//! Two-loop recursion over a bounded (s, y) history, Armijo backtracking
//! line search, optional box constraints via projection. Gradients come
//! from central differences — the objective stays a black box.

use std::collections::VecDeque;

use nalgebra::DVector;

use super::{numerical_gradient, Bounds, Minimum, Solver, SolverConfig};
use crate::{Error, Result};

/// History entry: step `s`, gradient change `y`, and `1 / sᵀy`.
type Correction = (DVector<f64>, DVector<f64>, f64);

/// Quasi-Newton local minimizer (default solver).
#[derive(Debug, Clone, Default)]
pub struct Lbfgs {
    config: SolverConfig,
}

impl Lbfgs {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

impl Solver for Lbfgs {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        initial: &[f64],
        bounds: Option<&Bounds>,
    ) -> Result<Minimum> {
        if initial.is_empty() {
            return Err(Error::Solver("empty initial guess".into()));
        }
        if let Some(b) = bounds {
            if b.len() != initial.len() {
                return Err(Error::Solver(format!(
                    "bounds dimension {} does not match guess dimension {}",
                    b.len(),
                    initial.len()
                )));
            }
        }

        let cfg = &self.config;
        let mut x = DVector::from_column_slice(initial);
        if let Some(b) = bounds {
            b.project(x.as_mut_slice());
        }
        let mut fx = objective(x.as_slice());
        if !fx.is_finite() {
            return Err(Error::Solver(format!(
                "objective is {fx} at the initial guess"
            )));
        }
        let mut grad = numerical_gradient(objective, x.as_slice());

        let mut history: VecDeque<Correction> = VecDeque::with_capacity(cfg.memory);
        let mut converged = false;
        let mut iterations = 0;

        while iterations < cfg.max_iterations {
            if grad.amax() <= cfg.gradient_tolerance {
                converged = true;
                break;
            }

            let mut direction = two_loop_direction(&grad, &history);
            if direction.dot(&grad) >= 0.0 {
                // Curvature history went stale; restart from steepest descent.
                history.clear();
                direction = -&grad;
            }

            let Some((x_next, f_next)) = line_search(objective, &x, fx, &grad, &direction, bounds)
            else {
                // No acceptable step even along the descent direction — the
                // objective is flat to numerical precision here.
                converged = grad.amax() <= cfg.gradient_tolerance;
                break;
            };
            iterations += 1;

            let grad_next = numerical_gradient(objective, x_next.as_slice());
            let s = &x_next - &x;
            let y = &grad_next - &grad;
            let sy = s.dot(&y);
            if sy > 1e-10 * s.norm() * y.norm() {
                if history.len() == cfg.memory {
                    history.pop_front();
                }
                history.push_back((s, y, 1.0 / sy));
            }

            let decrease = fx - f_next;
            let scale = fx.abs().max(f_next.abs()).max(1.0);
            x = x_next;
            fx = f_next;
            grad = grad_next;

            if decrease <= cfg.value_tolerance * scale {
                converged = true;
                break;
            }
        }

        tracing::debug!(
            dims = initial.len(),
            iterations,
            converged,
            value = fx,
            "lbfgs finished"
        );
        Ok(Minimum {
            point: x.as_slice().to_vec(),
            value: fx,
            iterations,
            converged,
        })
    }
}

/// L-BFGS two-loop recursion: apply the implicit inverse-Hessian estimate
/// to the gradient and negate, yielding a search direction.
fn two_loop_direction(grad: &DVector<f64>, history: &VecDeque<Correction>) -> DVector<f64> {
    let mut q = grad.clone();
    let mut alphas = Vec::with_capacity(history.len());
    for (s, y, rho) in history.iter().rev() {
        let alpha = rho * s.dot(&q);
        q.axpy(-alpha, y, 1.0);
        alphas.push(alpha);
    }

    // Scale by the most recent curvature estimate.
    let gamma = history
        .back()
        .map(|(s, y, _)| s.dot(y) / y.dot(y))
        .unwrap_or(1.0);
    q *= gamma;

    for ((s, y, rho), &alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = rho * y.dot(&q);
        q.axpy(alpha - beta, s, 1.0);
    }
    -q
}

/// Backtracking line search with the Armijo sufficient-decrease condition.
/// Candidate points are projected into the bounds before evaluation.
fn line_search(
    objective: &dyn Fn(&[f64]) -> f64,
    x: &DVector<f64>,
    fx: f64,
    grad: &DVector<f64>,
    direction: &DVector<f64>,
    bounds: Option<&Bounds>,
) -> Option<(DVector<f64>, f64)> {
    const C1: f64 = 1e-4;
    const BACKTRACK: f64 = 0.5;
    const MAX_HALVINGS: usize = 60;

    let slope = grad.dot(direction);
    let mut t = 1.0;
    for _ in 0..MAX_HALVINGS {
        let mut candidate = x + direction * t;
        if let Some(b) = bounds {
            b.project(candidate.as_mut_slice());
        }
        let f_candidate = objective(candidate.as_slice());
        if f_candidate.is_finite() && f_candidate <= fx + C1 * t * slope {
            return Some((candidate, f_candidate));
        }
        t *= BACKTRACK;
    }
    None
}

// ============================================================================
// Tests
// ============================================================================
