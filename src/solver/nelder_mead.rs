//! Derivative-free Nelder-Mead simplex fallback.
//!
//! Substitutable for [`Lbfgs`](super::Lbfgs) behind the same [`Solver`]
//! trait when the objective is too noisy for finite-difference gradients.
//! Bounds are honored by clamping every trial vertex.

use nalgebra::DVector;

use super::{Bounds, Minimum, Solver, SolverConfig};
use crate::{Error, Result};

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Simplex local minimizer.
#[derive(Debug, Clone)]
pub struct NelderMead {
    config: SolverConfig,
}

impl Default for NelderMead {
    fn default() -> Self {
        // The simplex converges linearly, so it gets a larger budget and a
        // looser value tolerance than the quasi-Newton default.
        Self {
            config: SolverConfig {
                max_iterations: 2000,
                value_tolerance: 1e-10,
                ..SolverConfig::default()
            },
        }
    }
}

impl NelderMead {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

impl Solver for NelderMead {
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
        let n = initial.len();
        let clamp = |v: &mut DVector<f64>| {
            if let Some(b) = bounds {
                b.project(v.as_mut_slice());
            }
        };

        // Initial simplex: the guess plus one vertex per axis, each nudged
        // by 5% of the coordinate (or a small absolute step at zero).
        let mut vertices: Vec<DVector<f64>> = Vec::with_capacity(n + 1);
        let mut x0 = DVector::from_column_slice(initial);
        clamp(&mut x0);
        vertices.push(x0.clone());
        for i in 0..n {
            let mut v = x0.clone();
            v[i] += if v[i] != 0.0 { 0.05 * v[i].abs() } else { 0.00025 };
            clamp(&mut v);
            vertices.push(v);
        }

        let mut values: Vec<f64> = vertices.iter().map(|v| objective(v.as_slice())).collect();
        if !values[0].is_finite() {
            return Err(Error::Solver(format!(
                "objective is {} at the initial guess",
                values[0]
            )));
        }

        let mut converged = false;
        let mut iterations = 0;

        while iterations < cfg.max_iterations {
            // Order vertices best → worst.
            let mut order: Vec<usize> = (0..=n).collect();
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            vertices = order.iter().map(|&i| vertices[i].clone()).collect();
            values = order.iter().map(|&i| values[i]).collect();

            let spread = values[n] - values[0];
            if spread.abs() <= cfg.value_tolerance * values[0].abs().max(1.0) {
                converged = true;
                break;
            }
            iterations += 1;

            // Centroid of all but the worst vertex.
            let mut centroid = DVector::zeros(n);
            for v in &vertices[..n] {
                centroid += v;
            }
            centroid /= n as f64;

            let mut reflected = &centroid + (&centroid - &vertices[n]) * REFLECT;
            clamp(&mut reflected);
            let f_reflected = objective(reflected.as_slice());

            if f_reflected < values[0] {
                let mut expanded = &centroid + (&centroid - &vertices[n]) * EXPAND;
                clamp(&mut expanded);
                let f_expanded = objective(expanded.as_slice());
                if f_expanded < f_reflected {
                    vertices[n] = expanded;
                    values[n] = f_expanded;
                } else {
                    vertices[n] = reflected;
                    values[n] = f_reflected;
                }
            } else if f_reflected < values[n - 1] {
                vertices[n] = reflected;
                values[n] = f_reflected;
            } else {
                // Contract toward whichever of (worst, reflected) is better.
                let toward = if f_reflected < values[n] { &reflected } else { &vertices[n] };
                let mut contracted = &centroid + (toward - &centroid) * CONTRACT;
                clamp(&mut contracted);
                let f_contracted = objective(contracted.as_slice());
                if f_contracted < values[n].min(f_reflected) {
                    vertices[n] = contracted;
                    values[n] = f_contracted;
                } else {
                    // Shrink everything toward the best vertex.
                    let best = vertices[0].clone();
                    for (v, f) in vertices.iter_mut().zip(values.iter_mut()).skip(1) {
                        *v = &best + (&*v - &best) * SHRINK;
                        clamp(v);
                        *f = objective(v.as_slice());
                    }
                }
            }
        }

        let best = values
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);

        tracing::debug!(
            dims = n,
            iterations,
            converged,
            value = values[best],
            "nelder-mead finished"
        );
        Ok(Minimum {
            point: vertices[best].as_slice().to_vec(),
            value: values[best],
            iterations,
            converged,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimizes_shifted_quadratic() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2);
        let min = NelderMead::default().minimize(&f, &[0.0, 0.0], None).unwrap();
        assert!(min.converged);
        assert!((min.point[0] - 3.0).abs() < 1e-3);
        assert!((min.point[1] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_budget_exhaustion_reports_not_converged() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2);
        let tight = NelderMead::new(SolverConfig {
            max_iterations: 1,
            value_tolerance: 0.0,
            ..SolverConfig::default()
        });
        let min = tight.minimize(&f, &[0.0], None).unwrap();
        assert!(!min.converged);
    }

    #[test]
    fn test_respects_bounds() {
        let f = |x: &[f64]| (x[0] + 2.0).powi(2);
        let bounds = Bounds::new(vec![(0.0, 10.0)]);
        let min = NelderMead::default().minimize(&f, &[5.0], Some(&bounds)).unwrap();
        assert!(min.point[0] >= 0.0);
        assert!(min.point[0] < 1e-3);
    }

    #[test]
    fn test_empty_guess_is_error() {
        let f = |_: &[f64]| 0.0;
        assert!(NelderMead::default().minimize(&f, &[], None).is_err());
    }
}
