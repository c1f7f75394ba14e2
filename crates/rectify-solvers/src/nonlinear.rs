//! Iterative solver for relative (delta) constraints.
//!
//! The delta model is a ratio of affine terms, so there is no closed form;
//! the fit is a Levenberg-Marquardt minimization of the squared residuals
//! over all six parameters, starting from the identity. The model functions
//! for image point `(x, y)` with denominator `d = 1 + skew_x*x + skew_y*y`:
//!
//! ```text
//! Fx(x, y) = ( a*x + b*y + tx) / d
//! Fy(x, y) = (-b*x + a*y + ty) / d
//! ```
//!
//! Each delta constraint contributes one residual
//! `F(point1) - F(point2) - world_delta` along its axis. Differencing two
//! evaluations cancels any constant offset of the displacement field, which
//! is what makes the formulation usable when absolute world coordinates are
//! unknown; with both skews at zero the translation parameters are
//! unobservable and stay at their identity start.

use nalgebra::{Cholesky, DMatrix, DVector};
use rectify_constraints::{DeltaAxis, DeltaConstraint, TransformParams};

use crate::types::{SolveQuality, SolverError, TransformFit, TransformSolver};

/// Minimum number of delta constraints for the six-unknown fit.
pub const MIN_DELTA_CONSTRAINTS: usize = 6;

const NUM_PARAMS: usize = 6;

/// Parameters controlling the Levenberg-Marquardt iteration.
#[derive(Debug, Clone)]
pub struct LMParams {
    /// Maximum number of LM iterations.
    pub max_iters: usize,
    /// Convergence threshold on the decrease of the squared residual norm.
    pub eps: f64,
    /// Initial damping factor (lambda).
    pub lambda_init: f64,
    /// Multiplicative factor to increase/decrease lambda.
    pub lambda_mul: f64,
}

impl Default for LMParams {
    fn default() -> Self {
        Self {
            max_iters: 100,
            eps: 1e-12,
            lambda_init: 1e-3,
            lambda_mul: 10.0,
        }
    }
}

/// Levenberg-Marquardt solver over delta constraints, both axes pooled.
#[derive(Debug, Clone, Default)]
pub struct NonlinearSolver {
    /// Iteration controls.
    pub params: LMParams,
}

impl NonlinearSolver {
    /// Solver with the given iteration controls.
    pub fn new(params: LMParams) -> Self {
        Self { params }
    }
}

impl TransformSolver for NonlinearSolver {
    type Constraint = DeltaConstraint;

    fn fit(&self, constraints: &[DeltaConstraint]) -> Result<TransformFit, SolverError> {
        if constraints.len() < MIN_DELTA_CONSTRAINTS {
            return Err(SolverError::InsufficientConstraints {
                required: MIN_DELTA_CONSTRAINTS,
                actual: constraints.len(),
            });
        }

        let mut x = DVector::zeros(NUM_PARAMS);
        let mut residuals = residual_vector(&x, constraints);
        let mut err_sq = residuals.norm_squared();

        let mut lambda = self.params.lambda_init;
        let mut iters = 0usize;
        let mut converged = err_sq < self.params.eps;

        while iters < self.params.max_iters && !converged {
            iters += 1;

            let jac = jacobian(&x, constraints);
            let mut h = jac.transpose() * &jac;
            let g = jac.transpose() * &residuals;
            for d in 0..NUM_PARAMS {
                h[(d, d)] += lambda;
            }

            let Some(chol) = Cholesky::new(h) else {
                // singular normal equations, raise the damping and retry
                lambda *= self.params.lambda_mul;
                continue;
            };
            let delta = chol.solve(&g);

            let x_new = &x - &delta;
            let residuals_new = residual_vector(&x_new, constraints);
            let err_sq_new = residuals_new.norm_squared();
            log::debug!(
                "lm iteration {}: err_sq {:.3e} -> {:.3e} lambda {:.1e}",
                iters,
                err_sq,
                err_sq_new,
                lambda
            );

            if err_sq_new < err_sq {
                x = x_new;
                residuals = residuals_new;
                if (err_sq - err_sq_new) < self.params.eps || err_sq_new < self.params.eps {
                    converged = true;
                }
                err_sq = err_sq_new;
                lambda = (lambda / self.params.lambda_mul).max(1e-12);
            } else {
                lambda *= self.params.lambda_mul;
            }
        }

        let residual = err_sq.sqrt();
        if !converged {
            return Err(SolverError::NotConverged {
                iterations: iters,
                residual,
            });
        }

        let mut p = [0.0; NUM_PARAMS];
        p.copy_from_slice(x.as_slice());
        Ok(TransformFit {
            params: TransformParams::from_vector(&p),
            rank: NUM_PARAMS,
            quality: SolveQuality::FullyDetermined,
            residual,
            iterations: Some(iters),
        })
    }
}

/// Displacement along the constraint axis for one image point.
fn model(x: &DVector<f64>, px: f64, py: f64, axis: DeltaAxis) -> f64 {
    let d = 1.0 + x[4] * px + x[5] * py;
    match axis {
        DeltaAxis::X => (x[0] * px + x[1] * py + x[2]) / d,
        DeltaAxis::Y => (-x[1] * px + x[0] * py + x[3]) / d,
    }
}

fn residual_vector(x: &DVector<f64>, constraints: &[DeltaConstraint]) -> DVector<f64> {
    DVector::from_iterator(
        constraints.len(),
        constraints.iter().map(|c| {
            model(x, c.image_x1, c.image_y1, c.axis) - model(x, c.image_x2, c.image_y2, c.axis)
                - c.world_delta
        }),
    )
}

/// Partial derivatives of the model at one image point.
fn model_gradient(x: &DVector<f64>, px: f64, py: f64, axis: DeltaAxis) -> [f64; 6] {
    let d = 1.0 + x[4] * px + x[5] * py;
    let f = model(x, px, py, axis);
    match axis {
        DeltaAxis::X => [px / d, py / d, 1.0 / d, 0.0, -f * px / d, -f * py / d],
        DeltaAxis::Y => [py / d, -px / d, 0.0, 1.0 / d, -f * px / d, -f * py / d],
    }
}

fn jacobian(x: &DVector<f64>, constraints: &[DeltaConstraint]) -> DMatrix<f64> {
    let mut jac = DMatrix::zeros(constraints.len(), NUM_PARAMS);
    for (i, c) in constraints.iter().enumerate() {
        let g1 = model_gradient(x, c.image_x1, c.image_y1, c.axis);
        let g2 = model_gradient(x, c.image_x2, c.image_y2, c.axis);
        for j in 0..NUM_PARAMS {
            jac[(i, j)] = g1[j] - g2[j];
        }
    }
    jac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn delta_for(truth: &DVector<f64>, p1: [f64; 2], p2: [f64; 2], axis: DeltaAxis) -> DeltaConstraint {
        let delta = model(truth, p1[0], p1[1], axis) - model(truth, p2[0], p2[1], axis);
        DeltaConstraint::with_unit_weight(axis, p1[0], p1[1], p2[0], p2[1], delta)
    }

    fn grid_points() -> Vec<[f64; 2]> {
        let mut pts = Vec::new();
        for &x in &[0.0, 50.0, 100.0] {
            for &y in &[0.0, 50.0, 100.0] {
                pts.push([x, y]);
            }
        }
        pts
    }

    fn constraints_from_truth(truth: &DVector<f64>) -> Vec<DeltaConstraint> {
        let pts = grid_points();
        let mut constraints = Vec::new();
        for pair in pts.windows(2) {
            constraints.push(delta_for(truth, pair[0], pair[1], DeltaAxis::X));
            constraints.push(delta_for(truth, pair[0], pair[1], DeltaAxis::Y));
        }
        constraints
    }

    #[test]
    fn rejects_too_few_constraints() {
        let constraints = vec![
            DeltaConstraint::with_unit_weight(DeltaAxis::X, 0.0, 0.0, 1.0, 0.0, 0.0);
            5
        ];
        let err = NonlinearSolver::default().fit(&constraints).unwrap_err();
        assert!(matches!(
            err,
            SolverError::InsufficientConstraints {
                required: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn zero_deltas_return_identity() {
        let constraints: Vec<DeltaConstraint> = (0..6)
            .map(|i| {
                DeltaConstraint::with_unit_weight(DeltaAxis::X, 0.0, 0.0, (i + 1) as f64, 0.0, 0.0)
            })
            .collect();
        let fit = NonlinearSolver::default().fit(&constraints).unwrap();
        assert_eq!(fit.params, TransformParams::identity());
        assert_eq!(fit.iterations, Some(0));
        let expected = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_eq!(fit.matrix(), expected);
    }

    #[test]
    fn recovers_conformal_deltas() {
        // With zero skews the deltas cannot observe the translation; it
        // stays at the identity start.
        let truth = DVector::from_column_slice(&[0.1, -0.05, 0.0, 0.0, 0.0, 0.0]);
        let fit = NonlinearSolver::default()
            .fit(&constraints_from_truth(&truth))
            .unwrap();
        assert_relative_eq!(fit.params.a, 0.1, epsilon = 1e-6);
        assert_relative_eq!(fit.params.b, -0.05, epsilon = 1e-6);
        assert_relative_eq!(fit.params.tx, 0.0, epsilon = 1e-6);
        assert_relative_eq!(fit.params.ty, 0.0, epsilon = 1e-6);
        assert_relative_eq!(fit.params.skew_x, 0.0, epsilon = 1e-8);
        assert_relative_eq!(fit.params.skew_y, 0.0, epsilon = 1e-8);
    }

    #[test]
    fn recovers_skewed_ground_truth() {
        let truth = DVector::from_column_slice(&[0.08, -0.03, 4.0, 2.5, 8e-4, -6e-4]);
        let fit = NonlinearSolver::default()
            .fit(&constraints_from_truth(&truth))
            .unwrap();
        let got = fit.params.to_vector();
        for (i, &want) in truth.iter().enumerate() {
            assert_relative_eq!(got[i], want, epsilon = 1e-6);
        }
        assert_eq!(fit.quality, SolveQuality::FullyDetermined);
        assert_eq!(fit.rank, 6);
        assert!(fit.iterations.unwrap() > 0);
        assert!(fit.residual < 1e-8);
    }

    #[test]
    fn reports_non_convergence() {
        // Contradictory measurements on the same pair and an impossible
        // decrease threshold: the iteration budget runs out.
        let mut constraints = Vec::new();
        for i in 0..3 {
            let x2 = (i + 1) as f64;
            constraints.push(DeltaConstraint::with_unit_weight(
                DeltaAxis::X,
                0.0,
                0.0,
                x2,
                0.0,
                1.0,
            ));
            constraints.push(DeltaConstraint::with_unit_weight(
                DeltaAxis::X,
                0.0,
                0.0,
                x2,
                0.0,
                -1.0,
            ));
        }
        let solver = NonlinearSolver::new(LMParams {
            max_iters: 3,
            eps: 0.0,
            ..Default::default()
        });
        let err = solver.fit(&constraints).unwrap_err();
        match err {
            SolverError::NotConverged {
                iterations,
                residual,
            } => {
                assert_eq!(iterations, 3);
                assert!(residual > 0.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
