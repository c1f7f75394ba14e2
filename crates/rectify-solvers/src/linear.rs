//! Closed-form solver for absolute point constraints.
//!
//! Each point constraint contributes two rows of a `2m x 6` linear system
//! obtained by cross-multiplying the rational transform model, so the system
//! is exact for the full conformal-plus-skew family, not an approximation.
//! The system is solved through a rank-aware SVD pseudo-inverse; when the
//! system is rank deficient, a model-selection ladder tries to drop the skew
//! columns and keeps the simplest model whose residual stays within
//! [`RESIDUAL_TOL`].

use nalgebra::{DMatrix, DVector};
use rectify_constraints::{PointConstraint, TransformParams};

use crate::types::{SolveQuality, SolverError, TransformFit, TransformSolver, RESIDUAL_TOL};

/// Minimum number of point constraints for a 6-unknown system.
pub const MIN_POINT_CONSTRAINTS: usize = 3;

const NUM_PARAMS: usize = 6;
const SKEW_X_COL: usize = 4;
const SKEW_Y_COL: usize = 5;

/// SVD-based least-squares solver over point constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearSolver;

impl TransformSolver for LinearSolver {
    type Constraint = PointConstraint;

    fn fit(&self, constraints: &[PointConstraint]) -> Result<TransformFit, SolverError> {
        if constraints.len() < MIN_POINT_CONSTRAINTS {
            return Err(SolverError::InsufficientConstraints {
                required: MIN_POINT_CONSTRAINTS,
                actual: constraints.len(),
            });
        }

        let (a, b) = build_system(constraints);
        let selected = select_model(&a, &b)?;
        log::debug!(
            "linear fit: rank={} quality={:?} residual={:.3e}",
            selected.rank,
            selected.quality,
            selected.residual
        );

        let mut x = [0.0; NUM_PARAMS];
        x.copy_from_slice(selected.x.as_slice());
        Ok(TransformFit {
            params: TransformParams::from_vector(&x),
            rank: selected.rank,
            quality: selected.quality,
            residual: selected.residual,
            iterations: None,
        })
    }
}

/// Assemble the weighted `2m x 6` design system from point constraints.
///
/// For image point `(xd, yd)`, world point `(xp, yp)` and weight `w`, the two
/// rows are
///
/// ```text
/// w * [xd,  yd, 1, 0, -xd*xp, -yd*xp] . x = w * (xp - xd)
/// w * [yd, -xd, 0, 1, -xd*yp, -yd*yp] . x = w * (yp - yd)
/// ```
pub(crate) fn build_system(constraints: &[PointConstraint]) -> (DMatrix<f64>, DVector<f64>) {
    let m = constraints.len();
    let mut a = DMatrix::zeros(2 * m, NUM_PARAMS);
    let mut b = DVector::zeros(2 * m);
    for (i, c) in constraints.iter().enumerate() {
        let (xd, yd) = (c.image_x, c.image_y);
        let (xp, yp) = (c.world_x, c.world_y);
        let w = c.weight;
        let r = 2 * i;
        a[(r, 0)] = w * xd;
        a[(r, 1)] = w * yd;
        a[(r, 2)] = w;
        a[(r, 4)] = -w * xd * xp;
        a[(r, 5)] = -w * yd * xp;
        b[r] = w * (xp - xd);
        a[(r + 1, 0)] = w * yd;
        a[(r + 1, 1)] = -w * xd;
        a[(r + 1, 3)] = w;
        a[(r + 1, 4)] = -w * xd * yp;
        a[(r + 1, 5)] = -w * yd * yp;
        b[r + 1] = w * (yp - yd);
    }
    (a, b)
}

/// Minimum-norm least-squares solution through the SVD pseudo-inverse.
///
/// Singular values at or below `s_max * max(rows, cols) * eps` are treated as
/// zero; the returned rank counts the values above that tolerance.
pub(crate) fn min_norm_solve(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
) -> Result<(DVector<f64>, usize), SolverError> {
    let svd = a.clone().svd(true, true);
    let u = svd
        .u
        .as_ref()
        .ok_or_else(|| SolverError::SvdFailed("missing U factor".to_string()))?;
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| SolverError::SvdFailed("missing V^T factor".to_string()))?;
    let s = &svd.singular_values;

    let s_max = s.iter().cloned().fold(0.0_f64, f64::max);
    let tol = s_max * a.nrows().max(a.ncols()) as f64 * f64::EPSILON;
    let rank = s.iter().filter(|&&sv| sv > tol).count();

    let mut y = u.transpose() * b;
    for i in 0..y.len() {
        if i < rank {
            y[i] /= s[i];
        } else {
            y[i] = 0.0;
        }
    }
    Ok((v_t.transpose() * y, rank))
}

struct SelectedModel {
    x: DVector<f64>,
    rank: usize,
    quality: SolveQuality,
    residual: f64,
}

struct ReducedFit {
    x: DVector<f64>,
    rank: usize,
    residual: f64,
}

/// Solve the system with the given parameter columns removed, zero-padding
/// the solution back to six entries.
fn solve_dropping(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    dropped: &[usize],
) -> Result<ReducedFit, SolverError> {
    let mut reduced = a.clone();
    // remove from the highest index so earlier positions stay valid
    for &col in dropped.iter().rev() {
        reduced = reduced.remove_column(col);
    }
    let (x_reduced, rank) = min_norm_solve(&reduced, b)?;
    let residual = (&reduced * &x_reduced - b).norm();

    let mut x = DVector::zeros(NUM_PARAMS);
    let mut j = 0;
    for i in 0..NUM_PARAMS {
        if dropped.contains(&i) {
            continue;
        }
        x[i] = x_reduced[j];
        j += 1;
    }
    Ok(ReducedFit { x, rank, residual })
}

/// Model-selection ladder over the skew columns.
///
/// A full-rank system is returned as-is. Otherwise the decision is driven by
/// which skew magnitudes fall below [`RESIDUAL_TOL`], and reductions are
/// accepted only when the reduced residual stays below the same tolerance.
/// When both skews are present, `skew_y` is tried before `skew_x`; the order
/// is fixed and deliberately asymmetric.
fn select_model(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<SelectedModel, SolverError> {
    let (x, rank) = min_norm_solve(a, b)?;
    let full_residual = (a * &x - b).norm();

    if rank == NUM_PARAMS {
        return Ok(SelectedModel {
            x,
            rank,
            quality: SolveQuality::FullyDetermined,
            residual: full_residual,
        });
    }

    let x_skew_small = x[SKEW_X_COL].abs() < RESIDUAL_TOL;
    let y_skew_small = x[SKEW_Y_COL].abs() < RESIDUAL_TOL;

    match (x_skew_small, y_skew_small) {
        // no skew in the minimum-norm solution already
        (true, true) => Ok(SelectedModel {
            x,
            rank,
            quality: SolveQuality::MinimumNorm,
            residual: full_residual,
        }),
        // only x skew present, try to remove it
        (false, true) => {
            let fit = solve_dropping(a, b, &[SKEW_X_COL])?;
            if fit.residual < RESIDUAL_TOL {
                Ok(accept_reduced(fit))
            } else {
                Ok(SelectedModel {
                    x,
                    rank,
                    quality: SolveQuality::MinimumNorm,
                    residual: full_residual,
                })
            }
        }
        // only y skew present, try to remove it
        (true, false) => {
            let fit = solve_dropping(a, b, &[SKEW_Y_COL])?;
            if fit.residual < RESIDUAL_TOL {
                Ok(accept_reduced(fit))
            } else {
                Ok(SelectedModel {
                    x,
                    rank,
                    quality: SolveQuality::MinimumNorm,
                    residual: full_residual,
                })
            }
        }
        // skew in both axes: try y first, then escalate to dropping both
        (false, false) => {
            let no_y = solve_dropping(a, b, &[SKEW_Y_COL])?;
            if no_y.residual < RESIDUAL_TOL {
                let no_skew = solve_dropping(a, b, &[SKEW_X_COL, SKEW_Y_COL])?;
                if no_skew.residual < RESIDUAL_TOL {
                    Ok(accept_reduced(no_skew))
                } else {
                    Ok(accept_reduced(no_y))
                }
            } else {
                let no_x = solve_dropping(a, b, &[SKEW_X_COL])?;
                if no_x.residual < RESIDUAL_TOL {
                    Ok(accept_reduced(no_x))
                } else {
                    // both reductions rejected, keep the full fit
                    Ok(SelectedModel {
                        x,
                        rank,
                        quality: SolveQuality::PreferredReduced,
                        residual: full_residual,
                    })
                }
            }
        }
    }
}

fn accept_reduced(fit: ReducedFit) -> SelectedModel {
    SelectedModel {
        x: fit.x,
        rank: fit.rank,
        quality: SolveQuality::PreferredReduced,
        residual: fit.residual,
    }
}
