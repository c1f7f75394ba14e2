#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Two solvers estimate the same six-parameter transform family
//! `(a, b, tx, ty, skew_x, skew_y)` from different constraint kinds:
//!
//! - [`LinearSolver`] fits absolute point correspondences through a
//!   rank-aware SVD least-squares solve, then runs a model-selection step
//!   that drops statistically unsupported skew terms.
//! - [`NonlinearSolver`] fits relative (delta) measurements through
//!   Levenberg-Marquardt, since the delta model is a ratio of affine terms
//!   with no closed form.
//!
//! Both return a [`TransformFit`] whose parameters render to the shared
//! homogeneous matrix via
//! [`TransformParams::matrix`](rectify_constraints::TransformParams::matrix).
//!
//! ```
//! use rectify_constraints::{ConstraintStore, PointConstraint};
//! use rectify_solvers::{LinearSolver, TransformSolver};
//!
//! let mut store = ConstraintStore::new();
//! store.insert(PointConstraint::with_unit_weight(0.0, 0.0, 5.0, 5.0), false);
//! store.insert(PointConstraint::with_unit_weight(10.0, 0.0, 15.0, 5.0), false);
//! store.insert(PointConstraint::with_unit_weight(0.0, 10.0, 5.0, 15.0), false);
//!
//! let fit = LinearSolver.fit(store.items())?;
//! let matrix = fit.params.matrix();
//! assert!((matrix[0][2] - 5.0).abs() < 1e-9);
//! # Ok::<(), rectify_solvers::SolverError>(())
//! ```

/// Closed-form SVD solver over point constraints, with model selection.
pub mod linear;

/// Iterative nonlinear least-squares solver over delta constraints.
pub mod nonlinear;

/// Shared solver types: fit results, quality codes, errors.
pub mod types;

pub use linear::LinearSolver;
pub use nonlinear::{LMParams, NonlinearSolver};
pub use types::{SolveQuality, SolverError, TransformFit, TransformSolver, RESIDUAL_TOL};
