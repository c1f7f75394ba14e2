//! Common data types shared across the transform solvers.

use rectify_constraints::TransformParams;
use thiserror::Error;

/// Residual acceptance tolerance for model selection and skew thresholds.
pub const RESIDUAL_TOL: f64 = 1e-8;

/// Error types for the transform solvers.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Too few constraints to form a well-posed system.
    #[error("solver requires at least {required} constraints, got {actual}")]
    InsufficientConstraints {
        /// Minimum number of constraints required by the solver.
        required: usize,
        /// Actual number of constraints provided.
        actual: usize,
    },

    /// Singular value decomposition failed.
    #[error("SVD computation failed: {0}")]
    SvdFailed(String),

    /// The nonlinear optimizer did not converge.
    #[error("optimization did not converge after {iterations} iterations (residual {residual})")]
    NotConverged {
        /// Number of iterations performed before giving up.
        iterations: usize,
        /// Residual norm at the last accepted iterate.
        residual: f64,
    },
}

/// How the returned parameters were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveQuality {
    /// Under-determined system; minimum-norm solution among all best fits.
    MinimumNorm,
    /// A simpler model was deliberately selected over the full one.
    PreferredReduced,
    /// Full-rank system; the full six-parameter fit is exact or least-squares
    /// over-determined.
    FullyDetermined,
}

/// Result returned by any transform solver.
#[derive(Debug, Clone)]
pub struct TransformFit {
    /// Estimated transform parameters.
    pub params: TransformParams,
    /// Numerical rank of the solved (possibly reduced) linear system; 6 for
    /// the nonlinear solver, which always fits the full model.
    pub rank: usize,
    /// Qualitative confidence code for the fit.
    pub quality: SolveQuality,
    /// Residual norm of the accepted fit.
    pub residual: f64,
    /// Iterations taken by an iterative solver, if applicable.
    pub iterations: Option<usize>,
}

impl TransformFit {
    /// The homogeneous 3x3 transform matrix of the fitted parameters.
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.params.matrix()
    }
}

/// Trait implemented by every transform solver in this crate.
///
/// The two implementations fit the same parameter family from different
/// constraint kinds; callers pick the solver matching the constraints they
/// hold (absolute point pairs versus relative deltas).
pub trait TransformSolver {
    /// Constraint kind consumed by the solver.
    type Constraint;

    /// Fit the transform parameters to the given constraints.
    fn fit(&self, constraints: &[Self::Constraint]) -> Result<TransformFit, SolverError>;
}
