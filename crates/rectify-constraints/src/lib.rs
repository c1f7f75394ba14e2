#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Point and delta constraint types.
pub mod constraint;

/// Constraint store with synchronous create/destroy notifications.
pub mod store;

/// Transform parameters and the shared 3x3 output matrix.
pub mod transform;

pub use constraint::{DeltaAxis, DeltaConstraint, PointConstraint};
pub use store::{ConstraintId, ConstraintListener, ConstraintStore, ListenerId};
pub use transform::TransformParams;
