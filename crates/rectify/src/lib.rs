#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use rectify_constraints as constraints;

#[doc(inline)]
pub use rectify_solvers as solvers;
