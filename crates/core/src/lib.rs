//! # Core - miniflow foundations
//!
//! The pieces the autodiff engine is built on:
//!
//! - **Shapes**: per-axis extents, sub-shape and fold-shape derivation,
//!   transposition of the trailing axes
//! - **Errors**: shape, dimension, rank and index precondition failures
//! - **Parallel**: the element-iteration primitive behind element-wise ops
//!
//! Tensors, nodes and the graph scheduler live in the `miniflow` crate.

pub mod error;
pub mod parallel;
pub mod shape;

// Re-export key types at crate root for convenience
pub use error::CoreError;
pub use parallel::Strategy;
pub use shape::Shape;

/// Scalar type the autodiff engine computes in.
pub type Scalar = f64;

/// Index type for axes and elements.
pub type Index = usize;
