//! # Error Types
//!
//! Shape errors are precondition violations: they mean two tensors were
//! wired together whose extents cannot be combined. The tensor operators
//! surface them as panics; the `try_*` forms hand them back as values.

use thiserror::Error;

use crate::shape::Shape;

/// Errors raised by shape-checked tensor operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Operand shapes disagree for an element-wise operation.
    #[error("Shape mismatch in {op}: expected {expected}, got {got}")]
    ShapeMismatch {
        op: &'static str,
        expected: Shape,
        got: Shape,
    },

    /// Inner dimensions of a contraction disagree.
    #[error("Dimension mismatch in {op}: {left} vs {right}")]
    DimensionMismatch {
        op: &'static str,
        left: usize,
        right: usize,
    },

    /// An axis or element index is past the end.
    #[error("Index out of range: {index} (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The operation is not defined for an operand of this rank.
    #[error("{op} is not defined for rank {rank}")]
    RankMismatch { op: &'static str, rank: usize },
}

impl CoreError {
    /// Build a `ShapeMismatch` for `op`.
    pub fn shape_mismatch(op: &'static str, expected: &Shape, got: &Shape) -> Self {
        CoreError::ShapeMismatch {
            op,
            expected: expected.clone(),
            got: got.clone(),
        }
    }
}
