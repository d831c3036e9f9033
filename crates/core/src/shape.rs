//! # Shapes
//!
//! A shape lists the extent of every axis of a tensor. Shapes are plain
//! values: cheap to clone, compared element-wise, never shared.
//!
//! ## Design Choices
//!
//! The rank is carried at runtime (`Vec<usize>`) rather than as a const
//! generic, because dropping an axis (`axis_removed`) has to produce a shape
//! of rank R-1, which stable const generics cannot express. A rank-0 shape
//! is the shape of a scalar: it is what removing the only axis of a rank-1
//! shape yields.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::error::CoreError;

/// The per-axis extents of a tensor.
///
/// Extents may be zero (an empty axis is legal but degenerate).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a shape from axis extents.
    ///
    /// # Example
    ///
    /// ```rust
    /// use miniflow_core::Shape;
    ///
    /// let s = Shape::new(vec![2, 5]);
    /// assert_eq!(s.rank(), 2);
    /// assert_eq!(s[1], 5);
    /// ```
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self { dims: dims.into() }
    }

    /// The rank-0 shape of a scalar.
    pub fn scalar() -> Self {
        Self { dims: Vec::new() }
    }

    /// A shape of the given rank with every extent zero.
    pub fn empty(rank: usize) -> Self {
        Self {
            dims: vec![0; rank],
        }
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (1 for a scalar).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Axis extents as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Whether this is the rank-0 scalar shape.
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Checked read of one axis extent.
    pub fn get(&self, axis: usize) -> Result<usize, CoreError> {
        self.dims
            .get(axis)
            .copied()
            .ok_or(CoreError::IndexOutOfRange {
                index: axis,
                len: self.dims.len(),
            })
    }

    /// Checked write of one axis extent.
    pub fn set(&mut self, axis: usize, extent: usize) -> Result<(), CoreError> {
        let len = self.dims.len();
        let slot = self
            .dims
            .get_mut(axis)
            .ok_or(CoreError::IndexOutOfRange { index: axis, len })?;
        *slot = extent;
        Ok(())
    }

    /// The shape with axis `k` dropped (rank R-1).
    pub fn try_axis_removed(&self, k: usize) -> Result<Shape, CoreError> {
        if k >= self.rank() {
            return Err(CoreError::IndexOutOfRange {
                index: k,
                len: self.rank(),
            });
        }
        let dims = self
            .dims
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != k)
            .map(|(_, &d)| d)
            .collect::<Vec<_>>();
        Ok(Shape { dims })
    }

    /// The shape with axis `k` dropped.
    ///
    /// Panics with `IndexOutOfRange` if `k` is not an axis of this shape.
    pub fn axis_removed(&self, k: usize) -> Shape {
        match self.try_axis_removed(k) {
            Ok(shape) => shape,
            Err(e) => panic!("{e}"),
        }
    }

    /// Shape of one sub-tensor: the first axis dropped.
    pub fn sub_shape(&self) -> Shape {
        self.axis_removed(0)
    }

    /// Shape after folding the last axis away.
    pub fn fold_shape(&self) -> Shape {
        self.axis_removed(self.rank().saturating_sub(1))
    }

    /// The shape with its last two axes swapped.
    ///
    /// Shapes of rank below 2 come back unchanged.
    pub fn transposed(&self) -> Shape {
        let mut dims = self.dims.clone();
        let r = dims.len();
        if r >= 2 {
            dims.swap(r - 1, r - 2);
        }
        Shape { dims }
    }

    /// Row-major strides for this shape.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.rank()];
        for i in (0..self.rank().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }
}

impl Index<usize> for Shape {
    type Output = usize;

    fn index(&self, axis: usize) -> &usize {
        match self.dims.get(axis) {
            Some(d) => d,
            None => panic!(
                "{}",
                CoreError::IndexOutOfRange {
                    index: axis,
                    len: self.dims.len()
                }
            ),
        }
    }
}

impl IndexMut<usize> for Shape {
    fn index_mut(&mut self, axis: usize) -> &mut usize {
        let len = self.dims.len();
        match self.dims.get_mut(axis) {
            Some(d) => d,
            None => panic!("{}", CoreError::IndexOutOfRange { index: axis, len }),
        }
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::new(dims.to_vec())
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims.to_vec())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]",
            self.dims
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.numel(), 1);
        assert_eq!(s.to_string(), "[]");
    }

    #[test]
    fn test_axis_removed() {
        let s = Shape::new(vec![3, 2, 5]);
        assert_eq!(s.axis_removed(0), Shape::new(vec![2, 5]));
        assert_eq!(s.axis_removed(1), Shape::new(vec![3, 5]));
        assert_eq!(s.axis_removed(2), Shape::new(vec![3, 2]));
        assert_eq!(s.sub_shape(), Shape::new(vec![2, 5]));
        assert_eq!(s.fold_shape(), Shape::new(vec![3, 2]));
    }

    #[test]
    fn test_rank_one_folds_to_scalar() {
        let s = Shape::new(vec![4]);
        assert_eq!(s.fold_shape(), Shape::scalar());
        assert_eq!(s.sub_shape(), Shape::scalar());
    }

    #[test]
    fn test_transposed() {
        assert_eq!(
            Shape::new(vec![3, 2, 5]).transposed(),
            Shape::new(vec![3, 5, 2])
        );
        assert_eq!(Shape::new(vec![7]).transposed(), Shape::new(vec![7]));
    }

    #[test]
    fn test_checked_access() {
        let mut s = Shape::new(vec![2, 5]);
        assert_eq!(s.get(1), Ok(5));
        assert_eq!(
            s.get(2),
            Err(CoreError::IndexOutOfRange { index: 2, len: 2 })
        );
        s.set(0, 4).unwrap();
        assert_eq!(s[0], 4);
        assert!(s.set(3, 1).is_err());
    }

    #[test]
    fn test_strides() {
        assert_eq!(Shape::new(vec![3, 2, 5]).strides(), vec![10, 5, 1]);
        assert!(Shape::scalar().strides().is_empty());
    }

    #[test]
    #[should_panic(expected = "Index out of range")]
    fn test_axis_removed_out_of_range() {
        let _ = Shape::new(vec![2, 5]).axis_removed(2);
    }
}
