//! # Tensors
//!
//! An n-dimensional array of scalars with a runtime shape. Storage is one
//! flat row-major buffer; a tensor owns it exclusively and every operation
//! allocates a fresh result, so cloning is a deep copy and operands are
//! never aliased.
//!
//! ## Operations
//!
//! | Op | Result shape | Precondition |
//! |----|--------------|--------------|
//! | `a + b`, `a - b`, `a * b`, `a / b` | shape of `a` | shapes equal |
//! | `a + s`, `s - a`, ... | shape of `a` | none |
//! | `exp`, `sqr` | shape of `a` | none |
//! | `transpose` | last two axes swapped | none |
//! | `sum`, `mean` | last axis dropped | none |
//! | `dot` | see [`Tensor::dot`] | inner dims equal |
//!
//! A rank-0 tensor is a scalar. It is what folding a vector produces, and
//! it is the value type of the scalar computational graph: `transpose`,
//! `sum` and `mean` leave it unchanged and `dot` with it is scaling.
//!
//! ## Example
//!
//! ```rust
//! use miniflow::tensor::Tensor;
//!
//! let mut t = Tensor::full([2, 5], 2.0);
//! t[[0, 0]] = 1.0;
//!
//! // Row sums: the last axis is folded away.
//! let s = t.sum();
//! assert_eq!(s.data(), &[9.0, 10.0]);
//! ```

use std::fmt;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign,
};

use miniflow_core::{parallel, CoreError, Scalar, Shape};

// ============================================================================
// Element Types
// ============================================================================

/// A scalar a tensor can hold.
pub trait Element:
    Copy
    + Default
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + 'static
{
    fn zero() -> Self;
    fn one() -> Self;
    /// Convert an extent (for `mean`).
    fn from_usize(n: usize) -> Self;
}

/// Elements with an exponential.
pub trait Real: Element + Neg<Output = Self> {
    fn exp(self) -> Self;
    fn abs(self) -> Self;
}

macro_rules! impl_element {
    ($($t:ty => $zero:expr, $one:expr);* $(;)?) => {
        $(
            impl Element for $t {
                fn zero() -> Self {
                    $zero
                }

                fn one() -> Self {
                    $one
                }

                fn from_usize(n: usize) -> Self {
                    n as $t
                }
            }
        )*
    };
}

impl_element! {
    i32 => 0, 1;
    i64 => 0, 1;
    f32 => 0.0, 1.0;
    f64 => 0.0, 1.0;
}

impl Real for f32 {
    fn exp(self) -> Self {
        f32::exp(self)
    }

    fn abs(self) -> Self {
        f32::abs(self)
    }
}

impl Real for f64 {
    fn exp(self) -> Self {
        f64::exp(self)
    }

    fn abs(self) -> Self {
        f64::abs(self)
    }
}

// ============================================================================
// Tensor
// ============================================================================

/// An n-dimensional array with row-major storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T = Scalar> {
    shape: Shape,
    data: Vec<T>,
}

impl<T: Element> Default for Tensor<T> {
    /// The scalar zero.
    fn default() -> Self {
        Self::scalar(T::zero())
    }
}

impl<T: Element> Tensor<T> {
    /// A tensor of the given rank with every extent zero.
    pub fn empty(rank: usize) -> Self {
        Self::zeros(Shape::empty(rank))
    }

    /// A tensor of `shape` filled with zeros.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::full(shape, T::zero())
    }

    /// A tensor of `shape` with every element set to `value`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use miniflow::tensor::Tensor;
    ///
    /// let t = Tensor::full([2, 3], 7);
    /// assert_eq!(t.len(), 6);
    /// assert_eq!(t[[1, 2]], 7);
    /// ```
    pub fn full(shape: impl Into<Shape>, value: T) -> Self {
        let shape = shape.into();
        let data = vec![value; shape.numel()];
        Self { shape, data }
    }

    /// A rank-0 tensor.
    pub fn scalar(value: T) -> Self {
        Self {
            shape: Shape::scalar(),
            data: vec![value],
        }
    }

    /// A rank-1 tensor.
    pub fn vector(data: Vec<T>) -> Self {
        Self {
            shape: Shape::new(vec![data.len()]),
            data,
        }
    }

    /// A rank-2 tensor from row-major data.
    pub fn matrix(rows: usize, cols: usize, data: Vec<T>) -> Self {
        Self::from_data([rows, cols], data)
    }

    /// Wrap row-major data, checking its length against `shape`.
    pub fn try_from_data(shape: impl Into<Shape>, data: Vec<T>) -> Result<Self, CoreError> {
        let shape = shape.into();
        if data.len() != shape.numel() {
            return Err(CoreError::DimensionMismatch {
                op: "from_data",
                left: shape.numel(),
                right: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Wrap row-major data. Panics if the length does not fit `shape`.
    pub fn from_data(shape: impl Into<Shape>, data: Vec<T>) -> Self {
        Self::try_from_data(shape, data).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Zeros with this tensor's shape.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape.clone())
    }

    /// Ones with this tensor's shape.
    pub fn ones_like(&self) -> Self {
        Self::full(self.shape.clone(), T::one())
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_scalar()
    }

    /// Row-major elements.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// The single element of a one-element tensor.
    pub fn try_as_scalar(&self) -> Result<T, CoreError> {
        match self.data.as_slice() {
            [value] => Ok(*value),
            _ => Err(CoreError::RankMismatch {
                op: "as_scalar",
                rank: self.rank(),
            }),
        }
    }

    /// The single element of a one-element tensor. Panics otherwise.
    pub fn as_scalar(&self) -> T {
        self.try_as_scalar().unwrap_or_else(|e| panic!("{e}"))
    }

    // ------------------------------------------------------------------------
    // Indexing
    // ------------------------------------------------------------------------

    /// Flat offset of a full coordinate.
    fn offset(&self, index: &[usize]) -> Result<usize, CoreError> {
        if index.len() != self.rank() {
            return Err(CoreError::RankMismatch {
                op: "index",
                rank: index.len(),
            });
        }
        let mut offset = 0;
        for (&i, &extent) in index.iter().zip(self.shape.dims()) {
            if i >= extent {
                return Err(CoreError::IndexOutOfRange {
                    index: i,
                    len: extent,
                });
            }
            offset = offset * extent + i;
        }
        Ok(offset)
    }

    /// Checked element read.
    pub fn get(&self, index: &[usize]) -> Result<T, CoreError> {
        self.offset(index).map(|o| self.data[o])
    }

    /// Checked element write.
    pub fn set(&mut self, index: &[usize], value: T) -> Result<(), CoreError> {
        let o = self.offset(index)?;
        self.data[o] = value;
        Ok(())
    }

    /// Number of elements in one sub-tensor along the first axis.
    fn inner_len(&self) -> usize {
        self.shape.sub_shape().numel()
    }

    /// Copy out sub-tensor `i` of the first axis (a scalar at rank 1).
    pub fn try_slice(&self, i: usize) -> Result<Tensor<T>, CoreError> {
        if self.is_scalar() {
            return Err(CoreError::RankMismatch {
                op: "slice",
                rank: 0,
            });
        }
        let extent = self.shape[0];
        if i >= extent {
            return Err(CoreError::IndexOutOfRange {
                index: i,
                len: extent,
            });
        }
        let inner = self.inner_len();
        Ok(Tensor {
            shape: self.shape.sub_shape(),
            data: self.data[i * inner..(i + 1) * inner].to_vec(),
        })
    }

    /// Copy out sub-tensor `i` of the first axis. Panics when out of range.
    pub fn slice(&self, i: usize) -> Tensor<T> {
        self.try_slice(i).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Replace sub-tensor `i` of the first axis.
    pub fn try_set_slice(&mut self, i: usize, sub: &Tensor<T>) -> Result<(), CoreError> {
        if self.is_scalar() {
            return Err(CoreError::RankMismatch {
                op: "set_slice",
                rank: 0,
            });
        }
        let expected = self.shape.sub_shape();
        if sub.shape != expected {
            return Err(CoreError::shape_mismatch("set_slice", &expected, &sub.shape));
        }
        let extent = self.shape[0];
        if i >= extent {
            return Err(CoreError::IndexOutOfRange {
                index: i,
                len: extent,
            });
        }
        let inner = sub.len();
        self.data[i * inner..(i + 1) * inner].copy_from_slice(&sub.data);
        Ok(())
    }

    pub fn set_slice(&mut self, i: usize, sub: &Tensor<T>) {
        self.try_set_slice(i, sub).unwrap_or_else(|e| panic!("{e}"))
    }

    // ------------------------------------------------------------------------
    // Element-wise
    // ------------------------------------------------------------------------

    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(T) -> T + Sync + Send) -> Tensor<T> {
        Tensor {
            shape: self.shape.clone(),
            data: parallel::map(&self.data, |&x| f(x)),
        }
    }

    /// Combine two same-shape tensors element by element.
    pub fn try_zip_with(
        &self,
        other: &Tensor<T>,
        op: &'static str,
        f: impl Fn(T, T) -> T + Sync + Send,
    ) -> Result<Tensor<T>, CoreError> {
        if self.shape != other.shape {
            return Err(CoreError::shape_mismatch(op, &self.shape, &other.shape));
        }
        Ok(Tensor {
            shape: self.shape.clone(),
            data: parallel::zip_map(&self.data, &other.data, |&a, &b| f(a, b)),
        })
    }

    pub fn zip_with(&self, other: &Tensor<T>, f: impl Fn(T, T) -> T + Sync + Send) -> Tensor<T> {
        self.try_zip_with(other, "zip_with", f)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_add(&self, other: &Tensor<T>) -> Result<Tensor<T>, CoreError> {
        self.try_zip_with(other, "add", |a, b| a + b)
    }

    pub fn try_sub(&self, other: &Tensor<T>) -> Result<Tensor<T>, CoreError> {
        self.try_zip_with(other, "sub", |a, b| a - b)
    }

    pub fn try_mul(&self, other: &Tensor<T>) -> Result<Tensor<T>, CoreError> {
        self.try_zip_with(other, "mul", |a, b| a * b)
    }

    pub fn try_div(&self, other: &Tensor<T>) -> Result<Tensor<T>, CoreError> {
        self.try_zip_with(other, "div", |a, b| a / b)
    }

    /// Element-wise square.
    pub fn sqr(&self) -> Tensor<T> {
        self.map(|x| x * x)
    }

    // ------------------------------------------------------------------------
    // Shape operations
    // ------------------------------------------------------------------------

    /// Swap the last two axes.
    ///
    /// Rank 0 and 1 come back unchanged. At rank 2 this is the matrix
    /// transpose; above that every trailing 2-D slice is transposed and the
    /// leading axes pass through.
    ///
    /// # Example
    ///
    /// ```rust
    /// use miniflow::tensor::Tensor;
    ///
    /// let mut t = Tensor::full([3, 2, 5], 2);
    /// t[[0, 1, 3]] = 7;
    /// let tt = t.transpose();
    /// assert_eq!(tt.shape().dims(), &[3, 5, 2]);
    /// assert_eq!(tt[[0, 3, 1]], 7);
    /// ```
    pub fn transpose(&self) -> Tensor<T> {
        let r = self.rank();
        if r < 2 {
            return self.clone();
        }
        let rows = self.shape[r - 2];
        let cols = self.shape[r - 1];
        let block = rows * cols;
        let mut data = vec![T::zero(); self.len()];
        if block > 0 {
            for (src, dst) in self.data.chunks(block).zip(data.chunks_mut(block)) {
                for i in 0..rows {
                    for j in 0..cols {
                        dst[j * rows + i] = src[i * cols + j];
                    }
                }
            }
        }
        Tensor {
            shape: self.shape.transposed(),
            data,
        }
    }

    // ------------------------------------------------------------------------
    // Reductions
    // ------------------------------------------------------------------------

    /// Fold the last axis by summation.
    ///
    /// A vector sums to a scalar; a matrix gives its row sums; higher ranks
    /// fold the innermost axis and keep the rest. Scalars are unchanged.
    pub fn sum(&self) -> Tensor<T> {
        if self.is_scalar() {
            return self.clone();
        }
        let last = self.shape[self.rank() - 1];
        let shape = self.shape.fold_shape();
        if last == 0 {
            return Tensor::zeros(shape);
        }
        let data = self
            .data
            .chunks(last)
            .map(|chunk| chunk.iter().fold(T::zero(), |acc, &x| acc + x))
            .collect();
        Tensor { shape, data }
    }

    /// Fold the last axis by averaging: `sum() / extent`.
    pub fn mean(&self) -> Tensor<T> {
        if self.is_scalar() {
            return self.clone();
        }
        let extent = self.shape[self.rank() - 1];
        if extent == 0 {
            return self.sum();
        }
        &self.sum() / T::from_usize(extent)
    }

    /// Sum of every element.
    pub fn sum_all(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &x| acc + x)
    }

    /// Mean of every element, folding one axis at a time down to a scalar.
    pub fn mean_all(&self) -> T {
        let mut reduced = self.mean();
        while !reduced.is_scalar() {
            reduced = reduced.mean();
        }
        reduced.as_scalar()
    }

    /// Sum over the first (batch) axis, dropping it.
    pub fn sum_over_batch(&self) -> Tensor<T> {
        if self.is_scalar() {
            return self.clone();
        }
        let shape = self.shape.sub_shape();
        let inner = shape.numel();
        let mut data = vec![T::zero(); inner];
        if inner > 0 {
            for row in self.data.chunks(inner) {
                for (acc, &x) in data.iter_mut().zip(row) {
                    *acc = *acc + x;
                }
            }
        }
        Tensor { shape, data }
    }

    /// Add `row` to every sub-tensor along the first axis.
    pub fn try_add_rows(&self, row: &Tensor<T>) -> Result<Tensor<T>, CoreError> {
        if self.is_scalar() {
            return Err(CoreError::RankMismatch {
                op: "add_rows",
                rank: 0,
            });
        }
        let expected = self.shape.sub_shape();
        if row.shape != expected {
            return Err(CoreError::shape_mismatch("add_rows", &expected, &row.shape));
        }
        let inner = row.len().max(1);
        let mut out = self.clone();
        parallel::for_each_mut(&mut out.data, |i, x| *x = *x + row.data[i % inner]);
        Ok(out)
    }

    pub fn add_rows(&self, row: &Tensor<T>) -> Tensor<T> {
        self.try_add_rows(row).unwrap_or_else(|e| panic!("{e}"))
    }

    // ------------------------------------------------------------------------
    // Contraction
    // ------------------------------------------------------------------------

    /// Contract two tensors.
    ///
    /// | lhs | rhs | result |
    /// |-----|-----|--------|
    /// | scalar | any | `rhs * lhs` |
    /// | any | scalar | `lhs * rhs` |
    /// | `[n]` | `[n]` | scalar inner product |
    /// | `[m, n]` | `[n]` | `[m]` matrix-vector product |
    /// | `[m, n]` | `[n, p]` | `[m, p]` matrix product |
    pub fn try_dot(&self, other: &Tensor<T>) -> Result<Tensor<T>, CoreError> {
        if self.is_scalar() {
            return Ok(other * self.data[0]);
        }
        if other.is_scalar() {
            return Ok(self * other.data[0]);
        }
        match (self.rank(), other.rank()) {
            (1, 1) => {
                if self.shape != other.shape {
                    return Err(CoreError::shape_mismatch("dot", &self.shape, &other.shape));
                }
                Ok(Tensor::scalar(inner_product(&self.data, &other.data)))
            }
            (2, 1) => {
                let (m, n) = (self.shape[0], self.shape[1]);
                if n != other.shape[0] {
                    return Err(CoreError::DimensionMismatch {
                        op: "dot",
                        left: n,
                        right: other.shape[0],
                    });
                }
                let data = (0..m)
                    .map(|i| inner_product(&self.data[i * n..(i + 1) * n], &other.data))
                    .collect();
                Ok(Tensor {
                    shape: Shape::new(vec![m]),
                    data,
                })
            }
            (2, 2) => {
                let (m, n) = (self.shape[0], self.shape[1]);
                let (k, p) = (other.shape[0], other.shape[1]);
                if n != k {
                    return Err(CoreError::DimensionMismatch {
                        op: "dot",
                        left: n,
                        right: k,
                    });
                }
                // Each output row is the matrix-vector product of other^T with a row of self.
                let other_t = other.transpose();
                let mut data = Vec::with_capacity(m * p);
                for i in 0..m {
                    let row = &self.data[i * n..(i + 1) * n];
                    data.extend((0..p).map(|j| inner_product(&other_t.data[j * n..(j + 1) * n], row)));
                }
                Ok(Tensor {
                    shape: Shape::new(vec![m, p]),
                    data,
                })
            }
            (l, r) => Err(CoreError::RankMismatch {
                op: "dot",
                rank: if l > 2 { l } else { r },
            }),
        }
    }

    /// Contract two tensors. Panics on mismatched dimensions or ranks.
    ///
    /// # Example
    ///
    /// ```rust
    /// use miniflow::tensor::Tensor;
    ///
    /// let a = Tensor::vector(vec![4, 2]);
    /// let b = Tensor::vector(vec![3, 5]);
    /// assert_eq!(a.dot(&b).as_scalar(), 22);
    /// ```
    pub fn dot(&self, other: &Tensor<T>) -> Tensor<T> {
        self.try_dot(other).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Outer product of two vectors: `[m] ⊗ [n]` is `[m, n]` with
    /// `out[i, j] = self[i] * other[j]`.
    pub fn try_outer(&self, other: &Tensor<T>) -> Result<Tensor<T>, CoreError> {
        if self.rank() != 1 {
            return Err(CoreError::RankMismatch {
                op: "outer",
                rank: self.rank(),
            });
        }
        if other.rank() != 1 {
            return Err(CoreError::RankMismatch {
                op: "outer",
                rank: other.rank(),
            });
        }
        let data = self
            .data
            .iter()
            .flat_map(|&a| other.data.iter().map(move |&b| a * b))
            .collect();
        Ok(Tensor {
            shape: Shape::new(vec![self.len(), other.len()]),
            data,
        })
    }

    pub fn outer(&self, other: &Tensor<T>) -> Tensor<T> {
        self.try_outer(other).unwrap_or_else(|e| panic!("{e}"))
    }
}

fn inner_product<T: Element>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b.iter())
        .fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

impl<T: Real> Tensor<T> {
    /// Element-wise exponential.
    pub fn exp(&self) -> Tensor<T> {
        self.map(Real::exp)
    }

    /// Largest absolute element-wise difference to a same-shape tensor.
    pub fn max_abs_diff(&self, other: &Tensor<T>) -> Result<T, CoreError> {
        let diff = self.try_sub(other)?;
        Ok(diff
            .data
            .iter()
            .fold(T::zero(), |acc, &x| if x.abs() > acc { x.abs() } else { acc }))
    }
}

// ============================================================================
// Index Operators
// ============================================================================

impl<T: Element, const N: usize> Index<[usize; N]> for Tensor<T> {
    type Output = T;

    fn index(&self, index: [usize; N]) -> &T {
        match self.offset(&index) {
            Ok(o) => &self.data[o],
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T: Element, const N: usize> IndexMut<[usize; N]> for Tensor<T> {
    fn index_mut(&mut self, index: [usize; N]) -> &mut T {
        match self.offset(&index) {
            Ok(o) => &mut self.data[o],
            Err(e) => panic!("{e}"),
        }
    }
}

// ============================================================================
// Arithmetic Operators
// ============================================================================

macro_rules! impl_tensor_binop {
    ($trait:ident, $method:ident, $try:ident, $assign_trait:ident, $assign:ident, $op:tt) => {
        impl<'a, 'b, T: Element> $trait<&'b Tensor<T>> for &'a Tensor<T> {
            type Output = Tensor<T>;

            fn $method(self, rhs: &'b Tensor<T>) -> Tensor<T> {
                self.$try(rhs).unwrap_or_else(|e| panic!("{e}"))
            }
        }

        impl<T: Element> $trait<Tensor<T>> for Tensor<T> {
            type Output = Tensor<T>;

            fn $method(self, rhs: Tensor<T>) -> Tensor<T> {
                &self $op &rhs
            }
        }

        impl<'b, T: Element> $trait<&'b Tensor<T>> for Tensor<T> {
            type Output = Tensor<T>;

            fn $method(self, rhs: &'b Tensor<T>) -> Tensor<T> {
                &self $op rhs
            }
        }

        impl<'a, T: Element> $trait<Tensor<T>> for &'a Tensor<T> {
            type Output = Tensor<T>;

            fn $method(self, rhs: Tensor<T>) -> Tensor<T> {
                self $op &rhs
            }
        }

        // Tensor ⊕ scalar broadcasts the scalar over every element.
        impl<'a, T: Element> $trait<T> for &'a Tensor<T> {
            type Output = Tensor<T>;

            fn $method(self, rhs: T) -> Tensor<T> {
                self.map(move |x| x $op rhs)
            }
        }

        impl<T: Element> $trait<T> for Tensor<T> {
            type Output = Tensor<T>;

            fn $method(self, rhs: T) -> Tensor<T> {
                &self $op rhs
            }
        }

        // Compound assignment replaces the whole value.
        impl<'b, T: Element> $assign_trait<&'b Tensor<T>> for Tensor<T> {
            fn $assign(&mut self, rhs: &'b Tensor<T>) {
                *self = &*self $op rhs;
            }
        }

        impl<T: Element> $assign_trait<Tensor<T>> for Tensor<T> {
            fn $assign(&mut self, rhs: Tensor<T>) {
                *self = &*self $op &rhs;
            }
        }

        impl<T: Element> $assign_trait<T> for Tensor<T> {
            fn $assign(&mut self, rhs: T) {
                *self = &*self $op rhs;
            }
        }
    };
}

impl_tensor_binop!(Add, add, try_add, AddAssign, add_assign, +);
impl_tensor_binop!(Sub, sub, try_sub, SubAssign, sub_assign, -);
impl_tensor_binop!(Mul, mul, try_mul, MulAssign, mul_assign, *);
impl_tensor_binop!(Div, div, try_div, DivAssign, div_assign, /);

// scalar ⊕ tensor, element-wise with the scalar on the left: `s - t` is
// `s - t[i]` and `s / t` is `s / t[i]`.
macro_rules! impl_scalar_lhs {
    ($($t:ty),*) => {
        $(
            impl<'a> Add<&'a Tensor<$t>> for $t {
                type Output = Tensor<$t>;
                fn add(self, rhs: &'a Tensor<$t>) -> Tensor<$t> {
                    rhs.map(move |x| self + x)
                }
            }

            impl Add<Tensor<$t>> for $t {
                type Output = Tensor<$t>;
                fn add(self, rhs: Tensor<$t>) -> Tensor<$t> {
                    self + &rhs
                }
            }

            impl<'a> Sub<&'a Tensor<$t>> for $t {
                type Output = Tensor<$t>;
                fn sub(self, rhs: &'a Tensor<$t>) -> Tensor<$t> {
                    rhs.map(move |x| self - x)
                }
            }

            impl Sub<Tensor<$t>> for $t {
                type Output = Tensor<$t>;
                fn sub(self, rhs: Tensor<$t>) -> Tensor<$t> {
                    self - &rhs
                }
            }

            impl<'a> Mul<&'a Tensor<$t>> for $t {
                type Output = Tensor<$t>;
                fn mul(self, rhs: &'a Tensor<$t>) -> Tensor<$t> {
                    rhs.map(move |x| self * x)
                }
            }

            impl Mul<Tensor<$t>> for $t {
                type Output = Tensor<$t>;
                fn mul(self, rhs: Tensor<$t>) -> Tensor<$t> {
                    self * &rhs
                }
            }

            impl<'a> Div<&'a Tensor<$t>> for $t {
                type Output = Tensor<$t>;
                fn div(self, rhs: &'a Tensor<$t>) -> Tensor<$t> {
                    rhs.map(move |x| self / x)
                }
            }

            impl Div<Tensor<$t>> for $t {
                type Output = Tensor<$t>;
                fn div(self, rhs: Tensor<$t>) -> Tensor<$t> {
                    self / &rhs
                }
            }
        )*
    };
}

impl_scalar_lhs!(i32, i64, f32, f64);

impl<'a, T: Element + Neg<Output = T>> Neg for &'a Tensor<T> {
    type Output = Tensor<T>;

    fn neg(self) -> Tensor<T> {
        self.map(|x| -x)
    }
}

impl<T: Element + Neg<Output = T>> Neg for Tensor<T> {
    type Output = Tensor<T>;

    fn neg(self) -> Tensor<T> {
        -&self
    }
}

// ============================================================================
// Display
// ============================================================================

impl<T: Element> fmt::Display for Tensor<T> {
    /// Nested braces, one level per axis: `{{1, 2}, {3, 4}}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_level<T: fmt::Display>(
            f: &mut fmt::Formatter<'_>,
            dims: &[usize],
            data: &[T],
        ) -> fmt::Result {
            match dims {
                [] => write!(f, "{}", data[0]),
                [_] => {
                    write!(f, "{{")?;
                    for (i, x) in data.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{x}")?;
                    }
                    write!(f, "}}")
                }
                [n, rest @ ..] => {
                    let inner: usize = rest.iter().product();
                    write!(f, "{{")?;
                    for i in 0..*n {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write_level(f, rest, &data[i * inner..(i + 1) * inner])?;
                    }
                    write!(f, "}}")
                }
            }
        }
        write_level(f, self.shape.dims(), &self.data)
    }
}

// ============================================================================
// Tests
// ============================================================================
