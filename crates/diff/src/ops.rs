//! # Node Operations
//!
//! The node kinds of the computational graph and the math behind each one.
//! Every operation knows how to:
//!
//! - Execute forward (compute its value from its inbound values)
//! - Compute its VJP (vector-Jacobian product): given one outbound
//!   contribution of the cost gradient, the contribution to every inbound
//!   gradient slot
//!
//! ## Operations
//!
//! | Kind | Inbound | Forward | Backward |
//! |------|---------|---------|----------|
//! | Input | none | value set externally | sum of outbound grads |
//! | Trainable | none | value set externally | sum of outbound grads |
//! | Linear | X, W, b | `X · W + b` | `g·Wᵀ` (`g ⊗ W` for vector W), `Xᵀ·g`, `sum(g)` |
//! | Sigmoid | X | `1 / (1 + e^-X)` | `v (1 - v) g` |
//! | MeanSquaredError | Y, Ŷ | `mean((Y - Ŷ)²)` | `2/m · diff`, `-2/m · diff` |
//! | Debug | X | X | seeds ones into X |

use std::fmt;

use miniflow_core::{CoreError, Shape};

use crate::tensor::Tensor;

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Constant leaf; its value only changes through `Network::set_value`.
    Input,

    /// Leaf updated by gradient descent.
    Trainable,

    /// Affine map `X · W + b`.
    Linear,

    /// Element-wise logistic function.
    Sigmoid,

    /// Mean squared error between labels and predictions; the graph root.
    MeanSquaredError,

    /// Identity that seeds a unit gradient into its input.
    Debug,
}

impl NodeKind {
    /// Number of inbound edges this kind expects.
    pub fn num_inputs(&self) -> usize {
        match self {
            NodeKind::Input | NodeKind::Trainable => 0,
            NodeKind::Sigmoid | NodeKind::Debug => 1,
            NodeKind::MeanSquaredError => 2,
            NodeKind::Linear => 3,
        }
    }

    /// Leaves: nodes with no inbound edges, placed first by the scheduler.
    pub fn is_input(&self) -> bool {
        matches!(self, NodeKind::Input | NodeKind::Trainable)
    }

    pub fn is_trainable(&self) -> bool {
        matches!(self, NodeKind::Trainable)
    }

    /// Label a node of this kind reports under until renamed.
    pub fn default_label(&self) -> &'static str {
        match self {
            NodeKind::Input => "Input",
            NodeKind::Trainable => "Trainable",
            NodeKind::Linear => "Linear",
            NodeKind::Sigmoid => "Sigmoid",
            NodeKind::MeanSquaredError => "Cost",
            NodeKind::Debug => "Debug",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Input => write!(f, "Input"),
            NodeKind::Trainable => write!(f, "Trainable"),
            NodeKind::Linear => write!(f, "Linear"),
            NodeKind::Sigmoid => write!(f, "Sigmoid"),
            NodeKind::MeanSquaredError => write!(f, "MeanSquaredError"),
            NodeKind::Debug => write!(f, "Debug"),
        }
    }
}

// ============================================================================
// Linear
// ============================================================================

/// `X · W + b`.
///
/// The bias either matches the product's shape, is one row of a batched
/// product (added to every row), or is a scalar.
pub fn linear(x: &Tensor, w: &Tensor, b: &Tensor) -> Result<Tensor, CoreError> {
    let product = x.try_dot(w)?;
    if product.shape() == b.shape() {
        return product.try_add(b);
    }
    if !product.is_scalar() && *b.shape() == product.shape().sub_shape() {
        return product.try_add_rows(b);
    }
    if b.is_scalar() {
        return Ok(&product + b.as_scalar());
    }
    Err(CoreError::shape_mismatch("linear", product.shape(), b.shape()))
}

/// Contributions of one outbound gradient `grad` to the X, W and b slots.
pub fn linear_vjp(
    x: &Tensor,
    w: &Tensor,
    b_shape: &Shape,
    grad: &Tensor,
) -> Result<[Tensor; 3], CoreError> {
    // C = X·W: ∂L/∂X = g·Wᵀ, ∂L/∂W = Xᵀ·g
    let grad_x = if x.rank() == 2 && w.rank() == 1 {
        // C[i] = Σ_j X[i, j]·W[j], so ∂L/∂X[i, j] = g[i]·W[j]
        grad.try_outer(w)?
    } else {
        grad.try_dot(&w.transpose())?
    };
    let grad_w = x.transpose().try_dot(grad)?;
    let grad_b = fold_to(grad, b_shape)?;
    Ok([grad_x, grad_w, grad_b])
}

/// Sum `grad` down to `shape`, undoing the bias broadcast of [`linear`].
fn fold_to(grad: &Tensor, shape: &Shape) -> Result<Tensor, CoreError> {
    if grad.shape() == shape {
        return Ok(grad.clone());
    }
    if !grad.is_scalar() && grad.shape().sub_shape() == *shape {
        return Ok(grad.sum_over_batch());
    }
    if shape.is_scalar() {
        return Ok(Tensor::scalar(grad.sum_all()));
    }
    Err(CoreError::shape_mismatch("linear bias", shape, grad.shape()))
}

// ============================================================================
// Sigmoid
// ============================================================================

/// `1 / (1 + e^-x)`, element-wise.
pub fn sigmoid(x: &Tensor) -> Tensor {
    1.0 / (1.0 + (-x).exp())
}

/// `v (1 - v) g`, with `v` the sigmoid's own output.
pub fn sigmoid_vjp(value: &Tensor, grad: &Tensor) -> Result<Tensor, CoreError> {
    value.try_mul(&(1.0 - value))?.try_mul(grad)
}

// ============================================================================
// Mean Squared Error
// ============================================================================

/// `(diff, cost)` with `diff = labels - predictions` and `cost` the scalar
/// mean of `diff²`.
pub fn squared_error(labels: &Tensor, predictions: &Tensor) -> Result<(Tensor, Tensor), CoreError> {
    let diff = labels.try_sub(predictions)?;
    let cost = Tensor::scalar(diff.sqr().mean_all());
    Ok((diff, cost))
}

/// Gradients for the labels and predictions slots, with `m` the number of
/// averaged elements.
pub fn squared_error_vjp(diff: &Tensor) -> [Tensor; 2] {
    let m = diff.len().max(1) as f64;
    let grad_labels = diff * (2.0 / m);
    let grad_predictions = -&grad_labels;
    [grad_labels, grad_predictions]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_inputs() {
        assert_eq!(NodeKind::Input.num_inputs(), 0);
        assert_eq!(NodeKind::Linear.num_inputs(), 3);
        assert_eq!(NodeKind::MeanSquaredError.num_inputs(), 2);
        assert!(NodeKind::Trainable.is_input());
        assert!(!NodeKind::Sigmoid.is_input());
        assert_eq!(NodeKind::MeanSquaredError.default_label(), "Cost");
    }

    #[test]
    fn test_linear_scalar() {
        let v = linear(&Tensor::scalar(0.2), &Tensor::scalar(1.0), &Tensor::scalar(0.3)).unwrap();
        assert!((v.as_scalar() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_linear_batched_row_bias() {
        // 2 samples, 3 features, 2 outputs
        let x = Tensor::matrix(2, 3, vec![1.0, 0.0, 2.0, 0.0, 1.0, 1.0]);
        let w = Tensor::matrix(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = Tensor::vector(vec![0.5, -0.5]);
        let v = linear(&x, &w, &b).unwrap();
        assert_eq!(v.shape().dims(), &[2, 2]);
        assert_eq!(v.data(), &[11.5, 13.5, 8.5, 9.5]);

        let g = Tensor::full([2, 2], 1.0);
        let [gx, gw, gb] = linear_vjp(&x, &w, b.shape(), &g).unwrap();
        assert_eq!(gx.shape(), x.shape());
        assert_eq!(gx.data(), &[3.0, 7.0, 11.0, 3.0, 7.0, 11.0]);
        assert_eq!(gw.shape(), w.shape());
        assert_eq!(gw.data(), &[1.0, 1.0, 1.0, 1.0, 3.0, 3.0]);
        assert_eq!(gb.data(), &[2.0, 2.0]);
    }

    #[test]
    fn test_linear_matrix_times_vector() {
        // 3 samples, 2 features, one output per sample
        let x = Tensor::matrix(3, 2, vec![1.0, 2.0, 0.5, -1.0, 0.0, 3.0]);
        let w = Tensor::vector(vec![0.5, -0.25]);
        let b = Tensor::scalar(0.1);
        let v = linear(&x, &w, &b).unwrap();
        assert_eq!(v.shape().dims(), &[3]);

        let g = Tensor::vector(vec![1.0, 2.0, -1.0]);
        let [gx, gw, gb] = linear_vjp(&x, &w, b.shape(), &g).unwrap();
        assert_eq!(gx.shape(), x.shape());
        assert_eq!(gx.data(), &[0.5, -0.25, 1.0, -0.5, -0.5, 0.25]);
        assert_eq!(gw.shape(), w.shape());
        assert_eq!(gw.data(), &[2.0, -3.0]);
        assert!(gb.is_scalar());
        assert_eq!(gb.as_scalar(), 2.0);
    }

    #[test]
    fn test_linear_rejects_bad_bias() {
        let x = Tensor::full([2, 3], 1.0);
        let w = Tensor::full([3, 2], 1.0);
        let b = Tensor::full([3], 1.0);
        assert!(linear(&x, &w, &b).is_err());
    }

    #[test]
    fn test_sigmoid() {
        let v = sigmoid(&Tensor::scalar(0.5));
        assert!((v.as_scalar() - 0.6224593).abs() < 1e-6);
        let zero = sigmoid(&Tensor::vector(vec![0.0, 0.0]));
        assert_eq!(zero.data(), &[0.5, 0.5]);

        let g = sigmoid_vjp(&v, &Tensor::scalar(1.0)).unwrap();
        assert!((g.as_scalar() - 0.235).abs() < 1e-3);
    }

    #[test]
    fn test_squared_error() {
        let (diff, cost) = squared_error(&Tensor::scalar(0.5), &Tensor::scalar(0.6224)).unwrap();
        assert!((diff.as_scalar() + 0.1224).abs() < 1e-12);
        assert!((cost.as_scalar() - 0.015).abs() < 1e-3);

        let [gy, gp] = squared_error_vjp(&diff);
        assert!((gy.as_scalar() + 0.2448).abs() < 1e-9);
        assert!((gp.as_scalar() - 0.2448).abs() < 1e-9);
    }

    #[test]
    fn test_squared_error_averages_all_elements() {
        let labels = Tensor::matrix(2, 2, vec![1.0, 0.0, 0.0, 1.0]);
        let preds = Tensor::full([2, 2], 0.5);
        let (diff, cost) = squared_error(&labels, &preds).unwrap();
        assert!(cost.is_scalar());
        assert!((cost.as_scalar() - 0.25).abs() < 1e-12);

        let [gy, _] = squared_error_vjp(&diff);
        assert_eq!(gy.data(), &[0.25, -0.25, -0.25, 0.25]);
    }
}
