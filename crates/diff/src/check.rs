//! # Gradient Checking
//!
//! Compares the gradients the backward pass accumulates in leaf nodes with
//! central finite differences of the terminal cost:
//!
//! ```text
//! ∂cost/∂v[i] ≈ (cost(v[i] + h) - cost(v[i] - h)) / 2h
//! ```
//!
//! Each estimate perturbs one element, re-runs the forward pass, and restores
//! the original value, so a check leaves the network as it found it.

use miniflow_core::{CoreError, Scalar};
use thiserror::Error;

use crate::graph::Graph;
use crate::network::NodeId;

/// Error from gradient checking.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GradCheckError {
    #[error(
        "Gradient mismatch at node {node}[{elem}]: analytical={analytical}, numerical={numerical}, diff={diff}"
    )]
    Mismatch {
        node: usize,
        elem: usize,
        analytical: Scalar,
        numerical: Scalar,
        diff: Scalar,
    },

    #[error(transparent)]
    Shape(#[from] CoreError),
}

/// Central-difference estimate of `∂cost/∂node[elem]`.
pub fn numerical_gradient(
    graph: &mut Graph<'_>,
    node: NodeId,
    elem: usize,
    h: Scalar,
) -> Result<Scalar, CoreError> {
    let original = graph.value(node).clone();
    if elem >= original.len() {
        return Err(CoreError::IndexOutOfRange {
            index: elem,
            len: original.len(),
        });
    }

    let mut shifted_cost = |delta: Scalar| -> Result<Scalar, CoreError> {
        let mut shifted = original.clone();
        shifted.data_mut()[elem] += delta;
        graph.network_mut().set_value(node, shifted);
        graph.try_forward()?;
        Ok(graph.cost())
    };
    let f_plus = shifted_cost(h);
    let f_minus = shifted_cost(-h);

    graph.network_mut().set_value(node, original);
    graph.try_forward()?;

    Ok((f_plus? - f_minus?) / (2.0 * h))
}

/// Check the backward-pass gradient of every Trainable in the graph.
pub fn grad_check(graph: &mut Graph<'_>, h: Scalar, tolerance: Scalar) -> Result<(), GradCheckError> {
    let nodes: Vec<NodeId> = graph
        .order()
        .iter()
        .copied()
        .filter(|&id| graph.network().kind(id).is_trainable())
        .collect();
    grad_check_nodes(graph, &nodes, h, tolerance)
}

/// Check the backward-pass gradient of the given leaves.
pub fn grad_check_nodes(
    graph: &mut Graph<'_>,
    nodes: &[NodeId],
    h: Scalar,
    tolerance: Scalar,
) -> Result<(), GradCheckError> {
    graph.try_forward()?;
    graph.try_backward()?;
    let expected: Vec<_> = nodes
        .iter()
        .map(|&id| (id, graph.gradient(id)[0].clone()))
        .collect();

    for (id, grad) in expected {
        for (elem, &analytical) in grad.data().iter().enumerate() {
            let numerical = numerical_gradient(graph, id, elem, h)?;
            let diff = (numerical - analytical).abs();

            // Relative error for large values
            let scale = analytical.abs().max(numerical.abs()).max(1.0);
            if diff / scale > tolerance && diff > tolerance {
                tracing::debug!(node = id.index(), elem, analytical, numerical, "gradient mismatch");
                return Err(GradCheckError::Mismatch {
                    node: id.index(),
                    elem,
                    analytical,
                    numerical,
                    diff,
                });
            }
        }
    }
    Ok(())
}
