//! # miniflow - reverse-mode autodiff over a node graph
//!
//! A small automatic-differentiation engine: leaf nodes hold tensors,
//! operation nodes combine them, a cost node scores the result, and a
//! scheduler runs forward, backward and gradient-descent passes in
//! dependency order.
//!
//! ## Core Concepts
//!
//! - **Tensors** are n-dimensional arrays with a runtime shape; rank 0 is a
//!   scalar
//! - **Nodes** live in an arena (`Network`); edges carry the consumer's
//!   inbound slot so gradients can be routed back to the right producer
//! - **The graph** orders nodes once so producers precede consumers, then
//!   walks that order forward and its reverse backward
//!
//! ## Modules
//!
//! - [`tensor`]: element-wise ops, reductions, `transpose`, `dot`
//! - [`ops`]: node kinds and their forward / VJP math
//! - [`network`]: the node arena and per-node passes
//! - [`graph`]: ordering and the forward/backward/update passes
//! - [`hooks`]: observing node values and training steps
//! - [`train`]: training configuration and model builders
//! - [`check`]: finite-difference gradient checking
//!
//! ## Example
//!
//! ```rust
//! use miniflow::{Graph, Network, Tensor};
//!
//! // Fit sigmoid(W * 0.2 + b) to 0.5
//! let mut net = Network::new();
//! let x = net.input(Tensor::scalar(0.2));
//! let y = net.input(Tensor::scalar(0.5));
//! let w = net.trainable(Tensor::scalar(1.0));
//! let b = net.trainable(Tensor::scalar(0.3));
//! let l = net.linear(x, w, b);
//! let s = net.sigmoid(l);
//! let cost = net.mean_squared_error(y, s);
//!
//! let mut graph = Graph::new(&mut net, cost);
//! graph.train(1.0, 100);
//! assert!(graph.cost() < 1e-10);
//! ```

pub mod check;
pub mod graph;
pub mod hooks;
pub mod network;
pub mod ops;
pub mod tensor;
pub mod train;

// Re-export key types
pub use check::{grad_check, GradCheckError};
pub use graph::Graph;
pub use hooks::{CostRecorder, NodeHook, NullHook, TracingHook};
pub use miniflow_core::{CoreError, Scalar, Shape};
pub use network::{Network, NodeId, Outbound};
pub use ops::NodeKind;
pub use tensor::{Element, Real, Tensor};
pub use train::{
    logistic_regression, scalar_network, ConfigError, LogisticModel, TrainConfig, TrainError,
};
