//! # Training Utilities
//!
//! - `TrainConfig`: learning rate, iteration count and progress logging,
//!   deserializable so runs can be described in JSON
//! - `LogisticModel`: the Input → Linear → Sigmoid → MeanSquaredError network
//!   with handles to every node
//! - Builders for the scalar demo network and for batched logistic regression
//!
//! ## Example: the scalar demo network
//!
//! ```rust
//! use miniflow::train::{scalar_network, TrainConfig};
//!
//! let mut model = scalar_network();
//! let config = TrainConfig::default().with_iterations(200);
//! let history = model.graph().fit(&config);
//!
//! assert!(history.last().unwrap() < &history[0]);
//! ```

use miniflow_core::{CoreError, Scalar};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::Graph;
use crate::network::{Network, NodeId};
use crate::ops;
use crate::tensor::Tensor;

// ============================================================================
// Train Configuration
// ============================================================================

/// Errors in a training configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("learning rate must be finite and positive, got {0}")]
    InvalidLearningRate(Scalar),

    #[error("log interval must be at least 1")]
    ZeroLogInterval,
}

/// Errors from a configured training run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Shape(#[from] CoreError),
}

/// Configuration for a gradient-descent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Step size of every update
    pub learning_rate: Scalar,
    /// Number of train steps
    pub iterations: usize,
    /// Log the cost at `info` every this many steps
    pub log_every: Option<usize>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            iterations: 500,
            log_every: None,
        }
    }
}

impl TrainConfig {
    pub fn new(learning_rate: Scalar, iterations: usize) -> Self {
        Self {
            learning_rate,
            iterations,
            log_every: None,
        }
    }

    /// Set the learning rate.
    pub fn with_learning_rate(mut self, learning_rate: Scalar) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the iteration count.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Log progress every `n` steps.
    pub fn with_log_every(mut self, n: usize) -> Self {
        self.log_every = Some(n);
        self
    }

    /// Reject values gradient descent cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        if self.log_every == Some(0) {
            return Err(ConfigError::ZeroLogInterval);
        }
        Ok(())
    }
}

// ============================================================================
// Logistic Model
// ============================================================================

/// A single logistic layer scored by mean squared error.
#[derive(Debug)]
pub struct LogisticModel {
    pub network: Network,
    pub features: NodeId,
    pub labels: NodeId,
    pub weights: NodeId,
    pub bias: NodeId,
    pub linear: NodeId,
    pub sigmoid: NodeId,
    pub cost: NodeId,
}

impl LogisticModel {
    fn build(features: Tensor, labels: Tensor, weights: Tensor, bias: Tensor) -> Self {
        let mut network = Network::new();
        let x = network.input(features);
        let y = network.input(labels);
        let w = network.trainable(weights);
        let b = network.trainable(bias);
        let linear = network.linear(x, w, b);
        let sigmoid = network.sigmoid(linear);
        let cost = network.mean_squared_error(y, sigmoid);

        network.set_label(x, "X");
        network.set_label(y, "Y");
        network.set_label(w, "W");
        network.set_label(b, "b");

        Self {
            network,
            features: x,
            labels: y,
            weights: w,
            bias: b,
            linear,
            sigmoid,
            cost,
        }
    }

    /// Schedule the network for training.
    pub fn graph(&mut self) -> Graph<'_> {
        Graph::new(&mut self.network, self.cost)
    }

    /// Current prediction; valid after a forward pass.
    pub fn prediction(&self) -> &Tensor {
        self.network.value(self.sigmoid)
    }

    /// Current cost; valid after a forward pass.
    pub fn cost_value(&self) -> Scalar {
        self.network.value(self.cost).sum_all()
    }
}

/// The scalar demo network: fit `sigmoid(W · 0.2 + b)` to `0.5` from
/// `W = 1`, `b = 0.3`.
pub fn scalar_network() -> LogisticModel {
    LogisticModel::build(
        Tensor::scalar(0.2),
        Tensor::scalar(0.5),
        Tensor::scalar(1.0),
        Tensor::scalar(0.3),
    )
}

/// Batched logistic regression.
///
/// `features` is `[n, k]`, `weights` `[k, o]`, `bias` `[o]` and `labels`
/// `[n, o]`. The shapes are checked up front.
pub fn logistic_regression(
    features: Tensor,
    labels: Tensor,
    weights: Tensor,
    bias: Tensor,
) -> Result<LogisticModel, CoreError> {
    if features.rank() != 2 {
        return Err(CoreError::RankMismatch {
            op: "logistic_regression",
            rank: features.rank(),
        });
    }
    let product = ops::linear(&features, &weights, &bias)?;
    ops::squared_error(&labels, &product)?;

    tracing::debug!(
        samples = features.shape()[0],
        features = features.shape()[1],
        "building logistic regression"
    );
    Ok(LogisticModel::build(features, labels, weights, bias))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TrainConfig::default();
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.iterations, 500);
        assert_eq!(config.log_every, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builders() {
        let config = TrainConfig::new(1.0, 100).with_log_every(10);
        assert_eq!(config.log_every, Some(10));
        let config = config.with_learning_rate(0.5).with_iterations(3);
        assert_eq!(config, TrainConfig::new(0.5, 3).with_log_every(10));
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            TrainConfig::new(-1.0, 10).validate(),
            Err(ConfigError::InvalidLearningRate(-1.0))
        );
        assert!(TrainConfig::new(Scalar::NAN, 10).validate().is_err());
        assert_eq!(
            TrainConfig::default().with_log_every(0).validate(),
            Err(ConfigError::ZeroLogInterval)
        );
    }

    #[test]
    fn test_config_from_json() {
        let config: TrainConfig =
            serde_json::from_str(r#"{"learning_rate": 0.01, "iterations": 20}"#).unwrap();
        assert_eq!(config, TrainConfig::new(0.01, 20));

        let config: TrainConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TrainConfig::default());
    }

    #[test]
    fn test_scalar_network_labels() {
        let model = scalar_network();
        assert_eq!(model.network.label(model.weights), "W");
        assert_eq!(model.network.label(model.cost), "Cost");
        assert_eq!(model.network.trainables(), vec![model.weights, model.bias]);
    }

    #[test]
    fn test_logistic_regression_shape_checks() {
        let ok = logistic_regression(
            Tensor::full([4, 3], 1.0),
            Tensor::full([4, 1], 1.0),
            Tensor::full([3, 1], 0.1),
            Tensor::vector(vec![0.0]),
        );
        assert!(ok.is_ok());

        let bad_weights = logistic_regression(
            Tensor::full([4, 3], 1.0),
            Tensor::full([4, 1], 1.0),
            Tensor::full([2, 1], 0.1),
            Tensor::vector(vec![0.0]),
        );
        assert!(matches!(
            bad_weights,
            Err(CoreError::DimensionMismatch { op: "dot", .. })
        ));

        let bad_labels = logistic_regression(
            Tensor::full([4, 3], 1.0),
            Tensor::full([3, 1], 1.0),
            Tensor::full([3, 1], 0.1),
            Tensor::vector(vec![0.0]),
        );
        assert!(matches!(bad_labels, Err(CoreError::ShapeMismatch { .. })));

        let rank_one = logistic_regression(
            Tensor::vector(vec![1.0, 2.0]),
            Tensor::scalar(1.0),
            Tensor::full([2, 1], 0.1),
            Tensor::vector(vec![0.0]),
        );
        assert!(matches!(rank_one, Err(CoreError::RankMismatch { rank: 1, .. })));
    }
}
