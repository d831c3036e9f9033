//! Node execution hooks for observability.
//!
//! Hooks observe values as the graph computes them without changing the
//! passes. They are purely observational: no return value, no effect on
//! the numbers.
//!
//! ## Events
//!
//! - `on_value`: a node reported its freshly computed value (the cost node
//!   reports under the label `"Cost"`)
//! - `on_step`: a training step finished with the given cost
//!
//! ## Example
//!
//! ```rust
//! use miniflow::hooks::NodeHook;
//! use miniflow::network::NodeId;
//! use miniflow::tensor::Tensor;
//!
//! struct PrintCost;
//!
//! impl NodeHook for PrintCost {
//!     fn on_value(&self, _node: NodeId, label: &str, value: &Tensor) {
//!         println!("{label}: {value}");
//!     }
//! }
//! ```

use std::sync::Mutex;

use miniflow_core::Scalar;

use crate::network::NodeId;
use crate::tensor::Tensor;

// ============================================================================
// Node Hook Trait
// ============================================================================

/// Trait for observing graph execution events.
///
/// All methods default to no-ops.
pub trait NodeHook: Send + Sync {
    /// Called after a reporting node computes its value.
    fn on_value(&self, _node: NodeId, _label: &str, _value: &Tensor) {}

    /// Called after a training step. `step` counts from 1.
    fn on_step(&self, _step: usize, _cost: Scalar) {}
}

// ============================================================================
// Null Hook (Default)
// ============================================================================

/// A no-op hook for when no observation is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHook;

impl NodeHook for NullHook {}

// ============================================================================
// Tracing Hook
// ============================================================================

/// Emits every event as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHook {
    /// Log values at `debug` instead of `trace`.
    pub verbose: bool,
}

impl TracingHook {
    pub fn new() -> Self {
        Self { verbose: false }
    }

    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

impl NodeHook for TracingHook {
    fn on_value(&self, node: NodeId, label: &str, value: &Tensor) {
        if self.verbose {
            tracing::debug!(node = node.index(), %label, %value, "node value");
        } else {
            tracing::trace!(node = node.index(), %label, %value, "node value");
        }
    }

    fn on_step(&self, step: usize, cost: Scalar) {
        tracing::debug!(step, cost, "training step");
    }
}

// ============================================================================
// Cost Recorder
// ============================================================================

/// Records every reported value and step cost.
#[derive(Debug, Default)]
pub struct CostRecorder {
    values: Mutex<Vec<(String, Scalar)>>,
    steps: Mutex<Vec<Scalar>>,
}

impl CostRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(label, sum of elements)` for every `on_value`, in order.
    pub fn values(&self) -> Vec<(String, Scalar)> {
        self.values
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// The cost of every finished step, in order.
    pub fn steps(&self) -> Vec<Scalar> {
        self.steps.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Values reported under `label`.
    pub fn values_for(&self, label: &str) -> Vec<Scalar> {
        self.values()
            .into_iter()
            .filter(|(l, _)| l == label)
            .map(|(_, v)| v)
            .collect()
    }
}

impl NodeHook for CostRecorder {
    fn on_value(&self, _node: NodeId, label: &str, value: &Tensor) {
        if let Ok(mut values) = self.values.lock() {
            values.push((label.to_string(), value.sum_all()));
        }
    }

    fn on_step(&self, _step: usize, cost: Scalar) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(cost);
        }
    }
}
