//! # Graph Scheduler
//!
//! A `Graph` fixes an evaluation order over the nodes a terminal (cost) node
//! depends on, then drives the three passes over that order:
//!
//! - **forward**: producers before consumers
//! - **backward**: the reverse order, so a node's consumers have all
//!   written their gradient slots before the node reads them
//! - **update**: forward order, only Trainable nodes act
//!
//! ## Ordering
//!
//! The order is a depth-first post-order over inbound edges (visited in slot
//! order) with a visited set, so every reachable node appears exactly once
//! and after all of its inputs. Leaves are then moved to the front, keeping
//! their discovery order. A cyclic wiring cannot be ordered and is not
//! detected.
//!
//! ## Example
//!
//! ```rust
//! use miniflow::graph::Graph;
//! use miniflow::network::Network;
//! use miniflow::tensor::Tensor;
//!
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
//! let history = graph.train_with_history(0.1, 50);
//! assert!(history[49] < history[0]);
//! ```

use std::collections::HashSet;

use miniflow_core::{CoreError, Scalar};

use crate::network::{Network, NodeId};
use crate::tensor::Tensor;
use crate::train::{TrainConfig, TrainError};

/// An evaluation order over a network, rooted at a terminal node.
#[derive(Debug)]
pub struct Graph<'n> {
    network: &'n mut Network,
    terminal: NodeId,
    order: Vec<NodeId>,
    /// `order` as a set; the backward pass reads no consumer outside it.
    scheduled: HashSet<NodeId>,
    steps: usize,
}

impl<'n> Graph<'n> {
    /// Order every node `terminal` depends on.
    pub fn new(network: &'n mut Network, terminal: NodeId) -> Self {
        let order = topological_order(network, terminal);
        let scheduled = order.iter().copied().collect();
        tracing::debug!(
            nodes = order.len(),
            terminal = terminal.index(),
            "built graph"
        );
        Self {
            network,
            terminal,
            order,
            scheduled,
            steps: 0,
        }
    }

    /// Nodes in forward order.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn terminal(&self) -> NodeId {
        self.terminal
    }

    pub fn network(&self) -> &Network {
        &*self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        self.network
    }

    pub fn value(&self, id: NodeId) -> &Tensor {
        self.network.value(id)
    }

    pub fn gradient(&self, id: NodeId) -> &[Tensor] {
        self.network.gradient(id)
    }

    /// The terminal node's current value summed to a scalar.
    pub fn cost(&self) -> Scalar {
        self.network.value(self.terminal).sum_all()
    }

    /// Training steps taken so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    // ------------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------------

    pub fn try_forward(&mut self) -> Result<(), CoreError> {
        for &id in &self.order {
            self.network.try_forward_node(id)?;
        }
        Ok(())
    }

    /// Forward every node in order. Panics on a shape-incompatible wiring.
    pub fn forward(&mut self) {
        self.try_forward().unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_backward(&mut self) -> Result<(), CoreError> {
        for &id in self.order.iter().rev() {
            self.network.try_backward_node_within(id, &self.scheduled)?;
        }
        Ok(())
    }

    /// Backpropagate every node in reverse order. Consumers outside the
    /// graph contribute nothing.
    pub fn backward(&mut self) {
        self.try_backward().unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_update(&mut self, learning_rate: Scalar) -> Result<(), CoreError> {
        for &id in &self.order {
            self.network.try_update_node(id, learning_rate)?;
        }
        Ok(())
    }

    /// One gradient-descent step on every Trainable.
    pub fn update(&mut self, learning_rate: Scalar) {
        self.try_update(learning_rate)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    // ------------------------------------------------------------------------
    // Training
    // ------------------------------------------------------------------------

    /// Forward, backward, update. Returns the cost seen by the forward pass.
    pub fn try_train_step(&mut self, learning_rate: Scalar) -> Result<Scalar, CoreError> {
        self.try_forward()?;
        let cost = self.cost();
        self.try_backward()?;
        self.try_update(learning_rate)?;

        self.steps += 1;
        tracing::trace!(step = self.steps, cost, "train step");
        self.network.hook().on_step(self.steps, cost);
        Ok(cost)
    }

    pub fn train_step(&mut self, learning_rate: Scalar) -> Scalar {
        self.try_train_step(learning_rate)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Repeat [`Graph::train_step`] `iterations` times.
    pub fn train(&mut self, learning_rate: Scalar, iterations: usize) {
        self.train_with_history(learning_rate, iterations);
    }

    /// Like [`Graph::train`], returning the cost of every step.
    pub fn train_with_history(&mut self, learning_rate: Scalar, iterations: usize) -> Vec<Scalar> {
        self.fit(&TrainConfig::new(learning_rate, iterations))
    }

    /// Train as configured, returning the cost of every step.
    ///
    /// The config is validated first; a rejected config takes no step.
    pub fn try_fit(&mut self, config: &TrainConfig) -> Result<Vec<Scalar>, TrainError> {
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "rejected training config");
            return Err(e.into());
        }
        tracing::debug!(
            learning_rate = config.learning_rate,
            iterations = config.iterations,
            "training started"
        );
        let mut history = Vec::with_capacity(config.iterations);
        for i in 1..=config.iterations {
            let cost = self.try_train_step(config.learning_rate)?;
            if config.log_every.is_some_and(|n| n > 0 && i % n == 0) {
                tracing::info!(iteration = i, cost, "training progress");
            }
            history.push(cost);
        }
        tracing::info!(
            iterations = config.iterations,
            final_cost = history.last().copied(),
            "training finished"
        );
        Ok(history)
    }

    /// Train as configured. Panics on an invalid config or wiring.
    pub fn fit(&mut self, config: &TrainConfig) -> Vec<Scalar> {
        self.try_fit(config).unwrap_or_else(|e| panic!("{e}"))
    }
}

/// Depth-first post-order over inbound edges with leaves moved first.
fn topological_order(network: &Network, terminal: NodeId) -> Vec<NodeId> {
    let mut visited = HashSet::new();
    let mut post = Vec::with_capacity(network.node_count());
    // (node, next inbound slot to visit)
    let mut stack = vec![(terminal, 0usize)];
    visited.insert(terminal);

    while let Some((node, slot)) = stack.pop() {
        let inbound = network.inbound(node);
        match inbound.get(slot) {
            Some(&next) => {
                stack.push((node, slot + 1));
                if visited.insert(next) {
                    stack.push((next, 0));
                }
            }
            None => post.push(node),
        }
    }

    let (mut order, rest): (Vec<_>, Vec<_>) =
        post.into_iter().partition(|&id| network.is_input(id));
    order.extend(rest);
    order
}
