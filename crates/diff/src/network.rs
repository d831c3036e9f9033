//! # Node Network
//!
//! The arena owning every node of a computational graph. Nodes live in a
//! `petgraph` directed graph; an edge runs from a producer to a consumer and
//! carries the consumer's inbound slot index. Outbound back-references
//! `(node, index)` are therefore read straight off the edge list and never
//! own anything.
//!
//! ## Per-node protocol
//!
//! Each node holds a `value` and one gradient slot per inbound edge (leaves
//! hold a single slot for themselves). `gradient[i]` is the derivative of the
//! cost with respect to inbound `i`, so a producer finds its share of the
//! cost gradient at `consumer.gradient[index]`.
//!
//! - **forward**: compute `value` from the inbound values
//! - **backward**: clear the gradient slots, then for every outbound edge
//!   accumulate the local VJP of that edge's contribution
//! - **update**: Trainable only, `value -= rate * gradient[0]`
//!
//! ## Example
//!
//! ```rust
//! use miniflow::network::Network;
//! use miniflow::tensor::Tensor;
//!
//! let mut net = Network::new();
//! let x = net.input(Tensor::scalar(0.2));
//! let w = net.trainable(Tensor::scalar(1.0));
//! let b = net.trainable(Tensor::scalar(0.3));
//! let l = net.linear(x, w, b);
//!
//! net.forward_node(l);
//! assert!((net.value(l).as_scalar() - 0.5).abs() < 1e-12);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use miniflow_core::{CoreError, Scalar};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::hooks::{NodeHook, NullHook};
use crate::ops::{self, NodeKind};
use crate::tensor::Tensor;

/// Handle to a node in a [`Network`].
pub type NodeId = NodeIndex;

/// Edge weight: the consumer's inbound slot this edge feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub index: usize,
}

/// Non-owning reference to a consumer and the slot it reads us through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Outbound {
    pub node: NodeId,
    pub index: usize,
}

/// One computation step.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    value: Tensor,
    gradient: Vec<Tensor>,
    /// `labels - predictions` from the last forward of a MeanSquaredError.
    diff: Option<Tensor>,
    label: Option<String>,
}

impl Node {
    fn new(kind: NodeKind, value: Tensor) -> Self {
        Self {
            kind,
            value,
            gradient: Vec::new(),
            diff: None,
            label: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn gradient(&self) -> &[Tensor] {
        &self.gradient
    }

    pub fn label(&self) -> &str {
        self.label
            .as_deref()
            .unwrap_or_else(|| self.kind.default_label())
    }
}

// ============================================================================
// Network
// ============================================================================

/// Arena of nodes and their wiring.
pub struct Network {
    graph: DiGraph<Node, Edge>,
    hook: Arc<dyn NodeHook>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}

impl Network {
    /// Create an empty network with a [`NullHook`].
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            hook: Arc::new(NullHook),
        }
    }

    /// Replace the observation hook.
    pub fn set_hook(&mut self, hook: Arc<dyn NodeHook>) {
        self.hook = hook;
    }

    pub fn with_hook(mut self, hook: Arc<dyn NodeHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn hook(&self) -> &dyn NodeHook {
        self.hook.as_ref()
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    /// Add a constant leaf.
    pub fn input(&mut self, value: Tensor) -> NodeId {
        self.add_leaf(NodeKind::Input, value)
    }

    /// Add a leaf that gradient descent updates.
    pub fn trainable(&mut self, value: Tensor) -> NodeId {
        self.add_leaf(NodeKind::Trainable, value)
    }

    /// Add `x · w + b`.
    pub fn linear(&mut self, x: NodeId, w: NodeId, b: NodeId) -> NodeId {
        self.add_op(NodeKind::Linear, &[x, w, b])
    }

    /// Add the element-wise logistic function of `x`.
    pub fn sigmoid(&mut self, x: NodeId) -> NodeId {
        self.add_op(NodeKind::Sigmoid, &[x])
    }

    /// Add the cost node comparing `predictions` against `labels`.
    pub fn mean_squared_error(&mut self, labels: NodeId, predictions: NodeId) -> NodeId {
        self.add_op(NodeKind::MeanSquaredError, &[labels, predictions])
    }

    /// Add an identity node seeding a unit gradient into `x`.
    ///
    /// Only used to drive a single node's backward in isolation.
    pub fn debug(&mut self, x: NodeId) -> NodeId {
        let id = self.add_op(NodeKind::Debug, &[x]);
        let seed = self.graph[x].value.ones_like();
        self.graph[id].gradient = vec![seed];
        id
    }

    fn add_leaf(&mut self, kind: NodeKind, value: Tensor) -> NodeId {
        let mut node = Node::new(kind, value);
        node.gradient = vec![node.value.zeros_like()];
        let id = self.graph.add_node(node);
        tracing::trace!(node = id.index(), %kind, "added leaf");
        id
    }

    fn add_op(&mut self, kind: NodeKind, inbound: &[NodeId]) -> NodeId {
        debug_assert_eq!(inbound.len(), kind.num_inputs());
        let mut node = Node::new(kind, Tensor::default());
        node.gradient = inbound
            .iter()
            .map(|&p| self.graph[p].value.zeros_like())
            .collect();
        let id = self.graph.add_node(node);
        for (index, &p) in inbound.iter().enumerate() {
            self.graph.add_edge(p, id, Edge { index });
        }
        tracing::trace!(node = id.index(), %kind, "added operation");
        id
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.graph.node_weight(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.graph[id]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.graph[id].kind
    }

    pub fn is_input(&self, id: NodeId) -> bool {
        self.graph[id].kind.is_input()
    }

    /// Current value; valid once the node has been forwarded.
    pub fn value(&self, id: NodeId) -> &Tensor {
        &self.graph[id].value
    }

    /// Gradient slots; valid once the node has been backpropagated.
    pub fn gradient(&self, id: NodeId) -> &[Tensor] {
        &self.graph[id].gradient
    }

    /// Replace a node's value, typically an Input's between steps.
    pub fn set_value(&mut self, id: NodeId, value: Tensor) {
        self.graph[id].value = value;
    }

    pub fn label(&self, id: NodeId) -> &str {
        self.graph[id].label()
    }

    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) {
        self.graph[id].label = Some(label.into());
    }

    /// Producers feeding `id`, in slot order.
    pub fn inbound(&self, id: NodeId) -> Vec<NodeId> {
        let mut edges: Vec<(usize, NodeId)> = self
            .graph
            .edges_directed(id, Direction::Incoming)
            .map(|e| (e.weight().index, e.source()))
            .collect();
        edges.sort_unstable();
        edges.into_iter().map(|(_, p)| p).collect()
    }

    /// Consumers of `id` with the slot each reads it through.
    pub fn outbound(&self, id: NodeId) -> Vec<Outbound> {
        let mut out: Vec<Outbound> = self
            .graph
            .edges_directed(id, Direction::Outgoing)
            .map(|e| Outbound {
                node: e.target(),
                index: e.weight().index,
            })
            .collect();
        out.sort_unstable();
        out
    }

    /// Every node id, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Every Trainable node, in insertion order.
    pub fn trainables(&self) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .filter(|&id| self.graph[id].kind.is_trainable())
            .collect()
    }

    fn inbound_values(&self, id: NodeId) -> Vec<Tensor> {
        self.inbound(id)
            .into_iter()
            .map(|p| self.graph[p].value.clone())
            .collect()
    }

    /// This node's share of the cost gradient from each consumer. With a
    /// scope, consumers outside it are skipped.
    fn outbound_gradients(&self, id: NodeId, scope: Option<&HashSet<NodeId>>) -> Vec<Tensor> {
        self.outbound(id)
            .into_iter()
            .filter(|o| scope.map_or(true, |s| s.contains(&o.node)))
            .filter_map(|o| self.graph[o.node].gradient.get(o.index).cloned())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Per-node passes
    // ------------------------------------------------------------------------

    /// Compute `id`'s value from its inbound values.
    pub fn try_forward_node(&mut self, id: NodeId) -> Result<(), CoreError> {
        let kind = self.graph[id].kind;
        let inputs = self.inbound_values(id);
        match kind {
            NodeKind::Input | NodeKind::Trainable => {}
            NodeKind::Linear => {
                self.graph[id].value = ops::linear(&inputs[0], &inputs[1], &inputs[2])?;
            }
            NodeKind::Sigmoid => {
                self.graph[id].value = ops::sigmoid(&inputs[0]);
            }
            NodeKind::MeanSquaredError => {
                let (diff, cost) = ops::squared_error(&inputs[0], &inputs[1])?;
                let node = &mut self.graph[id];
                node.diff = Some(diff);
                node.value = cost;
                self.hook.on_value(id, self.graph[id].label(), &self.graph[id].value);
            }
            NodeKind::Debug => {
                let node = &mut self.graph[id];
                node.gradient = vec![inputs[0].ones_like()];
                node.value = inputs[0].clone();
            }
        }
        Ok(())
    }

    /// Compute `id`'s value. Panics on a shape-incompatible wiring.
    pub fn forward_node(&mut self, id: NodeId) {
        self.try_forward_node(id).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Fill `id`'s gradient slots from every consumer's gradients.
    pub fn try_backward_node(&mut self, id: NodeId) -> Result<(), CoreError> {
        self.backward_from(id, None)
    }

    /// Like [`Network::try_backward_node`], reading only consumers in
    /// `scope`. Slots of consumers outside it are stale from other passes.
    pub fn try_backward_node_within(
        &mut self,
        id: NodeId,
        scope: &HashSet<NodeId>,
    ) -> Result<(), CoreError> {
        self.backward_from(id, Some(scope))
    }

    fn backward_from(&mut self, id: NodeId, scope: Option<&HashSet<NodeId>>) -> Result<(), CoreError> {
        let kind = self.graph[id].kind;
        let gradient = match kind {
            NodeKind::Debug => return Ok(()),
            NodeKind::MeanSquaredError => {
                // The root is seeded directly, not from outbound edges.
                let diff = match &self.graph[id].diff {
                    Some(diff) => diff.clone(),
                    None => {
                        let inputs = self.inbound_values(id);
                        ops::squared_error(&inputs[0], &inputs[1])?.0
                    }
                };
                ops::squared_error_vjp(&diff).to_vec()
            }
            NodeKind::Input | NodeKind::Trainable => {
                let mut total = self.graph[id].value.zeros_like();
                for grad in self.outbound_gradients(id, scope) {
                    total = total.try_add(&grad)?;
                }
                vec![total]
            }
            NodeKind::Linear => {
                let inputs = self.inbound_values(id);
                let mut slots: Vec<Tensor> = inputs.iter().map(Tensor::zeros_like).collect();
                for grad in self.outbound_gradients(id, scope) {
                    let contrib =
                        ops::linear_vjp(&inputs[0], &inputs[1], inputs[2].shape(), &grad)?;
                    for (slot, c) in slots.iter_mut().zip(contrib.iter()) {
                        *slot = slot.try_add(c)?;
                    }
                }
                slots
            }
            NodeKind::Sigmoid => {
                let inputs = self.inbound_values(id);
                let value = &self.graph[id].value;
                let mut total = inputs[0].zeros_like();
                for grad in self.outbound_gradients(id, scope) {
                    total = total.try_add(&ops::sigmoid_vjp(value, &grad)?)?;
                }
                vec![total]
            }
        };
        self.graph[id].gradient = gradient;
        Ok(())
    }

    /// Fill `id`'s gradient slots. Panics on a shape-incompatible wiring.
    pub fn backward_node(&mut self, id: NodeId) {
        self.try_backward_node(id).unwrap_or_else(|e| panic!("{e}"))
    }

    /// One gradient-descent step on a Trainable; other kinds ignore it.
    pub fn try_update_node(&mut self, id: NodeId, learning_rate: Scalar) -> Result<(), CoreError> {
        let node = &mut self.graph[id];
        if !node.kind.is_trainable() {
            return Ok(());
        }
        let step = &node.gradient[0] * learning_rate;
        node.value = node.value.try_sub(&step)?;
        Ok(())
    }

    pub fn update_node(&mut self, id: NodeId, learning_rate: Scalar) {
        self.try_update_node(id, learning_rate)
            .unwrap_or_else(|e| panic!("{e}"))
    }
}
