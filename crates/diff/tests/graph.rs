//! # Graph Tests
//!
//! Ordering invariants, hook delivery, externally set inputs and batched
//! training.

use std::sync::Arc;

use miniflow::{
    grad_check, logistic_regression, CostRecorder, Graph, Network, NodeId, TrainConfig, Tensor,
};

/// Two layers sharing one input and one weight, so shared nodes are reached
/// along several paths.
fn shared_network(net: &mut Network) -> NodeId {
    let x = net.input(Tensor::scalar(0.4));
    let y = net.input(Tensor::scalar(0.3));
    let w = net.trainable(Tensor::scalar(0.7));
    let b1 = net.trainable(Tensor::scalar(0.1));
    let b2 = net.trainable(Tensor::scalar(-0.2));
    let l1 = net.linear(x, w, b1);
    let s1 = net.sigmoid(l1);
    let l2 = net.linear(s1, w, b2);
    let s2 = net.sigmoid(l2);
    let l3 = net.linear(s2, w, s1);
    net.mean_squared_error(y, l3)
}

fn position(order: &[NodeId], id: NodeId) -> usize {
    order.iter().position(|&o| o == id).unwrap()
}

#[test]
fn test_every_producer_precedes_its_consumers() {
    let mut net = Network::new();
    let cost = shared_network(&mut net);
    let graph = Graph::new(&mut net, cost);
    let order = graph.order();

    for &id in order {
        for p in graph.network().inbound(id) {
            assert!(position(order, p) < position(order, id));
        }
    }
}

#[test]
fn test_consumers_backpropagate_first() {
    let mut net = Network::new();
    let cost = shared_network(&mut net);
    let graph = Graph::new(&mut net, cost);
    let backward: Vec<NodeId> = graph.order().iter().rev().copied().collect();

    for &id in &backward {
        for out in graph.network().outbound(id) {
            assert!(position(&backward, out.node) < position(&backward, id));
        }
    }
}

#[test]
fn test_each_node_scheduled_once() {
    let mut net = Network::new();
    let cost = shared_network(&mut net);
    let graph = Graph::new(&mut net, cost);

    let mut seen = std::collections::HashSet::new();
    for &id in graph.order() {
        assert!(seen.insert(id), "node {} scheduled twice", id.index());
    }
    assert_eq!(graph.order().len(), graph.network().node_count());
}

#[test]
fn test_leaves_come_first() {
    let mut net = Network::new();
    let cost = shared_network(&mut net);
    let graph = Graph::new(&mut net, cost);

    let leaves = graph
        .order()
        .iter()
        .take_while(|&&id| graph.network().is_input(id))
        .count();
    assert_eq!(leaves, 5);
    assert!(graph.order()[leaves..]
        .iter()
        .all(|&id| !graph.network().is_input(id)));
}

#[test]
fn test_shared_network_gradients_match_finite_differences() {
    let mut net = Network::new();
    let cost = shared_network(&mut net);
    let mut graph = Graph::new(&mut net, cost);
    assert!(miniflow::grad_check(&mut graph, 1e-6, 1e-6).is_ok());
}

#[test]
fn test_forward_twice_is_identical() {
    let mut net = Network::new();
    let cost = shared_network(&mut net);
    let mut graph = Graph::new(&mut net, cost);

    graph.forward();
    let first = graph.cost();
    graph.forward();
    assert_eq!(graph.cost(), first);
}

#[test]
fn test_backward_does_not_accumulate_across_steps() {
    let mut net = Network::new();
    let cost = shared_network(&mut net);
    let mut graph = Graph::new(&mut net, cost);

    let trainables = graph.network().trainables();

    graph.forward();
    graph.backward();
    let first: Vec<Tensor> = trainables
        .iter()
        .map(|&id| graph.gradient(id)[0].clone())
        .collect();
    graph.backward();
    for (&id, g) in trainables.iter().zip(&first) {
        assert_eq!(&graph.gradient(id)[0], g);
    }
}

/// `sigmoid(x·w + b)` scored against `y`, on its own network.
fn sigmoid_cost_gradient(x: f64, y: f64, w: f64, b: f64) -> f64 {
    let mut net = Network::new();
    let x = net.input(Tensor::scalar(x));
    let y = net.input(Tensor::scalar(y));
    let w_id = net.trainable(Tensor::scalar(w));
    let b = net.trainable(Tensor::scalar(b));
    let l = net.linear(x, w_id, b);
    let s = net.sigmoid(l);
    let cost = net.mean_squared_error(y, s);
    let mut graph = Graph::new(&mut net, cost);
    graph.forward();
    graph.backward();
    graph.gradient(w_id)[0].as_scalar()
}

#[test]
fn test_costs_sharing_weights_backpropagate_independently() {
    // W and b feed a plain linear cost and a sigmoid cost.
    let mut net = Network::new();
    let x = net.input(Tensor::scalar(0.2));
    let y = net.input(Tensor::scalar(0.5));
    let w = net.trainable(Tensor::scalar(1.0));
    let b = net.trainable(Tensor::scalar(0.3));
    let l = net.linear(x, w, b);
    let linear_cost = net.mean_squared_error(y, l);
    let s = net.sigmoid(l);
    let sigmoid_cost = net.mean_squared_error(y, s);

    // Each cost leaves slots behind in the nodes only it schedules.
    for terminal in [sigmoid_cost, linear_cost] {
        let mut graph = Graph::new(&mut net, terminal);
        graph.network_mut().set_value(y, Tensor::scalar(-3.0));
        graph.forward();
        graph.backward();
    }
    // d/dw (y - (x·w + b))² = -2 (y - l) x with l = 0.5
    assert!((net.gradient(w)[0].as_scalar() - 1.4).abs() < 1e-12);
    assert!((net.gradient(b)[0].as_scalar() - 7.0).abs() < 1e-12);
    net.set_value(y, Tensor::scalar(0.5));

    let expected = sigmoid_cost_gradient(0.2, 0.5, 1.0, 0.3);
    let mut graph = Graph::new(&mut net, sigmoid_cost);
    graph.forward();
    graph.backward();
    assert!((graph.gradient(w)[0].as_scalar() - expected).abs() < 1e-12);
    assert!(grad_check(&mut graph, 1e-6, 1e-6).is_ok());
}

#[test]
fn test_hook_sees_every_step() {
    let recorder = Arc::new(CostRecorder::new());
    let mut net = Network::new().with_hook(recorder.clone());
    let cost = shared_network(&mut net);
    let mut graph = Graph::new(&mut net, cost);

    let history = graph.train_with_history(0.5, 10);

    assert_eq!(recorder.steps(), history);
    assert_eq!(recorder.values_for("Cost"), history);
}

#[test]
fn test_set_value_between_steps() {
    let mut net = Network::new();
    let x = net.input(Tensor::scalar(0.0));
    let y = net.input(Tensor::scalar(1.0));
    let cost = net.mean_squared_error(y, x);
    let mut graph = Graph::new(&mut net, cost);

    graph.forward();
    assert_eq!(graph.cost(), 1.0);

    graph.network_mut().set_value(x, Tensor::scalar(0.5));
    graph.forward();
    assert_eq!(graph.cost(), 0.25);
}

#[test]
fn test_batched_logistic_regression_learns() {
    // Label is 1 when the first feature exceeds the second.
    let features = Tensor::matrix(
        4,
        2,
        vec![2.0, 0.0, 0.0, 2.0, 1.5, 0.5, 0.5, 1.5],
    );
    let labels = Tensor::matrix(4, 1, vec![1.0, 0.0, 1.0, 0.0]);
    let mut model = logistic_regression(
        features,
        labels.clone(),
        Tensor::zeros([2, 1]),
        Tensor::vector(vec![0.0]),
    )
    .unwrap();

    let config: TrainConfig =
        serde_json::from_str(r#"{"learning_rate": 2.0, "iterations": 300, "log_every": 100}"#)
            .unwrap();
    config.validate().unwrap();
    let history = model.graph().fit(&config);

    assert!((history[0] - 0.25).abs() < 1e-12);
    assert!(history[299] < 0.05);
    let prediction = model.prediction();
    for (p, l) in prediction.data().iter().zip(labels.data()) {
        assert!((p - l).abs() < 0.5);
    }
    assert_eq!(model.network.value(model.bias).shape().dims(), &[1]);
}
