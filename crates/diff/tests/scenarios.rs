//! # End-to-End Scenarios
//!
//! Tensor reductions and contractions on hand-checked values, then the
//! scalar networks trained to convergence.

use miniflow::{Graph, Network, Tensor};

// ============================================================================
// Tensor Scenarios
// ============================================================================

#[test]
fn scenario_rank2_sum() {
    let mut t = Tensor::full([2, 5], 2);
    t[[0, 0]] = 1;
    let s = t.sum();
    assert_eq!(s.rank(), 1);
    assert_eq!(s.data(), &[9, 10]);
}

#[test]
fn scenario_mean() {
    let mut t = Tensor::full([2, 5], 2);
    t[[1, 1]] = 7;
    assert_eq!(t.mean().data(), &[2, 3]);
}

#[test]
fn scenario_dot_chain() {
    let mut t1 = Tensor::full([2], 2);
    let mut t2 = Tensor::full([2], 3);
    t1[[0]] = 4;
    t2[[1]] = 5;
    assert_eq!(t1.dot(&t2).as_scalar(), 22);
}

// ============================================================================
// Network Scenarios
// ============================================================================

#[test]
fn scenario_linear_trainable_update() {
    let mut net = Network::new();
    let x = net.input(Tensor::scalar(0.2));
    let w = net.trainable(Tensor::scalar(1.0));
    let b = net.trainable(Tensor::scalar(0.3));
    let l = net.linear(x, w, b);
    let d = net.debug(l);

    let mut graph = Graph::new(&mut net, d);
    graph.train(1.0, 1);

    assert!((graph.value(l).as_scalar() - 0.5).abs() < 1e-12);
    assert!((graph.gradient(w)[0].as_scalar() - 0.2).abs() < 1e-12);
    assert!((graph.value(w).as_scalar() - 0.8).abs() < 1e-12);
}

fn scalar_network(net: &mut Network) -> miniflow::NodeId {
    let x = net.input(Tensor::scalar(0.2));
    let y = net.input(Tensor::scalar(0.5));
    let w = net.trainable(Tensor::scalar(1.0));
    let b = net.trainable(Tensor::scalar(0.3));
    let l = net.linear(x, w, b);
    let s = net.sigmoid(l);
    net.mean_squared_error(y, s)
}

#[test]
fn scenario_cost_decreases_monotonically() {
    let mut net = Network::new();
    let cost = scalar_network(&mut net);
    let mut graph = Graph::new(&mut net, cost);

    let history = graph.train_with_history(0.01, 100);
    assert_eq!(history.len(), 100);
    for pair in history.windows(2) {
        assert!(pair[1] < pair[0], "cost went up: {} -> {}", pair[0], pair[1]);
    }
}

#[test]
fn scenario_scalar_network_converges() {
    let mut net = Network::new();
    let cost = scalar_network(&mut net);
    let mut graph = Graph::new(&mut net, cost);

    graph.train(1.0, 100);
    assert!(graph.cost().abs() < 1e-10);
}

#[test]
fn scenario_deep_network_converges() {
    let mut net = Network::new();
    let x = net.input(Tensor::scalar(0.2));
    let y = net.input(Tensor::scalar(0.5));

    let mut layer = x;
    for _ in 0..3 {
        let w = net.trainable(Tensor::scalar(1.0));
        let b = net.trainable(Tensor::scalar(0.1));
        let l = net.linear(layer, w, b);
        layer = net.sigmoid(l);
    }
    let cost = net.mean_squared_error(y, layer);

    let mut graph = Graph::new(&mut net, cost);
    assert_eq!(graph.order().len(), 3 * 4 + 3);

    graph.train(1.0, 100);
    assert!(graph.cost().abs() < 1e-10);
}

#[test]
fn scenario_demo_network_default_config() {
    let mut model = miniflow::scalar_network();
    let history = model.graph().fit(&miniflow::TrainConfig::default());

    assert_eq!(history.len(), 500);
    assert!(history[499] < history[0]);
    assert!((model.prediction().as_scalar() - 0.5).abs() < 0.01);
}
