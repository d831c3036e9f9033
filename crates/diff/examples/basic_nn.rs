//! Scalar logistic unit trained by gradient descent
//!
//! Run with: cargo run -p miniflow --example basic_nn
//! More output: RUST_LOG=miniflow=debug cargo run -p miniflow --example basic_nn
//!
//! This example demonstrates:
//! - Building Input, Trainable, Linear, Sigmoid and MeanSquaredError nodes
//! - Ordering them into a Graph rooted at the cost
//! - Training with forward -> backward -> update steps
//! - Watching the cost through a hook
//!
//! The network fits sigmoid(W * 0.2 + b) to 0.5 starting from W = 1, b = 0.3.

use std::sync::Arc;

use miniflow::train::scalar_network;
use miniflow::{grad_check, TracingHook, TrainConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "miniflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Scalar logistic unit ===\n");

    let mut model = scalar_network();
    model.network.set_hook(Arc::new(TracingHook::new()));

    // -------------------------------------------------------------------------
    // 1. Evaluation order
    // -------------------------------------------------------------------------
    let mut graph = model.graph();
    println!("1. Evaluation order (leaves first)");
    for &id in graph.order() {
        let net = graph.network();
        println!("   {:>2}: {} ({})", id.index(), net.label(id), net.kind(id));
    }
    println!();

    // -------------------------------------------------------------------------
    // 2. Gradients agree with finite differences
    // -------------------------------------------------------------------------
    match grad_check(&mut graph, 1e-6, 1e-6) {
        Ok(()) => println!("2. Gradient check passed\n"),
        Err(e) => println!("2. Gradient check failed: {e}\n"),
    }

    // -------------------------------------------------------------------------
    // 3. Training
    // -------------------------------------------------------------------------
    let config = TrainConfig::default().with_log_every(100);
    println!(
        "3. Training: learning_rate = {}, iterations = {}",
        config.learning_rate, config.iterations
    );
    let history = graph.fit(&config);
    for (i, cost) in history.iter().enumerate().step_by(100) {
        println!("   step {:>3}: cost = {:.6e}", i + 1, cost);
    }
    println!();

    // -------------------------------------------------------------------------
    // 4. Result
    // -------------------------------------------------------------------------
    drop(graph);
    println!("4. Result");
    println!("   W          = {}", model.network.value(model.weights));
    println!("   b          = {}", model.network.value(model.bias));
    println!("   prediction = {}", model.prediction());
    println!("   cost       = {:.6e}", model.cost_value());
}
