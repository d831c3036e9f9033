//! Shapes and element iteration
//!
//! Run with: cargo run -p miniflow-core --example shapes
//!
//! This example demonstrates:
//! - Sub-shapes and fold-shapes
//! - Transposing the trailing axes
//! - Shape errors as values
//! - Picking an iteration strategy by input size

use miniflow_core::parallel::{self, PARALLEL_THRESHOLD};
use miniflow_core::{CoreError, Shape, Strategy};

fn main() {
    println!("=== Shapes ===\n");

    // -------------------------------------------------------------------------
    // 1. Axis removal
    // -------------------------------------------------------------------------
    let s = Shape::new(vec![3, 2, 5]);
    println!("1. Axis removal");
    println!("   shape      = {} ({} elements)", s, s.numel());
    println!("   sub_shape  = {}", s.sub_shape());
    println!("   fold_shape = {}", s.fold_shape());
    println!("   fold a vector: {} -> {}", Shape::new(vec![4]), Shape::new(vec![4]).fold_shape());
    println!();

    // -------------------------------------------------------------------------
    // 2. Transposition
    // -------------------------------------------------------------------------
    println!("2. Transposition swaps the last two axes");
    println!("   {} -> {}", s, s.transposed());
    println!();

    // -------------------------------------------------------------------------
    // 3. Errors
    // -------------------------------------------------------------------------
    println!("3. Errors");
    match s.try_axis_removed(3) {
        Ok(shape) => println!("   unexpected: {shape}"),
        Err(e) => println!("   {e}"),
    }
    let mismatch = CoreError::shape_mismatch("add", &Shape::new(vec![2]), &Shape::new(vec![3]));
    println!("   {mismatch}");
    println!();

    // -------------------------------------------------------------------------
    // 4. Iteration strategy
    // -------------------------------------------------------------------------
    println!("4. Iteration strategy (threshold {PARALLEL_THRESHOLD})");
    for len in [10, PARALLEL_THRESHOLD, 100_000] {
        println!("   {len:>7} elements -> {:?}", Strategy::for_len(len));
    }
    let squares = parallel::map(&[1.0, 2.0, 3.0], |x: &f64| x * x);
    println!("   squares of [1, 2, 3] = {squares:?}");
}
