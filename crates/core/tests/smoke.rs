//! Smoke tests for the core crate.
//!
//! These tests verify that the basic infrastructure works:
//! - Shapes can be created, compared and displayed
//! - Errors convert into `Box<dyn Error>`
//! - Both iteration strategies give the same results

use miniflow_core::parallel::{self, PARALLEL_THRESHOLD};
use miniflow_core::{CoreError, Shape, Strategy};

#[test]
fn smoke_shapes_exist() {
    assert_eq!(Shape::scalar().rank(), 0);
    assert_eq!(Shape::new(vec![128]).rank(), 1);
    assert_eq!(Shape::new(vec![64, 128]).rank(), 2);
}

#[test]
fn smoke_shape_display() {
    let display = format!("{}", Shape::new(vec![3, 4]));
    assert_eq!(display, "[3, 4]");
}

#[test]
fn smoke_error_is_std_error() {
    fn fails() -> Result<(), Box<dyn std::error::Error>> {
        Err(CoreError::IndexOutOfRange { index: 5, len: 2 })?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert!(err.to_string().contains("Index out of range"));
}

#[test]
fn smoke_strategies_agree() {
    let n = PARALLEL_THRESHOLD + 17;
    let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let b: Vec<f64> = (0..n).map(|i| (n - i) as f64).collect();

    let seq = parallel::zip_map_with(Strategy::Sequential, &a, &b, |x, y| x + y);
    let par = parallel::zip_map_with(Strategy::Parallel, &a, &b, |x, y| x + y);
    assert_eq!(seq, par);
    assert!(seq.iter().all(|&v| v == n as f64));
}
