//! # Element Iteration
//!
//! The "for each element" primitive that every element-wise tensor operation
//! runs through. Per-element work is independent: no index writes to state
//! another index reads, so the traversal order never changes a result and
//! large inputs can be split across threads.
//!
//! | Strategy | Execution |
//! |----------|-----------|
//! | `Sequential` | plain iterator on the calling thread |
//! | `Parallel` | rayon parallel iterator |
//!
//! Graph passes do NOT use this module: forward and backward are ordered
//! node-by-node and must stay sequential.

use rayon::prelude::*;

/// Inputs at or above this many elements are processed in parallel.
pub const PARALLEL_THRESHOLD: usize = 4096;

/// How a slice traversal is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Walk the elements in order on the current thread.
    #[default]
    Sequential,
    /// Split the elements across the rayon thread pool.
    Parallel,
}

impl Strategy {
    /// Pick a strategy for an input of `len` elements.
    pub fn for_len(len: usize) -> Self {
        if len >= PARALLEL_THRESHOLD {
            Strategy::Parallel
        } else {
            Strategy::Sequential
        }
    }
}

/// Apply `f` to every element, producing a new vector.
pub fn map<T, U, F>(src: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    map_with(Strategy::for_len(src.len()), src, f)
}

/// [`map`] with an explicit strategy.
pub fn map_with<T, U, F>(strategy: Strategy, src: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    match strategy {
        Strategy::Sequential => src.iter().map(f).collect(),
        Strategy::Parallel => src.par_iter().map(f).collect(),
    }
}

/// Combine two equal-length slices element by element.
///
/// The caller checks lengths; extra elements of the longer slice are
/// ignored.
pub fn zip_map<A, B, U, F>(a: &[A], b: &[B], f: F) -> Vec<U>
where
    A: Sync,
    B: Sync,
    U: Send,
    F: Fn(&A, &B) -> U + Sync + Send,
{
    zip_map_with(Strategy::for_len(a.len()), a, b, f)
}

/// [`zip_map`] with an explicit strategy.
pub fn zip_map_with<A, B, U, F>(strategy: Strategy, a: &[A], b: &[B], f: F) -> Vec<U>
where
    A: Sync,
    B: Sync,
    U: Send,
    F: Fn(&A, &B) -> U + Sync + Send,
{
    match strategy {
        Strategy::Sequential => a.iter().zip(b.iter()).map(|(x, y)| f(x, y)).collect(),
        Strategy::Parallel => a
            .par_iter()
            .zip(b.par_iter())
            .map(|(x, y)| f(x, y))
            .collect(),
    }
}

/// Visit every element mutably together with its index.
pub fn for_each_mut<T, F>(dst: &mut [T], f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    match Strategy::for_len(dst.len()) {
        Strategy::Sequential => dst.iter_mut().enumerate().for_each(|(i, x)| f(i, x)),
        Strategy::Parallel => dst.par_iter_mut().enumerate().for_each(|(i, x)| f(i, x)),
    }
}
