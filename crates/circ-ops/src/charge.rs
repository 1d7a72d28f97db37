//! Charge-basis operators of a periodic variable.
//!
//! The basis is `|m⟩` for `m = -n..=n`, stored at index `m + n`.

use circ_core::MatrixFormat;

use crate::matrix::{Operator, C64};

/// Charge number operator `diag(-n, …, n)`.
pub fn number(cutoff: usize) -> Operator {
    let n = cutoff as f64;
    let values: Vec<C64> = (0..2 * cutoff + 1)
        .map(|k| C64::new(k as f64 - n, 0.0))
        .collect();
    Operator::diagonal(&values, MatrixFormat::Sparse)
}

fn shift_pair(cutoff: usize, up: C64, down: C64) -> Operator {
    let dim = 2 * cutoff + 1;
    let triplets = (0..dim.saturating_sub(1)).flat_map(move |k| [(k + 1, k, up), (k, k + 1, down)]);
    Operator::from_triplets(dim, triplets, MatrixFormat::Sparse)
}

/// `cos θ = (e^{iθ} + e^{-iθ}) / 2`, where `e^{iθ}|m⟩ = |m+1⟩`.
pub fn cos(cutoff: usize) -> Operator {
    shift_pair(cutoff, C64::new(0.5, 0.0), C64::new(0.5, 0.0))
}

/// `sin θ = -i (e^{iθ} - e^{-iθ}) / 2`.
pub fn sin(cutoff: usize) -> Operator {
    shift_pair(cutoff, C64::new(0.0, -0.5), C64::new(0.0, 0.5))
}
