//! Harmonic-oscillator basis operators of an extended variable.

use circ_core::{CircuitError, MatrixFormat};
use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::matrix::{Operator, C64};

/// Oscillator scales derived from the effective capacitive and inductive energies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oscillator {
    /// `ω = √(8 E_L E_C)`.
    pub frequency: f64,
    /// `l = (8 E_C / E_L)^¼`.
    pub length: f64,
}

impl Oscillator {
    /// Scales for charging energy `ec` and inductive energy `el`.
    pub fn from_energies(ec: f64, el: f64) -> Result<Self, CircuitError> {
        if !(ec > 0.0 && el > 0.0) {
            return Err(CircuitError::structural(
                "oscillator-energies",
                "harmonic basis needs positive quadratic coefficients",
            )
            .with_context("ec", ec.to_string())
            .with_context("el", el.to_string())
            .with_hint("use the discretized basis for this variable"));
        }
        Ok(Self {
            frequency: (8.0 * el * ec).sqrt(),
            length: (8.0 * ec / el).powf(0.25),
        })
    }
}

/// Lowering operator `a|k⟩ = √k |k-1⟩`.
pub fn annihilation(levels: usize) -> Operator {
    Operator::from_triplets(
        levels,
        (1..levels).map(|k| (k - 1, k, C64::new((k as f64).sqrt(), 0.0))),
        MatrixFormat::Sparse,
    )
}

/// Raising operator `a†`.
pub fn creation(levels: usize) -> Operator {
    annihilation(levels).adjoint()
}

/// Number operator `a†a`.
pub fn number(levels: usize) -> Operator {
    let values: Vec<C64> = (0..levels).map(|k| C64::new(k as f64, 0.0)).collect();
    Operator::diagonal(&values, MatrixFormat::Sparse)
}

fn ladder_sum(levels: usize, raise: C64, lower: C64) -> Operator {
    Operator::from_triplets(
        levels,
        (1..levels).flat_map(move |k| {
            let s = (k as f64).sqrt();
            [(k, k - 1, raise * s), (k - 1, k, lower * s)]
        }),
        MatrixFormat::Sparse,
    )
}

/// `θ = l (a† + a) / √2`.
pub fn position(osc: &Oscillator, levels: usize) -> Operator {
    let c = C64::new(osc.length / std::f64::consts::SQRT_2, 0.0);
    ladder_sum(levels, c, c)
}

/// `Q = i (a† - a) / (√2 l)`.
pub fn momentum(osc: &Oscillator, levels: usize) -> Operator {
    let c = 1.0 / (std::f64::consts::SQRT_2 * osc.length);
    ladder_sum(levels, C64::new(0.0, c), C64::new(0.0, -c))
}

/// `(cos θ, sin θ)` as matrix functions of the dense position operator.
pub fn trig(osc: &Oscillator, levels: usize) -> (Operator, Operator) {
    let theta = position(osc, levels).to_dense();
    let eigen = SymmetricEigen::new(theta);
    let vectors = &eigen.eigenvectors;
    let apply = |f: fn(f64) -> f64| -> DMatrix<C64> {
        let diag = DMatrix::from_diagonal(&eigen.eigenvalues.map(|x| C64::new(f(x), 0.0)));
        vectors * diag * vectors.adjoint()
    };
    (
        Operator::Dense(apply(f64::cos)),
        Operator::Dense(apply(f64::sin)),
    )
}
