#![deny(missing_docs)]
#![doc = "Eigensolver dispatch for circuit Hamiltonians: direct diagonalization of dense operators and seeded Lanczos iteration for sparse ones."]

use circ_core::{CircuitError, MatrixFormat};
use circ_ops::{Operator, C64};
use nalgebra::DMatrix;
use tracing::info;

mod config;
pub mod dense;
pub mod elements;
pub mod lanczos;

pub use config::SolverConfig;
pub use elements::matrix_element_table;

/// Lowest eigenvalues in ascending order, with eigenvectors as columns when
/// they were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenSystem {
    /// Eigenvalues, ascending.
    pub energies: Vec<f64>,
    /// Column `i` is the eigenvector of `energies[i]`.
    pub vectors: Option<DMatrix<C64>>,
}

impl EigenSystem {
    /// Number of eigenpairs.
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    /// True when no eigenpair is stored.
    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// `‖O v_i − E_i v_i‖` per eigenpair; empty when vectors were dropped.
    pub fn residuals(&self, op: &Operator) -> Vec<f64> {
        let Some(vectors) = &self.vectors else {
            return Vec::new();
        };
        self.energies
            .iter()
            .enumerate()
            .map(|(i, energy)| {
                let v = vectors.column(i).into_owned();
                (op.matvec(&v) - &v * C64::new(*energy, 0.0)).norm()
            })
            .collect()
    }
}

fn check_count(op: &Operator, k: usize) -> Result<(), CircuitError> {
    if k == 0 || k > op.dim() {
        return Err(CircuitError::structural(
            "eigenvalue-count",
            "requested eigenvalue count must lie in 1..=dim",
        )
        .with_context("requested", k.to_string())
        .with_context("dim", op.dim().to_string()));
    }
    Ok(())
}

/// Lowest `k` eigenpairs of the Hermitian `op`.
///
/// Dense operators are diagonalized directly; sparse operators go through
/// [`lanczos::lowest_eigenpairs`]. Eigenvector phases are arbitrary.
pub fn eigensystem(
    op: &Operator,
    k: usize,
    config: &SolverConfig,
) -> Result<EigenSystem, CircuitError> {
    check_count(op, k)?;
    let system = match op.format() {
        MatrixFormat::Dense => dense::lowest_eigenpairs(op.to_dense(), k),
        MatrixFormat::Sparse => lanczos::lowest_eigenpairs(op, k, config)?,
    };
    info!(
        dim = op.dim(),
        requested = k,
        format = ?op.format(),
        ground = system.energies.first().copied().unwrap_or(f64::NAN),
        "diagonalized"
    );
    Ok(system)
}

/// Lowest `k` eigenvalues of the Hermitian `op`, ascending.
pub fn eigenvalues(
    op: &Operator,
    k: usize,
    config: &SolverConfig,
) -> Result<Vec<f64>, CircuitError> {
    eigensystem(op, k, config).map(|system| system.energies)
}
