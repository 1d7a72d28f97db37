//! Tensor product of truncated bare eigenbases with coupling terms.

use circ_core::{CircuitError, MatrixFormat};
use circ_ops::{Operator, C64};
use nalgebra::DMatrix;

/// `coefficient · ⊗_slot O_slot`, each factor given in the bare basis of
/// its subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct Coupling {
    /// Numeric prefactor.
    pub coefficient: f64,
    /// Subsystem slot and its operator, one entry per slot at most.
    pub factors: Vec<(usize, DMatrix<C64>)>,
}

/// Bare subsystems plus the couplings between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeSpace {
    energies: Vec<Vec<f64>>,
    couplings: Vec<Coupling>,
}

impl CompositeSpace {
    /// Empty space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subsystem by its bare energies and returns its slot.
    pub fn add_subsystem(&mut self, energies: Vec<f64>) -> usize {
        self.energies.push(energies);
        self.energies.len() - 1
    }

    /// Registers a coupling term.
    pub fn add_coupling(&mut self, coupling: Coupling) -> Result<(), CircuitError> {
        let dims = self.dims();
        let mut seen = vec![false; dims.len()];
        for (slot, matrix) in &coupling.factors {
            let Some(&dim) = dims.get(*slot) else {
                return Err(CircuitError::structural(
                    "coupling-slot",
                    "coupling refers to an unknown subsystem",
                )
                .with_context("slot", slot.to_string()));
            };
            if seen[*slot] || matrix.nrows() != dim || matrix.ncols() != dim {
                return Err(CircuitError::structural(
                    "coupling-shape",
                    "coupling factors must be square in their subsystem and unique per slot",
                )
                .with_context("slot", slot.to_string())
                .with_context("dim", dim.to_string()));
            }
            seen[*slot] = true;
        }
        self.couplings.push(coupling);
        Ok(())
    }

    /// Truncated dimension per subsystem.
    pub fn dims(&self) -> Vec<usize> {
        self.energies.iter().map(Vec::len).collect()
    }

    /// Dimension of the product space.
    pub fn dim(&self) -> usize {
        self.dims().iter().product()
    }

    /// Registered couplings.
    pub fn couplings(&self) -> &[Coupling] {
        &self.couplings
    }

    /// Dressed Hamiltonian `Σ_s diag(E_s) + Σ couplings` in the product basis.
    pub fn hamiltonian(&self, format: MatrixFormat) -> Result<Operator, CircuitError> {
        let dims = self.dims();
        let mut total = Operator::zeros(self.dim(), format);
        for (slot, energies) in self.energies.iter().enumerate() {
            let values: Vec<C64> = energies.iter().map(|e| C64::new(*e, 0.0)).collect();
            let bare = Operator::diagonal(&values, MatrixFormat::Sparse);
            total = total.add(&tensor_product(&dims, &[(slot, bare)], format))?;
        }
        for coupling in &self.couplings {
            let factors: Vec<(usize, Operator)> = coupling
                .factors
                .iter()
                .map(|(slot, m)| (*slot, Operator::Dense(m.clone())))
                .collect();
            let term = tensor_product(&dims, &factors, format)
                .scale(C64::new(coupling.coefficient, 0.0));
            total = total.add(&term)?;
        }
        Ok(total)
    }
}

/// `⊗_slot F_slot` over `dims`, with identities where no factor is given.
pub fn tensor_product(
    dims: &[usize],
    factors: &[(usize, Operator)],
    format: MatrixFormat,
) -> Operator {
    let mut product: Option<Operator> = None;
    for (slot, dim) in dims.iter().enumerate() {
        let factor = factors
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, op)| op.clone().into_format(MatrixFormat::Sparse))
            .unwrap_or_else(|| Operator::identity(*dim, MatrixFormat::Sparse));
        product = Some(match product {
            None => factor,
            Some(acc) => acc.kron(&factor),
        });
    }
    product
        .unwrap_or_else(|| Operator::identity(1, MatrixFormat::Sparse))
        .into_format(format)
}
