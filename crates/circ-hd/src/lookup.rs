//! Bare-label bookkeeping for dressed eigenstates.

use std::collections::BTreeMap;

use circ_core::CircuitError;
use circ_eig::EigenSystem;
use itertools::Itertools;

/// Smallest overlap amplitude accepted for a bare-to-dressed assignment.
pub const OVERLAP_THRESHOLD: f64 = 0.5;

/// Maps product labels of the top-level bare states to dressed eigenstates.
///
/// Labels list one bare index per top-level subsystem; the first subsystem
/// varies slowest, matching the tensor layout of the dressed Hamiltonian.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumLookup {
    dims: Vec<usize>,
    energies: Vec<f64>,
    dressed_by_bare: BTreeMap<Vec<usize>, usize>,
    bare_by_dressed: BTreeMap<usize, (Vec<usize>, f64)>,
}

impl SpectrumLookup {
    /// Builds the lookup from dressed eigenpairs in the product basis of `dims`.
    pub fn new(dims: Vec<usize>, dressed: &EigenSystem) -> Result<Self, CircuitError> {
        let vectors = dressed.vectors.as_ref().ok_or_else(|| {
            CircuitError::structural("lookup-vectors", "spectrum lookup needs eigenvectors")
        })?;
        let dim: usize = dims.iter().product();
        if vectors.nrows() != dim {
            return Err(CircuitError::structural(
                "lookup-dimension",
                "eigenvectors do not live in the product of the truncated dimensions",
            )
            .with_context("expected", dim.to_string())
            .with_context("found", vectors.nrows().to_string()));
        }

        let mut dressed_by_bare = BTreeMap::new();
        let mut bare_by_dressed: BTreeMap<usize, (Vec<usize>, f64)> = BTreeMap::new();
        let labels = dims.iter().map(|&d| 0..d).multi_cartesian_product();
        for (row, label) in labels.enumerate() {
            let best = (0..vectors.ncols())
                .map(|col| (col, vectors[(row, col)].norm()))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            let Some((col, overlap)) = best else {
                continue;
            };
            if overlap < OVERLAP_THRESHOLD {
                continue;
            }
            dressed_by_bare.insert(label.clone(), col);
            let stronger = bare_by_dressed
                .get(&col)
                .map_or(true, |(_, previous)| overlap > *previous);
            if stronger {
                bare_by_dressed.insert(col, (label, overlap));
            }
        }
        Ok(Self {
            dims,
            energies: dressed.energies.clone(),
            dressed_by_bare,
            bare_by_dressed,
        })
    }

    /// Truncated dimensions of the labelled subsystems.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Dressed index of the state with bare labels `labels`.
    pub fn dressed_index(&self, labels: &[usize]) -> Option<usize> {
        self.dressed_by_bare.get(labels).copied()
    }

    /// Bare labels of dressed state `dressed`.
    pub fn bare_index(&self, dressed: usize) -> Option<&[usize]> {
        self.bare_by_dressed
            .get(&dressed)
            .map(|(label, _)| label.as_slice())
    }

    /// Dressed energy of the state with bare labels `labels`.
    pub fn energy_by_bare_index(&self, labels: &[usize]) -> Option<f64> {
        self.dressed_index(labels)
            .and_then(|index| self.energies.get(index).copied())
    }
}
