//! Circuit descriptions, solver configuration and typed field updates.

use std::collections::BTreeMap;

use circ_core::{CircuitError, ExtBasis, GridRange, MatrixFormat, Variable};
use circ_eig::SolverConfig;
use circ_sym::{parse_hamiltonian, Expr, Symbol, SymbolTable, SymbolValues};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::circuit::SymbolicSource;
use crate::partition::{Group, TruncDim};
use crate::tree::NodeSettings;

/// Variables, symbols with their initial values, and the raw Hamiltonian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitDescription {
    /// Declared variables.
    pub variables: Vec<Variable>,
    /// Branch parameters such as `EJ` or `EC`.
    #[serde(default)]
    pub parameters: IndexMap<String, f64>,
    /// External fluxes in units of the flux quantum.
    #[serde(default)]
    pub external_fluxes: IndexMap<String, f64>,
    /// Offset charges.
    #[serde(default)]
    pub offset_charges: IndexMap<String, f64>,
    /// Hamiltonian text, e.g. `4*EC*n1^2 - EJ*cos(θ1)`.
    pub hamiltonian: String,
}

impl CircuitDescription {
    /// Names the parser resolves to scalar symbols.
    pub fn table(&self) -> SymbolTable {
        SymbolTable {
            parameters: self.parameters.keys().cloned().collect(),
            external_fluxes: self.external_fluxes.keys().cloned().collect(),
            offset_charges: self.offset_charges.keys().cloned().collect(),
        }
    }

    /// Initial values of every declared symbol.
    pub fn values(&self) -> SymbolValues {
        let parameters = self
            .parameters
            .iter()
            .map(|(name, value)| (Symbol::Parameter(name.clone()), *value));
        let fluxes = self
            .external_fluxes
            .iter()
            .map(|(name, value)| (Symbol::ExternalFlux(name.clone()), *value));
        let offsets = self
            .offset_charges
            .iter()
            .map(|(name, value)| (Symbol::OffsetCharge(name.clone()), *value));
        parameters.chain(fluxes).chain(offsets).collect()
    }
}

impl SymbolicSource for CircuitDescription {
    fn variables(&self) -> Vec<Variable> {
        self.variables.clone()
    }

    fn symbol_table(&self) -> SymbolTable {
        self.table()
    }

    fn raw_hamiltonian(&self, _values: &SymbolValues) -> Result<Expr, CircuitError> {
        parse_hamiltonian(&self.hamiltonian, &self.table())
    }
}

/// Basis, truncation and solver settings of a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// Basis of extended variables.
    #[serde(default)]
    pub basis: ExtBasis,
    /// Cutoff per variable index.
    #[serde(default)]
    pub cutoffs: BTreeMap<usize, usize>,
    /// Grid interval per discretized variable index.
    #[serde(default)]
    pub grid_ranges: BTreeMap<usize, GridRange>,
    /// Optional system hierarchy.
    #[serde(default)]
    pub hierarchy: Option<Vec<Group>>,
    /// Truncated dimensions matching `hierarchy`.
    #[serde(default)]
    pub truncation: Option<Vec<TruncDim>>,
    /// Storage of dressed Hamiltonians.
    #[serde(default)]
    pub dressed_format: MatrixFormat,
    /// Eigensolver settings.
    #[serde(default)]
    pub solver: SolverConfig,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            basis: ExtBasis::default(),
            cutoffs: BTreeMap::new(),
            grid_ranges: BTreeMap::new(),
            hierarchy: None,
            truncation: None,
            dressed_format: MatrixFormat::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl CircuitConfig {
    pub(crate) fn node_settings(&self) -> NodeSettings {
        NodeSettings {
            basis: self.basis,
            cutoffs: self.cutoffs.clone(),
            grids: self.grid_ranges.clone(),
            solver: self.solver.clone(),
            dressed_format: self.dressed_format,
        }
    }
}

/// A single mutation of a circuit field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldUpdate {
    /// New value of a branch parameter.
    Parameter {
        /// Parameter name.
        name: String,
        /// New value.
        value: f64,
    },
    /// New value of an external flux.
    ExternalFlux {
        /// Flux name.
        name: String,
        /// New value.
        value: f64,
    },
    /// New value of an offset charge.
    OffsetCharge {
        /// Offset charge name.
        name: String,
        /// New value.
        value: f64,
    },
    /// New cutoff of a variable.
    Cutoff {
        /// Variable index.
        variable: usize,
        /// New cutoff.
        cutoff: usize,
    },
    /// New grid interval of a discretized variable.
    GridRange {
        /// Variable index.
        variable: usize,
        /// New interval.
        range: GridRange,
    },
}
