//! The [`Circuit`] facade: canonical Hamiltonian, subsystem tree and the
//! spectrum accessors built on them.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use circ_core::{CircuitError, Variable};
use circ_eig::{eigensystem, matrix_element_table, EigenSystem};
use circ_ops::{Operator, C64};
use circ_sym::{
    canonicalize, CanonicalHamiltonian, Canonicalized, Expr, OpSymbol, ShiftSolution, Symbol,
    SymbolTable, SymbolValues,
};
use nalgebra::DMatrix;
use tracing::{debug, info};

use crate::config::{CircuitConfig, CircuitDescription, FieldUpdate};
use crate::lookup::SpectrumLookup;
use crate::partition::{Group, TruncDim};
use crate::tree::SystemTree;

/// Supplier of the raw symbolic Hamiltonian.
///
/// Implementations derive the Hamiltonian from a circuit; some parameters
/// change its structure, and updating one of those regenerates it.
pub trait SymbolicSource: fmt::Debug + Send + Sync {
    /// Declared variables.
    fn variables(&self) -> Vec<Variable>;

    /// Declared parameter, flux and offset names.
    fn symbol_table(&self) -> SymbolTable;

    /// Raw Hamiltonian for the given symbol values.
    fn raw_hamiltonian(&self, values: &SymbolValues) -> Result<Expr, CircuitError>;

    /// True when changing `parameter` requires regenerating the Hamiltonian.
    fn regenerates_on(&self, _parameter: &str) -> bool {
        false
    }
}

/// A circuit ready for numeric diagonalization.
#[derive(Debug, Clone)]
pub struct Circuit {
    source: Arc<dyn SymbolicSource>,
    config: CircuitConfig,
    values: SymbolValues,
    canonical: Canonicalized,
    tree: SystemTree,
}

impl Circuit {
    /// Canonicalizes the Hamiltonian of `source` and evaluates every node.
    pub fn new(
        source: Arc<dyn SymbolicSource>,
        values: SymbolValues,
        config: CircuitConfig,
    ) -> Result<Self, CircuitError> {
        let (canonical, tree) = build(source.as_ref(), &values, &config)?;
        Ok(Self {
            source,
            config,
            values,
            canonical,
            tree,
        })
    }

    /// Circuit of a parsed description with its initial values.
    pub fn from_description(
        description: &CircuitDescription,
        config: CircuitConfig,
    ) -> Result<Self, CircuitError> {
        let values = description.values();
        Self::new(Arc::new(description.clone()), values, config)
    }

    /// Replaces the system hierarchy; the tree is rebuilt wholesale.
    pub fn set_system_hierarchy(
        &mut self,
        hierarchy: Option<Vec<Group>>,
        truncation: Option<Vec<TruncDim>>,
    ) -> Result<(), CircuitError> {
        let mut config = self.config.clone();
        config.hierarchy = hierarchy;
        config.truncation = truncation;
        let tree = build_tree(&self.canonical, self.source.as_ref(), &self.values, &config)?;
        self.config = config;
        self.tree = tree;
        Ok(())
    }

    /// Applies one field mutation. On error the circuit keeps its previous
    /// state.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn update(&mut self, update: FieldUpdate) -> Result<(), CircuitError> {
        let mut next = self.clone();
        next.apply(update)?;
        *self = next;
        Ok(())
    }

    fn apply(&mut self, update: FieldUpdate) -> Result<(), CircuitError> {
        let table = self.source.symbol_table();
        match update {
            FieldUpdate::Parameter { name, value } => {
                declared(&table.parameters, &name)?;
                self.values.set(Symbol::Parameter(name.clone()), value);
                if self.source.regenerates_on(&name) {
                    debug!(parameter = %name, "regenerating hamiltonian");
                    let (canonical, tree) = build(self.source.as_ref(), &self.values, &self.config)?;
                    self.canonical = canonical;
                    self.tree = tree;
                    return Ok(());
                }
                self.refresh_values()
            }
            FieldUpdate::ExternalFlux { name, value } => {
                declared(&table.external_fluxes, &name)?;
                self.values.set(Symbol::ExternalFlux(name), value);
                self.refresh_values()
            }
            FieldUpdate::OffsetCharge { name, value } => {
                declared(&table.offset_charges, &name)?;
                self.values.set(Symbol::OffsetCharge(name), value);
                self.refresh_values()
            }
            FieldUpdate::Cutoff { variable, cutoff } => {
                self.variable(variable)?;
                if cutoff == 0 {
                    return Err(CircuitError::structural("cutoff", "cutoffs must be positive")
                        .with_context("variable", variable.to_string()));
                }
                self.config.cutoffs.insert(variable, cutoff);
                let dirty = self.tree.set_cutoff(variable, cutoff);
                self.tree.evaluate(&dirty)
            }
            FieldUpdate::GridRange { variable, range } => {
                self.variable(variable)?;
                self.config.grid_ranges.insert(variable, range);
                let dirty = self.tree.set_grid(variable, range);
                self.tree.evaluate(&dirty)
            }
        }
    }

    fn refresh_values(&mut self) -> Result<(), CircuitError> {
        let bound = bind_shifts(&self.canonical, &self.values)?;
        let dirty = self.tree.set_values(&bound);
        debug!(nodes = dirty.len(), "propagated values");
        self.tree.evaluate(&dirty)
    }

    fn variable(&self, index: usize) -> Result<Variable, CircuitError> {
        self.source
            .variables()
            .into_iter()
            .find(|v| v.index == index)
            .ok_or_else(|| {
                CircuitError::structural("undeclared-variable", "no variable with this index")
                    .with_context("variable", index.to_string())
            })
    }

    /// Configuration in effect.
    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// Current values of the declared symbols.
    pub fn values(&self) -> &SymbolValues {
        &self.values
    }

    /// Canonical Hamiltonian.
    pub fn canonical(&self) -> &CanonicalHamiltonian {
        &self.canonical.hamiltonian
    }

    /// Coordinate shifts for the current values.
    pub fn flux_shifts(&self) -> Result<ShiftSolution, CircuitError> {
        self.canonical.shifts.solve(&self.values)
    }

    /// Subsystem tree.
    pub fn tree(&self) -> &SystemTree {
        &self.tree
    }

    /// Dimension of the space the top-level Hamiltonian acts on.
    pub fn hilbertdim(&self) -> usize {
        self.tree.dimension(0)
    }

    /// Numeric top-level Hamiltonian; dressed when the circuit is hierarchical.
    pub fn hamiltonian(&self) -> Result<&Operator, CircuitError> {
        self.tree.root().numeric_hamiltonian()
    }

    /// Operator by name, in the top-level space.
    pub fn get_operator(&self, name: &str) -> Result<Operator, CircuitError> {
        if name == "I" {
            return Ok(self.tree.identity(0));
        }
        let symbol: OpSymbol = name.parse()?;
        self.tree.operator(0, &[(symbol, 1)])
    }

    /// Lowest `k` eigenvalues, ascending.
    pub fn eigenvals(&self, k: usize) -> Result<Vec<f64>, CircuitError> {
        self.eigensys(k).map(|system| system.energies)
    }

    /// Lowest `k` eigenpairs, ascending.
    pub fn eigensys(&self, k: usize) -> Result<EigenSystem, CircuitError> {
        let system = eigensystem(self.hamiltonian()?, k, &self.config.solver)?;
        info!(
            k,
            dim = self.hilbertdim(),
            hierarchical = self.tree.is_hierarchical(),
            "solved spectrum"
        );
        Ok(system)
    }

    /// `⟨v_i|O|v_j⟩` over the lowest `k` eigenvectors.
    pub fn matrixelement_table(&self, name: &str, k: usize) -> Result<DMatrix<C64>, CircuitError> {
        let op = self.get_operator(name)?;
        let system = self.eigensys(k)?;
        let vectors = system.vectors.as_ref().ok_or_else(|| {
            CircuitError::structural("eigenvectors", "eigensolver returned no eigenvectors")
        })?;
        matrix_element_table(&op, vectors)
    }

    /// Bare-label lookup over the lowest `k` dressed states.
    pub fn spectrum_lookup(&self, k: usize) -> Result<SpectrumLookup, CircuitError> {
        if !self.tree.is_hierarchical() {
            return Err(CircuitError::structural(
                "lookup-flat",
                "spectrum lookup needs a hierarchical circuit",
            ));
        }
        SpectrumLookup::new(self.tree.top_level_dims(), &self.eigensys(k)?)
    }
}

fn declared(names: &BTreeSet<String>, name: &str) -> Result<(), CircuitError> {
    if names.contains(name) {
        Ok(())
    } else {
        Err(CircuitError::substitution("unknown-symbol", "symbol is not declared")
            .with_context("symbol", name.to_string()))
    }
}

fn bind_shifts(
    canonical: &Canonicalized,
    values: &SymbolValues,
) -> Result<SymbolValues, CircuitError> {
    let mut bound = values.clone();
    canonical.shifts.bind(&mut bound)?;
    Ok(bound)
}

fn build_tree(
    canonical: &Canonicalized,
    source: &dyn SymbolicSource,
    values: &SymbolValues,
    config: &CircuitConfig,
) -> Result<SystemTree, CircuitError> {
    let bound = bind_shifts(canonical, values)?;
    let mut tree = SystemTree::build(
        &canonical.hamiltonian,
        &source.variables(),
        config.hierarchy.as_deref(),
        config.truncation.as_deref(),
        &config.node_settings(),
        &bound,
    )?;
    tree.evaluate_all()?;
    Ok(tree)
}

#[tracing::instrument(level = "debug", skip_all)]
fn build(
    source: &dyn SymbolicSource,
    values: &SymbolValues,
    config: &CircuitConfig,
) -> Result<(Canonicalized, SystemTree), CircuitError> {
    let raw = source.raw_hamiltonian(values)?;
    let canonical = canonicalize(&raw, &source.variables(), config.basis)?;
    let tree = build_tree(&canonical, source, values, config)?;
    Ok((canonical, tree))
}
