//! Arena of subsystem nodes.
//!
//! Nodes are stored in depth-first order, so a parent always precedes its
//! children. Children are owned through id lists; the parent link is a plain
//! id. Values and settings flow from the root down; numeric Hamiltonians are
//! rebuilt from the leaves up, one depth level at a time, with the nodes of a
//! level evaluated in parallel.

use std::collections::{BTreeMap, BTreeSet};

use circ_core::{CircuitError, ExtBasis, GridRange, MatrixFormat, Variable};
use circ_eig::{eigensystem, matrix_element_table, EigenSystem, SolverConfig};
use circ_ops::{Operator, OperatorSet, Oscillator, VarSpec, C64};
use circ_sym::{CanonicalHamiltonian, OpSymbol, OperatorKey, SymbolValues};
use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::debug;

use crate::composite::{tensor_product, CompositeSpace, Coupling};
use crate::evaluate::{evaluate, harmonic_reduction, monomial_operator};
use crate::partition::{self, Group, TruncDim};

/// Index of a node in its [`SystemTree`].
pub type NodeId = usize;

/// Basis choices inherited by every node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSettings {
    /// Basis of extended variables.
    pub basis: ExtBasis,
    /// Cutoff per variable; missing entries use the category default.
    pub cutoffs: BTreeMap<usize, usize>,
    /// Grid interval per discretized variable.
    pub grids: BTreeMap<usize, GridRange>,
    /// Eigensolver settings.
    pub solver: SolverConfig,
    /// Storage of dressed Hamiltonians.
    pub dressed_format: MatrixFormat,
}

impl NodeSettings {
    fn restricted(&self, variables: &[Variable]) -> Self {
        let keep: BTreeSet<usize> = variables.iter().map(|v| v.index).collect();
        Self {
            basis: self.basis,
            cutoffs: self
                .cutoffs
                .iter()
                .filter(|(i, _)| keep.contains(i))
                .map(|(i, c)| (*i, *c))
                .collect(),
            grids: self
                .grids
                .iter()
                .filter(|(i, _)| keep.contains(i))
                .map(|(i, g)| (*i, *g))
                .collect(),
            solver: self.solver.clone(),
            dressed_format: self.dressed_format,
        }
    }

    /// Cutoff in effect for `variable`.
    pub fn cutoff(&self, variable: &Variable) -> usize {
        self.cutoffs
            .get(&variable.index)
            .copied()
            .unwrap_or_else(|| variable.default_cutoff())
    }
}

#[derive(Debug, Clone)]
struct NodeState {
    specs: Vec<VarSpec>,
    operators: Option<OperatorSet>,
    hamiltonian: Operator,
    bare: Option<EigenSystem>,
}

/// One subsystem of the hierarchy.
#[derive(Debug, Clone)]
pub struct SubsystemNode {
    id: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    variables: Vec<Variable>,
    hamiltonian: CanonicalHamiltonian,
    interaction: CanonicalHamiltonian,
    couplings: CanonicalHamiltonian,
    truncated_dim: Option<usize>,
    settings: NodeSettings,
    values: SymbolValues,
    state: Option<NodeState>,
}

impl SubsystemNode {
    /// Id within the tree.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Parent id; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids in hierarchy order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Variables, sorted by index.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Every monomial acting inside this node.
    pub fn hamiltonian(&self) -> &CanonicalHamiltonian {
        &self.hamiltonian
    }

    /// Monomials coupling this node to its siblings.
    pub fn interaction(&self) -> &CanonicalHamiltonian {
        &self.interaction
    }

    /// Monomials coupling the children of this node.
    pub fn couplings(&self) -> &CanonicalHamiltonian {
        &self.couplings
    }

    /// Retained bare states; `None` for the root.
    pub fn truncated_dim(&self) -> Option<usize> {
        self.truncated_dim
    }

    /// True when the node is assembled from children.
    pub fn is_hierarchical(&self) -> bool {
        !self.children.is_empty()
    }

    /// Symbol values bound in this node.
    pub fn values(&self) -> &SymbolValues {
        &self.values
    }

    /// Inherited settings.
    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    /// Numeric Hamiltonian in the node's own space.
    pub fn numeric_hamiltonian(&self) -> Result<&Operator, CircuitError> {
        self.state().map(|s| &s.hamiltonian)
    }

    /// Bare eigenpairs retained for the parent.
    pub fn bare(&self) -> Option<&EigenSystem> {
        self.state.as_ref().and_then(|s| s.bare.as_ref())
    }

    fn state(&self) -> Result<&NodeState, CircuitError> {
        self.state.as_ref().ok_or_else(|| {
            CircuitError::structural("node-state", "subsystem has not been evaluated")
                .with_context("node", self.id.to_string())
        })
    }

    fn var_specs(&self, oscillators: &BTreeMap<usize, Oscillator>) -> Vec<VarSpec> {
        self.variables
            .iter()
            .map(|variable| VarSpec {
                variable: *variable,
                cutoff: self.settings.cutoff(variable),
                grid: self
                    .settings
                    .grids
                    .get(&variable.index)
                    .copied()
                    .unwrap_or_default(),
                oscillator: oscillators.get(&variable.index).copied(),
            })
            .collect()
    }
}

/// Arena of subsystem nodes rooted at id 0.
#[derive(Debug, Clone)]
pub struct SystemTree {
    nodes: Vec<SubsystemNode>,
}

impl SystemTree {
    /// Builds the node structure for `hierarchy`. Nothing is evaluated yet.
    pub fn build(
        hamiltonian: &CanonicalHamiltonian,
        variables: &[Variable],
        hierarchy: Option<&[Group]>,
        truncation: Option<&[TruncDim]>,
        settings: &NodeSettings,
        values: &SymbolValues,
    ) -> Result<Self, CircuitError> {
        let mut sorted = variables.to_vec();
        sorted.sort();
        if let Some(hierarchy) = hierarchy {
            let indices: Vec<usize> = sorted.iter().map(|v| v.index).collect();
            partition::validate(hierarchy, truncation, &indices)?;
        }
        let mut tree = SystemTree { nodes: Vec::new() };
        let root = tree.push(
            None,
            sorted,
            hamiltonian.clone(),
            CanonicalHamiltonian::default(),
            None,
            settings.clone(),
            values,
        );
        if let (Some(hierarchy), Some(truncation)) = (hierarchy, truncation) {
            if partition::is_hierarchical(hierarchy) {
                tree.spawn(root, hierarchy, truncation)?;
            }
        }
        debug!(nodes = tree.nodes.len(), "built subsystem tree");
        Ok(tree)
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        parent: Option<NodeId>,
        variables: Vec<Variable>,
        hamiltonian: CanonicalHamiltonian,
        interaction: CanonicalHamiltonian,
        truncated_dim: Option<usize>,
        settings: NodeSettings,
        values: &SymbolValues,
    ) -> NodeId {
        let id = self.nodes.len();
        let values = values.restricted_to(&hamiltonian.free_symbols());
        let settings = settings.restricted(&variables);
        self.nodes.push(SubsystemNode {
            id,
            parent,
            children: Vec::new(),
            variables,
            hamiltonian,
            interaction,
            couplings: CanonicalHamiltonian::default(),
            truncated_dim,
            settings,
            values,
            state: None,
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        id
    }

    fn spawn(
        &mut self,
        parent: NodeId,
        hierarchy: &[Group],
        truncation: &[TruncDim],
    ) -> Result<(), CircuitError> {
        let groups: Vec<BTreeSet<usize>> = hierarchy
            .iter()
            .map(|g| g.indices().into_iter().collect())
            .collect();
        let split = partition::partition(&self.nodes[parent].hamiltonian, &groups);
        self.nodes[parent].couplings = split.couplings;

        for ((entry, trunc), terms) in hierarchy.iter().zip(truncation).zip(split.groups) {
            let node = &self.nodes[parent];
            let variables: Vec<Variable> = node
                .variables
                .iter()
                .filter(|v| terms.variables.contains(&v.index))
                .copied()
                .collect();
            let settings = node.settings.clone();
            let values = node.values.clone();
            let child = self.push(
                Some(parent),
                variables,
                terms.own,
                terms.interaction,
                Some(trunc.dim()),
                settings,
                &values,
            );
            if entry.is_hierarchical() {
                let nested = trunc.nested().ok_or_else(|| {
                    CircuitError::structural(
                        "truncation-shape",
                        "nested subsystems need a combined truncation entry",
                    )
                })?;
                self.spawn(child, &entry.children(), nested)?;
            }
        }
        Ok(())
    }

    /// Root node.
    pub fn root(&self) -> &SubsystemNode {
        &self.nodes[0]
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> Option<&SubsystemNode> {
        self.nodes.get(id)
    }

    /// Every node in depth-first order.
    pub fn nodes(&self) -> &[SubsystemNode] {
        &self.nodes
    }

    /// True when the root is assembled from subsystems.
    pub fn is_hierarchical(&self) -> bool {
        self.root().is_hierarchical()
    }

    /// Dimension of a node's own space.
    pub fn dimension(&self, id: NodeId) -> usize {
        let node = &self.nodes[id];
        if node.is_hierarchical() {
            self.child_dims(node).iter().product()
        } else {
            node.variables
                .iter()
                .map(|v| v.dimension(node.settings.cutoff(v)))
                .product()
        }
    }

    fn child_dims(&self, node: &SubsystemNode) -> Vec<usize> {
        node.children
            .iter()
            .map(|c| self.nodes[*c].truncated_dim.unwrap_or(0))
            .collect()
    }

    /// Truncated dimensions of the root's subsystems.
    pub fn top_level_dims(&self) -> Vec<usize> {
        self.child_dims(self.root())
    }

    fn depth(&self, mut id: NodeId) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.nodes[id].parent {
            id = parent;
            depth += 1;
        }
        depth
    }

    /// Pushes root values down the tree; returns the nodes whose values changed.
    pub fn set_values(&mut self, values: &SymbolValues) -> BTreeSet<NodeId> {
        let mut changed = BTreeSet::new();
        for id in 0..self.nodes.len() {
            let inherited = match self.nodes[id].parent {
                None => values.clone(),
                Some(parent) => self.nodes[parent].values.clone(),
            };
            let node = &mut self.nodes[id];
            let restricted = inherited.restricted_to(&node.hamiltonian.free_symbols());
            if restricted != node.values {
                node.values = restricted;
                changed.insert(id);
            }
        }
        changed
    }

    /// Changes a cutoff in every node holding `variable`; returns those nodes.
    pub fn set_cutoff(&mut self, variable: usize, cutoff: usize) -> BTreeSet<NodeId> {
        self.update_settings(variable, |settings| {
            settings.cutoffs.insert(variable, cutoff);
        })
    }

    /// Changes a grid interval in every node holding `variable`.
    pub fn set_grid(&mut self, variable: usize, range: GridRange) -> BTreeSet<NodeId> {
        self.update_settings(variable, |settings| {
            settings.grids.insert(variable, range);
        })
    }

    fn update_settings(
        &mut self,
        variable: usize,
        apply: impl Fn(&mut NodeSettings),
    ) -> BTreeSet<NodeId> {
        let mut changed = BTreeSet::new();
        for node in &mut self.nodes {
            if node.variables.iter().any(|v| v.index == variable) {
                apply(&mut node.settings);
                changed.insert(node.id);
            }
        }
        changed
    }

    /// Evaluates every node.
    pub fn evaluate_all(&mut self) -> Result<(), CircuitError> {
        let all: BTreeSet<NodeId> = (0..self.nodes.len()).collect();
        self.evaluate(&all)
    }

    /// Re-evaluates `dirty` nodes and all of their ancestors, deepest first.
    #[tracing::instrument(level = "debug", skip(self, dirty), fields(dirty = dirty.len()))]
    pub fn evaluate(&mut self, dirty: &BTreeSet<NodeId>) -> Result<(), CircuitError> {
        let mut pending = BTreeSet::new();
        for &id in dirty {
            let mut cursor = Some(id);
            while let Some(current) = cursor {
                pending.insert(current);
                cursor = self.nodes[current].parent;
            }
        }
        let mut levels: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        for id in pending {
            levels.entry(self.depth(id)).or_default().push(id);
        }
        for (depth, ids) in levels.into_iter().rev() {
            let states = ids
                .par_iter()
                .map(|&id| self.compute(id).map(|state| (id, state)))
                .collect::<Result<Vec<_>, CircuitError>>()?;
            debug!(depth, nodes = states.len(), "evaluated level");
            for (id, state) in states {
                self.nodes[id].state = Some(state);
            }
        }
        Ok(())
    }

    fn compute(&self, id: NodeId) -> Result<NodeState, CircuitError> {
        let node = &self.nodes[id];
        let (specs, operators, hamiltonian) = if node.is_hierarchical() {
            (Vec::new(), None, self.assemble(node)?)
        } else {
            let (specs, operators, hamiltonian) = self.evaluate_leaf(node)?;
            (specs, Some(operators), hamiltonian)
        };
        let bare = match node.truncated_dim {
            Some(dim) => Some(
                eigensystem(&hamiltonian, dim, &node.settings.solver)
                    .map_err(|err| err.with_context("node", id.to_string()))?,
            ),
            None => None,
        };
        Ok(NodeState {
            specs,
            operators,
            hamiltonian,
            bare,
        })
    }

    fn evaluate_leaf(
        &self,
        node: &SubsystemNode,
    ) -> Result<(Vec<VarSpec>, OperatorSet, Operator), CircuitError> {
        let mut terms = node.hamiltonian.numeric_terms(&node.values)?;
        let oscillators = if node.settings.basis == ExtBasis::Harmonic {
            harmonic_reduction(&mut terms, &node.variables)?
        } else {
            BTreeMap::new()
        };
        let specs = node.var_specs(&oscillators);
        let cached = node
            .state
            .as_ref()
            .filter(|state| state.specs == specs)
            .and_then(|state| state.operators.clone());
        let operators = match cached {
            Some(operators) => operators,
            None => {
                let format = MatrixFormat::for_node(node.variables.len(), node.settings.basis);
                OperatorSet::build(&specs, node.settings.basis, format)?
            }
        };
        let hamiltonian = evaluate(&terms, &operators)?;
        Ok((specs, operators, hamiltonian))
    }

    fn assemble(&self, node: &SubsystemNode) -> Result<Operator, CircuitError> {
        let mut space = CompositeSpace::new();
        for &child in &node.children {
            let bare = self.bare_of(child)?;
            space.add_subsystem(bare.energies.clone());
        }
        for (key, coefficient) in node.couplings.numeric_terms(&node.values)? {
            let mut factors = Vec::new();
            for (slot, part) in self.split_by_child(node, &key)? {
                factors.push((slot, self.projected(node.children[slot], &part)?));
            }
            space.add_coupling(Coupling {
                coefficient,
                factors,
            })?;
        }
        debug!(
            node = node.id,
            dims = ?space.dims(),
            couplings = space.couplings().len(),
            "assembled composite"
        );
        space.hamiltonian(node.settings.dressed_format)
    }

    fn bare_of(&self, id: NodeId) -> Result<&EigenSystem, CircuitError> {
        let node = &self.nodes[id];
        node.state()?.bare.as_ref().ok_or_else(|| {
            CircuitError::structural("bare-missing", "subsystem has no truncated eigenbasis")
                .with_context("node", id.to_string())
        })
    }

    fn split_by_child(
        &self,
        node: &SubsystemNode,
        key: &[(OpSymbol, u32)],
    ) -> Result<BTreeMap<usize, OperatorKey>, CircuitError> {
        let mut parts: BTreeMap<usize, OperatorKey> = BTreeMap::new();
        for (symbol, power) in key {
            let slot = node
                .children
                .iter()
                .position(|c| self.nodes[*c].variables.iter().any(|v| v.index == symbol.var))
                .ok_or_else(|| {
                    CircuitError::unsupported(
                        "node-variable",
                        "operator acts on a variable outside this subsystem",
                    )
                    .with_context("operator", symbol.to_string())
                    .with_context("node", node.id.to_string())
                })?;
            parts.entry(slot).or_default().push((*symbol, *power));
        }
        Ok(parts)
    }

    /// `V† O V` for the product `key` evaluated in node `id`'s own space,
    /// with `V` the node's retained bare states.
    fn projected(
        &self,
        id: NodeId,
        key: &[(OpSymbol, u32)],
    ) -> Result<DMatrix<C64>, CircuitError> {
        let op = self.operator(id, key)?;
        let vectors = self.bare_of(id)?.vectors.as_ref().ok_or_else(|| {
            CircuitError::structural("bare-vectors", "bare eigenvectors were not retained")
                .with_context("node", id.to_string())
        })?;
        matrix_element_table(&op, vectors)
    }

    /// Operator product `key` in the own space of node `id`.
    ///
    /// In a hierarchical node each factor is projected onto the bare states
    /// of the child holding its variable and placed at that child's slot.
    pub fn operator(&self, id: NodeId, key: &[(OpSymbol, u32)]) -> Result<Operator, CircuitError> {
        let node = self.nodes.get(id).ok_or_else(|| {
            CircuitError::structural("node-id", "no such subsystem").with_context("node", id.to_string())
        })?;
        if !node.is_hierarchical() {
            let operators = node.state()?.operators.as_ref().ok_or_else(|| {
                CircuitError::structural("node-operators", "leaf has no operator set")
                    .with_context("node", id.to_string())
            })?;
            return monomial_operator(key, operators);
        }
        let mut factors = Vec::new();
        for (slot, part) in self.split_by_child(node, key)? {
            let matrix = self.projected(node.children[slot], &part)?;
            factors.push((slot, Operator::Dense(matrix)));
        }
        Ok(tensor_product(
            &self.child_dims(node),
            &factors,
            node.settings.dressed_format,
        ))
    }

    /// Identity of node `id`'s own space.
    pub fn identity(&self, id: NodeId) -> Operator {
        let node = &self.nodes[id];
        let format = if node.is_hierarchical() {
            node.settings.dressed_format
        } else {
            MatrixFormat::for_node(node.variables.len(), node.settings.basis)
        };
        Operator::identity(self.dimension(id), format)
    }
}
