//! System hierarchies, truncation dimensions and the split of a canonical
//! Hamiltonian into per-group and coupling terms.

use std::collections::BTreeSet;

use circ_core::CircuitError;
use circ_sym::{CanonicalHamiltonian, Monomial};
use serde::{Deserialize, Serialize};

/// Entry of a system hierarchy: a variable index or a nested list.
///
/// `[[1, 2], [3]]` describes two subsystems; `[[[1], [2]], [3]]` makes the
/// first subsystem itself hierarchical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Group {
    /// A single variable.
    Var(usize),
    /// A subsystem made of the listed entries.
    Nested(Vec<Group>),
}

impl Group {
    /// Variable indices in the order they were listed.
    pub fn indices(&self) -> Vec<usize> {
        match self {
            Group::Var(index) => vec![*index],
            Group::Nested(children) => children.iter().flat_map(Group::indices).collect(),
        }
    }

    /// Sub-hierarchy of the subsystem this entry describes.
    pub fn children(&self) -> Vec<Group> {
        match self {
            Group::Var(index) => vec![Group::Var(*index)],
            Group::Nested(children) => children.clone(),
        }
    }

    /// True when the subsystem is itself partitioned further.
    pub fn is_hierarchical(&self) -> bool {
        match self {
            Group::Var(_) => false,
            Group::Nested(children) => is_hierarchical(children),
        }
    }
}

/// True when any entry of `hierarchy` is a list, i.e. the system is split
/// into subsystems.
pub fn is_hierarchical(hierarchy: &[Group]) -> bool {
    hierarchy.iter().any(|g| matches!(g, Group::Nested(_)))
}

/// Truncated dimension of one subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TruncDim {
    /// Retained bare states of a leaf subsystem.
    Individual(usize),
    /// Retained states of a hierarchical subsystem plus the dimensions of
    /// its own subsystems.
    Combined(usize, Vec<TruncDim>),
}

impl TruncDim {
    /// Number of retained states.
    pub fn dim(&self) -> usize {
        match self {
            TruncDim::Individual(dim) | TruncDim::Combined(dim, _) => *dim,
        }
    }

    /// Dimensions of the nested subsystems, if any.
    pub fn nested(&self) -> Option<&[TruncDim]> {
        match self {
            TruncDim::Individual(_) => None,
            TruncDim::Combined(_, nested) => Some(nested),
        }
    }
}

/// Default retained states of a leaf subsystem.
pub const DEFAULT_INDIVIDUAL_TRUNCATION: usize = 6;

/// Default retained states of a hierarchical subsystem.
pub const DEFAULT_COMBINED_TRUNCATION: usize = 50;

/// Suggests truncated dimensions matching the shape of `hierarchy`.
pub fn truncation_template(hierarchy: &[Group], individual: usize, combined: usize) -> Vec<TruncDim> {
    hierarchy
        .iter()
        .map(|entry| match entry {
            Group::Nested(children) if is_hierarchical(children) => TruncDim::Combined(
                combined,
                truncation_template(children, individual, combined),
            ),
            _ => TruncDim::Individual(individual),
        })
        .collect()
}

/// Checks that `hierarchy` partitions `variables` and that `truncation`
/// has a matching shape. Flat hierarchies need no truncation.
pub fn validate(
    hierarchy: &[Group],
    truncation: Option<&[TruncDim]>,
    variables: &[usize],
) -> Result<(), CircuitError> {
    check_nonempty(hierarchy)?;
    let declared: BTreeSet<usize> = variables.iter().copied().collect();
    let listed: Vec<usize> = hierarchy.iter().flat_map(Group::indices).collect();
    let unique: BTreeSet<usize> = listed.iter().copied().collect();
    if unique.len() != listed.len() || unique != declared {
        return Err(CircuitError::structural(
            "hierarchy-partition",
            "hierarchy must list every variable exactly once",
        )
        .with_context("declared", format!("{declared:?}"))
        .with_context("listed", format!("{listed:?}")));
    }
    if !is_hierarchical(hierarchy) {
        return Ok(());
    }
    let truncation = truncation.ok_or_else(|| {
        CircuitError::structural(
            "truncation-missing",
            "hierarchical diagonalization needs a truncated dimension per subsystem",
        )
        .with_hint("start from truncation_template(hierarchy, 6, 50)")
    })?;
    check_shape(hierarchy, truncation)
}

fn check_nonempty(hierarchy: &[Group]) -> Result<(), CircuitError> {
    if hierarchy.is_empty() {
        return Err(CircuitError::structural(
            "hierarchy-empty",
            "hierarchy entries must not be empty",
        ));
    }
    for entry in hierarchy {
        if let Group::Nested(children) = entry {
            check_nonempty(children)?;
        }
    }
    Ok(())
}

fn check_shape(hierarchy: &[Group], truncation: &[TruncDim]) -> Result<(), CircuitError> {
    if hierarchy.len() != truncation.len() {
        return Err(CircuitError::structural(
            "truncation-shape",
            "one truncated dimension is needed per subsystem",
        )
        .with_context("subsystems", hierarchy.len().to_string())
        .with_context("dimensions", truncation.len().to_string()));
    }
    for (entry, trunc) in hierarchy.iter().zip(truncation) {
        if trunc.dim() == 0 {
            return Err(CircuitError::structural(
                "truncation-size",
                "truncated dimensions must be positive",
            )
            .with_context("subsystem", format!("{:?}", entry.indices())));
        }
        match (entry.is_hierarchical(), trunc) {
            (true, TruncDim::Combined(_, nested)) => check_shape(&entry.children(), nested)?,
            (false, TruncDim::Individual(_)) => {}
            _ => {
                return Err(CircuitError::structural(
                    "truncation-shape",
                    "nested subsystems need a combined truncation entry and leaves a single one",
                )
                .with_context("subsystem", format!("{:?}", entry.indices())))
            }
        }
    }
    Ok(())
}

/// Terms attributed to one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTerms {
    /// Variables of the group.
    pub variables: BTreeSet<usize>,
    /// Monomials acting only on the group.
    pub own: CanonicalHamiltonian,
    /// Monomials coupling the group to other groups.
    pub interaction: CanonicalHamiltonian,
}

/// Result of [`partition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Buckets in group order.
    pub groups: Vec<GroupTerms>,
    /// Every monomial spanning more than one group, listed once.
    pub couplings: CanonicalHamiltonian,
}

/// Splits `hamiltonian` over disjoint variable groups.
///
/// A monomial whose variables lie inside one group goes to that group's own
/// terms; operator-free monomials go to the first group. Any other monomial
/// is a coupling and appears in the interaction bucket of every group it
/// touches.
pub fn partition(hamiltonian: &CanonicalHamiltonian, groups: &[BTreeSet<usize>]) -> Partition {
    let mut own: Vec<Vec<Monomial>> = vec![Vec::new(); groups.len()];
    let mut interaction: Vec<Vec<Monomial>> = vec![Vec::new(); groups.len()];
    let mut couplings = Vec::new();
    for monomial in hamiltonian.monomials() {
        let variables = monomial.variables();
        match groups.iter().position(|g| variables.is_subset(g)) {
            Some(owner) => own[owner].push(monomial.clone()),
            None => {
                for (slot, group) in groups.iter().enumerate() {
                    if !variables.is_disjoint(group) {
                        interaction[slot].push(monomial.clone());
                    }
                }
                couplings.push(monomial.clone());
            }
        }
    }
    Partition {
        groups: groups
            .iter()
            .zip(own.into_iter().zip(interaction))
            .map(|(variables, (own, interaction))| GroupTerms {
                variables: variables.clone(),
                own: CanonicalHamiltonian::new(own),
                interaction: CanonicalHamiltonian::new(interaction),
            })
            .collect(),
        couplings: CanonicalHamiltonian::new(couplings),
    }
}
