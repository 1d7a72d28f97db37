//! Per-node operator sets: elementary operators embedded into the node's
//! tensor-product space.
//!
//! Variables are laid out in ascending index order; the operator of the
//! variable at rank `r` is `I_left ⊗ O ⊗ I_right` where the identities span
//! the variables before and after it.

use std::collections::BTreeMap;

use circ_core::{CircuitError, ExtBasis, GridRange, MatrixFormat, VarKind, Variable};
use circ_sym::{OpKind, OpSymbol};
use tracing::debug;

use crate::matrix::Operator;
use crate::oscillator::Oscillator;
use crate::{charge, grid::Grid1d, oscillator};

/// Basis data of one variable within a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarSpec {
    /// The variable.
    pub variable: Variable,
    /// Charge cutoff, grid points or oscillator levels.
    pub cutoff: usize,
    /// Interval of a discretized coordinate.
    pub grid: GridRange,
    /// Oscillator scales in the harmonic basis.
    pub oscillator: Option<Oscillator>,
}

impl VarSpec {
    /// Matrix dimension of this variable.
    pub fn dimension(&self) -> usize {
        self.variable.dimension(self.cutoff)
    }
}

/// Elementary operators of one variable in its own (unembedded) space.
pub fn elementary_operators(
    spec: &VarSpec,
    basis: ExtBasis,
) -> Result<Vec<(OpKind, Operator)>, CircuitError> {
    if spec.cutoff == 0 {
        return Err(CircuitError::structural("cutoff", "cutoffs must be positive")
            .with_context("variable", spec.variable.index.to_string()));
    }
    let ops = match (spec.variable.kind, basis) {
        (VarKind::Periodic, _) => vec![
            (OpKind::Charge, charge::number(spec.cutoff)),
            (OpKind::Cos, charge::cos(spec.cutoff)),
            (OpKind::Sin, charge::sin(spec.cutoff)),
        ],
        (VarKind::Extended, ExtBasis::Discretized) => {
            let grid = Grid1d::new(spec.grid, spec.cutoff)?;
            vec![
                (OpKind::Position, grid.position()),
                (OpKind::Momentum, grid.momentum()),
                (OpKind::MomentumSquared, grid.momentum_squared()),
                (OpKind::Cos, grid.cos()),
                (OpKind::Sin, grid.sin()),
            ]
        }
        (VarKind::Extended, ExtBasis::Harmonic) => {
            let osc = spec.oscillator.ok_or_else(|| {
                CircuitError::structural(
                    "oscillator-missing",
                    "harmonic basis requires oscillator scales",
                )
                .with_context("variable", spec.variable.index.to_string())
            })?;
            let levels = spec.cutoff;
            let (cos, sin) = oscillator::trig(&osc, levels);
            vec![
                (OpKind::Annihilation, oscillator::annihilation(levels)),
                (OpKind::Creation, oscillator::creation(levels)),
                (OpKind::OscNumber, oscillator::number(levels)),
                (OpKind::Position, oscillator::position(&osc, levels)),
                (OpKind::Momentum, oscillator::momentum(&osc, levels)),
                (OpKind::Cos, cos),
                (OpKind::Sin, sin),
            ]
        }
    };
    Ok(ops)
}

/// Embeds `op`, acting on slot `slot`, into the product space of `dims`.
pub fn embed(op: &Operator, slot: usize, dims: &[usize], format: MatrixFormat) -> Operator {
    let left: usize = dims[..slot].iter().product();
    let right: usize = dims[slot + 1..].iter().product();
    let mut out = op.clone().into_format(MatrixFormat::Sparse);
    if left > 1 {
        out = Operator::identity(left, MatrixFormat::Sparse).kron(&out);
    }
    if right > 1 {
        out = out.kron(&Operator::identity(right, MatrixFormat::Sparse));
    }
    out.into_format(format)
}

/// Embedded operators of every variable of a node.
#[derive(Debug, Clone)]
pub struct OperatorSet {
    operators: BTreeMap<OpSymbol, Operator>,
    indices: Vec<usize>,
    dims: Vec<usize>,
    format: MatrixFormat,
}

impl OperatorSet {
    /// Builds and embeds the operators of `specs`, which must be sorted by
    /// variable index.
    pub fn build(
        specs: &[VarSpec],
        basis: ExtBasis,
        format: MatrixFormat,
    ) -> Result<Self, CircuitError> {
        if specs
            .windows(2)
            .any(|w| w[0].variable.index >= w[1].variable.index)
        {
            return Err(CircuitError::structural(
                "variable-order",
                "node variables must be unique and sorted ascending",
            ));
        }
        let dims: Vec<usize> = specs.iter().map(VarSpec::dimension).collect();
        let mut operators = BTreeMap::new();
        for (slot, spec) in specs.iter().enumerate() {
            for (kind, op) in elementary_operators(spec, basis)? {
                let symbol = OpSymbol::new(spec.variable.index, kind);
                operators.insert(symbol, embed(&op, slot, &dims, format));
            }
        }
        debug!(
            variables = specs.len(),
            dim = dims.iter().product::<usize>(),
            ?format,
            "built operator set"
        );
        Ok(Self {
            operators,
            indices: specs.iter().map(|s| s.variable.index).collect(),
            dims,
            format,
        })
    }

    /// Embedded operator for `symbol`.
    pub fn get(&self, symbol: &OpSymbol) -> Result<&Operator, CircuitError> {
        self.operators.get(symbol).ok_or_else(|| {
            CircuitError::unsupported("operator-set", "operator is not defined for this node")
                .with_context("operator", symbol.to_string())
        })
    }

    /// Looks up an operator by name; `I` is the identity.
    pub fn by_name(&self, name: &str) -> Result<Operator, CircuitError> {
        if name == "I" {
            return Ok(self.identity());
        }
        let symbol: OpSymbol = name.parse()?;
        self.get(&symbol).cloned()
    }

    /// Identity of the node space.
    pub fn identity(&self) -> Operator {
        Operator::identity(self.dim(), self.format)
    }

    /// Every defined operator symbol.
    pub fn symbols(&self) -> impl Iterator<Item = &OpSymbol> {
        self.operators.keys()
    }

    /// Variable indices in tensor order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Per-variable dimensions in tensor order.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Total dimension.
    pub fn dim(&self) -> usize {
        self.dims.iter().product()
    }

    /// Storage format.
    pub fn format(&self) -> MatrixFormat {
        self.format
    }
}
