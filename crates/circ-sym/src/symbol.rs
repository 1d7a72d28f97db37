//! Symbols of the Hamiltonian algebra and tagged operator names.

use std::fmt;
use std::str::FromStr;

use circ_core::CircuitError;
use serde::{Deserialize, Serialize};

/// Leaf symbol of a Hamiltonian expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// Coordinate `θ<i>`.
    Position(usize),
    /// Momentum `Q<i>` of an extended variable.
    Momentum(usize),
    /// Charge number `n<i>` of a periodic variable.
    Charge(usize),
    /// Branch parameter such as `EJ`.
    Parameter(String),
    /// External flux threading a closure branch.
    ExternalFlux(String),
    /// Offset charge of a periodic variable.
    OffsetCharge(String),
    /// Constant displacement of an extended coordinate.
    FluxShift(usize),
}

impl Symbol {
    /// True for operator-valued symbols.
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            Symbol::Position(_) | Symbol::Momentum(_) | Symbol::Charge(_)
        )
    }

    /// True for symbols carrying an implicit identity factor. Shifts count
    /// because they are solved from the fluxes.
    pub fn is_identity_bearing(&self) -> bool {
        matches!(
            self,
            Symbol::ExternalFlux(_) | Symbol::OffsetCharge(_) | Symbol::FluxShift(_)
        )
    }

    /// Variable index of an operator symbol.
    pub fn var_index(&self) -> Option<usize> {
        match self {
            Symbol::Position(i) | Symbol::Momentum(i) | Symbol::Charge(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Position(i) => write!(f, "θ{i}"),
            Symbol::Momentum(i) => write!(f, "Q{i}"),
            Symbol::Charge(i) => write!(f, "n{i}"),
            Symbol::Parameter(name) | Symbol::ExternalFlux(name) | Symbol::OffsetCharge(name) => {
                write!(f, "{name}")
            }
            Symbol::FluxShift(i) => write!(f, "Δ{i}"),
        }
    }
}

/// Kind of an elementary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OpKind {
    /// Charge number of a periodic variable.
    Charge,
    /// `cos θ`.
    Cos,
    /// `sin θ`.
    Sin,
    /// Coordinate of an extended variable.
    Position,
    /// First-derivative momentum.
    Momentum,
    /// Dedicated second-derivative momentum squared.
    MomentumSquared,
    /// Oscillator lowering operator.
    Annihilation,
    /// Oscillator raising operator.
    Creation,
    /// Oscillator number operator.
    OscNumber,
}

impl OpKind {
    fn prefix(&self) -> &'static str {
        match self {
            OpKind::Charge => "n",
            OpKind::Cos => "cos",
            OpKind::Sin => "sin",
            OpKind::Position => "theta",
            OpKind::Momentum => "Q",
            OpKind::MomentumSquared => "Qs",
            OpKind::Annihilation => "a",
            OpKind::Creation => "ad",
            OpKind::OscNumber => "Nh",
        }
    }
}

/// Operator symbol tagged `<kind><index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpSymbol {
    /// Variable index.
    pub var: usize,
    /// Operator kind.
    pub kind: OpKind,
}

impl OpSymbol {
    /// Creates a tagged operator symbol.
    pub const fn new(var: usize, kind: OpKind) -> Self {
        Self { var, kind }
    }
}

impl fmt::Display for OpSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.var)
    }
}

// Longer prefixes first so `Qs` wins over `Q` and `ad` over `a`.
const NAME_PREFIXES: &[(&str, OpKind)] = &[
    ("theta", OpKind::Position),
    ("cos", OpKind::Cos),
    ("sin", OpKind::Sin),
    ("Qs", OpKind::MomentumSquared),
    ("Nh", OpKind::OscNumber),
    ("ad", OpKind::Creation),
    ("θc", OpKind::Cos),
    ("θs", OpKind::Sin),
    ("θ", OpKind::Position),
    ("Q", OpKind::Momentum),
    ("n", OpKind::Charge),
    ("a", OpKind::Annihilation),
];

impl FromStr for OpSymbol {
    type Err = CircuitError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        for (prefix, kind) in NAME_PREFIXES {
            let Some(rest) = name.strip_prefix(prefix) else {
                continue;
            };
            if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if let Ok(var) = rest.parse::<usize>() {
                return Ok(OpSymbol::new(var, *kind));
            }
        }
        Err(CircuitError::unsupported("operator-name", "unrecognized operator name")
            .with_context("name", name))
    }
}
