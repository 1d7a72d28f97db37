#![deny(missing_docs)]
#![doc = "Core types, error taxonomy and seeding policy shared by the hierarchical circuit diagonalization crates."]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod provenance;
pub mod rng;

pub use errors::{CircuitError, ErrorInfo};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle, DEFAULT_SEED};

/// Default charge cutoff of a periodic variable (dimension `2 * 5 + 1`).
pub const DEFAULT_PERIODIC_CUTOFF: usize = 5;

/// Default number of grid points or oscillator levels of an extended variable.
pub const DEFAULT_EXTENDED_CUTOFF: usize = 30;

/// Category of a circuit variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    /// Compact coordinate represented in a charge basis.
    Periodic,
    /// Unbounded coordinate represented on a grid or in an oscillator basis.
    Extended,
}

/// Basis used for extended variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtBasis {
    /// Uniform finite-difference grid.
    #[default]
    Discretized,
    /// Harmonic-oscillator eigenbasis.
    Harmonic,
}

/// Storage format of numeric operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatrixFormat {
    /// Compressed sparse rows.
    #[default]
    Sparse,
    /// Dense column-major storage.
    Dense,
}

impl MatrixFormat {
    /// Storage rule for a node: dense only for a single harmonic-basis variable.
    pub fn for_node(var_count: usize, basis: ExtBasis) -> Self {
        if var_count == 1 && basis == ExtBasis::Harmonic {
            MatrixFormat::Dense
        } else {
            MatrixFormat::Sparse
        }
    }
}

/// A circuit variable identified by its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variable {
    /// Index as used in symbol names (`θ1`, `n1`, `Q1`).
    pub index: usize,
    /// Periodic or extended.
    pub kind: VarKind,
}

impl Variable {
    /// Creates a periodic variable.
    pub const fn periodic(index: usize) -> Self {
        Self {
            index,
            kind: VarKind::Periodic,
        }
    }

    /// Creates an extended variable.
    pub const fn extended(index: usize) -> Self {
        Self {
            index,
            kind: VarKind::Extended,
        }
    }

    /// Cutoff used when none is configured.
    pub fn default_cutoff(&self) -> usize {
        match self.kind {
            VarKind::Periodic => DEFAULT_PERIODIC_CUTOFF,
            VarKind::Extended => DEFAULT_EXTENDED_CUTOFF,
        }
    }

    /// Matrix dimension implied by `cutoff`.
    pub fn dimension(&self, cutoff: usize) -> usize {
        match self.kind {
            VarKind::Periodic => 2 * cutoff + 1,
            VarKind::Extended => cutoff,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            VarKind::Periodic => "periodic",
            VarKind::Extended => "extended",
        };
        write!(f, "{}({kind})", self.index)
    }
}

/// Interval of a discretized extended coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridRange {
    /// Left end point (inclusive).
    pub min: f64,
    /// Right end point (inclusive).
    pub max: f64,
}

impl Default for GridRange {
    fn default() -> Self {
        Self {
            min: -6.0 * std::f64::consts::PI,
            max: 6.0 * std::f64::consts::PI,
        }
    }
}
