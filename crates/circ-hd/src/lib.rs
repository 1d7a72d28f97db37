#![deny(missing_docs)]
#![doc = "Hierarchical diagonalization of circuit Hamiltonians: system partitioning, numeric evaluation, composite assembly of truncated subsystems and the `Circuit` facade."]

pub mod circuit;
pub mod composite;
pub mod config;
pub mod evaluate;
pub mod io;
pub mod lookup;
pub mod partition;
pub mod tree;

pub use circuit::{Circuit, SymbolicSource};
pub use composite::{CompositeSpace, Coupling};
pub use config::{CircuitConfig, CircuitDescription, FieldUpdate};
pub use lookup::SpectrumLookup;
pub use partition::{
    is_hierarchical, partition, truncation_template, Group, Partition, TruncDim,
    DEFAULT_COMBINED_TRUNCATION, DEFAULT_INDIVIDUAL_TRUNCATION,
};
pub use tree::{NodeId, NodeSettings, SubsystemNode, SystemTree};
