#![deny(missing_docs)]
#![doc = "Concrete operators for circuit variables: charge, finite-difference and oscillator bases, Kronecker embedding and sparse/dense storage."]

pub mod charge;
pub mod embed;
pub mod grid;
pub mod matrix;
pub mod oscillator;

pub use embed::{elementary_operators, embed, OperatorSet, VarSpec};
pub use grid::Grid1d;
pub use matrix::{Operator, C64};
pub use oscillator::Oscillator;
