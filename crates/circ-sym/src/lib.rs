#![deny(missing_docs)]
#![doc = "Typed symbolic Hamiltonians: expression trees, text parsing and canonicalization into substitution-ready monomials."]

pub mod canonical;
pub mod expr;
pub mod hash;
pub mod parse;
mod poly;
pub mod shift;
pub mod symbol;
pub mod values;

pub use canonical::{
    canonicalize, CanonicalHamiltonian, Canonicalized, Monomial, NumericTerms, OperatorKey,
    ScalarTerm,
};
pub use expr::{Expr, MAX_EXPONENT};
pub use hash::hamiltonian_hash;
pub use parse::{parse_hamiltonian, SymbolTable};
pub use poly::{Factor, Linear};
pub use shift::{FluxShiftSystem, ShiftSolution};
pub use symbol::{OpKind, OpSymbol, Symbol};
pub use values::SymbolValues;
