//! Numeric values bound to scalar symbols.

use std::collections::{BTreeMap, BTreeSet};

use circ_core::CircuitError;

use crate::symbol::Symbol;

/// Numeric substitution state of a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolValues {
    values: BTreeMap<Symbol, f64>,
}

impl SymbolValues {
    /// Creates an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `symbol` to `value`, replacing any previous binding.
    pub fn set(&mut self, symbol: Symbol, value: f64) {
        self.values.insert(symbol, value);
    }

    /// Returns the bound value.
    pub fn get(&self, symbol: &Symbol) -> Option<f64> {
        self.values.get(symbol).copied()
    }

    /// Returns the bound value or a substitution error naming the symbol.
    pub fn require(&self, symbol: &Symbol) -> Result<f64, CircuitError> {
        self.get(symbol).ok_or_else(|| {
            CircuitError::substitution("missing-value", "symbol has no numeric value")
                .with_context("symbol", symbol.to_string())
        })
    }

    /// True when `symbol` is bound.
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.values.contains_key(symbol)
    }

    /// Keeps only the bindings whose symbol appears in `symbols`.
    pub fn restricted_to(&self, symbols: &BTreeSet<Symbol>) -> SymbolValues {
        SymbolValues {
            values: self
                .values
                .iter()
                .filter(|(symbol, _)| symbols.contains(*symbol))
                .map(|(s, v)| (s.clone(), *v))
                .collect(),
        }
    }

    /// Iterates over bindings in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, f64)> {
        self.values.iter().map(|(s, v)| (s, *v))
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(Symbol, f64)> for SymbolValues {
    fn from_iter<I: IntoIterator<Item = (Symbol, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
