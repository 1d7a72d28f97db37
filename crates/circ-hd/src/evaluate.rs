//! Numeric evaluation of canonical Hamiltonians against an operator set.

use std::collections::BTreeMap;

use circ_core::{CircuitError, VarKind, Variable};
use circ_ops::{Operator, OperatorSet, Oscillator, C64};
use circ_sym::{NumericTerms, OpKind, OpSymbol};

/// Product of the operator powers in `key`; the empty product is the identity.
pub fn monomial_operator(
    key: &[(OpSymbol, u32)],
    operators: &OperatorSet,
) -> Result<Operator, CircuitError> {
    let mut product: Option<Operator> = None;
    for (symbol, power) in key {
        let factor = operators.get(symbol)?.pow(*power);
        product = Some(match product {
            None => factor,
            Some(acc) => acc.matmul(&factor)?,
        });
    }
    Ok(product.unwrap_or_else(|| operators.identity()))
}

/// Sums `coefficient · Π operator^power` over every numeric term.
pub fn evaluate(terms: &NumericTerms, operators: &OperatorSet) -> Result<Operator, CircuitError> {
    let mut total = Operator::zeros(operators.dim(), operators.format());
    for (key, coefficient) in terms {
        let term = monomial_operator(key, operators)?.scale(C64::new(*coefficient, 0.0));
        total = total.add(&term)?;
    }
    Ok(total)
}

/// Replaces `4E_C Q² + ½E_L θ²` of every extended variable by `ω N`, and
/// returns the oscillator scales the harmonic basis is built from.
pub fn harmonic_reduction(
    terms: &mut NumericTerms,
    variables: &[Variable],
) -> Result<BTreeMap<usize, Oscillator>, CircuitError> {
    let mut oscillators = BTreeMap::new();
    for variable in variables.iter().filter(|v| v.kind == VarKind::Extended) {
        let index = variable.index;
        let momentum = vec![(OpSymbol::new(index, OpKind::Momentum), 2)];
        let position = vec![(OpSymbol::new(index, OpKind::Position), 2)];
        let ec = terms.get(&momentum).copied().unwrap_or(0.0) / 4.0;
        let el = 2.0 * terms.get(&position).copied().unwrap_or(0.0);
        let oscillator = Oscillator::from_energies(ec, el)
            .map_err(|err| err.with_context("variable", index.to_string()))?;
        terms.remove(&momentum);
        terms.remove(&position);
        *terms
            .entry(vec![(OpSymbol::new(index, OpKind::OscNumber), 1)])
            .or_insert(0.0) += oscillator.frequency;
        oscillators.insert(index, oscillator);
    }
    Ok(oscillators)
}
