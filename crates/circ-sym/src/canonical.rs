//! Canonical, substitution-ready Hamiltonians.
//!
//! Canonicalization turns a raw [`Expr`] into a sum of [`Monomial`]s whose
//! operator part is a product of tagged [`OpSymbol`] powers and whose scalar
//! part is a product of parameter, flux, offset and shift factors. The steps
//! are applied in order:
//!
//! 1. extended coordinates with a linear term are shifted by `Δ<i>`, with the
//!    shifts fixed later by [`FluxShiftSystem::solve`];
//! 2. trigonometric functions of coordinates are expanded and tagged
//!    `cos<i>` / `sin<i>`;
//! 3. in the discretized basis `Q<i>²` is tagged `Qs<i>`;
//! 4. external fluxes are scaled by `2π`, and flux, offset or shift factors
//!    mark a term as identity bearing;
//! 5. operator-free terms that are not identity bearing are dropped; in the
//!    harmonic basis every operator-free term is dropped.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use circ_core::{CircuitError, ExtBasis, VarKind, Variable};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expr::Expr;
use crate::poly::{expand, Factor, Key, Poly};
use crate::shift::FluxShiftSystem;
use crate::symbol::{OpKind, OpSymbol, Symbol};
use crate::values::SymbolValues;

/// Operator part of a monomial: sorted `(operator, power)` pairs.
pub type OperatorKey = Vec<(OpSymbol, u32)>;

/// Numeric Hamiltonian: coefficient per operator product.
pub type NumericTerms = BTreeMap<OperatorKey, f64>;

/// Scalar part of a monomial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarTerm {
    /// Numeric prefactor.
    pub coefficient: f64,
    /// Scalar factors with integer powers.
    pub factors: Vec<(Factor, i32)>,
}

impl ScalarTerm {
    /// Evaluates the term against bound symbol values.
    pub fn evaluate(&self, values: &SymbolValues) -> Result<f64, CircuitError> {
        let lookup = |symbol: &Symbol| values.require(symbol);
        let mut result = self.coefficient;
        for (factor, power) in &self.factors {
            let base = match factor {
                Factor::Sym(symbol) => lookup(symbol)?,
                Factor::Cos(arg) => arg.evaluate(&lookup)?.cos(),
                Factor::Sin(arg) => arg.evaluate(&lookup)?.sin(),
            };
            result *= base.powi(*power);
        }
        Ok(result)
    }

    /// Every scalar symbol referenced, including inside trigonometric factors.
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        for (factor, _) in &self.factors {
            match factor {
                Factor::Sym(symbol) => {
                    out.insert(symbol.clone());
                }
                Factor::Cos(arg) | Factor::Sin(arg) => {
                    out.extend(arg.terms().iter().map(|(s, _)| s.clone()));
                }
            }
        }
        out
    }

    /// True when a flux, offset or shift symbol appears.
    pub fn is_identity_bearing(&self) -> bool {
        self.symbols().iter().any(Symbol::is_identity_bearing)
    }
}

/// One term of a canonical Hamiltonian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monomial {
    /// Scalar prefactor.
    pub scalar: ScalarTerm,
    /// Operator product, sorted by variable then kind.
    pub operators: OperatorKey,
}

impl Monomial {
    /// Variable indices touched by the operator part.
    pub fn variables(&self) -> BTreeSet<usize> {
        self.operators.iter().map(|(op, _)| op.var).collect()
    }

    /// True when the monomial multiplies an implicit identity.
    pub fn is_identity_bearing(&self) -> bool {
        self.scalar.is_identity_bearing()
    }

    fn order(&self, other: &Self) -> Ordering {
        self.operators
            .cmp(&other.operators)
            .then_with(|| self.scalar.factors.cmp(&other.scalar.factors))
            .then_with(|| self.scalar.coefficient.total_cmp(&other.scalar.coefficient))
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scalar.coefficient)?;
        for (factor, power) in &self.scalar.factors {
            match power {
                1 => write!(f, "*{factor}")?,
                p => write!(f, "*{factor}^{p}")?,
            }
        }
        for (op, power) in &self.operators {
            match power {
                1 => write!(f, "*{op}")?,
                p => write!(f, "*{op}^{p}")?,
            }
        }
        Ok(())
    }
}

/// Sum of canonical monomials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalHamiltonian {
    monomials: Vec<Monomial>,
}

impl CanonicalHamiltonian {
    /// Builds a Hamiltonian from monomials, merging repeated terms.
    pub fn new(monomials: Vec<Monomial>) -> Self {
        let mut merged: Vec<Monomial> = Vec::with_capacity(monomials.len());
        let mut sorted = monomials;
        sorted.sort_by(|a, b| a.order(b));
        for monomial in sorted {
            match merged.last_mut() {
                Some(last)
                    if last.operators == monomial.operators
                        && last.scalar.factors == monomial.scalar.factors =>
                {
                    last.scalar.coefficient += monomial.scalar.coefficient;
                }
                _ => merged.push(monomial),
            }
        }
        merged.retain(|m| m.scalar.coefficient != 0.0);
        Self { monomials: merged }
    }

    /// Monomials in canonical order.
    pub fn monomials(&self) -> &[Monomial] {
        &self.monomials
    }

    /// Number of monomials.
    pub fn len(&self) -> usize {
        self.monomials.len()
    }

    /// True when there are no monomials.
    pub fn is_empty(&self) -> bool {
        self.monomials.is_empty()
    }

    /// Variable indices referenced by any operator.
    pub fn variables(&self) -> BTreeSet<usize> {
        self.monomials.iter().flat_map(Monomial::variables).collect()
    }

    /// Scalar symbols referenced by any monomial.
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        self.monomials
            .iter()
            .flat_map(|m| m.scalar.symbols())
            .collect()
    }

    /// Sub-Hamiltonian of the monomials accepted by `keep`.
    pub fn filter(&self, keep: impl Fn(&Monomial) -> bool) -> CanonicalHamiltonian {
        CanonicalHamiltonian {
            monomials: self.monomials.iter().filter(|m| keep(m)).cloned().collect(),
        }
    }

    /// Substitutes numeric values and sums coefficients per operator product.
    pub fn numeric_terms(&self, values: &SymbolValues) -> Result<NumericTerms, CircuitError> {
        let mut terms = NumericTerms::new();
        for monomial in &self.monomials {
            let value = monomial.scalar.evaluate(values)?;
            *terms.entry(monomial.operators.clone()).or_insert(0.0) += value;
        }
        let scale = terms.values().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        terms.retain(|_, v| v.abs() > 1e-12 * scale.max(1.0));
        Ok(terms)
    }
}

/// Output of [`canonicalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Canonicalized {
    /// Canonical Hamiltonian.
    pub hamiltonian: CanonicalHamiltonian,
    /// Linear system fixing the shifts of extended coordinates.
    pub shifts: FluxShiftSystem,
}

/// Canonicalizes a raw Hamiltonian for the given variables and basis.
#[tracing::instrument(level = "debug", skip(raw, variables))]
pub fn canonicalize(
    raw: &Expr,
    variables: &[Variable],
    basis: ExtBasis,
) -> Result<Canonicalized, CircuitError> {
    let kinds: BTreeMap<usize, VarKind> = variables.iter().map(|v| (v.index, v.kind)).collect();
    if kinds.len() != variables.len() {
        return Err(CircuitError::structural(
            "duplicate-variable",
            "variable indices must be unique",
        ));
    }

    let unshifted = expand(raw)?;
    let shifted_vars = linear_extended_variables(&unshifted, &kinds);
    let poly = if shifted_vars.is_empty() {
        unshifted
    } else {
        let targets: BTreeSet<usize> = shifted_vars.iter().copied().collect();
        let substituted = raw.substitute(&|symbol| match symbol {
            Symbol::Position(i) if targets.contains(i) => {
                Some(Expr::position(*i) + Expr::Sym(Symbol::FluxShift(*i)))
            }
            _ => None,
        });
        expand(&substituted)?
    };
    let poly = poly.scale_fluxes();
    let shifts = FluxShiftSystem::from_poly(&poly, &shifted_vars);

    let mut monomials = Vec::new();
    let mut dropped = 0usize;
    for (key, coefficient) in poly.terms() {
        let monomial = tag_monomial(key, coefficient, &kinds, basis)?;
        let keep_constant = basis == ExtBasis::Discretized && monomial.is_identity_bearing();
        if monomial.operators.is_empty() && !keep_constant {
            dropped += 1;
            continue;
        }
        monomials.push(monomial);
    }
    debug!(
        monomials = monomials.len(),
        dropped,
        shifted = shifted_vars.len(),
        "canonicalized hamiltonian"
    );
    Ok(Canonicalized {
        hamiltonian: CanonicalHamiltonian::new(monomials),
        shifts,
    })
}

fn linear_extended_variables(poly: &Poly, kinds: &BTreeMap<usize, VarKind>) -> Vec<usize> {
    let mut found = BTreeSet::new();
    for (key, _) in poly.terms() {
        for (factor, power) in key {
            if let (Factor::Sym(Symbol::Position(i)), 1) = (factor, power) {
                if kinds.get(i) == Some(&VarKind::Extended) {
                    found.insert(*i);
                }
            }
        }
    }
    found.into_iter().collect()
}

fn require_kind(
    kinds: &BTreeMap<usize, VarKind>,
    index: usize,
    expected: VarKind,
    symbol: &Symbol,
) -> Result<(), CircuitError> {
    match kinds.get(&index) {
        Some(kind) if *kind == expected => Ok(()),
        Some(_) => Err(CircuitError::parse(
            "variable-kind",
            "symbol does not match the variable category",
        )
        .with_context("symbol", symbol.to_string())),
        None => Err(CircuitError::parse("undeclared-variable", "variable index is not declared")
            .with_context("symbol", symbol.to_string())),
    }
}

fn tag_monomial(
    key: &Key,
    coefficient: f64,
    kinds: &BTreeMap<usize, VarKind>,
    basis: ExtBasis,
) -> Result<Monomial, CircuitError> {
    let mut operators: OperatorKey = Vec::new();
    let mut factors = Vec::new();
    for (factor, power) in key {
        let operator_power = || {
            u32::try_from(*power).map_err(|_| {
                CircuitError::parse("operator-power", "operators need non-negative powers")
            })
        };
        match factor {
            Factor::Sym(symbol @ Symbol::Position(i)) => {
                if kinds.get(i) == Some(&VarKind::Periodic) {
                    return Err(CircuitError::parse(
                        "periodic-coordinate",
                        "periodic coordinates may only appear inside cos or sin",
                    )
                    .with_context("symbol", symbol.to_string()));
                }
                require_kind(kinds, *i, VarKind::Extended, symbol)?;
                operators.push((OpSymbol::new(*i, OpKind::Position), operator_power()?));
            }
            Factor::Sym(symbol @ Symbol::Momentum(i)) => {
                require_kind(kinds, *i, VarKind::Extended, symbol)?;
                let power = operator_power()?;
                if basis == ExtBasis::Discretized {
                    if power / 2 > 0 {
                        operators.push((OpSymbol::new(*i, OpKind::MomentumSquared), power / 2));
                    }
                    if power % 2 == 1 {
                        operators.push((OpSymbol::new(*i, OpKind::Momentum), 1));
                    }
                } else {
                    operators.push((OpSymbol::new(*i, OpKind::Momentum), power));
                }
            }
            Factor::Sym(symbol @ Symbol::Charge(i)) => {
                require_kind(kinds, *i, VarKind::Periodic, symbol)?;
                operators.push((OpSymbol::new(*i, OpKind::Charge), operator_power()?));
            }
            Factor::Cos(arg) | Factor::Sin(arg) if factor.is_operator() => {
                let index = match arg.as_single() {
                    Some(Symbol::Position(i)) => *i,
                    _ => {
                        return Err(CircuitError::parse(
                            "trig-operator",
                            "trigonometric operators must act on a single coordinate",
                        ))
                    }
                };
                if !kinds.contains_key(&index) {
                    return Err(CircuitError::parse(
                        "undeclared-variable",
                        "variable index is not declared",
                    )
                    .with_context("variable", index.to_string()));
                }
                let kind = if matches!(factor, Factor::Cos(_)) {
                    OpKind::Cos
                } else {
                    OpKind::Sin
                };
                operators.push((OpSymbol::new(index, kind), operator_power()?));
            }
            scalar => factors.push((scalar.clone(), *power)),
        }
    }
    operators.sort();
    Ok(Monomial {
        scalar: ScalarTerm {
            coefficient,
            factors,
        },
        operators,
    })
}
