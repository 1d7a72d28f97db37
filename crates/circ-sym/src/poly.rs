//! Polynomial expansion of expression trees, including trigonometric
//! multiple-angle expansion of position symbols.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::fmt;

use circ_core::CircuitError;
use serde::{Deserialize, Serialize};

use crate::expr::{Expr, MAX_EXPONENT};
use crate::symbol::Symbol;

const DROP_TOLERANCE: f64 = 1e-12;
const INTEGER_TOLERANCE: f64 = 1e-9;

/// Linear combination of symbols used as a trigonometric argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Linear {
    terms: Vec<(Symbol, f64)>,
}

impl Linear {
    /// Builds a sorted, merged linear form and drops vanishing coefficients.
    pub fn from_terms(terms: impl IntoIterator<Item = (Symbol, f64)>) -> Self {
        let mut merged: BTreeMap<Symbol, f64> = BTreeMap::new();
        for (symbol, coefficient) in terms {
            *merged.entry(symbol).or_insert(0.0) += coefficient;
        }
        Self {
            terms: merged
                .into_iter()
                .filter(|(_, c)| c.abs() > DROP_TOLERANCE)
                .collect(),
        }
    }

    /// The single-symbol form `1·symbol`.
    pub fn single(symbol: Symbol) -> Self {
        Self {
            terms: vec![(symbol, 1.0)],
        }
    }

    /// Symbol/coefficient pairs in symbol order.
    pub fn terms(&self) -> &[(Symbol, f64)] {
        &self.terms
    }

    /// True when no symbol survives.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns the symbol when the form is exactly `1·symbol`.
    pub fn as_single(&self) -> Option<&Symbol> {
        match self.terms.as_slice() {
            [(symbol, c)] if (c - 1.0).abs() <= DROP_TOLERANCE => Some(symbol),
            _ => None,
        }
    }

    /// Flips the overall sign so the leading coefficient is positive.
    fn sign_normalized(self) -> (Self, f64) {
        match self.terms.first() {
            Some((_, c)) if *c < 0.0 => (
                Self {
                    terms: self.terms.into_iter().map(|(s, c)| (s, -c)).collect(),
                },
                -1.0,
            ),
            _ => (self, 1.0),
        }
    }

    /// Evaluates the form with `lookup` supplying symbol values.
    pub fn evaluate(
        &self,
        lookup: &impl Fn(&Symbol) -> Result<f64, CircuitError>,
    ) -> Result<f64, CircuitError> {
        self.terms
            .iter()
            .try_fold(0.0, |acc, (symbol, c)| Ok(acc + c * lookup(symbol)?))
    }

    fn map_coefficients(&self, f: impl Fn(&Symbol, f64) -> f64) -> Self {
        Self {
            terms: self.terms.iter().map(|(s, c)| (s.clone(), f(s, *c))).collect(),
        }
    }
}

impl PartialEq for Linear {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Linear {}

impl PartialOrd for Linear {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Linear {
    fn cmp(&self, other: &Self) -> Ordering {
        for ((sa, ca), (sb, cb)) in self.terms.iter().zip(other.terms.iter()) {
            let ord = sa.cmp(sb).then_with(|| ca.total_cmp(cb));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.terms.len().cmp(&other.terms.len())
    }
}

impl fmt::Display for Linear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (symbol, c)) in self.terms.iter().enumerate() {
            match (idx, *c < 0.0) {
                (0, true) => write!(f, "-")?,
                (0, false) => {}
                (_, true) => write!(f, " - ")?,
                (_, false) => write!(f, " + ")?,
            }
            if (c.abs() - 1.0).abs() <= DROP_TOLERANCE {
                write!(f, "{symbol}")?;
            } else {
                write!(f, "{}*{symbol}", c.abs())?;
            }
        }
        Ok(())
    }
}

/// Factor of a polynomial term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Factor {
    /// Plain symbol.
    Sym(Symbol),
    /// Cosine of a linear form.
    Cos(Linear),
    /// Sine of a linear form.
    Sin(Linear),
}

impl Factor {
    /// True when the factor carries an operator.
    pub fn is_operator(&self) -> bool {
        match self {
            Factor::Sym(symbol) => symbol.is_operator(),
            Factor::Cos(arg) | Factor::Sin(arg) => arg.terms().iter().any(|(s, _)| s.is_operator()),
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factor::Sym(symbol) => write!(f, "{symbol}"),
            Factor::Cos(arg) => write!(f, "cos({arg})"),
            Factor::Sin(arg) => write!(f, "sin({arg})"),
        }
    }
}

pub(crate) type Key = Vec<(Factor, i32)>;

#[derive(Clone, Copy)]
enum Trig {
    Cos,
    Sin,
}

/// Sparse polynomial over [`Factor`]s with numeric coefficients.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Poly {
    terms: BTreeMap<Key, f64>,
}

impl Poly {
    pub(crate) fn constant(value: f64) -> Self {
        let mut poly = Poly::default();
        if value != 0.0 {
            poly.terms.insert(Vec::new(), value);
        }
        poly
    }

    pub(crate) fn factor(factor: Factor) -> Self {
        let mut poly = Poly::default();
        poly.terms.insert(vec![(factor, 1)], 1.0);
        poly
    }

    pub(crate) fn terms(&self) -> impl Iterator<Item = (&Key, f64)> {
        self.terms.iter().map(|(k, c)| (k, *c))
    }

    fn insert(&mut self, key: Key, coefficient: f64) {
        let entry = self.terms.entry(key).or_insert(0.0);
        *entry += coefficient;
    }

    fn pruned(mut self) -> Self {
        self.terms.retain(|_, c| c.abs() > DROP_TOLERANCE);
        self
    }

    pub(crate) fn add(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (key, c) in &other.terms {
            out.insert(key.clone(), *c);
        }
        out.pruned()
    }

    pub(crate) fn scale(&self, factor: f64) -> Poly {
        Poly {
            terms: self
                .terms
                .iter()
                .map(|(k, c)| (k.clone(), c * factor))
                .collect(),
        }
        .pruned()
    }

    pub(crate) fn mul(&self, other: &Poly) -> Poly {
        let mut out = Poly::default();
        for (ka, ca) in &self.terms {
            for (kb, cb) in &other.terms {
                out.insert(merge_keys(ka, kb), ca * cb);
            }
        }
        out.pruned()
    }

    fn powi(&self, mut exponent: u32) -> Poly {
        let mut result = Poly::constant(1.0);
        let mut base = self.clone();
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = result.mul(&base);
            }
            exponent >>= 1;
            if exponent > 0 {
                base = base.mul(&base);
            }
        }
        result
    }

    fn inverse(&self) -> Result<Poly, CircuitError> {
        let mut iter = self.terms.iter();
        match (iter.next(), iter.next()) {
            (Some((key, c)), None) if key.iter().all(|(f, _)| !f.is_operator()) => {
                let mut poly = Poly::default();
                poly.terms
                    .insert(key.iter().map(|(f, p)| (f.clone(), -p)).collect(), 1.0 / c);
                Ok(poly)
            }
            _ => Err(CircuitError::parse(
                "denominator",
                "division is only supported by operator-free monomials",
            )),
        }
    }

    /// Returns `(linear form, constant)` when every term has degree at most one.
    fn as_linear(&self) -> Option<(Linear, f64)> {
        let mut constant = 0.0;
        let mut terms = Vec::new();
        for (key, c) in &self.terms {
            match key.as_slice() {
                [] => constant += c,
                [(Factor::Sym(symbol), 1)] => terms.push((symbol.clone(), *c)),
                _ => return None,
            }
        }
        Some((Linear::from_terms(terms), constant))
    }

    /// Multiplies every external-flux symbol by `2π`.
    pub(crate) fn scale_fluxes(&self) -> Poly {
        let mut out = Poly::default();
        for (key, c) in &self.terms {
            let mut coefficient = *c;
            let mut scaled = Vec::with_capacity(key.len());
            for (factor, power) in key {
                let factor = match factor {
                    Factor::Sym(Symbol::ExternalFlux(name)) => {
                        coefficient *= TAU.powi(*power);
                        Factor::Sym(Symbol::ExternalFlux(name.clone()))
                    }
                    Factor::Cos(arg) => Factor::Cos(arg.map_coefficients(scale_flux_term)),
                    Factor::Sin(arg) => Factor::Sin(arg.map_coefficients(scale_flux_term)),
                    other => other.clone(),
                };
                scaled.push((factor, *power));
            }
            out.insert(scaled, coefficient);
        }
        out.pruned()
    }
}

fn scale_flux_term(symbol: &Symbol, c: f64) -> f64 {
    if matches!(symbol, Symbol::ExternalFlux(_)) {
        c * TAU
    } else {
        c
    }
}

fn merge_keys(a: &[(Factor, i32)], b: &[(Factor, i32)]) -> Key {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            Ordering::Less => {
                out.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                let power = a[i].1 + b[j].1;
                if power != 0 {
                    out.push((a[i].0.clone(), power));
                }
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Expands an expression tree into a polynomial.
pub(crate) fn expand(expr: &Expr) -> Result<Poly, CircuitError> {
    match expr {
        Expr::Const(value) => Ok(Poly::constant(*value)),
        Expr::Sym(symbol) => Ok(Poly::factor(Factor::Sym(symbol.clone()))),
        Expr::Add(items) => items
            .iter()
            .try_fold(Poly::default(), |acc, item| Ok(acc.add(&expand(item)?))),
        Expr::Mul(items) => items
            .iter()
            .try_fold(Poly::constant(1.0), |acc, item| Ok(acc.mul(&expand(item)?))),
        Expr::Pow(base, exponent) => {
            if exponent.unsigned_abs() > MAX_EXPONENT {
                return Err(CircuitError::parse(
                    "exponent-range",
                    format!("exponents are limited to ±{MAX_EXPONENT}"),
                )
                .with_context("exponent", exponent.to_string()));
            }
            let base = expand(base)?;
            if *exponent >= 0 {
                Ok(base.powi(exponent.unsigned_abs()))
            } else {
                Ok(base.inverse()?.powi(exponent.unsigned_abs()))
            }
        }
        Expr::Cos(arg) => expand_trig(Trig::Cos, &expand(arg)?),
        Expr::Sin(arg) => expand_trig(Trig::Sin, &expand(arg)?),
    }
}

fn expand_trig(kind: Trig, arg: &Poly) -> Result<Poly, CircuitError> {
    let (linear, offset) = arg.as_linear().ok_or_else(|| {
        CircuitError::parse("trig-argument", "trigonometric arguments must be linear")
    })?;
    let mut scalar = Vec::new();
    let mut angles = Vec::new();
    for (symbol, c) in linear.terms() {
        match symbol {
            Symbol::Position(index) => angles.push((*index, *c)),
            Symbol::Momentum(_) | Symbol::Charge(_) => {
                return Err(CircuitError::parse(
                    "trig-operator",
                    "only position symbols may appear inside trigonometric functions",
                )
                .with_context("symbol", symbol.to_string()))
            }
            _ => scalar.push((symbol.clone(), *c)),
        }
    }
    let (mut cos_acc, mut sin_acc) = scalar_trig(Linear::from_terms(scalar), offset);
    for (index, c) in angles {
        let multiple = c.round();
        if (c - multiple).abs() > INTEGER_TOLERANCE {
            return Err(CircuitError::parse(
                "trig-multiple",
                "position symbols must enter trigonometric arguments with integer multiples",
            )
            .with_context("variable", index.to_string())
            .with_context("multiple", c.to_string()));
        }
        let (ck, sk) = multiple_angle(index, multiple as i64);
        let next_cos = cos_acc.mul(&ck).add(&sin_acc.mul(&sk).scale(-1.0));
        let next_sin = sin_acc.mul(&ck).add(&cos_acc.mul(&sk));
        cos_acc = next_cos;
        sin_acc = next_sin;
    }
    Ok(match kind {
        Trig::Cos => cos_acc,
        Trig::Sin => sin_acc,
    })
}

fn scalar_trig(linear: Linear, offset: f64) -> (Poly, Poly) {
    if linear.is_empty() {
        return (Poly::constant(offset.cos()), Poly::constant(offset.sin()));
    }
    let (linear, sign) = linear.sign_normalized();
    let cos_l = Poly::factor(Factor::Cos(linear.clone()));
    let sin_l = Poly::factor(Factor::Sin(linear)).scale(sign);
    let cos_total = cos_l
        .scale(offset.cos())
        .add(&sin_l.scale(-offset.sin()));
    let sin_total = sin_l.scale(offset.cos()).add(&cos_l.scale(offset.sin()));
    (cos_total, sin_total)
}

/// `(cos kθ, sin kθ)` as polynomials in `cos θ` and `sin θ`.
fn multiple_angle(index: usize, multiple: i64) -> (Poly, Poly) {
    let angle = Linear::single(Symbol::Position(index));
    let c1 = Poly::factor(Factor::Cos(angle.clone()));
    let s1 = Poly::factor(Factor::Sin(angle));
    let mut ck = Poly::constant(1.0);
    let mut sk = Poly::default();
    for _ in 0..multiple.unsigned_abs() {
        let next_c = ck.mul(&c1).add(&sk.mul(&s1).scale(-1.0));
        let next_s = sk.mul(&c1).add(&ck.mul(&s1));
        ck = next_c;
        sk = next_s;
    }
    if multiple < 0 {
        sk = sk.scale(-1.0);
    }
    (ck, sk)
}
