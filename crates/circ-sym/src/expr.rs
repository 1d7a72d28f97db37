//! Typed expression tree for raw Hamiltonians.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;

/// Largest exponent magnitude accepted in an [`Expr::Pow`].
pub const MAX_EXPONENT: u32 = 32;

/// Raw symbolic expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric literal.
    Const(f64),
    /// Symbol leaf.
    Sym(Symbol),
    /// Sum of terms.
    Add(Vec<Expr>),
    /// Product of factors.
    Mul(Vec<Expr>),
    /// Integer power.
    Pow(Box<Expr>, i32),
    /// Cosine.
    Cos(Box<Expr>),
    /// Sine.
    Sin(Box<Expr>),
}

impl Expr {
    /// Numeric literal.
    pub fn constant(value: f64) -> Self {
        Expr::Const(value)
    }

    /// `θ<i>`.
    pub fn position(index: usize) -> Self {
        Expr::Sym(Symbol::Position(index))
    }

    /// `Q<i>`.
    pub fn momentum(index: usize) -> Self {
        Expr::Sym(Symbol::Momentum(index))
    }

    /// `n<i>`.
    pub fn charge(index: usize) -> Self {
        Expr::Sym(Symbol::Charge(index))
    }

    /// Branch parameter.
    pub fn param(name: &str) -> Self {
        Expr::Sym(Symbol::Parameter(name.to_string()))
    }

    /// External flux.
    pub fn flux(name: &str) -> Self {
        Expr::Sym(Symbol::ExternalFlux(name.to_string()))
    }

    /// Offset charge.
    pub fn offset(name: &str) -> Self {
        Expr::Sym(Symbol::OffsetCharge(name.to_string()))
    }

    /// Integer power.
    pub fn pow(self, exponent: i32) -> Self {
        Expr::Pow(Box::new(self), exponent)
    }

    /// Cosine of `self`.
    pub fn cos(self) -> Self {
        Expr::Cos(Box::new(self))
    }

    /// Sine of `self`.
    pub fn sin(self) -> Self {
        Expr::Sin(Box::new(self))
    }

    /// Collects every symbol in the tree.
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Expr::Const(_) => {}
            Expr::Sym(symbol) => {
                out.insert(symbol.clone());
            }
            Expr::Add(items) | Expr::Mul(items) => {
                for item in items {
                    item.collect_symbols(out);
                }
            }
            Expr::Pow(base, _) | Expr::Cos(base) | Expr::Sin(base) => base.collect_symbols(out),
        }
    }

    /// Replaces every leaf for which `f` returns `Some`.
    pub fn substitute(&self, f: &impl Fn(&Symbol) -> Option<Expr>) -> Expr {
        match self {
            Expr::Const(value) => Expr::Const(*value),
            Expr::Sym(symbol) => f(symbol).unwrap_or_else(|| Expr::Sym(symbol.clone())),
            Expr::Add(items) => Expr::Add(items.iter().map(|e| e.substitute(f)).collect()),
            Expr::Mul(items) => Expr::Mul(items.iter().map(|e| e.substitute(f)).collect()),
            Expr::Pow(base, k) => Expr::Pow(Box::new(base.substitute(f)), *k),
            Expr::Cos(arg) => Expr::Cos(Box::new(arg.substitute(f))),
            Expr::Sin(arg) => Expr::Sin(Box::new(arg.substitute(f))),
        }
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        match self {
            Expr::Add(mut items) => {
                items.push(rhs);
                Expr::Add(items)
            }
            lhs => Expr::Add(vec![lhs, rhs]),
        }
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        self + (-rhs)
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Mul(vec![Expr::Const(-1.0), self])
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        match self {
            Expr::Mul(mut items) => {
                items.push(rhs);
                Expr::Mul(items)
            }
            lhs => Expr::Mul(vec![lhs, rhs]),
        }
    }
}

impl Mul<Expr> for f64 {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(vec![Expr::Const(self), rhs])
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(value) => write!(f, "{value}"),
            Expr::Sym(symbol) => write!(f, "{symbol}"),
            Expr::Add(items) => {
                write!(f, "(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Expr::Mul(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, "*")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Expr::Pow(base, k) => write!(f, "({base})^{k}"),
            Expr::Cos(arg) => write!(f, "cos({arg})"),
            Expr::Sin(arg) => write!(f, "sin({arg})"),
        }
    }
}
