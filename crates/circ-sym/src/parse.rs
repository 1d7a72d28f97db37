//! Recursive-descent parser for Hamiltonian text.

use std::collections::BTreeSet;

use circ_core::CircuitError;
use serde::{Deserialize, Serialize};

use crate::expr::{Expr, MAX_EXPONENT};
use crate::symbol::Symbol;

/// Scalar names the parser resolves to parameter, flux and offset symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    /// Branch parameters.
    pub parameters: BTreeSet<String>,
    /// External fluxes.
    pub external_fluxes: BTreeSet<String>,
    /// Offset charges.
    pub offset_charges: BTreeSet<String>,
}

impl SymbolTable {
    fn resolve(&self, name: &str) -> Option<Symbol> {
        if self.parameters.contains(name) {
            return Some(Symbol::Parameter(name.to_string()));
        }
        if self.external_fluxes.contains(name) {
            return Some(Symbol::ExternalFlux(name.to_string()));
        }
        if self.offset_charges.contains(name) {
            return Some(Symbol::OffsetCharge(name.to_string()));
        }
        for (prefix, make) in VARIABLE_PREFIXES {
            if let Some(rest) = name.strip_prefix(prefix) {
                if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                    return rest.parse::<usize>().ok().map(make);
                }
            }
        }
        None
    }
}

const VARIABLE_PREFIXES: &[(&str, fn(usize) -> Symbol)] = &[
    ("theta", Symbol::Position),
    ("θ", Symbol::Position),
    ("Q", Symbol::Momentum),
    ("n", Symbol::Charge),
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn parse_error(code: &str, message: impl Into<String>, offset: usize) -> CircuitError {
    CircuitError::parse(code, message).with_context("offset", offset.to_string())
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, CircuitError> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (offset, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i].1 == 'e' || chars[i].1 == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j].1 == '+' || chars[j].1 == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].1.is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].1.is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let literal: String = chars[start..i].iter().map(|(_, c)| *c).collect();
            let value = literal
                .parse::<f64>()
                .map_err(|_| parse_error("number", format!("invalid literal '{literal}'"), offset))?;
            tokens.push((offset, Token::Number(value)));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().map(|(_, c)| *c).collect();
            tokens.push((offset, Token::Ident(ident)));
            continue;
        }
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if matches!(chars.get(i + 1), Some((_, '*'))) => {
                i += 1;
                Token::Caret
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => {
                return Err(parse_error(
                    "character",
                    format!("unexpected character '{other}'"),
                    offset,
                ))
            }
        };
        tokens.push((offset, token));
        i += 1;
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    table: &'a SymbolTable,
    end: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(o, _)| *o).unwrap_or(self.end)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), CircuitError> {
        let offset = self.offset();
        match self.next() {
            Some(token) if token == expected => Ok(()),
            _ => Err(parse_error(
                "expected-token",
                format!("expected {expected:?}"),
                offset,
            )),
        }
    }

    fn expression(&mut self) -> Result<Expr, CircuitError> {
        let mut terms = vec![self.term()?];
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    terms.push(self.term()?);
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    terms.push(-self.term()?);
                }
                _ => break,
            }
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Add(terms)
        })
    }

    fn term(&mut self) -> Result<Expr, CircuitError> {
        let mut factors = vec![self.unary()?];
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    factors.push(self.unary()?);
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    factors.push(self.unary()?.pow(-1));
                }
                _ => break,
            }
        }
        Ok(if factors.len() == 1 {
            factors.remove(0)
        } else {
            Expr::Mul(factors)
        })
    }

    fn unary(&mut self) -> Result<Expr, CircuitError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, CircuitError> {
        let base = self.atom()?;
        if self.peek() != Some(&Token::Caret) {
            return Ok(base);
        }
        self.pos += 1;
        let exponent = self.integer_exponent()?;
        Ok(base.pow(exponent))
    }

    fn integer_exponent(&mut self) -> Result<i32, CircuitError> {
        let offset = self.offset();
        let parenthesized = self.peek() == Some(&Token::LParen);
        if parenthesized {
            self.pos += 1;
        }
        let negative = self.peek() == Some(&Token::Minus);
        if negative {
            self.pos += 1;
        }
        let value = match self.next() {
            Some(Token::Number(value)) if value.fract() == 0.0 && value.abs() <= i32::MAX as f64 => {
                value as i32
            }
            _ => {
                return Err(parse_error(
                    "exponent",
                    "exponents must be integer literals",
                    offset,
                ))
            }
        };
        if value.unsigned_abs() > MAX_EXPONENT {
            return Err(parse_error(
                "exponent-range",
                format!("exponents are limited to ±{MAX_EXPONENT}"),
                offset,
            ));
        }
        if parenthesized {
            self.expect(Token::RParen)?;
        }
        Ok(if negative { -value } else { value })
    }

    fn atom(&mut self) -> Result<Expr, CircuitError> {
        let offset = self.offset();
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Const(value)),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if (name == "cos" || name == "sin") && self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let arg = self.expression()?;
                    self.expect(Token::RParen)?;
                    return Ok(if name == "cos" { arg.cos() } else { arg.sin() });
                }
                if name == "pi" || name == "π" {
                    return Ok(Expr::Const(std::f64::consts::PI));
                }
                self.table.resolve(&name).map(Expr::Sym).ok_or_else(|| {
                    parse_error("unknown-symbol", format!("undeclared symbol '{name}'"), offset)
                        .with_hint("declare it as a parameter, external flux or offset charge")
                })
            }
            Some(token) => Err(parse_error(
                "unexpected-token",
                format!("unexpected token {token:?}"),
                offset,
            )),
            None => Err(parse_error("eof", "unexpected end of input", offset)),
        }
    }
}

/// Parses Hamiltonian text into an expression tree.
pub fn parse_hamiltonian(text: &str, table: &SymbolTable) -> Result<Expr, CircuitError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        table,
        end: text.len(),
    };
    let expr = parser.expression()?;
    if parser.pos < parser.tokens.len() {
        return Err(parse_error(
            "trailing",
            "unexpected trailing input",
            parser.offset(),
        ));
    }
    Ok(expr)
}
