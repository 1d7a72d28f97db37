//! Structured error types shared across the circuit crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`CircuitError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (variable indices, dimensions, symbol names).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the diagonalization engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum CircuitError {
    /// Inconsistent or missing partition and truncation configuration.
    #[error("structural error: {0}")]
    Structural(ErrorInfo),
    /// Iterative eigensolver exhausted its budget before converging.
    #[error("convergence error: {0}")]
    Convergence(ErrorInfo),
    /// A symbol required by a monomial has no numeric value or operator.
    #[error("substitution error: {0}")]
    Substitution(ErrorInfo),
    /// Requested operator is not part of the node's operator set.
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(ErrorInfo),
    /// Malformed Hamiltonian text or unsupported symbolic shape.
    #[error("parse error: {0}")]
    Parse(ErrorInfo),
    /// Serialization and I/O errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl CircuitError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            CircuitError::Structural(info)
            | CircuitError::Convergence(info)
            | CircuitError::Substitution(info)
            | CircuitError::UnsupportedOperator(info)
            | CircuitError::Parse(info)
            | CircuitError::Serde(info) => info,
        }
    }

    /// Shorthand for a structural error with the given code.
    pub fn structural(code: &str, message: impl Into<String>) -> Self {
        CircuitError::Structural(ErrorInfo::new(code, message))
    }

    /// Shorthand for a substitution error with the given code.
    pub fn substitution(code: &str, message: impl Into<String>) -> Self {
        CircuitError::Substitution(ErrorInfo::new(code, message))
    }

    /// Shorthand for an unsupported-operator error with the given code.
    pub fn unsupported(code: &str, message: impl Into<String>) -> Self {
        CircuitError::UnsupportedOperator(ErrorInfo::new(code, message))
    }

    /// Shorthand for a parse error with the given code.
    pub fn parse(code: &str, message: impl Into<String>) -> Self {
        CircuitError::Parse(ErrorInfo::new(code, message))
    }

    /// Returns the stable code of the wrapped payload.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Adds a context entry to whichever family this error belongs to.
    pub fn with_context(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.map_info(|info| info.with_context(key, value))
    }

    /// Attaches a remediation hint.
    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        self.map_info(|info| info.with_hint(hint))
    }

    fn map_info(self, f: impl FnOnce(ErrorInfo) -> ErrorInfo) -> Self {
        match self {
            CircuitError::Structural(info) => CircuitError::Structural(f(info)),
            CircuitError::Convergence(info) => CircuitError::Convergence(f(info)),
            CircuitError::Substitution(info) => CircuitError::Substitution(f(info)),
            CircuitError::UnsupportedOperator(info) => CircuitError::UnsupportedOperator(f(info)),
            CircuitError::Parse(info) => CircuitError::Parse(f(info)),
            CircuitError::Serde(info) => CircuitError::Serde(f(info)),
        }
    }
}
