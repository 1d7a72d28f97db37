//! Constant shifts of extended coordinates that remove linear terms.
//!
//! After substituting `θ<i> → θ<i> + Δ<i>`, the coefficient of every linear
//! `θ<i>` term is affine in the shifts: `b_i + Σ_j M_ij Δ_j`. The system is
//! kept symbolic and solved numerically whenever values change.

use std::collections::BTreeMap;

use circ_core::{CircuitError, ErrorInfo};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::canonical::ScalarTerm;
use crate::poly::{Factor, Poly};
use crate::symbol::Symbol;
use crate::values::SymbolValues;

const CONSISTENCY_TOLERANCE: f64 = 1e-9;

/// Affine equations for the coordinate shifts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FluxShiftSystem {
    variables: Vec<usize>,
    matrix: Vec<Vec<Vec<ScalarTerm>>>,
    rhs: Vec<Vec<ScalarTerm>>,
}

/// Numeric shifts and whether the system was consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftSolution {
    /// Shift per extended variable.
    pub shifts: BTreeMap<usize, f64>,
    /// False when the zero-shift fallback was used.
    pub consistent: bool,
}

impl FluxShiftSystem {
    pub(crate) fn from_poly(poly: &Poly, variables: &[usize]) -> Self {
        let n = variables.len();
        let mut system = FluxShiftSystem {
            variables: variables.to_vec(),
            matrix: vec![vec![Vec::new(); n]; n],
            rhs: vec![Vec::new(); n],
        };
        let row_of: BTreeMap<usize, usize> =
            variables.iter().enumerate().map(|(r, v)| (*v, r)).collect();
        let col_of = &row_of;

        for (key, coefficient) in poly.terms() {
            let mut row = None;
            let mut operator_count = 0;
            let mut shift = None;
            let mut shift_count = 0;
            let mut scalars = Vec::new();
            for (factor, power) in key {
                match factor {
                    Factor::Sym(Symbol::Position(i)) if *power == 1 => {
                        operator_count += 1;
                        row = row_of.get(i).copied();
                    }
                    Factor::Sym(Symbol::FluxShift(j)) => {
                        shift_count += *power;
                        shift = col_of.get(j).copied();
                    }
                    other if other.is_operator() => operator_count += 2,
                    other => scalars.push((other.clone(), *power)),
                }
            }
            let (Some(row), 1) = (row, operator_count) else {
                continue;
            };
            let term = ScalarTerm {
                coefficient,
                factors: scalars,
            };
            match (shift_count, shift) {
                (0, _) => system.rhs[row].push(term),
                (1, Some(col)) => system.matrix[row][col].push(term),
                _ => debug!(row, "skipping nonlinear shift term"),
            }
        }
        system
    }

    /// Variables that carry a shift symbol.
    pub fn variables(&self) -> &[usize] {
        &self.variables
    }

    /// True when no extended variable needs a shift.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Solves `M Δ = -b` for the current values.
    ///
    /// Singular but consistent systems take the minimum-norm solution.
    /// Inconsistent systems fall back to zero shift for every variable.
    pub fn solve(&self, values: &SymbolValues) -> Result<ShiftSolution, CircuitError> {
        let n = self.variables.len();
        if n == 0 {
            return Ok(ShiftSolution {
                shifts: BTreeMap::new(),
                consistent: true,
            });
        }
        let sum = |terms: &[ScalarTerm]| -> Result<f64, CircuitError> {
            terms.iter().try_fold(0.0, |acc, t| Ok(acc + t.evaluate(values)?))
        };
        let mut m = DMatrix::<f64>::zeros(n, n);
        let mut b = DVector::<f64>::zeros(n);
        for row in 0..n {
            b[row] = sum(&self.rhs[row])?;
            for col in 0..n {
                m[(row, col)] = sum(&self.matrix[row][col])?;
            }
        }

        let target = -&b;
        let svd = m.clone().svd(true, true);
        let cutoff = svd.singular_values.max() * 1e-12;
        let candidate = svd.solve(&target, cutoff).map_err(|msg| {
            CircuitError::Substitution(ErrorInfo::new("shift-solve", msg))
        })?;
        let residual = (&m * &candidate - &target).norm();
        let consistent = residual <= CONSISTENCY_TOLERANCE * (1.0 + b.norm());
        let solution: Vec<f64> = if consistent {
            candidate.iter().copied().collect()
        } else {
            warn!(
                residual,
                variables = ?self.variables,
                "flux shift system is inconsistent; using zero shift"
            );
            vec![0.0; n]
        };
        Ok(ShiftSolution {
            shifts: self.variables.iter().copied().zip(solution).collect(),
            consistent,
        })
    }

    /// Solves the system and binds every `Δ<i>` in `values`.
    pub fn bind(&self, values: &mut SymbolValues) -> Result<ShiftSolution, CircuitError> {
        let solution = self.solve(values)?;
        for (var, shift) in &solution.shifts {
            values.set(Symbol::FluxShift(*var), *shift);
        }
        Ok(solution)
    }
}
