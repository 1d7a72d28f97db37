//! Finite-difference operators of an extended variable on a uniform grid.

use circ_core::{CircuitError, GridRange, MatrixFormat};

use crate::matrix::{Operator, C64};

/// Uniform grid including both end points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid1d {
    /// Left end point.
    pub min: f64,
    /// Right end point.
    pub max: f64,
    /// Number of points.
    pub points: usize,
}

impl Grid1d {
    /// Validates and creates a grid.
    pub fn new(range: GridRange, points: usize) -> Result<Self, CircuitError> {
        if points < 2 || !(range.max > range.min) {
            return Err(CircuitError::structural(
                "grid",
                "a grid needs at least two points and a non-empty interval",
            )
            .with_context("points", points.to_string())
            .with_context("min", range.min.to_string())
            .with_context("max", range.max.to_string()));
        }
        Ok(Self {
            min: range.min,
            max: range.max,
            points,
        })
    }

    /// Grid spacing.
    pub fn spacing(&self) -> f64 {
        (self.max - self.min) / (self.points - 1) as f64
    }

    /// Grid coordinates.
    pub fn coordinates(&self) -> Vec<f64> {
        let delta = self.spacing();
        (0..self.points).map(|k| self.min + k as f64 * delta).collect()
    }

    fn diagonal_of(&self, f: impl Fn(f64) -> f64) -> Operator {
        let values: Vec<C64> = self
            .coordinates()
            .into_iter()
            .map(|x| C64::new(f(x), 0.0))
            .collect();
        Operator::diagonal(&values, MatrixFormat::Sparse)
    }

    fn tridiagonal(&self, lower: C64, diag: C64, upper: C64) -> Operator {
        let n = self.points;
        let mut triplets = Vec::with_capacity(3 * n);
        for k in 0..n {
            if diag != C64::new(0.0, 0.0) {
                triplets.push((k, k, diag));
            }
            if k + 1 < n {
                triplets.push((k, k + 1, upper));
                triplets.push((k + 1, k, lower));
            }
        }
        Operator::from_triplets(n, triplets, MatrixFormat::Sparse)
    }

    /// Coordinate operator.
    pub fn position(&self) -> Operator {
        self.diagonal_of(|x| x)
    }

    /// `-i d/dθ` with a central three-point stencil.
    pub fn momentum(&self) -> Operator {
        let h = 1.0 / (2.0 * self.spacing());
        self.tridiagonal(C64::new(0.0, h), C64::new(0.0, 0.0), C64::new(0.0, -h))
    }

    /// `-d²/dθ²` with a three-point stencil.
    pub fn momentum_squared(&self) -> Operator {
        let h2 = 1.0 / (self.spacing() * self.spacing());
        self.tridiagonal(C64::new(-h2, 0.0), C64::new(2.0 * h2, 0.0), C64::new(-h2, 0.0))
    }

    /// `cos θ` on the grid.
    pub fn cos(&self) -> Operator {
        self.diagonal_of(f64::cos)
    }

    /// `sin θ` on the grid.
    pub fn sin(&self) -> Operator {
        self.diagonal_of(f64::sin)
    }
}
