//! Solver settings.

use circ_core::DEFAULT_SEED;
use serde::{Deserialize, Serialize};

/// Settings of the iterative sparse solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Iteration cap of the Lanczos recursion.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Relative residual at which a Ritz pair counts as converged.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Master seed of the start and restart vectors.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Iterations between convergence checks.
    #[serde(default = "default_check_interval")]
    pub check_interval: usize,
}

fn default_max_iterations() -> usize {
    500
}

fn default_tolerance() -> f64 {
    1e-10
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_check_interval() -> usize {
    5
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            seed: default_seed(),
            check_interval: default_check_interval(),
        }
    }
}
