//! Lanczos iteration with full reorthogonalization and explicit deflation
//! for the lowest eigenpairs of a Hermitian operator.
//!
//! A single Krylov space sees only one direction of each degenerate
//! eigenspace, so the solver works in passes. Every pass runs the recursion
//! on the operator projected onto the complement of the locked Ritz vectors,
//! starting from a fresh seeded substream vector. Its converged pairs are
//! merged into the locked set, which keeps the lowest `k`. The search stops
//! once a pass finds nothing below the current `k`-th locked value.
//!
//! Substream 0 seeds the first pass; later passes and breakdown restarts
//! draw the following substreams in order. Convergence uses the Ritz
//! residual estimate `β_m |s_{m,i}|`.

use circ_core::{CircuitError, ErrorInfo, RngHandle};
use circ_ops::{Operator, C64};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use tracing::{debug, trace};

use crate::config::SolverConfig;
use crate::EigenSystem;

const BREAKDOWN: f64 = 1e-12;
const RESTART_ATTEMPTS: u64 = 8;

/// Converged eigenpair kept out of later Krylov spaces.
#[derive(Debug, Clone)]
struct RitzPair {
    energy: f64,
    vector: DVector<C64>,
}

fn random_unit_vector(seed: u64, substream: u64, dim: usize) -> DVector<C64> {
    let samples = RngHandle::substream(seed, substream).centered_vector(dim);
    let v = DVector::from_iterator(dim, samples.into_iter().map(|x| C64::new(x, 0.0)));
    let norm = v.norm();
    v / C64::new(norm, 0.0)
}

fn orthogonalize(w: &mut DVector<C64>, locked: &[RitzPair], basis: &[DVector<C64>]) {
    // Two Gram-Schmidt passes keep the basis orthonormal to working precision.
    for _ in 0..2 {
        for q in locked.iter().map(|pair| &pair.vector).chain(basis) {
            let overlap = q.dotc(w);
            w.axpy(-overlap, q, C64::new(1.0, 0.0));
        }
    }
}

struct Ritz {
    values: Vec<f64>,
    vectors: DMatrix<f64>,
}

fn tridiagonal_ritz(alpha: &[f64], beta: &[f64]) -> Ritz {
    let m = alpha.len();
    let mut t = DMatrix::<f64>::zeros(m, m);
    for i in 0..m {
        t[(i, i)] = alpha[i];
        if i + 1 < m {
            t[(i, i + 1)] = beta[i];
            t[(i + 1, i)] = beta[i];
        }
    }
    let eigen = SymmetricEigen::new(t);
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
    let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let vectors = DMatrix::from_fn(m, m, |r, c| eigen.eigenvectors[(r, order[c])]);
    Ritz { values, vectors }
}

fn ritz_pairs(basis: &[DVector<C64>], ritz: &Ritz, count: usize) -> Vec<RitzPair> {
    let dim = basis.first().map(|q| q.len()).unwrap_or(0);
    (0..count)
        .map(|i| {
            let mut x = DVector::<C64>::zeros(dim);
            for (j, q) in basis.iter().enumerate() {
                x.axpy(C64::new(ritz.vectors[(j, i)], 0.0), q, C64::new(1.0, 0.0));
            }
            let norm = x.norm();
            if norm > 0.0 {
                x /= C64::new(norm, 0.0);
            }
            RitzPair {
                energy: ritz.values[i],
                vector: x,
            }
        })
        .collect()
}

/// Lowest `k` eigenpairs of the Hermitian `op`.
#[tracing::instrument(level = "debug", skip(op, config), fields(dim = op.dim()))]
pub fn lowest_eigenpairs(
    op: &Operator,
    k: usize,
    config: &SolverConfig,
) -> Result<EigenSystem, CircuitError> {
    let dim = op.dim();
    let mut substream = 0u64;
    let mut locked: Vec<RitzPair> = Vec::new();

    // Each pass that does not stop the search locks a new eigenvector below
    // the first pass's k-th value, and fewer than 2k of those exist.
    for pass in 0..2 * k + 2 {
        let want = k.min(dim - locked.len());
        if want == 0 {
            return Ok(assemble(locked));
        }
        let found = deflated_pass(op, want, &locked, config, &mut substream)?;

        if locked.len() >= k {
            let kth = locked[k - 1].energy;
            let slack = config.tolerance * kth.abs().max(1.0);
            if found.first().map_or(true, |pair| pair.energy >= kth - slack) {
                debug!(passes = pass + 1, substreams = substream, "lanczos converged");
                return Ok(assemble(locked));
            }
        }

        locked.extend(found);
        locked.sort_by(|a, b| a.energy.total_cmp(&b.energy));
        locked.truncate(k);
        debug!(pass, lowest_kth = locked[locked.len() - 1].energy, "locked ritz pairs");
    }

    Err(CircuitError::Convergence(
        ErrorInfo::new("lanczos-deflation", "deflated restarts kept finding lower eigenvalues")
            .with_context("dim", dim.to_string())
            .with_context("requested", k.to_string()),
    )
    .with_hint("use a dense Hamiltonian for this node"))
}

fn assemble(locked: Vec<RitzPair>) -> EigenSystem {
    let (energies, columns): (Vec<f64>, Vec<DVector<C64>>) = locked
        .into_iter()
        .map(|pair| (pair.energy, pair.vector))
        .unzip();
    EigenSystem {
        energies,
        vectors: Some(DMatrix::from_columns(&columns)),
    }
}

/// One Lanczos run on `op` projected away from `locked`, returning its
/// lowest `want` converged Ritz pairs in ascending order.
fn deflated_pass(
    op: &Operator,
    want: usize,
    locked: &[RitzPair],
    config: &SolverConfig,
    substream: &mut u64,
) -> Result<Vec<RitzPair>, CircuitError> {
    let dim = op.dim();
    let space = dim - locked.len();
    let budget = config.max_iterations.max(want);
    let interval = config.check_interval.max(1);

    let mut basis: Vec<DVector<C64>> = vec![fresh_vector(config.seed, substream, locked, &[], dim)?];
    let mut alpha: Vec<f64> = Vec::new();
    let mut beta: Vec<f64> = Vec::new();
    let mut block_start = 0usize;
    let mut scale = 1.0_f64;
    let mut worst_residual = f64::INFINITY;

    loop {
        let j = alpha.len();
        let mut w = op.matvec(&basis[j]);
        let a = basis[j].dotc(&w).re;
        alpha.push(a);
        orthogonalize(&mut w, locked, &basis);
        let b = w.norm();
        scale = scale.max(a.abs()).max(b);

        let m = alpha.len();
        let saturated = m == space;
        let breakdown = b <= BREAKDOWN * scale;
        let block_ready = m - block_start >= want.min(space - block_start);
        let due = m >= want && (m % interval == 0 || m == budget);

        if saturated || (block_ready && due && !breakdown) {
            let ritz = tridiagonal_ritz(&alpha, &beta);
            worst_residual = (0..want)
                .map(|i| {
                    let residual = b * ritz.vectors[(m - 1, i)].abs();
                    residual / ritz.values[i].abs().max(1.0)
                })
                .fold(0.0, f64::max);
            trace!(iteration = m, worst_residual, "lanczos convergence check");
            if saturated || worst_residual <= config.tolerance {
                debug!(iterations = m, locked = locked.len(), "lanczos pass converged");
                return Ok(ritz_pairs(&basis, &ritz, want));
            }
        }

        if m >= budget {
            return Err(CircuitError::Convergence(
                ErrorInfo::new("lanczos-budget", "sparse eigensolver did not converge")
                    .with_context("iterations", m.to_string())
                    .with_context("dim", dim.to_string())
                    .with_context("requested", want.to_string())
                    .with_context("residual", format!("{worst_residual:e}")),
            )
            .with_hint("increase max_iterations or use a dense Hamiltonian"));
        }

        if breakdown {
            let next = fresh_vector(config.seed, substream, locked, &basis, dim)?;
            debug!(iteration = m, substream = *substream, "lanczos breakdown; restarting");
            beta.push(0.0);
            basis.push(next);
            block_start = m;
        } else {
            beta.push(b);
            basis.push(w / C64::new(b, 0.0));
        }
    }
}

/// Unit vector from the next usable substream, orthogonal to `locked` and
/// `basis`.
fn fresh_vector(
    seed: u64,
    substream: &mut u64,
    locked: &[RitzPair],
    basis: &[DVector<C64>],
    dim: usize,
) -> Result<DVector<C64>, CircuitError> {
    for _ in 0..RESTART_ATTEMPTS {
        let mut v = random_unit_vector(seed, *substream, dim);
        *substream += 1;
        orthogonalize(&mut v, locked, basis);
        let norm = v.norm();
        if norm > 1e-8 {
            return Ok(v / C64::new(norm, 0.0));
        }
    }
    Err(CircuitError::Convergence(
        ErrorInfo::new("lanczos-restart", "could not extend the Krylov basis")
            .with_context("basis", (locked.len() + basis.len()).to_string())
            .with_context("dim", dim.to_string()),
    ))
}
