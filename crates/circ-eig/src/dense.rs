//! Direct Hermitian eigensolver for dense operators.

use circ_ops::C64;
use nalgebra::{DMatrix, SymmetricEigen};

use crate::EigenSystem;

/// Lowest `k` eigenpairs of a dense Hermitian matrix.
pub fn lowest_eigenpairs(matrix: DMatrix<C64>, k: usize) -> EigenSystem {
    let eigen = SymmetricEigen::new(matrix);
    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
    order.truncate(k);
    let energies = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let vectors = DMatrix::from_fn(eigen.eigenvectors.nrows(), order.len(), |r, c| {
        eigen.eigenvectors[(r, order[c])]
    });
    EigenSystem {
        energies,
        vectors: Some(vectors),
    }
}
