//! Matrix elements of operators between eigenvectors.

use circ_core::CircuitError;
use circ_ops::{Operator, C64};
use nalgebra::DMatrix;

/// Table `⟨v_i|O|v_j⟩` for the columns `v_i` of `vectors`.
pub fn matrix_element_table(
    op: &Operator,
    vectors: &DMatrix<C64>,
) -> Result<DMatrix<C64>, CircuitError> {
    if vectors.nrows() != op.dim() {
        return Err(CircuitError::structural(
            "dimension-mismatch",
            "eigenvectors and operator live in different spaces",
        )
        .with_context("operator", op.dim().to_string())
        .with_context("vectors", vectors.nrows().to_string()));
    }
    let mut applied = DMatrix::<C64>::zeros(vectors.nrows(), vectors.ncols());
    for (j, column) in vectors.column_iter().enumerate() {
        applied.set_column(j, &op.matvec(&column.into_owned()));
    }
    Ok(vectors.adjoint() * applied)
}
