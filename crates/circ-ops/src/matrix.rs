//! Sparse or dense numeric operators.

use circ_core::{CircuitError, MatrixFormat};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use num_complex::Complex64;

/// Complex scalar used by every operator.
pub type C64 = Complex64;

/// Square operator in either storage format.
#[derive(Debug, Clone)]
pub enum Operator {
    /// Compressed sparse rows.
    Sparse(CsrMatrix<C64>),
    /// Dense column-major storage.
    Dense(DMatrix<C64>),
}

fn dimension_mismatch(left: usize, right: usize) -> CircuitError {
    CircuitError::structural("dimension-mismatch", "operator dimensions differ")
        .with_context("left", left.to_string())
        .with_context("right", right.to_string())
}

impl Operator {
    /// Identity of size `dim`.
    pub fn identity(dim: usize, format: MatrixFormat) -> Self {
        match format {
            MatrixFormat::Sparse => Operator::Sparse(CsrMatrix::identity(dim)),
            MatrixFormat::Dense => Operator::Dense(DMatrix::identity(dim, dim)),
        }
    }

    /// Zero operator of size `dim`.
    pub fn zeros(dim: usize, format: MatrixFormat) -> Self {
        match format {
            MatrixFormat::Sparse => Operator::Sparse(CsrMatrix::zeros(dim, dim)),
            MatrixFormat::Dense => Operator::Dense(DMatrix::zeros(dim, dim)),
        }
    }

    /// Builds a `dim × dim` operator from `(row, col, value)` triplets.
    /// Repeated positions are summed.
    pub fn from_triplets(
        dim: usize,
        triplets: impl IntoIterator<Item = (usize, usize, C64)>,
        format: MatrixFormat,
    ) -> Self {
        match format {
            MatrixFormat::Sparse => {
                let mut coo = CooMatrix::new(dim, dim);
                for (row, col, value) in triplets {
                    coo.push(row, col, value);
                }
                Operator::Sparse(CsrMatrix::from(&coo))
            }
            MatrixFormat::Dense => {
                let mut dense = DMatrix::zeros(dim, dim);
                for (row, col, value) in triplets {
                    dense[(row, col)] += value;
                }
                Operator::Dense(dense)
            }
        }
    }

    /// Diagonal operator.
    pub fn diagonal(values: &[C64], format: MatrixFormat) -> Self {
        Self::from_triplets(
            values.len(),
            values.iter().enumerate().map(|(k, v)| (k, k, *v)),
            format,
        )
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        match self {
            Operator::Sparse(m) => m.nrows(),
            Operator::Dense(m) => m.nrows(),
        }
    }

    /// Storage format.
    pub fn format(&self) -> MatrixFormat {
        match self {
            Operator::Sparse(_) => MatrixFormat::Sparse,
            Operator::Dense(_) => MatrixFormat::Dense,
        }
    }

    /// Stored entries (dense operators report every entry).
    pub fn nnz(&self) -> usize {
        match self {
            Operator::Sparse(m) => m.nnz(),
            Operator::Dense(m) => m.len(),
        }
    }

    /// Dense copy.
    pub fn to_dense(&self) -> DMatrix<C64> {
        match self {
            Operator::Dense(m) => m.clone(),
            Operator::Sparse(m) => {
                let mut dense = DMatrix::zeros(m.nrows(), m.ncols());
                for (row, col, value) in m.triplet_iter() {
                    dense[(row, col)] += *value;
                }
                dense
            }
        }
    }

    /// Sparse copy; exact zeros of a dense operator are not stored.
    pub fn to_sparse(&self) -> CsrMatrix<C64> {
        match self {
            Operator::Sparse(m) => m.clone(),
            Operator::Dense(m) => {
                let mut coo = CooMatrix::new(m.nrows(), m.ncols());
                for col in 0..m.ncols() {
                    for row in 0..m.nrows() {
                        let value = m[(row, col)];
                        if value != C64::new(0.0, 0.0) {
                            coo.push(row, col, value);
                        }
                    }
                }
                CsrMatrix::from(&coo)
            }
        }
    }

    /// Converts to the requested storage format.
    pub fn into_format(self, format: MatrixFormat) -> Self {
        match (self, format) {
            (Operator::Sparse(m), MatrixFormat::Dense) => Operator::Dense(Operator::Sparse(m).to_dense()),
            (Operator::Dense(m), MatrixFormat::Sparse) => Operator::Sparse(Operator::Dense(m).to_sparse()),
            (op, _) => op,
        }
    }

    /// Matrix product `self · rhs`, in the format of `self`.
    pub fn matmul(&self, rhs: &Operator) -> Result<Operator, CircuitError> {
        if self.dim() != rhs.dim() {
            return Err(dimension_mismatch(self.dim(), rhs.dim()));
        }
        Ok(match (self, rhs) {
            (Operator::Sparse(a), Operator::Sparse(b)) => Operator::Sparse(a * b),
            (Operator::Sparse(a), Operator::Dense(b)) => {
                Operator::Sparse(a * &Operator::Dense(b.clone()).to_sparse())
            }
            (Operator::Dense(a), Operator::Dense(b)) => Operator::Dense(a * b),
            (Operator::Dense(a), Operator::Sparse(_)) => Operator::Dense(a * rhs.to_dense()),
        })
    }

    /// Matrix sum, in the format of `self`.
    pub fn add(&self, rhs: &Operator) -> Result<Operator, CircuitError> {
        if self.dim() != rhs.dim() {
            return Err(dimension_mismatch(self.dim(), rhs.dim()));
        }
        Ok(match self {
            Operator::Sparse(a) => {
                let b = rhs.to_sparse();
                let mut coo = CooMatrix::new(a.nrows(), a.ncols());
                for (row, col, value) in a.triplet_iter().chain(b.triplet_iter()) {
                    coo.push(row, col, *value);
                }
                Operator::Sparse(CsrMatrix::from(&coo))
            }
            Operator::Dense(a) => match rhs {
                Operator::Dense(b) => Operator::Dense(a + b),
                Operator::Sparse(b) => {
                    let mut sum = a.clone();
                    for (row, col, value) in b.triplet_iter() {
                        sum[(row, col)] += *value;
                    }
                    Operator::Dense(sum)
                }
            },
        })
    }

    /// Scalar multiple.
    pub fn scale(&self, factor: C64) -> Operator {
        match self {
            Operator::Sparse(m) => {
                let mut scaled = m.clone();
                for value in scaled.values_mut() {
                    *value *= factor;
                }
                Operator::Sparse(scaled)
            }
            Operator::Dense(m) => Operator::Dense(m * factor),
        }
    }

    /// Integer power by repeated squaring; `pow(0)` is the identity.
    pub fn pow(&self, exponent: u32) -> Operator {
        let mut result = Operator::identity(self.dim(), self.format());
        let mut base = self.clone();
        let mut remaining = exponent;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.matmul_same(&base);
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.matmul_same(&base);
            }
        }
        result
    }

    // Both operands share dimension and format by construction.
    fn matmul_same(&self, rhs: &Operator) -> Operator {
        match (self, rhs) {
            (Operator::Sparse(a), Operator::Sparse(b)) => Operator::Sparse(a * b),
            (Operator::Dense(a), Operator::Dense(b)) => Operator::Dense(a * b),
            (Operator::Sparse(a), Operator::Dense(_)) => Operator::Sparse(a * &rhs.to_sparse()),
            (Operator::Dense(a), Operator::Sparse(_)) => Operator::Dense(a * rhs.to_dense()),
        }
    }

    /// Kronecker product `self ⊗ rhs`, in the format of `self`.
    pub fn kron(&self, rhs: &Operator) -> Operator {
        match self {
            Operator::Dense(a) => Operator::Dense(a.kronecker(&rhs.to_dense())),
            Operator::Sparse(a) => {
                let b = rhs.to_sparse();
                let (rb, cb) = (b.nrows(), b.ncols());
                let mut coo = CooMatrix::new(a.nrows() * rb, a.ncols() * cb);
                for (i, j, x) in a.triplet_iter() {
                    for (k, l, y) in b.triplet_iter() {
                        coo.push(i * rb + k, j * cb + l, *x * *y);
                    }
                }
                Operator::Sparse(CsrMatrix::from(&coo))
            }
        }
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> Operator {
        match self {
            Operator::Dense(m) => Operator::Dense(m.adjoint()),
            Operator::Sparse(m) => Operator::from_triplets(
                m.nrows(),
                m.triplet_iter().map(|(i, j, v)| (j, i, v.conj())),
                MatrixFormat::Sparse,
            ),
        }
    }

    /// Matrix-vector product.
    pub fn matvec(&self, v: &DVector<C64>) -> DVector<C64> {
        match self {
            Operator::Dense(m) => m * v,
            Operator::Sparse(m) => {
                let mut out = DVector::zeros(m.nrows());
                for (row_idx, row) in m.row_iter().enumerate() {
                    let mut acc = C64::new(0.0, 0.0);
                    for (col, value) in row.col_indices().iter().zip(row.values()) {
                        acc += *value * v[*col];
                    }
                    out[row_idx] = acc;
                }
                out
            }
        }
    }

    /// Largest entrywise deviation from the conjugate transpose.
    pub fn hermiticity_defect(&self) -> f64 {
        let dense = self.to_dense();
        (&dense - dense.adjoint()).camax()
    }
}
