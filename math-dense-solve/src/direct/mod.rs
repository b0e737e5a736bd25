//! Dense factorizations
//!
//! Thin adapters over the faer decompositions. Every routine either returns
//! a complete result or a [`FactorError`]; no partial output is produced on
//! failure. The square factorizations estimate the reciprocal condition
//! number and report [`FactorError::Singular`] when it falls below the
//! caller's threshold.
//!
//! - [`lu_solve`]: LU decomposition with partial pivoting
//! - [`cholesky_solve`]: Cholesky for Hermitian positive-definite systems
//! - [`ldlt_solve`]: Bunch–Kaufman LDLᴴ for Hermitian indefinite systems
//! - [`triangular_solve`]: forward/back substitution
//! - [`least_squares_solve`], [`complete_orthogonal_solve`]: Householder QR
//! - [`pinv`]: SVD based pseudo-inverse
//! - [`equilibrated_solve`]: equilibration + LU + iterative refinement
//!
//! [`FactorError`]: crate::error::FactorError
//! [`FactorError::Singular`]: crate::error::FactorError::Singular

mod cholesky;
mod condition;
mod equilibrate;
mod ldlt;
mod lu;
mod qr;
mod svd;
mod triangular;

pub use cholesky::{CholeskyFactorization, cholesky_factorize, cholesky_solve};
pub use condition::{norm1, rcond_estimate};
pub use equilibrate::{
    EquilibratedSolution, Equilibration, SCALING_THRESHOLD, Scaling, equilibrated_solve,
    equilibration, scaling_decision,
};
pub use ldlt::{LdltFactorization, ldlt_factorize, ldlt_solve};
pub use lu::{LuFactorization, lu_factorize, lu_solve};
pub use qr::{complete_orthogonal_solve, least_squares_solve};
pub use svd::{Svd, default_tolerance, pinv, svd};
pub use triangular::triangular_solve;

use crate::traits::ComplexField;
use faer::{Mat, MatRef};
use ndarray::{Array2, ArrayView2};

/// Copy an ndarray matrix into faer storage.
pub(crate) fn to_faer<T: ComplexField>(a: ArrayView2<T>) -> Mat<T::Faer> {
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]].to_faer())
}

/// Copy a faer matrix back into an ndarray one.
pub(crate) fn from_faer<T: ComplexField>(m: MatRef<'_, T::Faer>) -> Array2<T> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| T::from_faer(*m.get(i, j)))
}
