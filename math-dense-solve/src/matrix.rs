//! Dense matrix helpers
//!
//! Structural views (`symmatu`, `symmatl`, `trimatu`, `trimatl`) and the
//! norms used by the dispatcher to judge results.

use crate::blas_helpers::vector_norm;
use crate::error::SolveError;
use crate::traits::ComplexField;
use ndarray::{Array2, ArrayView2};
use num_traits::{Float, Zero};
use serde::{Deserialize, Serialize};

/// Which triangle of a square matrix holds the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Triangle {
    Upper,
    Lower,
}

impl Triangle {
    /// True when element `(i, j)` belongs to this triangle (diagonal included).
    #[inline]
    pub fn contains(self, i: usize, j: usize) -> bool {
        match self {
            Triangle::Upper => i <= j,
            Triangle::Lower => i >= j,
        }
    }
}

fn require_square<T>(a: &ArrayView2<T>, context: &'static str) -> Result<(), SolveError> {
    let (rows, cols) = a.dim();
    if rows != cols {
        return Err(SolveError::NotSquare {
            rows,
            cols,
            context,
        });
    }
    Ok(())
}

/// Full Hermitian matrix built from one triangle of `a`.
///
/// The opposite triangle is replaced by the conjugate transpose of the
/// selected one. Fails for non-square input.
pub fn symmat<T: ComplexField>(a: ArrayView2<T>, triangle: Triangle) -> Result<Array2<T>, SolveError> {
    require_square(&a, "symmatu()/symmatl()")?;
    Ok(hermitian(a, triangle))
}

/// [`symmat`] for a matrix already known to be square.
pub(crate) fn hermitian<T: ComplexField>(a: ArrayView2<T>, triangle: Triangle) -> Array2<T> {
    let n = a.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if triangle.contains(i, j) {
            a[[i, j]]
        } else {
            a[[j, i]].conj()
        }
    })
}

impl From<Triangle> for faer::Side {
    fn from(triangle: Triangle) -> Self {
        match triangle {
            Triangle::Upper => faer::Side::Upper,
            Triangle::Lower => faer::Side::Lower,
        }
    }
}

/// Hermitian matrix from the upper triangle.
pub fn symmatu<T: ComplexField>(a: ArrayView2<T>) -> Result<Array2<T>, SolveError> {
    symmat(a, Triangle::Upper)
}

/// Hermitian matrix from the lower triangle.
pub fn symmatl<T: ComplexField>(a: ArrayView2<T>) -> Result<Array2<T>, SolveError> {
    symmat(a, Triangle::Lower)
}

/// Copy of `a` with everything outside `triangle` set to zero.
pub fn trimat<T: ComplexField>(a: ArrayView2<T>, triangle: Triangle) -> Result<Array2<T>, SolveError> {
    require_square(&a, "trimatu()/trimatl()")?;
    let n = a.nrows();
    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        if triangle.contains(i, j) {
            a[[i, j]]
        } else {
            T::zero()
        }
    }))
}

/// Upper triangular part of `a`.
pub fn trimatu<T: ComplexField>(a: ArrayView2<T>) -> Result<Array2<T>, SolveError> {
    trimat(a, Triangle::Upper)
}

/// Lower triangular part of `a`.
pub fn trimatl<T: ComplexField>(a: ArrayView2<T>) -> Result<Array2<T>, SolveError> {
    trimat(a, Triangle::Lower)
}

/// Conjugate transpose Aᴴ.
pub fn conj_transpose<T: ComplexField>(a: ArrayView2<T>) -> Array2<T> {
    let (rows, cols) = a.dim();
    Array2::from_shape_fn((cols, rows), |(i, j)| a[[j, i]].conj())
}

/// Largest element modulus, zero for an empty matrix.
pub fn max_abs<T: ComplexField>(a: ArrayView2<T>) -> T::Real {
    a.iter()
        .map(|v| v.norm())
        .fold(T::Real::zero(), |acc, v| acc.max(v))
}

/// Frobenius norm.
pub fn frobenius_norm<T: ComplexField>(a: ArrayView2<T>) -> T::Real {
    let mut sum = T::Real::zero();
    for column in a.columns() {
        let c = vector_norm(column);
        sum += c * c;
    }
    sum.sqrt()
}

/// True when no element is NaN or infinite.
pub fn is_finite<T: ComplexField>(a: ArrayView2<T>) -> bool {
    a.iter().all(|v| v.is_finite())
}

/// Frobenius norm of the residual A·X − B.
pub fn residual_norm<T: ComplexField>(
    a: ArrayView2<T>,
    x: ArrayView2<T>,
    b: ArrayView2<T>,
) -> T::Real {
    let r = a.dot(&x) - &b;
    frobenius_norm(r.view())
}
