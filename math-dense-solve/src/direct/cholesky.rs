//! Cholesky factorization
//!
//! A = L·Lᴴ for Hermitian positive-definite matrices through faer's `Llt`.
//! Only the selected triangle of A is read.

use super::condition::{check_rcond, norm1, rcond_estimate};
use super::lu::finite;
use super::{from_faer, to_faer};
use crate::error::FactorError;
use crate::matrix::{Triangle, hermitian, is_finite};
use crate::traits::ComplexField;
use faer::linalg::solvers::{Llt, Solve};
use ndarray::{Array2, ArrayView2};

/// Cholesky factorization result
#[derive(Debug)]
pub struct CholeskyFactorization<T: ComplexField> {
    llt: Llt<T::Faer>,
    /// 1-norm of the Hermitian matrix that was factored
    pub anorm: T::Real,
    pub n: usize,
}

impl<T: ComplexField> CholeskyFactorization<T> {
    /// Lower triangular factor L
    pub fn l(&self) -> Array2<T> {
        from_faer(self.llt.L())
    }

    /// Solve AX = B for every column of B
    pub fn solve(&self, b: ArrayView2<T>) -> Result<Array2<T>, FactorError> {
        if b.nrows() != self.n {
            return Err(FactorError::DimensionMismatch {
                expected: self.n,
                got: b.nrows(),
            });
        }
        let mut rhs = to_faer(b);
        self.llt.solve_in_place(&mut rhs);
        finite(from_faer(rhs.as_ref()))
    }

    /// Estimate of the reciprocal 1-norm condition number.
    pub fn rcond(&self) -> T::Real {
        // A is Hermitian, so the adjoint solve is the plain solve
        rcond_estimate::<T, _>(self.n, self.anorm, |x, _| self.llt.solve_in_place(x))
    }

    /// Position of the smallest diagonal entry of L
    fn smallest_pivot(&self) -> usize {
        let l = self.llt.L();
        (0..self.n)
            .min_by(|&i, &j| {
                let li = T::from_faer(*l.get(i, i)).norm();
                let lj = T::from_faer(*l.get(j, j)).norm();
                li.partial_cmp(&lj).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(0)
    }
}

/// Factor a Hermitian positive-definite matrix stored in `triangle`.
///
/// Fails with `NotPositiveDefinite` at the first non-positive pivot.
pub fn cholesky_factorize<T: ComplexField>(
    a: Array2<T>,
    triangle: Triangle,
) -> Result<CholeskyFactorization<T>, FactorError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(FactorError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let full = hermitian(a.view(), triangle);
    if !is_finite(full.view()) {
        return Err(FactorError::NonFinite);
    }
    let anorm = norm1(full.view());
    let llt = to_faer(full.view()).as_ref().llt(triangle.into())?;

    Ok(CholeskyFactorization { llt, anorm, n })
}

/// Solve AX = B with a Cholesky factorization. A is consumed.
///
/// Fails with [`FactorError::Singular`] when the estimated rcond is below
/// `rcond_min`.
pub fn cholesky_solve<T: ComplexField>(
    a: Array2<T>,
    b: ArrayView2<T>,
    triangle: Triangle,
    rcond_min: T::Real,
) -> Result<Array2<T>, FactorError> {
    let factorization = cholesky_factorize(a, triangle)?;
    check_rcond(factorization.rcond(), rcond_min, factorization.smallest_pivot())?;
    factorization.solve(b)
}
