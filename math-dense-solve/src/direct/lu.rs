//! LU decomposition solver
//!
//! LU factorization with partial pivoting for general square systems, backed
//! by faer's `PartialPivLu`. The reciprocal condition number estimate decides
//! whether the matrix is singular to working precision.

use super::condition::{check_rcond, norm1, rcond_estimate};
use super::{from_faer, to_faer};
use crate::error::FactorError;
use crate::matrix::is_finite;
use crate::traits::ComplexField;
use faer::linalg::solvers::{PartialPivLu, Solve};
use ndarray::{Array2, ArrayView2};
use num_traits::Zero;

/// LU factorization result
///
/// Wraps the faer factors together with ‖A‖₁ of the factored matrix.
#[derive(Debug)]
pub struct LuFactorization<T: ComplexField> {
    lu: PartialPivLu<T::Faer>,
    /// 1-norm of the factored matrix
    pub anorm: T::Real,
    /// Matrix dimension
    pub n: usize,
}

impl<T: ComplexField> LuFactorization<T> {
    fn check_rows(&self, b: &ArrayView2<T>) -> Result<(), FactorError> {
        if b.nrows() != self.n {
            return Err(FactorError::DimensionMismatch {
                expected: self.n,
                got: b.nrows(),
            });
        }
        Ok(())
    }

    /// Solve AX = B for every column of B
    pub fn solve(&self, b: ArrayView2<T>) -> Result<Array2<T>, FactorError> {
        self.check_rows(&b)?;
        let mut rhs = to_faer(b);
        self.lu.solve_in_place(&mut rhs);
        finite(from_faer(rhs.as_ref()))
    }

    /// Solve AᴴX = B using the same factors.
    pub fn solve_adjoint(&self, b: ArrayView2<T>) -> Result<Array2<T>, FactorError> {
        self.check_rows(&b)?;
        let mut rhs = to_faer(b);
        self.lu.solve_adjoint_in_place(&mut rhs);
        finite(from_faer(rhs.as_ref()))
    }

    /// Estimate of the reciprocal 1-norm condition number.
    pub fn rcond(&self) -> T::Real {
        rcond_estimate::<T, _>(self.n, self.anorm, |x, adjoint| {
            if adjoint {
                self.lu.solve_adjoint_in_place(x);
            } else {
                self.lu.solve_in_place(x);
            }
        })
    }

    /// Position of the smallest pivot of U
    pub fn smallest_pivot(&self) -> usize {
        let u = self.lu.U();
        (0..self.n)
            .map(|k| (k, T::from_faer(*u.get(k, k)).norm()))
            .fold((0, None), |(km, best), (k, m)| match best {
                Some(b) if b <= m => (km, Some(b)),
                _ => (k, Some(m)),
            })
            .0
    }
}

pub(super) fn finite<T: ComplexField>(x: Array2<T>) -> Result<Array2<T>, FactorError> {
    if is_finite(x.view()) {
        Ok(x)
    } else {
        Err(FactorError::NonFinite)
    }
}

/// Compute LU factorization with partial pivoting. A is consumed.
///
/// Only an exactly zero pivot fails here; use [`LuFactorization::rcond`] to
/// judge near singularity.
pub fn lu_factorize<T: ComplexField>(a: Array2<T>) -> Result<LuFactorization<T>, FactorError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(FactorError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }
    if !is_finite(a.view()) {
        return Err(FactorError::NonFinite);
    }

    let anorm = norm1(a.view());
    let lu = to_faer(a.view()).as_ref().partial_piv_lu();

    let u = lu.U();
    if let Some(index) = (0..n).find(|&k| T::from_faer(*u.get(k, k)).is_zero()) {
        return Err(FactorError::Singular { index });
    }

    Ok(LuFactorization { lu, anorm, n })
}

/// Solve AX = B using LU decomposition. A is consumed.
///
/// Fails with [`FactorError::Singular`] when the estimated rcond is below
/// `rcond_min`.
pub fn lu_solve<T: ComplexField>(
    a: Array2<T>,
    b: ArrayView2<T>,
    rcond_min: T::Real,
) -> Result<Array2<T>, FactorError> {
    let factorization = lu_factorize(a)?;
    check_rcond(factorization.rcond(), rcond_min, factorization.smallest_pivot())?;
    factorization.solve(b)
}
