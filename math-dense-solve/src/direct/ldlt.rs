//! Bunch–Kaufman LDLᴴ factorization
//!
//! P·A·Pᵀ = L·D·Lᴴ for Hermitian indefinite matrices through faer's `Lblt`,
//! with D block diagonal (1×1 and 2×2 pivots). Only the selected triangle of
//! A is read.

use super::condition::{check_rcond, norm1, rcond_estimate};
use super::lu::finite;
use super::{from_faer, to_faer};
use crate::error::FactorError;
use crate::matrix::{Triangle, hermitian, is_finite};
use crate::traits::ComplexField;
use faer::linalg::solvers::{Lblt, Solve};
use ndarray::{Array2, ArrayView2};
use num_traits::Zero;

/// LDLᴴ factorization result
#[derive(Debug)]
pub struct LdltFactorization<T: ComplexField> {
    lblt: Lblt<T::Faer>,
    /// 1-norm of the Hermitian matrix that was factored
    pub anorm: T::Real,
    pub n: usize,
}

impl<T: ComplexField> LdltFactorization<T> {
    /// Number of 2×2 blocks in D
    pub fn two_by_two_pivots(&self) -> usize {
        let sub = self.lblt.B_subdiag().column_vector();
        (0..self.n).filter(|&k| !T::from_faer(sub[k]).is_zero()).count()
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
        self.lblt.solve_in_place(&mut rhs);
        finite(from_faer(rhs.as_ref()))
    }

    /// Estimate of the reciprocal 1-norm condition number.
    pub fn rcond(&self) -> T::Real {
        rcond_estimate::<T, _>(self.n, self.anorm, |x, _| self.lblt.solve_in_place(x))
    }

    /// First block of D that is exactly singular, if any.
    fn singular_block(&self) -> Option<usize> {
        let diag = self.lblt.B_diag().column_vector();
        let sub = self.lblt.B_subdiag().column_vector();
        let mut k = 0;
        while k < self.n {
            let d = T::from_faer(diag[k]);
            let s = T::from_faer(sub[k]);
            if s.is_zero() || k + 1 == self.n {
                if d.is_zero() {
                    return Some(k);
                }
                k += 1;
            } else {
                let det = d * T::from_faer(diag[k + 1]) - T::from_real(s.norm_sqr());
                if det.is_zero() {
                    return Some(k);
                }
                k += 2;
            }
        }
        None
    }

    /// Position of the smallest diagonal entry of D
    fn smallest_pivot(&self) -> usize {
        let diag = self.lblt.B_diag().column_vector();
        (0..self.n)
            .min_by(|&i, &j| {
                let di = T::from_faer(diag[i]).norm();
                let dj = T::from_faer(diag[j]).norm();
                di.partial_cmp(&dj).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(0)
    }
}

/// Factor a Hermitian matrix stored in `triangle`.
///
/// Fails with `Singular` when a pivot block of D is exactly singular.
pub fn ldlt_factorize<T: ComplexField>(
    a: Array2<T>,
    triangle: Triangle,
) -> Result<LdltFactorization<T>, FactorError> {
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
    let lblt = to_faer(full.view()).as_ref().lblt(triangle.into());

    let factorization = LdltFactorization { lblt, anorm, n };
    match factorization.singular_block() {
        Some(index) => Err(FactorError::Singular { index }),
        None => Ok(factorization),
    }
}

/// Solve AX = B with a Bunch–Kaufman factorization. A is consumed.
///
/// Fails with [`FactorError::Singular`] when the estimated rcond is below
/// `rcond_min`.
pub fn ldlt_solve<T: ComplexField>(
    a: Array2<T>,
    b: ArrayView2<T>,
    triangle: Triangle,
    rcond_min: T::Real,
) -> Result<Array2<T>, FactorError> {
    let factorization = ldlt_factorize(a, triangle)?;
    check_rcond(factorization.rcond(), rcond_min, factorization.smallest_pivot())?;
    factorization.solve(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use num_complex::Complex64;

    const EPS: f64 = f64::EPSILON;

    fn check_solution(a: &Array2<f64>, x: &Array2<f64>, b: &Array2<f64>) {
        let ax = a.dot(x);
        for (got, want) in ax.iter().zip(b.iter()) {
            assert_relative_eq!(*got, *want, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_ldlt_indefinite() {
        let a = array![[1.0_f64, 2.0, 3.0], [2.0, -4.0, 1.0], [3.0, 1.0, 0.5]];
        let b = array![[1.0_f64, 0.0], [2.0, 1.0], [3.0, -1.0]];
        let x = ldlt_solve(a.clone(), b.view(), Triangle::Lower, EPS).unwrap();
        check_solution(&a, &x, &b);
    }

    #[test]
    fn test_ldlt_zero_diagonal_needs_two_by_two() {
        let a = array![[0.0_f64, 1.0, 0.0], [1.0, 0.0, 2.0], [0.0, 2.0, 1.0]];
        let b = array![[1.0_f64], [1.0], [1.0]];
        let f = ldlt_factorize(a.clone(), Triangle::Upper).unwrap();
        assert!(f.two_by_two_pivots() > 0);
        let x = f.solve(b.view()).unwrap();
        check_solution(&a, &x, &b);
    }

    #[test]
    fn test_ldlt_ignores_opposite_triangle() {
        let a = array![[2.0_f64, -1.0, 0.0], [-1.0, -3.0, 1.0], [0.0, 1.0, 1.0]];
        let mut garbage = a.clone();
        garbage[[0, 1]] = 100.0;
        garbage[[0, 2]] = f64::INFINITY;
        garbage[[1, 2]] = 55.0;
        let b = array![[1.0_f64], [0.0], [2.0]];
        let x = ldlt_solve(garbage, b.view(), Triangle::Lower, EPS).unwrap();
        check_solution(&a, &x, &b);
    }

    #[test]
    fn test_ldlt_hermitian() {
        let a = array![
            [Complex64::new(1.0, 0.0), Complex64::new(2.0, 1.0)],
            [Complex64::new(2.0, -1.0), Complex64::new(-3.0, 0.0)],
        ];
        let b = array![[Complex64::new(1.0, 1.0)], [Complex64::new(0.0, -2.0)]];
        let x = ldlt_solve(a.clone(), b.view(), Triangle::Upper, EPS).unwrap();
        let ax = a.dot(&x);
        for i in 0..2 {
            assert_relative_eq!((ax[[i, 0]] - b[[i, 0]]).norm(), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_ldlt_singular() {
        let a = array![[1.0_f64, 1.0], [1.0, 1.0]];
        let b = array![[1.0_f64], [1.0]];
        let result = ldlt_solve(a, b.view(), Triangle::Lower, EPS);
        assert!(matches!(result, Err(FactorError::Singular { .. })));
    }

    #[test]
    fn test_ldlt_numerically_singular() {
        // symmetric rank 2: row 2 = 2·row 1 - row 0
        let a = array![[2.0_f64, 1.0, 0.0], [1.0, 3.0, 5.0], [0.0, 5.0, 10.0]];
        let b = array![[1.0_f64], [1.0], [1.0]];
        assert!(matches!(
            ldlt_solve(a, b.view(), Triangle::Upper, EPS),
            Err(FactorError::Singular { .. })
        ));
    }
}
