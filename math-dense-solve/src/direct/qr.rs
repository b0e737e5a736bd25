//! QR based least squares
//!
//! Householder QR (faer `Qr`) solves full-rank least-squares and
//! minimum-norm problems. Rank-deficient problems go through a complete
//! orthogonal factorization: a column-pivoted QR (faer `ColPivQr`)
//! A·Pᵀ = Q·[R₁₁ R₁₂; 0 R₂₂] whose negligible R₂₂ is dropped, followed by a
//! QR of [R₁₁ R₁₂]ᴴ for the minimum-norm solution.

use super::lu::finite;
use super::{from_faer, to_faer};
use crate::error::FactorError;
use crate::matrix::{conj_transpose, is_finite};
use crate::traits::ComplexField;
use faer::linalg::solvers::SolveLstsqCore;
use faer::linalg::triangular_solve::solve_lower_triangular_in_place;
use faer::{Conj, Mat, MatRef};
use ndarray::{Array2, ArrayView2, s};
use num_traits::{Float, Zero};

/// Moduli of the diagonal of a (possibly trapezoidal) R factor
fn r_diagonal<T: ComplexField>(r: MatRef<'_, T::Faer>) -> Vec<T::Real> {
    (0..r.nrows().min(r.ncols()))
        .map(|k| T::from_faer(*r.get(k, k)).norm())
        .collect()
}

/// Fail at the first |r_kk| that is zero or at most `rel_tol·max|r_kk|`.
fn check_full_rank<T: ComplexField>(r: MatRef<'_, T::Faer>, rel_tol: T::Real) -> Result<(), FactorError> {
    let diag = r_diagonal::<T>(r);
    if diag.iter().any(|d| !d.is_finite()) {
        return Err(FactorError::NonFinite);
    }
    let r_max = diag.iter().fold(T::Real::zero(), |acc, &d| acc.max(d));
    let limit = rel_tol * r_max;
    match diag.iter().position(|&d| d.is_zero() || d <= limit) {
        Some(index) => Err(FactorError::Singular { index }),
        None => Ok(()),
    }
}

/// Minimum-norm solution of Mᴴ·X = B given the tall matrix M.
///
/// With M = Q·R, X = Q·R⁻ᴴ·B.
fn min_norm_from_adjoint<T: ComplexField>(
    tall: Mat<T::Faer>,
    b: ArrayView2<T>,
    rel_tol: T::Real,
) -> Result<Array2<T>, FactorError> {
    let qr = tall.as_ref().qr();
    let r = qr.R();
    check_full_rank::<T>(r, rel_tol)?;

    let mut y = to_faer(b);
    solve_lower_triangular_in_place(r.adjoint(), y.as_mut(), faer::get_global_parallelism());
    let q = from_faer::<T>(qr.compute_thin_Q().as_ref());
    finite(q.dot(&from_faer::<T>(y.as_ref())))
}

/// Least-squares (rows ≥ cols) or minimum-norm (rows < cols) solution of
/// AX = B for a full-rank A. A is consumed.
///
/// Reports [`FactorError::Singular`] when a diagonal entry of R is zero or at
/// most `rel_tol` times the largest one.
pub fn least_squares_solve<T: ComplexField>(
    a: Array2<T>,
    b: ArrayView2<T>,
    rel_tol: T::Real,
) -> Result<Array2<T>, FactorError> {
    let (m, n) = a.dim();
    if b.nrows() != m {
        return Err(FactorError::DimensionMismatch {
            expected: m,
            got: b.nrows(),
        });
    }
    if !is_finite(a.view()) {
        return Err(FactorError::NonFinite);
    }
    if m == 0 || n == 0 {
        return Ok(Array2::zeros((n, b.ncols())));
    }

    if m >= n {
        let qr = to_faer(a.view()).as_ref().qr();
        check_full_rank::<T>(qr.R(), rel_tol)?;
        let mut rhs = to_faer(b);
        qr.solve_lstsq_in_place_with_conj(Conj::No, rhs.as_mut());
        finite(from_faer(rhs.as_ref().get(..n, ..)))
    } else {
        min_norm_from_adjoint(to_faer(conj_transpose(a.view()).view()), b, rel_tol)
    }
}

/// Minimum-norm least-squares solution via a complete orthogonal
/// factorization. Works for rank-deficient A. A is consumed.
///
/// Diagonal entries of the pivoted R at or below `rel_tol·|r₀₀|` are treated
/// as zero. Returns the solution and the detected rank.
pub fn complete_orthogonal_solve<T: ComplexField>(
    a: Array2<T>,
    b: ArrayView2<T>,
    rel_tol: T::Real,
) -> Result<(Array2<T>, usize), FactorError> {
    let (m, n) = a.dim();
    if b.nrows() != m {
        return Err(FactorError::DimensionMismatch {
            expected: m,
            got: b.nrows(),
        });
    }
    if !is_finite(a.view()) {
        return Err(FactorError::NonFinite);
    }
    if m == 0 || n == 0 {
        return Ok((Array2::zeros((n, b.ncols())), 0));
    }

    let qr = to_faer(a.view()).as_ref().col_piv_qr();
    let r = qr.thin_R();
    let diag = r_diagonal::<T>(r);
    let r_max = diag.iter().fold(T::Real::zero(), |acc, &d| acc.max(d));
    let rank = diag
        .iter()
        .take_while(|&&d| d > rel_tol * r_max && !d.is_zero())
        .count();

    if rank == 0 {
        return Ok((Array2::zeros((n, b.ncols())), 0));
    }

    // c = Q₁ᴴ·B with Q₁ the leading `rank` columns of Q
    let q = from_faer::<T>(qr.compute_thin_Q().as_ref());
    let c = conj_transpose(q.slice(s![.., ..rank])).dot(&b);

    // minimum-norm z of [R₁₁ R₁₂]·z = c
    let leading = r.get(..rank, ..).adjoint().to_owned();
    let z = min_norm_from_adjoint(leading, c.view(), T::Real::zero())?;

    // column j of A·Pᵀ is column perm[j] of A
    let (perm, _) = qr.P().arrays();
    let mut x = Array2::zeros((n, b.ncols()));
    for (j, &p) in perm.iter().enumerate() {
        x.row_mut(p).assign(&z.row(j));
    }
    Ok((x, rank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use num_complex::Complex64;

    const EPS: f64 = f64::EPSILON;

    #[test]
    fn test_overdetermined_least_squares() {
        // Fit y = c0 + c1·t through (0,1), (1,3), (2,4), (3,4)
        let a = array![[1.0_f64, 0.0], [1.0, 1.0], [1.0, 2.0], [1.0, 3.0]];
        let b = array![[1.0_f64], [3.0], [4.0], [4.0]];
        let x = least_squares_solve(a, b.view(), 4.0 * EPS).unwrap();
        assert_relative_eq!(x[[0, 0]], 1.5, epsilon = 1e-12);
        assert_relative_eq!(x[[1, 0]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_underdetermined_minimum_norm() {
        let a = array![[1.0_f64, 1.0, 1.0]];
        let b = array![[3.0_f64]];
        let x = least_squares_solve(a, b.view(), 3.0 * EPS).unwrap();
        for i in 0..3 {
            assert_relative_eq!(x[[i, 0]], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_underdetermined_complex() {
        let a = array![
            [Complex64::new(1.0, 1.0), Complex64::new(0.0, 2.0), Complex64::new(1.0, 0.0)],
            [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0), Complex64::new(3.0, -1.0)],
        ];
        let b = array![[Complex64::new(1.0, 0.0)], [Complex64::new(0.0, 1.0)]];
        let x = least_squares_solve(a.clone(), b.view(), 3.0 * EPS).unwrap();
        let ax = a.dot(&x);
        for i in 0..2 {
            assert_relative_eq!((ax[[i, 0]] - b[[i, 0]]).norm(), 0.0, epsilon = 1e-12);
        }
        // the minimum-norm solution lies in the row space of A
        let ah = conj_transpose(a.view());
        let w = least_squares_solve(ah.clone(), x.view(), 3.0 * EPS).unwrap();
        let back = ah.dot(&w);
        for i in 0..3 {
            assert_relative_eq!((back[[i, 0]] - x[[i, 0]]).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rank_deficient_detected() {
        let a = array![[1.0_f64, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let b = array![[1.0_f64], [2.0], [3.0]];
        assert!(least_squares_solve(a.clone(), b.view(), 1e-10).is_err());

        let (x, rank) = complete_orthogonal_solve(a, b.view(), 1e-10).unwrap();
        assert_eq!(rank, 1);
        // Minimum-norm solution of x0 + 2·x1 = 1 is (1/5, 2/5)
        assert_relative_eq!(x[[0, 0]], 0.2, epsilon = 1e-12);
        assert_relative_eq!(x[[1, 0]], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_relative_rank_threshold() {
        // col 2 = col 0 + col 1 up to rounding, at a tiny overall scale
        let a = array![
            [1.0_f64, 0.1, 1.1],
            [0.3, 1.0, 1.3],
            [0.7, 0.7, 1.4],
            [0.2, 0.9, 1.1]
        ] * 1e-20;
        let b = array![[1.0_f64], [0.0], [2.0], [1.0]];
        assert!(matches!(
            least_squares_solve(a.clone(), b.view(), 1e-10),
            Err(FactorError::Singular { index: 2 })
        ));
        let (_, rank) = complete_orthogonal_solve(a, b.view(), 1e-10).unwrap();
        assert_eq!(rank, 2);
    }

    #[test]
    fn test_complete_orthogonal_zero_matrix() {
        let a = Array2::<f64>::zeros((2, 3));
        let b = array![[1.0_f64], [2.0]];
        let (x, rank) = complete_orthogonal_solve(a, b.view(), 3.0 * EPS).unwrap();
        assert_eq!(rank, 0);
        assert_eq!(x, Array2::<f64>::zeros((3, 1)));
    }

    #[test]
    fn test_complete_orthogonal_full_rank_matches_least_squares() {
        let a = array![[2.0_f64, -1.0], [1.0, 3.0], [0.5, 0.5]];
        let b = array![[1.0_f64, 0.0], [2.0, 1.0], [0.0, 4.0]];
        let x_ls = least_squares_solve(a.clone(), b.view(), 3.0 * EPS).unwrap();
        let (x_cof, rank) = complete_orthogonal_solve(a, b.view(), 3.0 * EPS).unwrap();
        assert_eq!(rank, 2);
        for (u, v) in x_ls.iter().zip(x_cof.iter()) {
            assert_relative_eq!(*u, *v, epsilon = 1e-12);
        }
    }
}
