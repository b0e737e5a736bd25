//! Triangular substitution
//!
//! Forward (lower) and back (upper) substitution through faer's blocked
//! triangular solves. Only the requested triangle of A is read and A is never
//! modified, so it is taken as a view.

use super::lu::finite;
use super::{from_faer, to_faer};
use crate::error::FactorError;
use crate::matrix::Triangle;
use crate::traits::ComplexField;
use faer::Mat;
use faer::linalg::triangular_solve::{
    solve_lower_triangular_in_place, solve_upper_triangular_in_place,
};
use ndarray::{Array2, ArrayView2};
use num_traits::Zero;

/// Solve AX = B where A is triangular. A is not modified.
///
/// Fails with [`FactorError::Singular`] only on an exactly zero diagonal
/// entry; there is no pivoting and no rescue.
pub fn triangular_solve<T: ComplexField>(
    a: ArrayView2<T>,
    b: ArrayView2<T>,
    triangle: Triangle,
) -> Result<Array2<T>, FactorError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(FactorError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }
    if b.nrows() != n {
        return Err(FactorError::DimensionMismatch {
            expected: n,
            got: b.nrows(),
        });
    }

    let mut tri = Mat::zeros(n, n);
    for j in 0..n {
        for i in 0..n {
            if triangle.contains(i, j) {
                let v = a[[i, j]];
                if !v.is_finite() {
                    return Err(FactorError::NonFinite);
                }
                tri[(i, j)] = v.to_faer();
            }
        }
    }
    if let Some(index) = (0..n).find(|&i| a[[i, i]].is_zero()) {
        return Err(FactorError::Singular { index });
    }

    let mut x = to_faer(b);
    let par = faer::get_global_parallelism();
    match triangle {
        Triangle::Lower => solve_lower_triangular_in_place(tri.as_ref(), x.as_mut(), par),
        Triangle::Upper => solve_upper_triangular_in_place(tri.as_ref(), x.as_mut(), par),
    }
    finite(from_faer(x.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use num_complex::Complex64;

    #[test]
    fn test_lower_substitution() {
        let a = array![[2.0_f64, 0.0, 0.0], [1.0, 4.0, 0.0], [-1.0, 2.0, 5.0]];
        let b = array![[2.0_f64], [9.0], [13.0]];
        let x = triangular_solve(a.view(), b.view(), Triangle::Lower).unwrap();
        assert_relative_eq!(x[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[[1, 0]], 2.0, epsilon = 1e-12);
        assert_relative_eq!(x[[2, 0]], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_upper_ignores_lower_triangle() {
        let clean = array![[1.0_f64, 2.0, 3.0], [0.0, 4.0, 5.0], [0.0, 0.0, 6.0]];
        let mut dirty = clean.clone();
        dirty[[1, 0]] = 1e6;
        dirty[[2, 0]] = f64::NAN;
        dirty[[2, 1]] = -3.0;
        let b = array![[6.0_f64, 1.0], [9.0, 0.0], [6.0, 2.0]];

        let x_clean = triangular_solve(clean.view(), b.view(), Triangle::Upper).unwrap();
        let x_dirty = triangular_solve(dirty.view(), b.view(), Triangle::Upper).unwrap();
        assert_eq!(x_clean, x_dirty);

        let residual = clean.dot(&x_clean) - &b;
        assert!(residual.iter().all(|r| r.abs() < 1e-12));
    }

    #[test]
    fn test_zero_diagonal_is_singular() {
        let a = array![[1.0_f64, 0.0], [3.0, 0.0]];
        let b = array![[1.0_f64], [1.0]];
        assert_eq!(
            triangular_solve(a.view(), b.view(), Triangle::Lower),
            Err(FactorError::Singular { index: 1 })
        );
    }

    #[test]
    fn test_complex_lower() {
        let a = array![
            [Complex64::new(1.0, 1.0), Complex64::new(0.0, 0.0)],
            [Complex64::new(2.0, 0.0), Complex64::new(0.0, 2.0)],
        ];
        let b = array![[Complex64::new(2.0, 0.0)], [Complex64::new(1.0, 0.0)]];
        let x = triangular_solve(a.view(), b.view(), Triangle::Lower).unwrap();
        let ax = a.dot(&x);
        for i in 0..2 {
            assert_relative_eq!((ax[[i, 0]] - b[[i, 0]]).norm(), 0.0, epsilon = 1e-12);
        }
    }
}
