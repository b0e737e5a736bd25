//! Singular value decomposition and pseudo-inverse
//!
//! Thin SVD through faer's `Svd`, and the Moore–Penrose pseudo-inverse built
//! on it. A decomposition that does not converge is reported as
//! [`FactorError::NoConvergence`] rather than returned half-finished.

use super::{from_faer, to_faer};
use crate::error::FactorError;
use crate::matrix::{conj_transpose, is_finite};
use crate::traits::ComplexField;
use ndarray::{Array1, Array2, ArrayView2, s};
use num_traits::{Float, FromPrimitive, One, Zero};

/// Thin SVD: A = U·diag(s)·Vᴴ with singular values in decreasing order.
#[derive(Debug, Clone)]
pub struct Svd<T: ComplexField> {
    /// m×p left singular vectors
    pub u: Array2<T>,
    /// p singular values, p = min(m, n)
    pub s: Array1<T::Real>,
    /// n×p right singular vectors
    pub v: Array2<T>,
}

/// Thin SVD of `a`.
pub fn svd<T: ComplexField>(a: ArrayView2<T>) -> Result<Svd<T>, FactorError> {
    if !is_finite(a.view()) {
        return Err(FactorError::NonFinite);
    }
    let (m, n) = a.dim();
    let p = m.min(n);
    if p == 0 {
        return Ok(Svd {
            u: Array2::zeros((m, 0)),
            s: Array1::zeros(0),
            v: Array2::zeros((n, 0)),
        });
    }

    let f = faer::linalg::solvers::Svd::new_thin(to_faer(a).as_ref())?;
    let sigma = f.S().column_vector();
    let s = Array1::from_shape_fn(p, |i| T::from_faer(sigma[i]).re());
    if s.iter().any(|x| !x.is_finite()) {
        return Err(FactorError::NonFinite);
    }

    Ok(Svd {
        u: from_faer(f.U()),
        s,
        v: from_faer(f.V()),
    })
}

/// Default pseudo-inverse tolerance: max(m, n) · σ_max · ε
pub fn default_tolerance<T: ComplexField>(m: usize, n: usize, sigma_max: T::Real) -> T::Real {
    let dim = T::Real::from_usize(m.max(n)).unwrap_or_else(T::Real::one);
    dim * sigma_max * T::epsilon()
}

/// Moore–Penrose pseudo-inverse of `a` (n×m for an m×n input).
///
/// Singular values at or below `tolerance` are treated as zero; `None`
/// selects [`default_tolerance`].
pub fn pinv<T: ComplexField>(
    a: ArrayView2<T>,
    tolerance: Option<T::Real>,
) -> Result<Array2<T>, FactorError> {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return Ok(Array2::zeros((n, m)));
    }

    let Svd { u, s, v } = svd(a)?;
    let sigma_max = s.iter().fold(T::Real::zero(), |acc, &x| acc.max(x));
    let tol = tolerance.unwrap_or_else(|| default_tolerance::<T>(m, n, sigma_max));
    let rank = s.iter().take_while(|&&x| x > tol).count();

    let v_scaled = Array2::from_shape_fn((n, rank), |(i, j)| v[[i, j]].scale(s[j].recip()));
    let u_h = conj_transpose(u.slice(s![.., ..rank]));
    let result = v_scaled.dot(&u_h);

    if is_finite(result.view()) {
        Ok(result)
    } else {
        Err(FactorError::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use num_complex::Complex64;

    fn reconstruct(svd: &Svd<f64>) -> Array2<f64> {
        let sd = Array2::from_diag(&svd.s);
        svd.u.dot(&sd).dot(&svd.v.t())
    }

    #[test]
    fn test_svd_tall() {
        let a = array![[3.0_f64, 2.0], [2.0, 3.0], [2.0, -2.0]];
        let f = svd(a.view()).unwrap();
        assert_relative_eq!(f.s[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(f.s[1], 3.0, epsilon = 1e-12);
        let r = reconstruct(&f);
        for (x, y) in r.iter().zip(a.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_svd_wide() {
        let a = array![[3.0_f64, 2.0, 2.0], [2.0, 3.0, -2.0]];
        let f = svd(a.view()).unwrap();
        assert_eq!(f.u.dim(), (2, 2));
        assert_eq!(f.v.dim(), (3, 2));
        assert_relative_eq!(f.s[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(f.s[1], 3.0, epsilon = 1e-12);
        let r = reconstruct(&f);
        for (x, y) in r.iter().zip(a.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pinv_invertible_matches_inverse() {
        let a = array![[4.0_f64, 7.0], [2.0, 6.0]];
        let p = pinv(a.view(), None).unwrap();
        let expected = array![[0.6, -0.7], [-0.2, 0.4]];
        for (x, y) in p.iter().zip(expected.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pinv_rank_deficient() {
        let a = array![[1.0_f64, 2.0], [2.0, 4.0]];
        let p = pinv(a.view(), None).unwrap();
        // pinv of u·vᵀ (rank one) is A / ‖A‖_F²
        for (x, y) in p.iter().zip(a.t().iter()) {
            assert_relative_eq!(*x, *y / 25.0, epsilon = 1e-12);
        }
        // Penrose condition A·A⁺·A = A
        let back = a.dot(&p).dot(&a);
        for (x, y) in back.iter().zip(a.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pinv_complex_penrose() {
        let a = array![
            [Complex64::new(1.0, 1.0), Complex64::new(2.0, 0.0), Complex64::new(0.0, -1.0)],
            [Complex64::new(0.0, 2.0), Complex64::new(1.0, -1.0), Complex64::new(3.0, 0.0)],
        ];
        let p = pinv(a.view(), None).unwrap();
        assert_eq!(p.dim(), (3, 2));
        let back = a.dot(&p).dot(&a);
        for (x, y) in back.iter().zip(a.iter()) {
            assert_relative_eq!((x - y).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pinv_rejects_nan() {
        let a = array![[1.0_f64, f64::NAN]];
        assert_eq!(pinv(a.view(), None), Err(FactorError::NonFinite));
    }

    #[test]
    fn test_svd_complex_unitary_factors() {
        let a = array![
            [Complex64::new(1.0, 2.0), Complex64::new(0.0, 1.0)],
            [Complex64::new(3.0, 0.0), Complex64::new(-1.0, 1.0)],
            [Complex64::new(0.0, -1.0), Complex64::new(2.0, 0.0)],
        ];
        let f = svd(a.view()).unwrap();
        assert!(f.s[0] >= f.s[1]);
        let uhu = conj_transpose(f.u.view()).dot(&f.u);
        for i in 0..2 {
            for j in 0..2 {
                let want = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!((uhu[[i, j]] - Complex64::new(want, 0.0)).norm(), 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_pinv_empty() {
        let a = Array2::<f64>::zeros((0, 3));
        assert_eq!(pinv(a.view(), None).unwrap().dim(), (3, 0));
    }
}
