//! Reciprocal condition number estimate
//!
//! Hager's 1-norm estimator of ‖A⁻¹‖₁, driven by the solves of an existing
//! factorization. A handful of solves with A and Aᴴ are enough, so the
//! estimate is cheap next to the factorization itself.

use crate::blas_helpers::inner_product;
use crate::error::FactorError;
use crate::traits::ComplexField;
use faer::Mat;
use ndarray::{Array1, ArrayView2};
use num_traits::{Float, FromPrimitive, One, Zero};

const MAX_SWEEPS: usize = 5;

/// 1-norm of a matrix: largest absolute column sum
pub fn norm1<T: ComplexField>(a: ArrayView2<T>) -> T::Real {
    a.columns()
        .into_iter()
        .map(|col| col.iter().fold(T::Real::zero(), |acc, v| acc + v.norm()))
        .fold(T::Real::zero(), |acc, v| acc.max(v))
}

/// Estimate rcond = 1 / (‖A‖₁·‖A⁻¹‖₁) for an n×n matrix with 1-norm `anorm`.
///
/// `solve(x, adjoint)` overwrites the n×1 column `x` with A⁻¹x, or with A⁻ᴴx
/// when `adjoint` is set. Returns zero when the estimate breaks down.
pub fn rcond_estimate<T, F>(n: usize, anorm: T::Real, solve: F) -> T::Real
where
    T: ComplexField,
    F: Fn(&mut Mat<T::Faer>, bool),
{
    let zero = T::Real::zero();
    if n == 0 {
        return T::Real::one();
    }
    if anorm <= zero || !anorm.is_finite() {
        return zero;
    }

    let apply = |v: &Array1<T>, adjoint: bool| -> Option<Array1<T>> {
        let mut col = Mat::from_fn(n, 1, |i, _| v[i].to_faer());
        solve(&mut col, adjoint);
        let out = Array1::from_shape_fn(n, |i| T::from_faer(col[(i, 0)]));
        out.iter().all(|v| v.is_finite()).then_some(out)
    };

    let n_real = T::Real::from_usize(n).unwrap_or_else(T::Real::one);
    let mut x = Array1::from_elem(n, T::from_real(T::Real::one() / n_real));
    let mut estimate = zero;

    for sweep in 0..MAX_SWEEPS {
        let Some(y) = apply(&x, false) else {
            return zero;
        };
        estimate = y.iter().fold(zero, |acc, v| acc + v.norm());

        let sign = y.mapv(|v| {
            let m = v.norm();
            if m > zero { v.scale(T::Real::one() / m) } else { T::one() }
        });
        let Some(z) = apply(&sign, true) else {
            return zero;
        };

        let (j_max, z_max) = z
            .iter()
            .enumerate()
            .fold((0, zero), |(jm, zm), (j, v)| {
                let m = v.norm();
                if m > zm { (j, m) } else { (jm, zm) }
            });
        let ztx = inner_product(z.view(), x.view()).re();
        if sweep > 0 && z_max <= ztx {
            break;
        }

        x.fill(T::zero());
        x[j_max] = T::one();
    }

    if estimate > zero && estimate.is_finite() {
        (T::Real::one() / anorm) / estimate
    } else {
        zero
    }
}

/// Reject a factorization whose rcond is below `threshold` or not a number.
///
/// `index` is the pivot position reported in [`FactorError::Singular`].
pub(crate) fn check_rcond<R: Float>(rcond: R, threshold: R, index: usize) -> Result<(), FactorError> {
    if rcond >= threshold {
        Ok(())
    } else {
        log::debug!(
            "rcond {:e} below threshold {:e}",
            rcond.to_f64().unwrap_or(f64::NAN),
            threshold.to_f64().unwrap_or(f64::NAN)
        );
        Err(FactorError::Singular { index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// Solves with a diagonal matrix given by its entries
    fn diagonal_solver(d: Vec<f64>) -> impl Fn(&mut Mat<f64>, bool) {
        move |x, _| {
            for (i, di) in d.iter().enumerate() {
                x[(i, 0)] /= *di;
            }
        }
    }

    #[test]
    fn test_norm1() {
        let a = array![[1.0_f64, -4.0], [-2.0, 1.0]];
        assert_relative_eq!(norm1(a.view()), 5.0);
    }

    #[test]
    fn test_rcond_diagonal() {
        // ‖A‖₁ = 2, ‖A⁻¹‖₁ = 2
        let rcond = rcond_estimate::<f64, _>(2, 2.0, diagonal_solver(vec![2.0, 0.5]));
        assert_relative_eq!(rcond, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_rcond_breakdown_is_zero() {
        let rcond = rcond_estimate::<f64, _>(2, 1.0, diagonal_solver(vec![1.0, 0.0]));
        assert_eq!(rcond, 0.0);
        assert_eq!(rcond_estimate::<f64, _>(0, 0.0, diagonal_solver(vec![])), 1.0);
    }

    #[test]
    fn test_check_rcond() {
        assert!(check_rcond(1e-3_f64, f64::EPSILON, 0).is_ok());
        assert_eq!(
            check_rcond(1e-17_f64, f64::EPSILON, 2),
            Err(FactorError::Singular { index: 2 })
        );
        assert!(check_rcond(f64::NAN, 0.0, 0).is_err());
    }
}
