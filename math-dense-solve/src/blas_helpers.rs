//! Level-1 kernels on matrix columns
//!
//! Small inner loops used around the factorizations: the condition estimate,
//! residual norms, refinement updates and equilibration. They operate on
//! ndarray views so that columns and rows of a matrix can be passed without
//! copying.

use crate::traits::ComplexField;
use ndarray::{ArrayView1, ArrayViewMut1};
use num_traits::{Float, Zero};

/// Compute inner product (x, y) = Σ conj(x_i) * y_i
#[inline]
pub fn inner_product<T: ComplexField>(x: ArrayView1<T>, y: ArrayView1<T>) -> T {
    assert_eq!(
        x.len(),
        y.len(),
        "Vector lengths must match for inner product"
    );
    let mut sum = T::zero();
    for (xi, yi) in x.iter().zip(y.iter()) {
        sum += xi.conj() * *yi;
    }
    sum
}

/// Compute vector 2-norm: ||x||_2 = sqrt(Σ |x_i|^2)
///
/// Scaled accumulation so that very large or very small entries do not
/// overflow or underflow the sum of squares.
#[inline]
pub fn vector_norm<T: ComplexField>(x: ArrayView1<T>) -> T::Real {
    let scale = x
        .iter()
        .map(|xi| xi.norm())
        .fold(T::Real::zero(), |acc, v| acc.max(v));
    if scale.is_zero() || !scale.is_finite() {
        return scale;
    }
    let mut sum = T::Real::zero();
    for xi in x.iter() {
        let r = xi.norm() / scale;
        sum += r * r;
    }
    scale * sum.sqrt()
}

/// Compute axpy: y = α * x + y
#[inline]
pub fn axpy<T: ComplexField>(alpha: T, x: ArrayView1<T>, mut y: ArrayViewMut1<T>) {
    for (xi, yi) in x.iter().zip(y.iter_mut()) {
        *yi += alpha * *xi;
    }
}

/// Compute vector scale in-place: x = α * x
#[inline]
pub fn scale_inplace<T: ComplexField>(mut x: ArrayViewMut1<T>, alpha: T) {
    for xi in x.iter_mut() {
        *xi *= alpha;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use num_complex::Complex64;

    #[test]
    fn test_inner_product_real() {
        let x = array![1.0_f64, 2.0, 3.0];
        let y = array![4.0_f64, 5.0, 6.0];

        let ip = inner_product(x.view(), y.view());
        assert_relative_eq!(ip, 32.0, epsilon = 1e-10);
    }

    #[test]
    fn test_inner_product_complex() {
        let x = array![Complex64::new(1.0, 2.0), Complex64::new(3.0, 4.0)];
        let y = array![Complex64::new(5.0, 6.0), Complex64::new(7.0, 8.0)];

        let ip = inner_product(x.view(), y.view());
        assert_relative_eq!(ip.re, 70.0, epsilon = 1e-10);
        assert_relative_eq!(ip.im, -8.0, epsilon = 1e-10);
    }

    #[test]
    fn test_vector_norm() {
        let x = array![3.0_f64, 4.0];
        assert_relative_eq!(vector_norm(x.view()), 5.0, epsilon = 1e-12);

        let z = array![Complex64::new(3.0, 0.0), Complex64::new(0.0, 4.0)];
        assert_relative_eq!(vector_norm(z.view()), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vector_norm_does_not_overflow() {
        let x = array![3.0e200_f64, 4.0e200];
        assert_relative_eq!(vector_norm(x.view()), 5.0e200, max_relative = 1e-12);

        let zero = array![0.0_f64, 0.0];
        assert_eq!(vector_norm(zero.view()), 0.0);
    }

    #[test]
    fn test_axpy_and_scale() {
        let x = array![1.0_f64, 2.0, 3.0];
        let mut y = array![1.0_f64, 1.0, 1.0];

        axpy(2.0, x.view(), y.view_mut());
        assert_eq!(y, array![3.0, 5.0, 7.0]);

        scale_inplace(y.view_mut(), 0.5);
        assert_eq!(y, array![1.5, 2.5, 3.5]);
    }
}
