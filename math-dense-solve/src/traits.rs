//! Scalar field abstraction
//!
//! The solver works uniformly over real and complex floating-point elements.
//! [`ComplexField`] gathers the handful of operations the solver needs:
//! conjugation, modulus, construction from a real value and finiteness checks.
//! It also names the scalar handed to the faer factorizations.

use num_complex::{Complex32, Complex64};
use num_traits::{Float, FromPrimitive, NumAssign, One, ToPrimitive, Zero};
use std::fmt::Debug;
use std::ops::Neg;

/// Trait for scalar types that can be used as matrix elements.
///
/// # Implementations
///
/// Provided for:
/// - `f64` and `f32` (real systems)
/// - `Complex64` and `Complex32` (complex systems; "symmetric" means Hermitian)
pub trait ComplexField:
    NumAssign + Clone + Copy + Send + Sync + Debug + Zero + One + Neg<Output = Self> + 'static
{
    /// The real number type underlying this field
    type Real: Float + NumAssign + FromPrimitive + ToPrimitive + Send + Sync + Debug + 'static;

    /// The same scalar as seen by the faer backend
    type Faer: faer::traits::ComplexField + Copy;

    fn to_faer(self) -> Self::Faer;

    fn from_faer(v: Self::Faer) -> Self;

    /// Complex conjugate
    fn conj(&self) -> Self;

    /// Squared magnitude |z|²
    fn norm_sqr(&self) -> Self::Real;

    /// Magnitude |z|
    fn norm(&self) -> Self::Real {
        self.norm_sqr().sqrt()
    }

    /// Create from a real value
    fn from_real(r: Self::Real) -> Self;

    /// Real part
    fn re(&self) -> Self::Real;

    /// Imaginary part
    fn im(&self) -> Self::Real;

    /// Multiplicative inverse (1/z)
    fn inv(&self) -> Self;

    /// True when both parts are finite
    fn is_finite(&self) -> bool {
        self.re().is_finite() && self.im().is_finite()
    }

    /// Multiply by a real scalar
    #[inline]
    fn scale(self, r: Self::Real) -> Self {
        self * Self::from_real(r)
    }

    /// Machine epsilon of the underlying real type
    #[inline]
    fn epsilon() -> Self::Real {
        Self::Real::epsilon()
    }
}

impl ComplexField for Complex64 {
    type Real = f64;
    type Faer = Complex64;

    #[inline]
    fn to_faer(self) -> Self {
        self
    }

    #[inline]
    fn from_faer(v: Self) -> Self {
        v
    }

    #[inline]
    fn conj(&self) -> Self {
        Complex64::conj(self)
    }

    #[inline]
    fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    #[inline]
    fn norm(&self) -> f64 {
        self.re.hypot(self.im)
    }

    #[inline]
    fn from_real(r: f64) -> Self {
        Complex64::new(r, 0.0)
    }

    #[inline]
    fn re(&self) -> f64 {
        self.re
    }

    #[inline]
    fn im(&self) -> f64 {
        self.im
    }

    #[inline]
    fn inv(&self) -> Self {
        Complex64::inv(self)
    }
}

impl ComplexField for Complex32 {
    type Real = f32;
    type Faer = Complex32;

    #[inline]
    fn to_faer(self) -> Self {
        self
    }

    #[inline]
    fn from_faer(v: Self) -> Self {
        v
    }

    #[inline]
    fn conj(&self) -> Self {
        Complex32::conj(self)
    }

    #[inline]
    fn norm_sqr(&self) -> f32 {
        self.re * self.re + self.im * self.im
    }

    #[inline]
    fn norm(&self) -> f32 {
        self.re.hypot(self.im)
    }

    #[inline]
    fn from_real(r: f32) -> Self {
        Complex32::new(r, 0.0)
    }

    #[inline]
    fn re(&self) -> f32 {
        self.re
    }

    #[inline]
    fn im(&self) -> f32 {
        self.im
    }

    #[inline]
    fn inv(&self) -> Self {
        Complex32::inv(self)
    }
}

impl ComplexField for f64 {
    type Real = f64;
    type Faer = f64;

    #[inline]
    fn to_faer(self) -> Self {
        self
    }

    #[inline]
    fn from_faer(v: Self) -> Self {
        v
    }

    #[inline]
    fn conj(&self) -> Self {
        *self
    }

    #[inline]
    fn norm_sqr(&self) -> f64 {
        *self * *self
    }

    #[inline]
    fn norm(&self) -> f64 {
        self.abs()
    }

    #[inline]
    fn from_real(r: f64) -> Self {
        r
    }

    #[inline]
    fn re(&self) -> f64 {
        *self
    }

    #[inline]
    fn im(&self) -> f64 {
        0.0
    }

    #[inline]
    fn inv(&self) -> Self {
        1.0 / *self
    }
}

impl ComplexField for f32 {
    type Real = f32;
    type Faer = f32;

    #[inline]
    fn to_faer(self) -> Self {
        self
    }

    #[inline]
    fn from_faer(v: Self) -> Self {
        v
    }

    #[inline]
    fn conj(&self) -> Self {
        *self
    }

    #[inline]
    fn norm_sqr(&self) -> f32 {
        *self * *self
    }

    #[inline]
    fn norm(&self) -> f32 {
        self.abs()
    }

    #[inline]
    fn from_real(r: f32) -> Self {
        r
    }

    #[inline]
    fn re(&self) -> f32 {
        *self
    }

    #[inline]
    fn im(&self) -> f32 {
        0.0
    }

    #[inline]
    fn inv(&self) -> Self {
        1.0 / *self
    }
}

/// Convert an `f64` constant into the real type of `T`.
#[inline]
pub(crate) fn real<T: ComplexField>(v: f64) -> T::Real {
    T::Real::from_f64(v).unwrap_or_else(T::Real::zero)
}
