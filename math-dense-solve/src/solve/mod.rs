//! Public solve entry points
//!
//! Free functions using a default [`Solver`]. Options are anything that
//! converts into [`SolveOpts`]: a single [`SolveOpt`], a union of them, or the
//! legacy `bool` / `&str` arguments, which always select the default set.
//!
//! ```
//! use math_audio_dense_solve::{SolveOpt, solve};
//! use ndarray::array;
//!
//! let a = array![[4.0_f64, 1.0], [1.0, 3.0]];
//! let b = array![[1.0_f64], [2.0]];
//! let x = solve(a.clone(), b.view(), SolveOpt::SymmetricPositiveDefinite).unwrap();
//! assert!((a.dot(&x) - &b).iter().all(|r| r.abs() < 1e-12));
//! ```

mod dispatch;
mod opts;

pub use dispatch::{ErrorPolicy, Solver, SolverConfig};
pub use opts::{ResolvedOpts, SolveOpt, SolveOpts, Structure, SystemKind};

use crate::error::SolveError;
use crate::matrix::Triangle;
use crate::traits::ComplexField;
use ndarray::{Array2, ArrayView2};

/// Solve A·X = B, returning X. A is consumed.
///
/// Numerical failure after every fallback is `Err(SolveError::NoSolution)`.
pub fn solve<T: ComplexField>(
    a: Array2<T>,
    b: ArrayView2<T>,
    opts: impl Into<SolveOpts>,
) -> Result<Array2<T>, SolveError> {
    Solver::default().solve(a, b, opts)
}

/// Solve A·X = B into `out`. A is consumed.
///
/// Returns `Ok(false)` and empties `out` when no solution was found.
pub fn solve_into<T: ComplexField>(
    out: &mut Array2<T>,
    a: Array2<T>,
    b: ArrayView2<T>,
    opts: impl Into<SolveOpts>,
) -> Result<bool, SolveError> {
    Solver::default().solve_into(out, a, b, opts)
}

/// Solve A·X = B with a custom configuration. A is consumed.
pub fn solve_with<T: ComplexField>(
    config: &SolverConfig,
    a: Array2<T>,
    b: ArrayView2<T>,
    opts: impl Into<SolveOpts>,
) -> Result<Array2<T>, SolveError> {
    Solver::new(config.clone()).solve(a, b, opts)
}

/// Solve the triangular system A·X = B. A is borrowed and not modified.
pub fn solve_tr<T: ComplexField>(
    a: ArrayView2<T>,
    b: ArrayView2<T>,
    triangle: Triangle,
) -> Result<Array2<T>, SolveError> {
    Solver::default().solve_tr(a, b, triangle)
}

/// Triangular solve into `out`; `Ok(false)` and an empty `out` on a zero
/// diagonal.
pub fn solve_tr_into<T: ComplexField>(
    out: &mut Array2<T>,
    a: ArrayView2<T>,
    b: ArrayView2<T>,
    triangle: Triangle,
) -> Result<bool, SolveError> {
    Solver::default().solve_tr_into(out, a, b, triangle)
}

/// X = pinv(A)·B with the default tolerance.
pub fn pinv_solve<T: ComplexField>(
    a: ArrayView2<T>,
    b: ArrayView2<T>,
) -> Result<Array2<T>, SolveError> {
    Solver::default().pinv_solve(a, b)
}

/// Moore–Penrose pseudo-inverse. `tolerance` is an absolute singular value
/// cutoff; `None` uses max(m, n)·σ_max·ε.
pub fn pinv<T: ComplexField>(
    a: ArrayView2<T>,
    tolerance: Option<T::Real>,
) -> Result<Array2<T>, SolveError> {
    crate::direct::pinv(a, tolerance).map_err(|e| {
        log::debug!("pinv(): {e}");
        SolveError::NoSolution
    })
}
