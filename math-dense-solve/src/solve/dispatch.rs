//! Solve dispatcher
//!
//! Classifies a system from its shape and the caller's options, runs the
//! matching factorization, and walks the fallback ladder on numerical
//! failure:
//!
//! | system                 | primary                 | on failure                         |
//! |------------------------|-------------------------|------------------------------------|
//! | square, equilibrate/refine | equilibrated LU + refinement | pseudo-inverse            |
//! | square, sympd          | Cholesky                | LU, then pseudo-inverse            |
//! | square, symmetric      | Bunch–Kaufman LDLᴴ      | LU, then pseudo-inverse            |
//! | square, triangular     | substitution            | pseudo-inverse                     |
//! | square, general        | LU                      | pseudo-inverse                     |
//! | non-square             | Householder QR          | complete orthogonal, pseudo-inverse |
//!
//! Steps after the primary one only run when the fallback is allowed. The
//! pseudo-inverse always works on the caller's matrix as asserted by the
//! structural option (symmetrized or triangularized), never on a
//! half-factorized copy.

use super::opts::{ResolvedOpts, SolveOpts, Structure, SystemKind};
use crate::direct::{
    cholesky_solve, complete_orthogonal_solve, equilibrated_solve, ldlt_solve,
    least_squares_solve, lu_solve, pinv, triangular_solve,
};
use crate::error::{FactorError, SolveError};
use crate::matrix::{Triangle, is_finite, symmat, trimat};
use crate::traits::{ComplexField, real};
use ndarray::{Array2, ArrayView2};
use num_traits::{FromPrimitive, One};
use serde::{Deserialize, Serialize};

/// What to do once every fallback has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Return `Ok(false)` with an empty output
    #[default]
    Recoverable,
    /// Return `Err(SolveError::NoSolution)` with an empty output
    Fatal,
}

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    /// Maximum refinement sweeps when `refine` is requested
    #[serde(default = "default_refine_iterations")]
    pub refine_iterations: usize,
    /// Absolute singular value cutoff of the pseudo-inverse
    /// (`None` = max(m, n)·σ_max·ε)
    #[serde(default)]
    pub pinv_tolerance: Option<f64>,
    /// Relative rank threshold of the extended least-squares step
    /// (`None` = max(m, n)·ε)
    #[serde(default)]
    pub rank_tolerance: Option<f64>,
    /// Reciprocal condition estimate below which LU, Cholesky and LDLᴴ
    /// report singularity (`None` = ε)
    #[serde(default)]
    pub rcond_threshold: Option<f64>,
}

fn default_refine_iterations() -> usize {
    5
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::Recoverable,
            refine_iterations: default_refine_iterations(),
            pinv_tolerance: None,
            rank_tolerance: None,
            rcond_threshold: None,
        }
    }
}

impl SolverConfig {
    /// Default configuration with the fatal error policy.
    pub fn fatal() -> Self {
        Self {
            error_policy: ErrorPolicy::Fatal,
            ..Default::default()
        }
    }
}

/// Dense solve dispatcher. Immutable once built; share it freely across
/// threads.
#[derive(Debug, Clone, Default)]
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn rcond_min<T: ComplexField>(&self) -> T::Real {
        self.config
            .rcond_threshold
            .map_or_else(T::epsilon, real::<T>)
    }

    fn pinv_tol<T: ComplexField>(&self) -> Option<T::Real> {
        self.config.pinv_tolerance.map(real::<T>)
    }

    fn rank_tol<T: ComplexField>(&self, rows: usize, cols: usize) -> T::Real {
        match self.config.rank_tolerance {
            Some(tol) => real::<T>(tol),
            None => {
                let dim = T::Real::from_usize(rows.max(cols)).unwrap_or_else(T::Real::one);
                dim * T::epsilon()
            }
        }
    }

    /// Solve A·X = B into `out`.
    ///
    /// A is consumed: every factorization works in place. B is only read.
    /// Returns `Ok(true)` with X in `out` on success. When no solution is
    /// found `out` is reset to an empty 0×0 matrix and the result depends on
    /// [`SolverConfig::error_policy`]. Shape mismatches and invalid option
    /// combinations are always `Err`.
    pub fn solve_into<T: ComplexField>(
        &self,
        out: &mut Array2<T>,
        a: Array2<T>,
        b: ArrayView2<T>,
        opts: impl Into<SolveOpts>,
    ) -> Result<bool, SolveError> {
        let opts = opts.into();
        let (rows, cols) = a.dim();
        if rows != b.nrows() {
            return Err(SolveError::DimensionMismatch {
                a_rows: rows,
                b_rows: b.nrows(),
            });
        }
        let resolved = opts.resolve(rows, cols)?;
        let kind = SystemKind::classify(rows, cols, resolved.structure);
        log::debug!(
            "solve(): {rows}x{cols} system, {} rhs, options [{opts}], kind {kind:?}",
            b.ncols()
        );

        let x = if resolved.allow_rank_deficient {
            log::debug!("solve(): rank deficiency allowed, using pseudo-inverse");
            let a0 = structured(a, resolved.structure)?;
            self.approximate(a0.view(), b)
        } else if rows == cols {
            self.solve_square(a, b, &resolved)?
        } else {
            self.solve_rectangular(a, b, &resolved)
        };

        self.finish(out, x)
    }

    /// Solve A·X = B and return X.
    ///
    /// Like [`Solver::solve_into`], but failure to find a solution is always
    /// `Err(SolveError::NoSolution)`.
    pub fn solve<T: ComplexField>(
        &self,
        a: Array2<T>,
        b: ArrayView2<T>,
        opts: impl Into<SolveOpts>,
    ) -> Result<Array2<T>, SolveError> {
        let mut out = Array2::zeros((0, 0));
        if self.solve_into(&mut out, a, b, opts)? {
            Ok(out)
        } else {
            Err(SolveError::NoSolution)
        }
    }

    /// Solve A·X = B for a triangular A into `out`.
    ///
    /// A is borrowed and never modified; only `triangle` of it is read. There
    /// is no fallback: a zero on the diagonal is a failure, handled according
    /// to the error policy. A and B must not share storage.
    pub fn solve_tr_into<T: ComplexField>(
        &self,
        out: &mut Array2<T>,
        a: ArrayView2<T>,
        b: ArrayView2<T>,
        triangle: Triangle,
    ) -> Result<bool, SolveError> {
        if overlapping(&a, &b) {
            return Err(SolveError::Aliased);
        }
        let (rows, cols) = a.dim();
        if rows != b.nrows() {
            return Err(SolveError::DimensionMismatch {
                a_rows: rows,
                b_rows: b.nrows(),
            });
        }
        if rows != cols {
            return Err(SolveError::NotSquare {
                rows,
                cols,
                context: "solve()",
            });
        }
        log::debug!("solve(): {rows}x{cols} {triangle:?} triangular system, no fallback");

        let x = triangular_solve(a, b, triangle)
            .map_err(|e| log::debug!("solve(): triangular substitution failed: {e}"))
            .ok();
        self.finish(out, x)
    }

    /// Triangular solve returning X; failure is `Err(SolveError::NoSolution)`.
    pub fn solve_tr<T: ComplexField>(
        &self,
        a: ArrayView2<T>,
        b: ArrayView2<T>,
        triangle: Triangle,
    ) -> Result<Array2<T>, SolveError> {
        let mut out = Array2::zeros((0, 0));
        if self.solve_tr_into(&mut out, a, b, triangle)? {
            Ok(out)
        } else {
            Err(SolveError::NoSolution)
        }
    }

    /// X = pinv(A)·B. A and B are only read.
    pub fn pinv_solve<T: ComplexField>(
        &self,
        a: ArrayView2<T>,
        b: ArrayView2<T>,
    ) -> Result<Array2<T>, SolveError> {
        if a.nrows() != b.nrows() {
            return Err(SolveError::DimensionMismatch {
                a_rows: a.nrows(),
                b_rows: b.nrows(),
            });
        }
        self.approximate(a, b).ok_or(SolveError::NoSolution)
    }

    /// Moore–Penrose pseudo-inverse of A using the configured tolerance.
    pub fn pinv<T: ComplexField>(&self, a: ArrayView2<T>) -> Result<Array2<T>, SolveError> {
        pinv(a, self.pinv_tol::<T>()).map_err(|e| {
            log::debug!("pinv(): {e}");
            SolveError::NoSolution
        })
    }

    fn finish<T: ComplexField>(
        &self,
        out: &mut Array2<T>,
        x: Option<Array2<T>>,
    ) -> Result<bool, SolveError> {
        match x {
            Some(x) => {
                *out = x;
                Ok(true)
            }
            None => {
                *out = Array2::zeros((0, 0));
                match self.config.error_policy {
                    ErrorPolicy::Recoverable => {
                        log::warn!("solve(): solution not found");
                        Ok(false)
                    }
                    ErrorPolicy::Fatal => Err(SolveError::NoSolution),
                }
            }
        }
    }

    fn solve_square<T: ComplexField>(
        &self,
        a: Array2<T>,
        b: ArrayView2<T>,
        opts: &ResolvedOpts,
    ) -> Result<Option<Array2<T>>, SolveError> {
        let tol = self.rcond_min::<T>();
        let fallback = if opts.allow_fallback {
            Some(structured(a.clone(), opts.structure)?)
        } else {
            None
        };

        let primary = if opts.extended() {
            if opts.structure != Structure::General {
                log::debug!(
                    "solve(): equilibrate/refine requested, {:?} fast path skipped",
                    opts.structure
                );
            }
            let refine = if opts.refine {
                self.config.refine_iterations
            } else {
                0
            };
            let a = structured(a, opts.structure)?;
            equilibrated_solve(a, b, opts.equilibrate, refine).map(|sol| {
                log::debug!(
                    "solve(): equilibrated solve, scaling {:?}, rcond {:?}, {} refinement step(s)",
                    sol.scaling,
                    sol.rcond,
                    sol.refinement_steps
                );
                sol.x
            })
        } else {
            match opts.structure {
                Structure::SymmetricPositiveDefinite(t) => {
                    let full = symmat(a.view(), t)?;
                    cholesky_solve(a, b, t, tol).or_else(|e| {
                        log::debug!("solve(): Cholesky failed ({e}), trying LU");
                        lu_solve(full, b, tol)
                    })
                }
                Structure::SymmetricUpper => self.symmetric(a, b, Triangle::Upper)?,
                Structure::SymmetricLower => self.symmetric(a, b, Triangle::Lower)?,
                Structure::TriangularUpper => triangular_solve(a.view(), b, Triangle::Upper),
                Structure::TriangularLower => triangular_solve(a.view(), b, Triangle::Lower),
                Structure::General => lu_solve(a, b, tol),
            }
        };

        match primary {
            Ok(x) => Ok(Some(x)),
            Err(e) => {
                log::debug!("solve(): direct solve failed: {e}");
                Ok(fallback.and_then(|a0| {
                    log::warn!(
                        "solve(): system seems singular to working precision; attempting approximate solution"
                    );
                    self.approximate(a0.view(), b)
                }))
            }
        }
    }

    fn symmetric<T: ComplexField>(
        &self,
        a: Array2<T>,
        b: ArrayView2<T>,
        triangle: Triangle,
    ) -> Result<Result<Array2<T>, FactorError>, SolveError> {
        let tol = self.rcond_min::<T>();
        let full = symmat(a.view(), triangle)?;
        Ok(ldlt_solve(a, b, triangle, tol).or_else(|e| {
            log::debug!("solve(): LDL factorization failed ({e}), trying LU");
            lu_solve(full, b, tol)
        }))
    }

    fn solve_rectangular<T: ComplexField>(
        &self,
        a: Array2<T>,
        b: ArrayView2<T>,
        opts: &ResolvedOpts,
    ) -> Option<Array2<T>> {
        let (rows, cols) = a.dim();
        let fallback = opts.allow_fallback.then(|| a.clone());

        let rank_tol = self.rank_tol::<T>(rows, cols);
        let err = match least_squares_solve(a, b, rank_tol) {
            Ok(x) => return Some(x),
            Err(e) => e,
        };
        log::debug!("solve(): QR solve failed: {err}");
        let a0 = fallback?;

        log::warn!(
            "solve(): system seems rank deficient; attempting approximate solution"
        );
        match complete_orthogonal_solve(a0.clone(), b, rank_tol) {
            Ok((x, rank)) => {
                log::debug!("solve(): extended least squares, rank {rank}");
                Some(x)
            }
            Err(e) => {
                log::debug!("solve(): extended least squares failed: {e}");
                self.approximate(a0.view(), b)
            }
        }
    }

    /// X = pinv(A)·B, accepted only when every element is finite.
    fn approximate<T: ComplexField>(&self, a: ArrayView2<T>, b: ArrayView2<T>) -> Option<Array2<T>> {
        let x = match pinv(a, self.pinv_tol::<T>()) {
            Ok(p) => p.dot(&b),
            Err(e) => {
                log::debug!("solve(): pseudo-inverse failed: {e}");
                return None;
            }
        };
        if is_finite(x.view()) {
            Some(x)
        } else {
            log::debug!("solve(): approximate solution rejected (non-finite)");
            None
        }
    }
}

/// A as described by `structure`: the full Hermitian matrix for the
/// symmetric options, the selected triangle for the triangular ones.
fn structured<T: ComplexField>(
    a: Array2<T>,
    structure: Structure,
) -> Result<Array2<T>, SolveError> {
    match structure.triangle() {
        Some(t) if structure.is_symmetric() => symmat(a.view(), t),
        Some(t) if structure.is_triangular() => trimat(a.view(), t),
        _ => Ok(a),
    }
}

/// Address range `[lo, hi)` covered by the elements of `v`.
fn memory_span<T>(v: &ArrayView2<T>) -> Option<(isize, isize)> {
    if v.is_empty() {
        return None;
    }
    let size = std::mem::size_of::<T>().max(1) as isize;
    let base = v.as_ptr() as isize;
    let (lo, hi) = v
        .shape()
        .iter()
        .zip(v.strides())
        .fold((0_isize, 0_isize), |(lo, hi), (&len, &stride)| {
            let reach = (len as isize - 1) * stride;
            (lo + reach.min(0), hi + reach.max(0))
        });
    Some((base + lo * size, base + (hi + 1) * size))
}

/// True when the address ranges of `a` and `b` intersect.
///
/// Interleaved views of one buffer count as overlapping.
fn overlapping<T>(a: &ArrayView2<T>, b: &ArrayView2<T>) -> bool {
    match (memory_span(a), memory_span(b)) {
        (Some((a_lo, a_hi)), Some((b_lo, b_hi))) => a_lo < b_hi && b_lo < a_hi,
        _ => false,
    }
}
