//! Extended square solve
//!
//! Row/column equilibration followed by LU and iterative refinement against
//! the unscaled system. Scale factors follow LAPACK's `geequ`; they are only
//! applied when the ratio of the smallest to the largest row (column) norm
//! drops below [`SCALING_THRESHOLD`] or the entries are close to
//! under/overflow.

use super::lu::lu_factorize;
use crate::blas_helpers::{axpy, scale_inplace, vector_norm};
use crate::error::FactorError;
use crate::matrix::{is_finite, max_abs};
use crate::parallel::parallel_map_indexed;
use crate::traits::{ComplexField, real};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use num_traits::{Float, One, Zero};

/// Row/column ratio below which scaling is applied.
pub const SCALING_THRESHOLD: f64 = 0.1;

/// Which scalings were applied to A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    None,
    Row,
    Column,
    Both,
}

impl Scaling {
    fn from_flags(rows: bool, cols: bool) -> Self {
        match (rows, cols) {
            (false, false) => Scaling::None,
            (true, false) => Scaling::Row,
            (false, true) => Scaling::Column,
            (true, true) => Scaling::Both,
        }
    }

    pub fn rows(self) -> bool {
        matches!(self, Scaling::Row | Scaling::Both)
    }

    pub fn columns(self) -> bool {
        matches!(self, Scaling::Column | Scaling::Both)
    }
}

/// Row and column scale factors with the ratio test inputs.
#[derive(Debug, Clone)]
pub struct Equilibration<R> {
    pub row: Array1<R>,
    pub col: Array1<R>,
    /// min row norm / max row norm
    pub row_ratio: R,
    /// min column norm / max column norm (after row scaling)
    pub col_ratio: R,
    /// max |a_ij|
    pub amax: R,
}

/// Result of [`equilibrated_solve`]
#[derive(Debug, Clone)]
pub struct EquilibratedSolution<T: ComplexField> {
    pub x: Array2<T>,
    /// Reciprocal 1-norm condition estimate of the (scaled) matrix
    pub rcond: T::Real,
    pub scaling: Scaling,
    /// Most refinement sweeps performed on any column
    pub refinement_steps: usize,
}

/// Compute equilibration factors. A zero row or column reports
/// [`FactorError::Singular`] with its index.
pub fn equilibration<T: ComplexField>(
    a: ArrayView2<T>,
) -> Result<Equilibration<T::Real>, FactorError> {
    let (m, n) = a.dim();
    let zero = T::Real::zero();
    let small = T::Real::min_positive_value();
    let big = small.recip();

    let mut row = Array1::from_elem(m, zero);
    for ((i, _), v) in a.indexed_iter() {
        row[i] = row[i].max(v.norm());
    }
    let (rmin, rmax) = row
        .iter()
        .fold((big, zero), |(lo, hi), &r| (lo.min(r), hi.max(r)));
    if let Some(i) = row.iter().position(|r| r.is_zero()) {
        return Err(FactorError::Singular { index: i });
    }
    let row_ratio = rmin.max(small) / rmax.min(big);
    row.mapv_inplace(|r| r.max(small).min(big).recip());

    let mut col = Array1::from_elem(n, zero);
    for ((i, j), v) in a.indexed_iter() {
        col[j] = col[j].max(v.norm() * row[i]);
    }
    let (cmin, cmax) = col
        .iter()
        .fold((big, zero), |(lo, hi), &c| (lo.min(c), hi.max(c)));
    if let Some(j) = col.iter().position(|c| c.is_zero()) {
        return Err(FactorError::Singular { index: j });
    }
    let col_ratio = cmin.max(small) / cmax.min(big);
    col.mapv_inplace(|c| c.max(small).min(big).recip());

    Ok(Equilibration {
        row,
        col,
        row_ratio,
        col_ratio,
        amax: max_abs(a),
    })
}

/// Decide which of the computed scalings are worth applying.
pub fn scaling_decision<T: ComplexField>(eq: &Equilibration<T::Real>) -> Scaling {
    let threshold = real::<T>(SCALING_THRESHOLD);
    let small = T::Real::min_positive_value() / T::epsilon();
    let large = small.recip();
    let rows = eq.row_ratio < threshold || eq.amax < small || eq.amax > large;
    let cols = eq.col_ratio < threshold;
    Scaling::from_flags(rows, cols)
}

fn scale_rows<T: ComplexField>(m: &mut Array2<T>, factors: &Array1<T::Real>) {
    for (row, &f) in m.axis_iter_mut(Axis(0)).zip(factors.iter()) {
        scale_inplace(row, T::from_real(f));
    }
}

fn scale_cols<T: ComplexField>(m: &mut Array2<T>, factors: &Array1<T::Real>) {
    for (col, &f) in m.axis_iter_mut(Axis(1)).zip(factors.iter()) {
        scale_inplace(col, T::from_real(f));
    }
}

/// Solve the square system AX = B with optional equilibration and up to
/// `refine_iterations` refinement sweeps. A is consumed.
///
/// Each column of B is refined on its own. Refinement of a column stops
/// early once the correction is below working precision relative to its
/// solution or the residual stops shrinking. An ill-conditioned matrix is
/// accepted with a warning; only an exactly zero pivot fails.
pub fn equilibrated_solve<T: ComplexField>(
    a: Array2<T>,
    b: ArrayView2<T>,
    equilibrate: bool,
    refine_iterations: usize,
) -> Result<EquilibratedSolution<T>, FactorError> {
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
    if !is_finite(a.view()) {
        return Err(FactorError::NonFinite);
    }

    let original = if refine_iterations > 0 {
        Some(a.clone())
    } else {
        None
    };

    let (scaling, eq) = if equilibrate && n > 0 {
        let eq = equilibration(a.view())?;
        (scaling_decision::<T>(&eq), Some(eq))
    } else {
        (Scaling::None, None)
    };

    let mut scaled = a;
    if let Some(eq) = &eq {
        if scaling.rows() {
            scale_rows(&mut scaled, &eq.row);
        }
        if scaling.columns() {
            scale_cols(&mut scaled, &eq.col);
        }
    }

    let factor = lu_factorize(scaled)?;
    let rcond = factor.rcond();
    if rcond < T::epsilon() {
        log::warn!("equilibrated solve: matrix is ill-conditioned (rcond = {:?})", rcond);
    }

    // x = C · (R·A·C)⁻¹ · R · rhs
    let scaled_solve = |rhs: Array2<T>| -> Result<Array2<T>, FactorError> {
        let mut rhs = rhs;
        if let Some(eq) = &eq {
            if scaling.rows() {
                scale_rows(&mut rhs, &eq.row);
            }
        }
        let mut y = factor.solve(rhs.view())?;
        if let Some(eq) = &eq {
            if scaling.columns() {
                scale_rows(&mut y, &eq.col);
            }
        }
        Ok(y)
    };

    let mut x = scaled_solve(b.to_owned())?;
    let mut refinement_steps = 0;

    if let Some(original) = original {
        let eps = T::epsilon();
        let x0 = &x;
        let refine_column = |j: usize| -> Result<(Array1<T>, usize), FactorError> {
            let bj = b.column(j);
            let mut xj = x0.column(j).to_owned();
            let mut residual = &bj - &original.dot(&xj);
            let mut last_norm = vector_norm(residual.view());
            let mut steps = 0;

            for _ in 0..refine_iterations {
                if last_norm.is_zero() {
                    break;
                }
                let correction = scaled_solve(residual.clone().insert_axis(Axis(1)))?;
                let dx = correction.column(0);
                let mut candidate = xj.clone();
                axpy(T::one(), dx, candidate.view_mut());
                let next_residual = &bj - &original.dot(&candidate);
                let next_norm = vector_norm(next_residual.view());
                if !(next_norm < last_norm) {
                    break;
                }

                xj = candidate;
                residual = next_residual;
                last_norm = next_norm;
                steps += 1;

                if vector_norm(dx) <= eps * vector_norm(xj.view()) {
                    break;
                }
            }
            Ok((xj, steps))
        };

        let columns = parallel_map_indexed(b.ncols(), refine_column);
        let mut refined = Array2::zeros(x.raw_dim());
        for (j, column) in columns.into_iter().enumerate() {
            let (xj, steps) = column?;
            refined.column_mut(j).assign(&xj);
            refinement_steps = refinement_steps.max(steps);
        }
        x = refined;
        log::debug!("equilibrated solve: up to {} refinement step(s) per column", refinement_steps);
    }

    if !is_finite(x.view()) {
        return Err(FactorError::NonFinite);
    }

    Ok(EquilibratedSolution {
        x,
        rcond: if rcond.is_finite() { rcond } else { T::Real::zero() },
        scaling,
        refinement_steps,
    })
}
