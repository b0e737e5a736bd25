//! Error types
//!
//! Two layers: [`FactorError`] is reported by the dense factorizations in
//! [`crate::direct`] and is always recoverable by the dispatcher's fallback
//! ladder. [`SolveError`] is what callers see.

use faer::linalg::solvers::{LltError, SvdError};
use thiserror::Error;

/// Numerical failure of a single factorization or substitution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactorError {
    #[error("matrix is singular to working precision (pivot {index})")]
    Singular { index: usize },
    #[error("matrix is not positive definite (leading minor {index})")]
    NotPositiveDefinite { index: usize },
    #[error("result contains non-finite values")]
    NonFinite,
    #[error("singular value decomposition did not converge")]
    NoConvergence,
    #[error("matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl From<LltError> for FactorError {
    fn from(err: LltError) -> Self {
        match err {
            LltError::NonPositivePivot { index } => FactorError::NotPositiveDefinite { index },
        }
    }
}

impl From<SvdError> for FactorError {
    fn from(err: SvdError) -> Self {
        match err {
            SvdError::NoConvergence => FactorError::NoConvergence,
        }
    }
}

/// Errors returned by the public solve entry points.
///
/// Variants other than [`SolveError::NoSolution`] are structural violations:
/// programmer errors that are reported immediately and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("solve(): number of rows in A ({a_rows}) and B ({b_rows}) must be the same")]
    DimensionMismatch { a_rows: usize, b_rows: usize },
    #[error("{context}: given matrix must be square sized (got {rows}x{cols})")]
    NotSquare {
        rows: usize,
        cols: usize,
        context: &'static str,
    },
    #[error("solve(): invalid options: {0}")]
    InvalidOptions(String),
    #[error("solve(): A and B must not share storage")]
    Aliased,
    #[error("solve(): solution not found")]
    NoSolution,
}

impl SolveError {
    /// True for precondition violations, false for numerical failure.
    pub fn is_structural(&self) -> bool {
        !matches!(self, SolveError::NoSolution)
    }
}
