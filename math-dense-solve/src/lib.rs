//! Dense linear system solve with structure dispatch and fallbacks
//!
//! A single `solve(A, B)` for dense matrices that picks the factorization
//! from the shape of the system and the options the caller asserts, and
//! escalates through approximate solutions when the direct solve fails.
//!
//! # Features
//!
//! - **Structure dispatch**: LU, Cholesky, Bunch–Kaufman LDLᴴ, triangular
//!   substitution, Householder QR least squares / minimum norm
//! - **Fallbacks**: equilibration with iterative refinement, complete
//!   orthogonal factorization for rank-deficient least squares,
//!   SVD pseudo-inverse
//! - **Error policy**: recoverable (`Ok(false)`) or fatal (`Err`) failures
//! - **Generic Scalar Types**: Works with Complex64, Complex32, f64, f32
//!
//! # Example
//!
//! ```
//! use math_audio_dense_solve::{SolveOpt, Solver, SolverConfig};
//! use ndarray::{Array2, array};
//!
//! let a = array![[2.0_f64, 0.0], [1.0, 1.0]];
//! let b = array![[2.0_f64], [3.0]];
//!
//! let solver = Solver::new(SolverConfig::default());
//! let mut x = Array2::zeros((0, 0));
//! let ok = solver
//!     .solve_into(&mut x, a, b.view(), SolveOpt::TriangularLower)
//!     .unwrap();
//! assert!(ok);
//! assert!((x[[1, 0]] - 2.0).abs() < 1e-12);
//! ```

pub mod blas_helpers;
pub mod direct;
pub mod error;
pub mod matrix;
pub mod parallel;
pub mod solve;
pub mod traits;

pub use error::{FactorError, SolveError};
pub use matrix::{Triangle, symmatl, symmatu, trimatl, trimatu};
pub use traits::ComplexField;

// Re-export the solve surface
pub use solve::{
    ErrorPolicy, ResolvedOpts, SolveOpt, SolveOpts, Solver, SolverConfig, Structure, SystemKind,
    pinv, pinv_solve, solve, solve_into, solve_tr, solve_tr_into, solve_with,
};

// Re-export direct factorizations
pub use direct::{EquilibratedSolution, LuFactorization, Scaling, equilibrated_solve, lu_solve};
