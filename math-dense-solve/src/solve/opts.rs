//! Solve options
//!
//! A [`SolveOpts`] is a plain set of [`SolveOpt`] values. Building one never
//! fails; whether a combination makes sense for a given system is only
//! checked when the dispatcher calls [`SolveOpts::resolve`].

use crate::error::SolveError;
use crate::matrix::Triangle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A single solve option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveOpt {
    /// A is Hermitian, only the upper triangle is read
    SymmetricUpper,
    /// A is Hermitian, only the lower triangle is read
    SymmetricLower,
    /// A is Hermitian positive definite
    #[serde(rename = "sympd")]
    SymmetricPositiveDefinite,
    /// A is upper triangular
    TriangularUpper,
    /// A is lower triangular
    TriangularLower,
    /// Scale rows/columns before factorizing
    Equilibrate,
    /// Iteratively refine the solution
    Refine,
    /// Go straight to the pseudo-inverse
    AllowRankDeficient,
    /// Permit the approximate fallback (the default)
    AllowFallback,
    /// Forbid the approximate fallback
    NoFallback,
}

impl SolveOpt {
    fn name(self) -> &'static str {
        match self {
            SolveOpt::SymmetricUpper => "symmetric_upper",
            SolveOpt::SymmetricLower => "symmetric_lower",
            SolveOpt::SymmetricPositiveDefinite => "sympd",
            SolveOpt::TriangularUpper => "triangular_upper",
            SolveOpt::TriangularLower => "triangular_lower",
            SolveOpt::Equilibrate => "equilibrate",
            SolveOpt::Refine => "refine",
            SolveOpt::AllowRankDeficient => "allow_rank_deficient",
            SolveOpt::AllowFallback => "allow_fallback",
            SolveOpt::NoFallback => "no_fallback",
        }
    }

    /// Options that describe the shape of A rather than how to solve.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            SolveOpt::SymmetricUpper
                | SolveOpt::SymmetricLower
                | SolveOpt::SymmetricPositiveDefinite
                | SolveOpt::TriangularUpper
                | SolveOpt::TriangularLower
        )
    }
}

impl fmt::Display for SolveOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of solve options. The empty set means a general solve with the
/// approximate fallback allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolveOpts {
    opts: BTreeSet<SolveOpt>,
}

impl SolveOpts {
    /// The default (empty) option set.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, opt: SolveOpt) -> bool {
        self.opts.contains(&opt)
    }

    pub fn is_empty(&self) -> bool {
        self.opts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SolveOpt> + '_ {
        self.opts.iter().copied()
    }

    pub fn insert(&mut self, opt: SolveOpt) {
        self.opts.insert(opt);
    }

    pub fn equilibrate(&self) -> bool {
        self.contains(SolveOpt::Equilibrate)
    }

    pub fn refine(&self) -> bool {
        self.contains(SolveOpt::Refine)
    }

    pub fn allow_rank_deficient(&self) -> bool {
        self.contains(SolveOpt::AllowRankDeficient)
    }

    /// True unless [`SolveOpt::NoFallback`] is present.
    pub fn allow_fallback(&self) -> bool {
        !self.contains(SolveOpt::NoFallback)
    }

    /// Validate the set against an `rows`×`cols` system.
    pub fn resolve(&self, rows: usize, cols: usize) -> Result<ResolvedOpts, SolveError> {
        let triangle_flags: Vec<SolveOpt> = self
            .iter()
            .filter(|o| o.is_structural() && *o != SolveOpt::SymmetricPositiveDefinite)
            .collect();
        if triangle_flags.len() > 1 {
            return Err(SolveError::InvalidOptions(format!(
                "conflicting structural options: {}",
                join(&triangle_flags)
            )));
        }

        let sympd = self.contains(SolveOpt::SymmetricPositiveDefinite);
        let structure = match (sympd, triangle_flags.first()) {
            (true, None) | (true, Some(SolveOpt::SymmetricLower)) => {
                Structure::SymmetricPositiveDefinite(Triangle::Lower)
            }
            (true, Some(SolveOpt::SymmetricUpper)) => {
                Structure::SymmetricPositiveDefinite(Triangle::Upper)
            }
            (true, Some(other)) => {
                return Err(SolveError::InvalidOptions(format!(
                    "sympd cannot be combined with {other}"
                )));
            }
            (false, None) => Structure::General,
            (false, Some(SolveOpt::SymmetricUpper)) => Structure::SymmetricUpper,
            (false, Some(SolveOpt::SymmetricLower)) => Structure::SymmetricLower,
            (false, Some(SolveOpt::TriangularUpper)) => Structure::TriangularUpper,
            (false, Some(SolveOpt::TriangularLower)) => Structure::TriangularLower,
            (false, Some(other)) => {
                return Err(SolveError::InvalidOptions(format!(
                    "{other} is not a structural option"
                )));
            }
        };

        if self.contains(SolveOpt::AllowFallback) && self.contains(SolveOpt::NoFallback) {
            return Err(SolveError::InvalidOptions(
                "allow_fallback and no_fallback are mutually exclusive".to_string(),
            ));
        }

        if rows != cols {
            if structure != Structure::General {
                return Err(SolveError::InvalidOptions(format!(
                    "structural options require a square system (got {rows}x{cols})"
                )));
            }
            if self.equilibrate() || self.refine() {
                return Err(SolveError::InvalidOptions(format!(
                    "equilibrate/refine require a square system (got {rows}x{cols})"
                )));
            }
        }

        Ok(ResolvedOpts {
            structure,
            equilibrate: self.equilibrate(),
            refine: self.refine(),
            allow_rank_deficient: self.allow_rank_deficient(),
            allow_fallback: self.allow_fallback(),
        })
    }
}

fn join(opts: &[SolveOpt]) -> String {
    opts.iter()
        .map(|o| o.name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for SolveOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&join(&self.iter().collect::<Vec<_>>()))
        }
    }
}

impl From<SolveOpt> for SolveOpts {
    fn from(opt: SolveOpt) -> Self {
        let mut opts = Self::default();
        opts.insert(opt);
        opts
    }
}

impl FromIterator<SolveOpt> for SolveOpts {
    fn from_iter<I: IntoIterator<Item = SolveOpt>>(iter: I) -> Self {
        Self {
            opts: iter.into_iter().collect(),
        }
    }
}

/// Legacy "slow" flag: accepted for compatibility, always the default set.
impl From<bool> for SolveOpts {
    fn from(_slow: bool) -> Self {
        Self::default()
    }
}

/// Legacy method string: accepted for compatibility, always the default set.
impl From<&str> for SolveOpts {
    fn from(_method: &str) -> Self {
        Self::default()
    }
}

impl BitOr for SolveOpt {
    type Output = SolveOpts;

    fn bitor(self, rhs: SolveOpt) -> SolveOpts {
        SolveOpts::from(self) | rhs
    }
}

impl BitOr<SolveOpt> for SolveOpts {
    type Output = SolveOpts;

    fn bitor(mut self, rhs: SolveOpt) -> SolveOpts {
        self.insert(rhs);
        self
    }
}

impl BitOr for SolveOpts {
    type Output = SolveOpts;

    fn bitor(mut self, rhs: SolveOpts) -> SolveOpts {
        self.opts.extend(rhs.opts);
        self
    }
}

impl BitOrAssign<SolveOpt> for SolveOpts {
    fn bitor_assign(&mut self, rhs: SolveOpt) {
        self.insert(rhs);
    }
}

/// Structure asserted by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Structure {
    General,
    SymmetricUpper,
    SymmetricLower,
    /// Cholesky reads the given triangle
    SymmetricPositiveDefinite(Triangle),
    TriangularUpper,
    TriangularLower,
}

impl Structure {
    /// Triangle of A that carries the data, if any.
    pub fn triangle(self) -> Option<Triangle> {
        match self {
            Structure::General => None,
            Structure::SymmetricUpper | Structure::TriangularUpper => Some(Triangle::Upper),
            Structure::SymmetricLower | Structure::TriangularLower => Some(Triangle::Lower),
            Structure::SymmetricPositiveDefinite(t) => Some(t),
        }
    }

    pub fn is_symmetric(self) -> bool {
        matches!(
            self,
            Structure::SymmetricUpper
                | Structure::SymmetricLower
                | Structure::SymmetricPositiveDefinite(_)
        )
    }

    pub fn is_triangular(self) -> bool {
        matches!(self, Structure::TriangularUpper | Structure::TriangularLower)
    }
}

/// Validated options, ready for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOpts {
    pub structure: Structure,
    pub equilibrate: bool,
    pub refine: bool,
    pub allow_rank_deficient: bool,
    pub allow_fallback: bool,
}

impl ResolvedOpts {
    /// Equilibrate or refine requested.
    pub fn extended(&self) -> bool {
        self.equilibrate || self.refine
    }
}

/// Classification of a linear system, derived at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemKind {
    SquareGeneral,
    SquareSymmetric,
    SquareSymmetricPositiveDefinite,
    SquareTriangular,
    OverDetermined,
    UnderDetermined,
}

impl SystemKind {
    pub fn classify(rows: usize, cols: usize, structure: Structure) -> Self {
        use std::cmp::Ordering;
        match rows.cmp(&cols) {
            Ordering::Greater => SystemKind::OverDetermined,
            Ordering::Less => SystemKind::UnderDetermined,
            Ordering::Equal => match structure {
                Structure::General => SystemKind::SquareGeneral,
                Structure::SymmetricUpper | Structure::SymmetricLower => {
                    SystemKind::SquareSymmetric
                }
                Structure::SymmetricPositiveDefinite(_) => {
                    SystemKind::SquareSymmetricPositiveDefinite
                }
                Structure::TriangularUpper | Structure::TriangularLower => {
                    SystemKind::SquareTriangular
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_general_with_fallback() {
        let r = SolveOpts::default().resolve(3, 3).unwrap();
        assert_eq!(r.structure, Structure::General);
        assert!(r.allow_fallback);
        assert!(!r.extended());
        assert!(!r.allow_rank_deficient);
    }

    #[test]
    fn test_union() {
        let opts = SolveOpt::Equilibrate | SolveOpt::Refine | SolveOpt::NoFallback;
        assert!(opts.equilibrate());
        assert!(opts.refine());
        assert!(!opts.allow_fallback());

        let mut more = SolveOpts::from(SolveOpt::TriangularLower);
        more |= SolveOpt::TriangularLower;
        let both = more | opts;
        assert_eq!(both.iter().count(), 4);
    }

    #[test]
    fn test_construction_never_fails() {
        // Invalid combination is only reported on resolve
        let opts = SolveOpt::TriangularUpper | SolveOpt::SymmetricLower;
        assert!(matches!(
            opts.resolve(2, 2),
            Err(SolveError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_sympd_selects_triangle() {
        let lower = SolveOpts::from(SolveOpt::SymmetricPositiveDefinite).resolve(2, 2);
        assert_eq!(
            lower.unwrap().structure,
            Structure::SymmetricPositiveDefinite(Triangle::Lower)
        );
        let upper = (SolveOpt::SymmetricPositiveDefinite | SolveOpt::SymmetricUpper).resolve(2, 2);
        assert_eq!(
            upper.unwrap().structure,
            Structure::SymmetricPositiveDefinite(Triangle::Upper)
        );
        let bad = SolveOpt::SymmetricPositiveDefinite | SolveOpt::TriangularLower;
        assert!(bad.resolve(2, 2).is_err());
    }

    #[test]
    fn test_shape_rules() {
        assert!(SolveOpts::from(SolveOpt::TriangularUpper).resolve(3, 2).is_err());
        assert!(SolveOpts::from(SolveOpt::Refine).resolve(2, 3).is_err());
        assert!(SolveOpts::from(SolveOpt::AllowRankDeficient).resolve(2, 3).is_ok());
        assert!(SolveOpts::from(SolveOpt::NoFallback).resolve(4, 3).is_ok());
    }

    #[test]
    fn test_fallback_conflict() {
        let opts = SolveOpt::AllowFallback | SolveOpt::NoFallback;
        assert!(opts.resolve(1, 1).is_err());
    }

    #[test]
    fn test_legacy_arguments_map_to_default() {
        assert_eq!(SolveOpts::from(true), SolveOpts::default());
        assert_eq!(SolveOpts::from(false), SolveOpts::default());
        assert_eq!(SolveOpts::from("std"), SolveOpts::default());
    }

    #[test]
    fn test_serde_names() {
        let opts = SolveOpt::SymmetricPositiveDefinite | SolveOpt::NoFallback;
        let json = serde_json::to_string(&opts).unwrap();
        assert_eq!(json, r#"["sympd","no_fallback"]"#);
        let back: SolveOpts = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            SystemKind::classify(4, 2, Structure::General),
            SystemKind::OverDetermined
        );
        assert_eq!(
            SystemKind::classify(2, 4, Structure::General),
            SystemKind::UnderDetermined
        );
        assert_eq!(
            SystemKind::classify(3, 3, Structure::TriangularLower),
            SystemKind::SquareTriangular
        );
    }
}
