//! Bundled fixtures: Dynkin types of finite mutation type with their known class
//! sizes, and minimally mutation-infinite examples.

use crate::enumerate::{enumerate_mutation_class, is_mutation_equivalent, ClassSize, EnumerationConfig, EnumerationMode};
use crate::equivalence::EquivalenceContext;
use crate::error::{QuiverError, Result};
use crate::matrix::{parse_exchange_matrix, ExchangeMatrix};
use crate::pipeline::CancelToken;
use std::fmt;
use std::str::FromStr;
use tracing::info;

// ============================================================================
// Dynkin types
// ============================================================================

/// A simply-laced Dynkin diagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DynkinType {
    /// Path on `n >= 1` vertices.
    A(usize),
    /// `n >= 4` vertices: a path with a fork at one end.
    D(usize),
    /// `n` in `6..=8`.
    E(usize),
}

/// Class sizes of a catalogue entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KnownSizes {
    /// Distinct matrices.
    pub exact: u64,
    /// Matrices up to permutation of the vertices.
    pub collapsed: u64,
}

const KNOWN_SIZES: &[(DynkinType, KnownSizes)] = &[
    (DynkinType::A(1), KnownSizes { exact: 1, collapsed: 1 }),
    (DynkinType::A(2), KnownSizes { exact: 2, collapsed: 1 }),
    (DynkinType::A(3), KnownSizes { exact: 14, collapsed: 4 }),
    (DynkinType::A(4), KnownSizes { exact: 144, collapsed: 6 }),
    (DynkinType::A(5), KnownSizes { exact: 1980, collapsed: 19 }),
    (DynkinType::A(6), KnownSizes { exact: 34_320, collapsed: 49 }),
    (DynkinType::D(4), KnownSizes { exact: 50, collapsed: 6 }),
    (DynkinType::D(5), KnownSizes { exact: 2184, collapsed: 26 }),
    (DynkinType::D(6), KnownSizes { exact: 40_320, collapsed: 80 }),
    (DynkinType::E(6), KnownSizes { exact: 42_840, collapsed: 67 }),
];

impl DynkinType {
    /// Number of vertices.
    pub fn rank(self) -> usize {
        match self {
            Self::A(n) | Self::D(n) | Self::E(n) => n,
        }
    }

    /// Returns `true` for an existing diagram.
    pub fn is_valid(self) -> bool {
        match self {
            Self::A(n) => n >= 1,
            Self::D(n) => n >= 4,
            Self::E(n) => (6..=8).contains(&n),
        }
    }

    /// Every diagram with `n` vertices.
    pub fn of_rank(n: usize) -> Vec<Self> {
        [Self::A(n), Self::D(n), Self::E(n)]
            .into_iter()
            .filter(|t| t.is_valid())
            .collect()
    }

    /// Exchange matrix of the diagram with every arrow pointing away from vertex 0.
    ///
    /// The fork of `D(n)` sits at vertex `n - 3`; the branch of `E(n)` at vertex 2.
    ///
    /// # Errors
    /// Returns [`QuiverError::UnknownType`] for an invalid diagram.
    pub fn matrix(self) -> Result<ExchangeMatrix> {
        if !self.is_valid() {
            return Err(QuiverError::UnknownType(self.to_string()));
        }
        let n = self.rank();
        let spine = match self {
            Self::A(_) => n,
            Self::D(_) | Self::E(_) => n - 1,
        };
        let mut m = ExchangeMatrix::zeros(n, n);
        for i in 1..spine {
            m = m.with_arrow(i - 1, i, 1)?;
        }
        match self {
            Self::A(_) => {}
            Self::D(_) => m = m.with_arrow(n - 3, n - 1, 1)?,
            Self::E(_) => m = m.with_arrow(2, n - 1, 1)?,
        }
        Ok(m)
    }

    /// Validated class sizes, if bundled.
    pub fn known_sizes(self) -> Option<KnownSizes> {
        KNOWN_SIZES
            .iter()
            .find(|(t, _)| *t == self)
            .map(|&(_, sizes)| sizes)
    }
}

impl fmt::Display for DynkinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(n) => write!(f, "A{n}"),
            Self::D(n) => write!(f, "D{n}"),
            Self::E(n) => write!(f, "E{n}"),
        }
    }
}

impl FromStr for DynkinType {
    type Err = QuiverError;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || QuiverError::UnknownType(s.to_string());
        let s = s.trim();
        let mut chars = s.chars();
        let family = chars.next().ok_or_else(unknown)?;
        let n: usize = chars.as_str().parse().map_err(|_| unknown())?;
        let t = match family.to_ascii_uppercase() {
            'A' => Self::A(n),
            'D' => Self::D(n),
            'E' => Self::E(n),
            _ => return Err(unknown()),
        };
        if t.is_valid() {
            Ok(t)
        } else {
            Err(unknown())
        }
    }
}

// ============================================================================
// Recognition
// ============================================================================

/// Returns the Dynkin type whose mutation class contains `m`, if any.
///
/// Only connected square matrices can match. Every candidate class is finite,
/// so the search always terminates unless `cancel` fires, in which case the
/// candidates not yet decided are skipped.
///
/// # Errors
/// Propagates [`QuiverError::TooManyMutableVertices`].
pub fn recognize(m: &ExchangeMatrix, ctx: &EquivalenceContext, cancel: &CancelToken) -> Result<Option<DynkinType>> {
    if !m.is_square() || m.is_empty() || m.certifies_infinite() || m.components().len() != 1 {
        return Ok(None);
    }
    for t in DynkinType::of_rank(m.rank()) {
        if is_mutation_equivalent(&t.matrix()?, m, ctx, cancel)? == Some(true) {
            return Ok(Some(t));
        }
    }
    Ok(None)
}

// ============================================================================
// Minimally mutation-infinite fixtures
// ============================================================================

const MINIMALLY_INFINITE: &[(&str, &str)] = &[
    ("acyclic_tournament_4", include_str!("../data/acyclic_tournament_4.txt")),
    ("triple_arrow_path", include_str!("../data/triple_arrow_path.txt")),
];

/// Bundled matrices that are mutation-infinite while every one-vertex deletion
/// is mutation-finite.
///
/// # Errors
/// Returns a parse error if a bundled fixture is malformed.
pub fn minimally_infinite_examples() -> Result<Vec<(&'static str, ExchangeMatrix)>> {
    MINIMALLY_INFINITE
        .iter()
        .map(|&(name, text)| Ok((name, parse_exchange_matrix(text)?)))
        .collect()
}

// ============================================================================
// Validation
// ============================================================================

/// Enumerates every catalogue entry of rank at most `max_rank` in both modes and
/// compares the results with the bundled sizes.
///
/// # Errors
/// Returns [`QuiverError::Validation`] naming the first mismatching entry.
pub fn validate_catalogue(ctx: &EquivalenceContext, max_rank: usize) -> Result<()> {
    let cancel = CancelToken::new();
    for &(t, sizes) in KNOWN_SIZES.iter().filter(|(t, _)| t.rank() <= max_rank) {
        let m = t.matrix()?;
        for (mode, expected) in [
            (EnumerationMode::Exact, sizes.exact),
            (EnumerationMode::UpToEquivalence, sizes.collapsed),
        ] {
            let got = enumerate_mutation_class(&m, &EnumerationConfig::with_mode(mode), ctx, &cancel)?.outcome;
            if got != ClassSize::Finite(expected) {
                return Err(QuiverError::Validation(format!(
                    "{t} ({mode}): expected {expected}, got {got}"
                )));
            }
        }
        info!(%t, exact = sizes.exact, collapsed = sizes.collapsed, "catalogue entry validated");
    }

    for (name, m) in minimally_infinite_examples()? {
        if !m.is_skew_symmetric() {
            return Err(QuiverError::Validation(format!("{name}: not skew-symmetric")));
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
