//! Vertex permutations and brute-force witness search.
//!
//! A *witness* that `a` and `b` are equivalent is a permutation `s` of the
//! mutable vertices with `b[s(i)][s(j)] == a[i][j]` for every entry, frozen
//! indices mapping to themselves. Equivalently `P a P^-1 == b` for the
//! permutation matrix `P` of `s`.

use crate::matrix::ExchangeMatrix;

// ============================================================================
// Permutation
// ============================================================================

/// A permutation of `0..n`, stored as its image table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Permutation(Box<[usize]>);

impl Permutation {
    /// The identity on `0..n`.
    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    /// Builds a permutation from an image table.
    ///
    /// # Panics
    /// Panics if `images` is not a permutation of `0..images.len()`.
    pub fn from_images(images: Vec<usize>) -> Self {
        let mut seen = vec![false; images.len()];
        for &v in &images {
            assert!(v < images.len() && !seen[v], "not a permutation: {images:?}");
            seen[v] = true;
        }
        Self(images.into_boxed_slice())
    }

    /// Number of permuted points.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the permutation of the empty set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Image of `i`; points beyond the permuted range map to themselves.
    #[inline(always)]
    pub fn apply(&self, i: usize) -> usize {
        self.0.get(i).copied().unwrap_or(i)
    }

    /// Image table.
    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// The inverse permutation.
    pub fn inverse(&self) -> Self {
        let mut inv = vec![0; self.len()];
        for (i, &s) in self.0.iter().enumerate() {
            inv[s] = i;
        }
        Self(inv.into_boxed_slice())
    }

    /// `self` after `other`: `i -> self(other(i))`.
    pub fn compose(&self, other: &Self) -> Self {
        debug_assert_eq!(self.len(), other.len());
        Self(other.0.iter().map(|&i| self.0[i]).collect())
    }
}

// ============================================================================
// PermutationSet
// ============================================================================

/// All `n!` permutations of `0..n`, in lexicographic order (identity first).
///
/// Stored as one flat table so that a brute-force scan stays cache friendly.
#[derive(Clone, Debug)]
pub struct PermutationSet {
    n: usize,
    table: Vec<usize>,
}

impl PermutationSet {
    /// Precomputes every permutation of `0..n`.
    ///
    /// Callers should bound `n` first: see [`PermutationSet::weight`].
    pub fn new(n: usize) -> Self {
        let count = factorial(n).unwrap_or(u64::MAX) as usize;
        let mut table = Vec::with_capacity(count.saturating_mul(n));
        for perm in Permutations::new(n) {
            table.extend_from_slice(&perm);
        }
        Self { n, table }
    }

    /// Number of points permuted.
    #[inline]
    pub fn degree(&self) -> usize {
        self.n
    }

    /// Number of permutations held (`n!`).
    #[inline]
    pub fn len(&self) -> usize {
        if self.n == 0 {
            1
        } else {
            self.table.len() / self.n
        }
    }

    /// Always `false`: even `n = 0` has the empty permutation.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates over the image tables.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> + '_ {
        let n = self.n;
        let empty: &[usize] = &[];
        let count = self.len();
        (0..count).map(move |p| if n == 0 { empty } else { &self.table[p * n..(p + 1) * n] })
    }

    /// Cache weight of an instance of size `n`: permutation count times matrix
    /// cells, `n! * n * n`. `None` on overflow.
    pub fn weight(n: usize) -> Option<u64> {
        let cells = (n as u64).checked_mul(n as u64)?;
        factorial(n)?.checked_mul(cells)
    }

    /// First permutation in the set that maps `a` onto `b`.
    pub fn find_witness(&self, a: &ExchangeMatrix, b: &ExchangeMatrix) -> Option<Permutation> {
        if !same_shape(a, b) || a.rank() != self.n {
            return None;
        }
        self.iter()
            .find(|perm| maps_to(a, b, perm))
            .map(|perm| Permutation(perm.into()))
    }

    /// Orbit masks of the mutable vertices under the automorphism group of `m`.
    pub fn automorphism_orbits(&self, m: &ExchangeMatrix) -> Vec<u64> {
        debug_assert_eq!(m.rank(), self.n);
        let mut orbits: Vec<u64> = (0..self.n).map(|k| 1u64 << k).collect();
        for perm in self.iter().filter(|perm| maps_to(m, m, perm)) {
            accumulate_orbits(&mut orbits, perm);
        }
        orbits
    }
}

// ============================================================================
// Lazy enumeration
// ============================================================================

/// Lazy lexicographic enumeration of the permutations of `0..n`.
///
/// Used directly when a [`PermutationSet`] would be too large to cache.
#[derive(Clone, Debug)]
pub struct Permutations {
    current: Option<Vec<usize>>,
}

impl Permutations {
    /// Starts at the identity.
    pub fn new(n: usize) -> Self {
        Self {
            current: Some((0..n).collect()),
        }
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let out = self.current.take()?;
        let mut next = out.clone();
        if next_permutation(&mut next) {
            self.current = Some(next);
        }
        Some(out)
    }
}

/// Advances `perm` to the next permutation in lexicographic order.
/// Returns `false` (leaving `perm` untouched) when it is already the last one.
fn next_permutation(perm: &mut [usize]) -> bool {
    let len = perm.len();
    if len < 2 {
        return false;
    }
    let Some(i) = (0..len - 1).rev().find(|&i| perm[i] < perm[i + 1]) else {
        return false;
    };
    let j = (i + 1..len).rev().find(|&j| perm[j] > perm[i]).unwrap_or(i + 1);
    perm.swap(i, j);
    perm[i + 1..].reverse();
    true
}

// ============================================================================
// Witness checks
// ============================================================================

#[inline]
fn same_shape(a: &ExchangeMatrix, b: &ExchangeMatrix) -> bool {
    a.rows() == b.rows() && a.cols() == b.cols()
}

/// Returns `true` if `perm` maps `a` onto `b`, i.e. `b[s(i)][s(j)] == a[i][j]`.
///
/// Indices at or beyond `perm.len()` (frozen vertices) map to themselves.
#[inline]
pub fn maps_to(a: &ExchangeMatrix, b: &ExchangeMatrix, perm: &[usize]) -> bool {
    let image = |x: usize| if x < perm.len() { perm[x] } else { x };
    for i in 0..a.rows() {
        let row = a.row(i);
        let target = b.row(image(i));
        for (j, &value) in row.iter().enumerate() {
            if target[image(j)] != value {
                return false;
            }
        }
    }
    true
}

/// Relabels the mutable vertices of `m` by `perm`: the result `b` satisfies
/// `b[s(i)][s(j)] == m[i][j]`.
pub fn relabel(m: &ExchangeMatrix, perm: &Permutation) -> ExchangeMatrix {
    debug_assert_eq!(perm.len(), m.rank());
    let (rows, cols) = (m.rows(), m.cols());
    let mut entries = vec![0; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            entries[perm.apply(i) * cols + perm.apply(j)] = m.get(i, j);
        }
    }
    // Dimensions are unchanged, so construction cannot fail.
    ExchangeMatrix::new(rows, cols, entries).unwrap_or_else(|_| m.clone())
}

/// Brute-force witness search without any precomputed set.
///
/// Empty matrices are trivially equivalent.
pub fn direct_witness(a: &ExchangeMatrix, b: &ExchangeMatrix) -> Option<Permutation> {
    if !same_shape(a, b) {
        return None;
    }
    Permutations::new(a.rank())
        .find(|perm| maps_to(a, b, perm))
        .map(Permutation::from_images)
}

/// Automorphism orbits computed without a precomputed set.
pub fn direct_automorphism_orbits(m: &ExchangeMatrix) -> Vec<u64> {
    let n = m.rank();
    let mut orbits: Vec<u64> = (0..n).map(|k| 1u64 << k).collect();
    for perm in Permutations::new(n).filter(|perm| maps_to(m, m, perm)) {
        accumulate_orbits(&mut orbits, &perm);
    }
    orbits
}

fn accumulate_orbits(orbits: &mut [u64], perm: &[usize]) {
    // Each automorphism joins k with s(k); closing under the group is unnecessary
    // because the set of automorphisms is itself closed under composition.
    for (k, &s) in perm.iter().enumerate() {
        orbits[k] |= 1u64 << s;
    }
}

/// `n!`, or `None` on overflow.
pub fn factorial(n: usize) -> Option<u64> {
    (1..=n as u64).try_fold(1u64, u64::checked_mul)
}

// ============================================================================
// Tests
// ============================================================================
