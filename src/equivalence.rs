//! Equivalence of exchange matrices up to simultaneous row/column permutation.
//!
//! Two matrices are equivalent iff some permutation `P` of the mutable vertices
//! satisfies `P a P^-1 == b`. The check is a brute-force scan over all `n!`
//! permutations, so results are cached twice over:
//!
//! - an [`EquivalenceChecker`] per size `n` holds the precomputed permutations
//!   and a pair cache keyed by the **unordered** pair of matrices;
//! - an [`EquivalenceContext`] holds the checkers themselves, bounded by a total
//!   weight (`n! * n * n` per checker) with least-recently-used eviction and
//!   single-flight construction.
//!
//! Both caches are safe to share between threads; everything else in the crate
//! is owned by a single enumeration run.

use crate::error::{QuiverError, Result};
use crate::matrix::ExchangeMatrix;
use crate::permutation::{Permutation, PermutationSet};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

// ============================================================================
// Configuration
// ============================================================================

/// Cache bounds for the equivalence oracle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquivalenceConfig {
    /// Maximum total weight of cached checkers, where a checker of size `n`
    /// weighs `n! * n * n`.
    pub max_instance_weight: u64,
    /// Maximum number of cached pairs per checker; the pair cache is cleared
    /// when it fills up.
    pub max_cached_pairs: usize,
}

impl Default for EquivalenceConfig {
    fn default() -> Self {
        Self {
            // Two size-8 instances, or any mix of smaller ones.
            max_instance_weight: 40_320 * 64 * 2,
            max_cached_pairs: 1 << 20,
        }
    }
}

// ============================================================================
// Fingerprint
// ============================================================================

/// Permutation-invariant summary of a matrix.
///
/// Equivalent matrices always have equal fingerprints, so unequal fingerprints
/// reject a pair without any permutation search. Collapsed enumeration also
/// buckets its representatives by fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(Box<[i32]>);

const SEPARATOR: i32 = i32::MIN;

impl Fingerprint {
    /// Computes the fingerprint of `m`.
    pub fn of(m: &ExchangeMatrix) -> Self {
        let (rows, cols, n) = (m.rows(), m.cols(), m.rank());

        // One key per mutable vertex: its sorted mutable row, then the fixed-order
        // entries against frozen vertices.
        let mut vertex_keys: Vec<Vec<i32>> = (0..n)
            .map(|i| {
                let mut key: Vec<i32> = m.row(i)[..n].to_vec();
                key.sort_unstable();
                key.extend_from_slice(&m.row(i)[n..]);
                key.extend((n..rows).map(|f| m.get(f, i)));
                key
            })
            .collect();
        vertex_keys.sort_unstable();

        let mut out = Vec::with_capacity(rows * cols + n + rows + 2);
        out.push(rows as i32);
        out.push(cols as i32);
        for key in vertex_keys {
            out.extend(key);
            out.push(SEPARATOR);
        }
        // Frozen rows see the mutable vertices as an unordered multiset.
        for f in n..rows {
            let mut key: Vec<i32> = m.row(f)[..n].to_vec();
            key.sort_unstable();
            out.extend(key);
            out.extend_from_slice(&m.row(f)[n..]);
            out.push(SEPARATOR);
        }
        // Frozen columns likewise.
        for f in n..cols {
            let mut key: Vec<i32> = (0..n).map(|i| m.get(i, f)).collect();
            key.sort_unstable();
            out.extend(key);
            out.push(SEPARATOR);
        }
        Self(out.into_boxed_slice())
    }
}

// ============================================================================
// EquivalenceChecker
// ============================================================================

/// Unordered pair key: `lo <= hi`, and the cached witness maps `lo` onto `hi`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PairKey {
    lo: ExchangeMatrix,
    hi: ExchangeMatrix,
}

/// Hit/miss counters of a checker's pair cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PairCacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that ran a permutation search.
    pub misses: u64,
    /// Pairs currently cached.
    pub entries: usize,
}

/// Equivalence oracle for matrices with `n` mutable vertices.
///
/// Holds all `n!` permutations and caches pairwise results.
#[derive(Debug)]
pub struct EquivalenceChecker {
    perms: PermutationSet,
    pairs: DashMap<PairKey, Option<Permutation>>,
    max_pairs: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EquivalenceChecker {
    /// Precomputes the permutations of `0..n`.
    pub fn new(n: usize, max_pairs: usize) -> Self {
        Self {
            perms: PermutationSet::new(n),
            pairs: DashMap::new(),
            max_pairs: max_pairs.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Number of mutable vertices this checker handles.
    #[inline]
    pub fn degree(&self) -> usize {
        self.perms.degree()
    }

    /// Returns a permutation mapping `a` onto `b`, if one exists.
    ///
    /// The result is cached for the unordered pair: a later query for `(b, a)`
    /// is answered from the same entry with the inverse permutation.
    pub fn witness(&self, a: &ExchangeMatrix, b: &ExchangeMatrix) -> Option<Permutation> {
        if a.rows() != b.rows() || a.cols() != b.cols() || a.rank() != self.degree() {
            return None;
        }
        if a == b {
            return Some(Permutation::identity(self.degree()));
        }
        if Fingerprint::of(a) != Fingerprint::of(b) {
            return None;
        }

        let reversed = a > b;
        let (lo, hi) = if reversed { (b, a) } else { (a, b) };
        let key = PairKey {
            lo: lo.clone(),
            hi: hi.clone(),
        };

        let cached = self.pairs.get(&key).map(|hit| hit.value().clone());
        let found = match cached {
            Some(found) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                found
            }
            None => {
                if self.pairs.len() >= self.max_pairs {
                    debug!(n = self.degree(), entries = self.pairs.len(), "clearing pair cache");
                    self.pairs.clear();
                }
                // The entry guard holds the shard lock, so a missing pair is searched once.
                let entry = self.pairs.entry(key).or_insert_with(|| {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    self.perms.find_witness(lo, hi)
                });
                let found = entry.value().clone();
                drop(entry);
                found
            }
        };

        if reversed {
            found.map(|w| w.inverse())
        } else {
            found
        }
    }

    /// Returns `true` iff `a` and `b` are equal up to permutation.
    pub fn are_equivalent(&self, a: &ExchangeMatrix, b: &ExchangeMatrix) -> bool {
        self.witness(a, b).is_some()
    }

    /// Orbit masks of the mutable vertices under the automorphisms of `m`.
    pub fn automorphism_orbits(&self, m: &ExchangeMatrix) -> Vec<u64> {
        self.perms.automorphism_orbits(m)
    }

    /// Snapshot of the pair cache counters.
    pub fn stats(&self) -> PairCacheStats {
        PairCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.pairs.len(),
        }
    }
}

// ============================================================================
// EquivalenceContext
// ============================================================================

type CheckerCell = Arc<OnceLock<Arc<EquivalenceChecker>>>;

#[derive(Default)]
struct InstanceCache {
    cells: HashMap<usize, CheckerCell>,
    /// Least recently used first.
    order: VecDeque<usize>,
    total_weight: u64,
}

impl InstanceCache {
    fn touch(&mut self, n: usize) {
        if let Some(pos) = self.order.iter().position(|&k| k == n) {
            self.order.remove(pos);
        }
        self.order.push_back(n);
    }
}

/// Process-scoped handle owning the weight-bounded cache of checkers.
///
/// Create one per process (or per test) and share it through an `Arc`.
pub struct EquivalenceContext {
    config: EquivalenceConfig,
    instances: Mutex<InstanceCache>,
}

impl Default for EquivalenceContext {
    fn default() -> Self {
        Self::new(EquivalenceConfig::default())
    }
}

impl std::fmt::Debug for EquivalenceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EquivalenceContext")
            .field("config", &self.config)
            .field("cached_sizes", &self.cached_sizes())
            .finish()
    }
}

impl EquivalenceContext {
    /// Creates an empty context.
    pub fn new(config: EquivalenceConfig) -> Self {
        Self {
            config,
            instances: Mutex::new(InstanceCache::default()),
        }
    }

    /// Creates an empty context behind an `Arc`.
    pub fn shared(config: EquivalenceConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    /// Cache configuration.
    pub fn config(&self) -> &EquivalenceConfig {
        &self.config
    }

    /// Returns the checker for size `n`, building it on first use.
    ///
    /// Concurrent callers asking for the same missing size wait for a single
    /// construction.
    ///
    /// # Errors
    /// Returns [`QuiverError::PermutationSetTooLarge`] if the checker's weight
    /// exceeds [`EquivalenceConfig::max_instance_weight`].
    pub fn checker(&self, n: usize) -> Result<Arc<EquivalenceChecker>> {
        let limit = self.config.max_instance_weight;
        let weight = match PermutationSet::weight(n) {
            Some(w) if w <= limit => w,
            other => {
                return Err(QuiverError::PermutationSetTooLarge {
                    n,
                    weight: other.unwrap_or(u64::MAX),
                    limit,
                })
            }
        };

        let cell = {
            let mut cache = self.instances.lock();
            let cell = if let Some(cell) = cache.cells.get(&n) {
                Arc::clone(cell)
            } else {
                let cell = CheckerCell::default();
                cache.cells.insert(n, Arc::clone(&cell));
                cache.total_weight += weight;
                cell
            };
            cache.touch(n);
            while cache.total_weight > limit && cache.order.len() > 1 {
                let Some(victim) = cache.order.pop_front() else { break };
                if cache.cells.remove(&victim).is_some() {
                    cache.total_weight -= PermutationSet::weight(victim).unwrap_or(0);
                    debug!(n = victim, "evicted equivalence checker");
                }
            }
            cell
        };

        let checker = cell.get_or_init(|| {
            debug!(n, weight, "building equivalence checker");
            Arc::new(EquivalenceChecker::new(n, self.config.max_cached_pairs))
        });
        Ok(Arc::clone(checker))
    }

    /// Returns a permutation mapping `a` onto `b`, if one exists.
    ///
    /// # Errors
    /// Propagates checker construction failures; see [`EquivalenceContext::checker`].
    pub fn witness(&self, a: &ExchangeMatrix, b: &ExchangeMatrix) -> Result<Option<Permutation>> {
        if a.rows() != b.rows() || a.cols() != b.cols() {
            return Ok(None);
        }
        Ok(self.checker(a.rank())?.witness(a, b))
    }

    /// Returns `true` iff `a` and `b` are equal up to simultaneous row/column
    /// permutation of the mutable vertices.
    ///
    /// # Errors
    /// Propagates checker construction failures; see [`EquivalenceContext::checker`].
    pub fn are_equivalent(&self, a: &ExchangeMatrix, b: &ExchangeMatrix) -> Result<bool> {
        Ok(self.witness(a, b)?.is_some())
    }

    /// Orbit masks of the mutable vertices under the automorphisms of `m`.
    ///
    /// # Errors
    /// Propagates checker construction failures; see [`EquivalenceContext::checker`].
    pub fn automorphism_orbits(&self, m: &ExchangeMatrix) -> Result<Vec<u64>> {
        Ok(self.checker(m.rank())?.automorphism_orbits(m))
    }

    /// Sizes whose checkers are currently cached, least recently used first.
    pub fn cached_sizes(&self) -> Vec<usize> {
        self.instances.lock().order.iter().copied().collect()
    }

    /// Total weight of the cached checkers.
    pub fn total_weight(&self) -> u64 {
        self.instances.lock().total_weight
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permutation::relabel;
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;
    use std::thread;

    fn a3() -> ExchangeMatrix {
        ExchangeMatrix::from_rows(&[[0, 1, 0], [-1, 0, 1], [0, -1, 0]]).unwrap()
    }

    fn random_skew<R: Rng>(rng: &mut R, n: usize) -> ExchangeMatrix {
        let mut m = ExchangeMatrix::zeros(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                m = m.with_arrow(i, j, rng.random_range(-2..=2)).unwrap();
            }
        }
        m
    }

    fn random_perm<R: Rng>(rng: &mut R, n: usize) -> Permutation {
        let mut images: Vec<usize> = (0..n).collect();
        for i in (1..n).rev() {
            images.swap(i, rng.random_range(0..=i));
        }
        Permutation::from_images(images)
    }

    #[test]
    fn equivalence_is_reflexive() {
        let ctx = EquivalenceContext::default();
        let mut rng = XorShiftRng::seed_from_u64(7);
        for n in 0..6 {
            let m = random_skew(&mut rng, n);
            assert!(ctx.are_equivalent(&m, &m).unwrap());
        }
    }

    #[test]
    fn relabelled_matrices_are_equivalent_both_ways() {
        let ctx = EquivalenceContext::default();
        let mut rng = XorShiftRng::seed_from_u64(0xABCD);
        for _ in 0..50 {
            let n = rng.random_range(1..=6);
            let m = random_skew(&mut rng, n);
            let r = relabel(&m, &random_perm(&mut rng, n));
            let w = ctx.witness(&m, &r).unwrap().expect("forward witness");
            assert_eq!(relabel(&m, &w), r);
            let back = ctx.witness(&r, &m).unwrap().expect("cached reverse witness");
            assert_eq!(relabel(&r, &back), m);
        }
    }

    #[test]
    fn symmetry_holds_with_and_without_cache() {
        let ctx = EquivalenceContext::default();
        let mut rng = XorShiftRng::seed_from_u64(99);
        for _ in 0..200 {
            let a = random_skew(&mut rng, 4);
            let b = random_skew(&mut rng, 4);
            let ab = ctx.are_equivalent(&a, &b).unwrap();
            let ba = ctx.are_equivalent(&b, &a).unwrap();
            let ab_again = ctx.are_equivalent(&a, &b).unwrap();
            assert_eq!(ab, ba);
            assert_eq!(ab, ab_again);
            assert_eq!(ab, crate::permutation::direct_witness(&a, &b).is_some());
        }
    }

    #[test]
    fn pair_cache_answers_reversed_query() {
        let ctx = EquivalenceContext::default();
        let a = a3();
        let b = relabel(&a, &Permutation::from_images(vec![1, 2, 0]));
        assert!(ctx.are_equivalent(&a, &b).unwrap());
        let checker = ctx.checker(3).unwrap();
        let before = checker.stats();
        assert_eq!(before.misses, 1);
        assert!(ctx.are_equivalent(&b, &a).unwrap());
        let after = checker.stats();
        assert_eq!(after.misses, 1);
        assert_eq!(after.hits, before.hits + 1);
        assert_eq!(after.entries, 1);
    }

    #[test]
    fn different_orientations_are_not_equivalent() {
        let ctx = EquivalenceContext::default();
        assert!(!ctx.are_equivalent(&a3(), &a3().mutate(1)).unwrap());
        let wide = ExchangeMatrix::zeros(3, 4);
        assert!(!ctx.are_equivalent(&a3(), &wide).unwrap());
    }

    #[test]
    fn empty_matrices_are_equivalent() {
        let ctx = EquivalenceContext::default();
        let e = ExchangeMatrix::zeros(0, 0);
        assert!(ctx.are_equivalent(&e, &e.clone()).unwrap());
    }

    #[test]
    fn fingerprint_is_permutation_invariant() {
        let mut rng = XorShiftRng::seed_from_u64(3);
        for _ in 0..50 {
            let m = random_skew(&mut rng, 5);
            let r = relabel(&m, &random_perm(&mut rng, 5));
            assert_eq!(Fingerprint::of(&m), Fingerprint::of(&r));
        }
        assert_ne!(Fingerprint::of(&a3()), Fingerprint::of(&a3().mutate(1)));
    }

    #[test]
    fn oversized_checker_is_rejected() {
        let ctx = EquivalenceContext::new(EquivalenceConfig {
            max_instance_weight: 6 * 9,
            max_cached_pairs: 16,
        });
        assert!(ctx.checker(3).is_ok());
        let err = ctx.checker(4).unwrap_err();
        assert_eq!(
            err,
            QuiverError::PermutationSetTooLarge { n: 4, weight: 24 * 16, limit: 54 }
        );
        let m = random_skew(&mut XorShiftRng::seed_from_u64(1), 4);
        assert!(ctx.are_equivalent(&m, &m).is_err());
    }

    #[test]
    fn instance_cache_evicts_least_recently_used() {
        // Weights: n=2 -> 8, n=3 -> 54, n=4 -> 384. All three do not fit in 440.
        let ctx = EquivalenceContext::new(EquivalenceConfig {
            max_instance_weight: 440,
            max_cached_pairs: 16,
        });
        ctx.checker(3).unwrap();
        ctx.checker(2).unwrap();
        assert_eq!(ctx.cached_sizes(), vec![3, 2]);
        assert_eq!(ctx.total_weight(), 54 + 8);
        ctx.checker(3).unwrap();
        assert_eq!(ctx.cached_sizes(), vec![2, 3]);
        // Adding size 4 pushes out size 2, the least recently used.
        ctx.checker(4).unwrap();
        assert_eq!(ctx.cached_sizes(), vec![3, 4]);
        assert_eq!(ctx.total_weight(), 54 + 384);
    }

    #[test]
    fn pair_cache_is_cleared_when_full() {
        let ctx = EquivalenceContext::new(EquivalenceConfig {
            max_instance_weight: 1_000,
            max_cached_pairs: 2,
        });
        let base = a3();
        let checker = ctx.checker(3).unwrap();
        for images in [vec![1, 0, 2], vec![2, 1, 0], vec![0, 2, 1]] {
            let other = relabel(&base, &Permutation::from_images(images));
            if other != base {
                checker.witness(&base, &other);
            }
        }
        assert!(checker.stats().entries <= 2);
    }

    #[test]
    fn checker_is_built_once_under_contention() {
        let ctx = Arc::new(EquivalenceContext::default());
        let checkers: Vec<Arc<EquivalenceChecker>> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let ctx = Arc::clone(&ctx);
                    s.spawn(move || ctx.checker(6).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for c in &checkers[1..] {
            assert!(Arc::ptr_eq(&checkers[0], c));
        }
        assert_eq!(ctx.cached_sizes(), vec![6]);
    }

    #[test]
    fn automorphism_orbits_via_context() {
        let ctx = EquivalenceContext::default();
        let cycle = a3().mutate(1);
        assert_eq!(ctx.automorphism_orbits(&cycle).unwrap(), vec![0b111; 3]);
    }

    proptest! {
        #[test]
        fn equivalence_is_symmetric(seed in any::<u64>(), n in 1usize..5) {
            let ctx = EquivalenceContext::default();
            let mut rng = XorShiftRng::seed_from_u64(seed);
            let a = random_skew(&mut rng, n);
            let b = random_skew(&mut rng, n);
            prop_assert_eq!(
                ctx.are_equivalent(&a, &b).unwrap(),
                ctx.are_equivalent(&b, &a).unwrap()
            );
        }
    }
}
