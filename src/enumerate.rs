//! Breadth-first exploration of mutation classes.
//!
//! The mutation graph is walked from a seed with a FIFO frontier. Every visited
//! matrix carries a [`LinkRecord`] marking which of its mutation edges have been
//! explored from either end; once all of them are, the matrix can never be
//! reached again through an unexplored edge and is evicted. Memory therefore
//! tracks the width of the frontier, not the size of the class.
//!
//! Two variants share the walk: [`EnumerationMode::Exact`] keys visited matrices
//! by raw equality, [`EnumerationMode::UpToEquivalence`] collapses matrices that
//! differ by a relabelling of the mutable vertices.

use crate::equivalence::{EquivalenceChecker, EquivalenceContext, Fingerprint};
use crate::error::{QuiverError, Result};
use crate::link::{LinkRecord, MAX_LINKS};
use crate::matrix::ExchangeMatrix;
use crate::permutation::{self, Permutation};
use crate::pipeline::CancelToken;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Identity used for visited matrices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EnumerationMode {
    /// Distinct raw matrices.
    #[default]
    Exact,
    /// Classes of matrices equal up to permutation of the mutable vertices.
    UpToEquivalence,
}

impl fmt::Display for EnumerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::UpToEquivalence => f.write_str("up-to-equivalence"),
        }
    }
}

/// Enumeration parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumerationConfig {
    /// Visited-set identity.
    pub mode: EnumerationMode,
    /// Stop with [`ClassSize::Infinite`] at the first discovered matrix passing
    /// [`ExchangeMatrix::certifies_infinite`].
    pub stop_on_certificate: bool,
    /// Explored edges between two checks of the cancel token.
    pub cancel_poll_every: u64,
    /// Discovered matrices between two progress log lines; `0` disables them.
    pub progress_every: u64,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            mode: EnumerationMode::Exact,
            stop_on_certificate: false,
            cancel_poll_every: 256,
            progress_every: 100_000,
        }
    }
}

impl EnumerationConfig {
    /// Default configuration in `mode`.
    pub fn with_mode(mode: EnumerationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Enables [`EnumerationConfig::stop_on_certificate`].
    pub fn stopping_on_certificate(mut self) -> Self {
        self.stop_on_certificate = true;
        self
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of an enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassSize {
    /// The class was exhausted; the value counts matrices or classes.
    Finite(u64),
    /// A discovered matrix certified an infinite class, or an entry overflowed.
    Infinite,
    /// The cancel token fired before an answer was reached.
    Cancelled,
}

impl ClassSize {
    /// The size, if the class was exhausted.
    pub fn finite(&self) -> Option<u64> {
        match *self {
            Self::Finite(n) => Some(n),
            _ => None,
        }
    }

    /// `Some(true)` for finite, `Some(false)` for infinite, `None` if cancelled.
    pub fn is_finite(&self) -> Option<bool> {
        match self {
            Self::Finite(_) => Some(true),
            Self::Infinite => Some(false),
            Self::Cancelled => None,
        }
    }
}

impl fmt::Display for ClassSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(n) => write!(f, "{n}"),
            Self::Infinite => f.write_str("infinite"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Counters collected during a walk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnumerationStats {
    /// Matrices (or classes) discovered, seed included.
    pub discovered: u64,
    /// Mutation edges explored; each edge is explored once from one end.
    pub explored_edges: u64,
    /// Records evicted after completion.
    pub evicted: u64,
    /// Largest number of simultaneously stored records.
    pub peak_visited: usize,
    /// Largest frontier length.
    pub peak_frontier: usize,
    /// Wall-clock time of the walk.
    pub elapsed: Duration,
}

/// Result of [`enumerate_mutation_class`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enumeration {
    /// Size of the class, or why none was determined.
    pub outcome: ClassSize,
    /// Walk counters.
    pub stats: EnumerationStats,
}

// ============================================================================
// Equivalence oracle
// ============================================================================

/// Cached checker when the permutation set fits the context's weight limit,
/// lazily enumerated permutations otherwise.
#[derive(Clone)]
enum Oracle {
    Cached(Arc<EquivalenceChecker>),
    Direct,
}

impl Oracle {
    fn for_rank(ctx: &EquivalenceContext, n: usize) -> Result<Self> {
        match ctx.checker(n) {
            Ok(checker) => Ok(Self::Cached(checker)),
            Err(QuiverError::PermutationSetTooLarge { n, weight, limit }) => {
                warn!(n, weight, limit, "permutation set too large to cache, using direct search");
                Ok(Self::Direct)
            }
            Err(e) => Err(e),
        }
    }

    fn witness(&self, a: &ExchangeMatrix, b: &ExchangeMatrix) -> Option<Permutation> {
        match self {
            Self::Cached(checker) => checker.witness(a, b),
            Self::Direct => permutation::direct_witness(a, b),
        }
    }

    fn orbits(&self, m: &ExchangeMatrix) -> Vec<u64> {
        match self {
            Self::Cached(checker) => checker.automorphism_orbits(m),
            Self::Direct => permutation::direct_automorphism_orbits(m),
        }
    }
}

// ============================================================================
// Visited sets
// ============================================================================

/// Storage of visited matrices and their link records.
trait Visited {
    /// If a stored matrix is identified with `m`, marks on it the edge that leads
    /// back along mutation `k` and returns whether that edge was fresh.
    fn mark_reached(&mut self, m: &ExchangeMatrix, k: usize) -> Option<bool>;

    /// Stores an unseen matrix with a fresh record, optionally marking `back`.
    fn insert(&mut self, m: ExchangeMatrix, back: Option<usize>);

    /// Record of a stored matrix, looked up by the exact stored value.
    fn record_mut(&mut self, stored: &ExchangeMatrix) -> Option<&mut LinkRecord>;

    /// Removes a stored matrix, returning its record.
    fn remove(&mut self, stored: &ExchangeMatrix) -> Option<LinkRecord>;

    fn len(&self) -> usize;
}

struct ExactVisited {
    n: usize,
    records: HashMap<ExchangeMatrix, LinkRecord>,
}

impl ExactVisited {
    fn new(n: usize) -> Self {
        Self {
            n,
            records: HashMap::new(),
        }
    }
}

impl Visited for ExactVisited {
    fn mark_reached(&mut self, m: &ExchangeMatrix, k: usize) -> Option<bool> {
        self.records.get_mut(m).map(|r| r.set(k))
    }

    fn insert(&mut self, m: ExchangeMatrix, back: Option<usize>) {
        let mut record = LinkRecord::new(self.n);
        if let Some(k) = back {
            record.set(k);
        }
        self.records.insert(m, record);
    }

    fn record_mut(&mut self, stored: &ExchangeMatrix) -> Option<&mut LinkRecord> {
        self.records.get_mut(stored)
    }

    fn remove(&mut self, stored: &ExchangeMatrix) -> Option<LinkRecord> {
        self.records.remove(stored)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

struct Slot {
    rep: ExchangeMatrix,
    links: LinkRecord,
}

/// Representatives bucketed by fingerprint; marks propagate along automorphism
/// orbits so that paired edge slots are always marked together.
struct CollapsedVisited {
    n: usize,
    oracle: Oracle,
    buckets: HashMap<Fingerprint, Vec<Slot>>,
    len: usize,
}

impl CollapsedVisited {
    fn new(n: usize, oracle: Oracle) -> Self {
        Self {
            n,
            oracle,
            buckets: HashMap::new(),
            len: 0,
        }
    }
}

impl Visited for CollapsedVisited {
    fn mark_reached(&mut self, m: &ExchangeMatrix, k: usize) -> Option<bool> {
        let oracle = &self.oracle;
        let bucket = self.buckets.get_mut(&Fingerprint::of(m))?;
        bucket.iter_mut().find_map(|slot| {
            oracle
                .witness(m, &slot.rep)
                .map(|sigma| slot.links.set(sigma.apply(k)))
        })
    }

    fn insert(&mut self, m: ExchangeMatrix, back: Option<usize>) {
        let mut links = LinkRecord::with_orbits(self.n, self.oracle.orbits(&m));
        if let Some(k) = back {
            links.set(k);
        }
        self.buckets
            .entry(Fingerprint::of(&m))
            .or_default()
            .push(Slot { rep: m, links });
        self.len += 1;
    }

    fn record_mut(&mut self, stored: &ExchangeMatrix) -> Option<&mut LinkRecord> {
        self.buckets
            .get_mut(&Fingerprint::of(stored))?
            .iter_mut()
            .find(|slot| slot.rep == *stored)
            .map(|slot| &mut slot.links)
    }

    fn remove(&mut self, stored: &ExchangeMatrix) -> Option<LinkRecord> {
        let key = Fingerprint::of(stored);
        let bucket = self.buckets.get_mut(&key)?;
        let pos = bucket.iter().position(|slot| slot.rep == *stored)?;
        let slot = bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        self.len -= 1;
        Some(slot.links)
    }

    fn len(&self) -> usize {
        self.len
    }
}

// ============================================================================
// Walk
// ============================================================================

enum Halt {
    Exhausted,
    Certificate,
    /// An entry left the `i32` range, which only unbounded growth can cause.
    Overflow,
    Target,
    Cancelled,
}

fn explore<V, F>(
    seed: &ExchangeMatrix,
    cfg: &EnumerationConfig,
    cancel: &CancelToken,
    mut visited: V,
    mut is_target: F,
) -> (Halt, EnumerationStats)
where
    V: Visited,
    F: FnMut(&ExchangeMatrix) -> bool,
{
    let start = Instant::now();
    let mut stats = EnumerationStats {
        discovered: 1,
        peak_visited: 1,
        peak_frontier: 1,
        ..Default::default()
    };
    let halt = |h: Halt, mut stats: EnumerationStats| {
        stats.elapsed = start.elapsed();
        (h, stats)
    };

    if is_target(seed) {
        return halt(Halt::Target, stats);
    }
    if cfg.stop_on_certificate && seed.certifies_infinite() {
        return halt(Halt::Certificate, stats);
    }

    visited.insert(seed.clone(), None);
    let mut frontier = VecDeque::from([seed.clone()]);
    let poll_every = cfg.cancel_poll_every.max(1);

    while let Some(m) = frontier.pop_front() {
        if cancel.is_stopped() {
            return halt(Halt::Cancelled, stats);
        }

        while let Some(k) = visited.record_mut(&m).and_then(|r| r.next_unset()) {
            stats.explored_edges += 1;
            if stats.explored_edges % poll_every == 0 && cancel.is_stopped() {
                return halt(Halt::Cancelled, stats);
            }

            let Ok(next) = m.try_mutate(k) else {
                debug!(vertex = k, discovered = stats.discovered, "entry overflow during enumeration");
                return halt(Halt::Overflow, stats);
            };
            match visited.mark_reached(&next, k) {
                Some(fresh) => {
                    // Both ends of an edge are always marked together, so the far
                    // end of an unexplored edge is unexplored too.
                    debug_assert!(fresh, "edge {k} was already marked on the far end");
                }
                None => {
                    stats.discovered += 1;
                    if is_target(&next) {
                        return halt(Halt::Target, stats);
                    }
                    if cfg.stop_on_certificate && next.certifies_infinite() {
                        return halt(Halt::Certificate, stats);
                    }
                    if cfg.progress_every > 0 && stats.discovered % cfg.progress_every == 0 {
                        info!(
                            discovered = stats.discovered,
                            visited = visited.len(),
                            frontier = frontier.len(),
                            "enumeration progress"
                        );
                    }
                    visited.insert(next.clone(), Some(k));
                    frontier.push_back(next);
                }
            }
            if let Some(record) = visited.record_mut(&m) {
                record.set(k);
            }
            stats.peak_visited = stats.peak_visited.max(visited.len());
            stats.peak_frontier = stats.peak_frontier.max(frontier.len());
        }

        if let Some(record) = visited.remove(&m) {
            debug_assert!(record.is_complete());
            stats.evicted += 1;
        }
    }

    halt(Halt::Exhausted, stats)
}

fn check_rank(m: &ExchangeMatrix) -> Result<usize> {
    let n = m.rank();
    if n > MAX_LINKS {
        return Err(QuiverError::TooManyMutableVertices { n });
    }
    Ok(n)
}

// ============================================================================
// Public API
// ============================================================================

/// Enumerates the mutation class of `seed`.
///
/// Returns [`ClassSize::Finite`] with the number of distinct matrices (exact
/// mode) or equivalence classes (collapsed mode) once the class is exhausted.
/// An infinite class ends with [`ClassSize::Infinite`] at the first certificate
/// (with [`EnumerationConfig::stop_on_certificate`]) or once an entry grows past
/// the `i32` range, which can take very long; `cancel` ends it earlier.
///
/// # Errors
/// Returns [`QuiverError::TooManyMutableVertices`] for more than 64 mutable
/// vertices. A permutation set too large to cache is not an error: the walk
/// falls back to uncached witness search.
pub fn enumerate_mutation_class(
    seed: &ExchangeMatrix,
    cfg: &EnumerationConfig,
    ctx: &EquivalenceContext,
    cancel: &CancelToken,
) -> Result<Enumeration> {
    let n = check_rank(seed)?;
    debug!(mode = %cfg.mode, rows = seed.rows(), cols = seed.cols(), "enumerating mutation class");

    let (halt, stats) = match cfg.mode {
        EnumerationMode::Exact => explore(seed, cfg, cancel, ExactVisited::new(n), |_| false),
        EnumerationMode::UpToEquivalence => {
            let oracle = Oracle::for_rank(ctx, n)?;
            explore(seed, cfg, cancel, CollapsedVisited::new(n, oracle), |_| false)
        }
    };

    let outcome = match halt {
        Halt::Exhausted => ClassSize::Finite(stats.discovered),
        Halt::Certificate | Halt::Overflow => ClassSize::Infinite,
        Halt::Cancelled => ClassSize::Cancelled,
        Halt::Target => unreachable!("no target was set"),
    };
    debug!(
        mode = %cfg.mode,
        %outcome,
        discovered = stats.discovered,
        explored = stats.explored_edges,
        peak_visited = stats.peak_visited,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "enumeration finished"
    );
    Ok(Enumeration { outcome, stats })
}

/// Decides whether `b` lies in the mutation class of `a`, up to permutation.
///
/// Walks the collapsed class of `a` until a class equivalent to `b` turns up.
/// Returns `Some(false)` once a finite class is exhausted without a match and
/// `None` if `cancel` fires first or the entries of an infinite class overflow
/// without a match.
///
/// # Errors
/// Returns [`QuiverError::TooManyMutableVertices`] for more than 64 mutable
/// vertices.
pub fn is_mutation_equivalent(
    a: &ExchangeMatrix,
    b: &ExchangeMatrix,
    ctx: &EquivalenceContext,
    cancel: &CancelToken,
) -> Result<Option<bool>> {
    if a.rows() != b.rows() || a.cols() != b.cols() {
        return Ok(Some(false));
    }
    let n = check_rank(a)?;
    let oracle = Oracle::for_rank(ctx, n)?;
    let target = Fingerprint::of(b);
    let matches = |m: &ExchangeMatrix| Fingerprint::of(m) == target && oracle.witness(m, b).is_some();

    let cfg = EnumerationConfig::with_mode(EnumerationMode::UpToEquivalence);
    let visited = CollapsedVisited::new(n, oracle.clone());
    let (halt, stats) = explore(a, &cfg, cancel, visited, matches);
    debug!(discovered = stats.discovered, "mutation equivalence search finished");
    Ok(match halt {
        Halt::Target => Some(true),
        Halt::Exhausted => Some(false),
        Halt::Certificate | Halt::Overflow | Halt::Cancelled => None,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equivalence::EquivalenceConfig;
    use std::thread;

    fn path(n: usize) -> ExchangeMatrix {
        let mut m = ExchangeMatrix::zeros(n, n);
        for i in 0..n.saturating_sub(1) {
            m = m.with_arrow(i, i + 1, 1).unwrap();
        }
        m
    }

    fn d(n: usize) -> ExchangeMatrix {
        let mut m = path(n - 1).enlarge(1, 1);
        m = m.with_arrow(n - 3, n - 1, 1).unwrap();
        m
    }

    fn tournament(n: usize) -> ExchangeMatrix {
        let mut m = ExchangeMatrix::zeros(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                m = m.with_arrow(i, j, 1).unwrap();
            }
        }
        m
    }

    fn run(m: &ExchangeMatrix, mode: EnumerationMode) -> Enumeration {
        enumerate_mutation_class(
            m,
            &EnumerationConfig::with_mode(mode),
            &EquivalenceContext::default(),
            &CancelToken::new(),
        )
        .unwrap()
    }

    fn sizes(m: &ExchangeMatrix) -> (ClassSize, ClassSize) {
        (
            run(m, EnumerationMode::Exact).outcome,
            run(m, EnumerationMode::UpToEquivalence).outcome,
        )
    }

    #[test]
    fn a3_class_sizes() {
        assert_eq!(sizes(&path(3)), (ClassSize::Finite(14), ClassSize::Finite(4)));
    }

    #[test]
    fn a4_class_sizes() {
        assert_eq!(sizes(&path(4)), (ClassSize::Finite(144), ClassSize::Finite(6)));
    }

    #[test]
    fn d5_class_sizes() {
        assert_eq!(sizes(&d(5)), (ClassSize::Finite(2184), ClassSize::Finite(26)));
    }

    #[test]
    fn tiny_classes() {
        assert_eq!(sizes(&path(2)), (ClassSize::Finite(2), ClassSize::Finite(1)));
        assert_eq!(sizes(&path(1)), (ClassSize::Finite(1), ClassSize::Finite(1)));
        assert_eq!(
            sizes(&ExchangeMatrix::zeros(0, 0)),
            (ClassSize::Finite(1), ClassSize::Finite(1))
        );
        let kronecker = ExchangeMatrix::from_rows(&[[0, 2], [-2, 0]]).unwrap();
        assert_eq!(sizes(&kronecker), (ClassSize::Finite(2), ClassSize::Finite(1)));
    }

    #[test]
    fn every_edge_is_explored_once() {
        let out = run(&path(3), EnumerationMode::Exact);
        // 14 matrices with 3 edge ends each; every exploration closes two ends.
        assert_eq!(out.stats.explored_edges, 21);
        assert_eq!(out.stats.evicted, 14);
        assert!(out.stats.peak_visited <= 14);
    }

    #[test]
    fn self_loops_at_isolated_vertices() {
        // Weight-3 pair plus an isolated vertex: the isolated mutation is a
        // self-loop and the large entry is no certificate.
        let m = ExchangeMatrix::zeros(3, 3).with_arrow(0, 1, 3).unwrap();
        let cfg = EnumerationConfig::default().stopping_on_certificate();
        let out = enumerate_mutation_class(&m, &cfg, &EquivalenceContext::default(), &CancelToken::new())
            .unwrap();
        assert_eq!(out.outcome, ClassSize::Finite(2));
        assert_eq!(sizes(&m).1, ClassSize::Finite(1));
    }

    #[test]
    fn exact_count_dominates_collapsed_count() {
        let cycle = path(3).mutate(1);
        let frozen = path(3).enlarge(1, 0).with_entry(3, 0, 1).unwrap();
        for m in [path(3), cycle, d(4), path(5), frozen] {
            let (exact, collapsed) = sizes(&m);
            let (Some(e), Some(c)) = (exact.finite(), collapsed.finite()) else {
                panic!("expected finite classes for {m}");
            };
            assert!(e >= c, "{e} < {c} for {m}");
        }
    }

    #[test]
    fn direct_fallback_gives_same_count() {
        let ctx = EquivalenceContext::new(EquivalenceConfig {
            max_instance_weight: 1,
            ..Default::default()
        });
        let out = enumerate_mutation_class(
            &path(4),
            &EnumerationConfig::with_mode(EnumerationMode::UpToEquivalence),
            &ctx,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(out.outcome, ClassSize::Finite(6));
        assert!(ctx.cached_sizes().is_empty());
    }

    #[test]
    fn certificate_stops_infinite_class() {
        let cfg = EnumerationConfig::default().stopping_on_certificate();
        let out = enumerate_mutation_class(&tournament(4), &cfg, &EquivalenceContext::default(), &CancelToken::new())
            .unwrap();
        assert_eq!(out.outcome, ClassSize::Infinite);
    }

    #[test]
    fn cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.request_stop();
        let out = enumerate_mutation_class(
            &path(4),
            &EnumerationConfig::default(),
            &EquivalenceContext::default(),
            &cancel,
        )
        .unwrap();
        assert_eq!(out.outcome, ClassSize::Cancelled);
    }

    #[test]
    fn entry_overflow_means_infinite_class() {
        // The principal part is finite, but the frozen row grows without bound.
        let m = ExchangeMatrix::from_rows(&[[0, 3], [-3, 0], [1, 0]]).unwrap();
        for mode in [EnumerationMode::Exact, EnumerationMode::UpToEquivalence] {
            let out = run(&m, mode);
            assert_eq!(out.outcome, ClassSize::Infinite, "{mode}");
            assert!(out.stats.discovered > 10);
        }

        let isolated = ExchangeMatrix::from_rows(&[[0, 3, 0], [-3, 0, 0], [0, 0, 0], [1, 0, 0]]).unwrap();
        assert_eq!(run(&isolated, EnumerationMode::Exact).outcome, ClassSize::Infinite);
        let ctx = EquivalenceContext::default();
        assert_eq!(is_mutation_equivalent(&m, &path(2).enlarge(1, 0), &ctx, &CancelToken::new()), Ok(None));
    }

    #[test]
    fn cancellation_ends_long_enumeration() {
        let cancel = CancelToken::new();
        let stopper = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                cancel.request_stop();
            })
        };
        let cfg = EnumerationConfig {
            cancel_poll_every: 16,
            ..Default::default()
        };
        // E8: finite, but far too large to exhaust before the timer fires.
        let e8 = path(7).enlarge(1, 1).with_arrow(2, 7, 1).unwrap();
        let out = enumerate_mutation_class(&e8, &cfg, &EquivalenceContext::default(), &cancel).unwrap();
        stopper.join().unwrap();
        assert_eq!(out.outcome, ClassSize::Cancelled);
        assert!(out.stats.discovered > 1);
    }

    #[test]
    fn rejects_too_many_vertices() {
        let m = ExchangeMatrix::zeros(65, 65);
        let err = enumerate_mutation_class(
            &m,
            &EnumerationConfig::default(),
            &EquivalenceContext::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert_eq!(err, QuiverError::TooManyMutableVertices { n: 65 });
    }

    #[test]
    fn mutation_equivalence() {
        let ctx = EquivalenceContext::default();
        let cancel = CancelToken::new();
        let cycle = path(3).mutate(1);
        let relabelled = permutation::relabel(&cycle, &Permutation::from_images(vec![2, 0, 1]));
        assert_eq!(is_mutation_equivalent(&path(3), &relabelled, &ctx, &cancel), Ok(Some(true)));
        assert_eq!(
            is_mutation_equivalent(&path(3), &ExchangeMatrix::zeros(3, 3), &ctx, &cancel),
            Ok(Some(false))
        );
        assert_eq!(is_mutation_equivalent(&path(3), &path(4), &ctx, &cancel), Ok(Some(false)));
        // A4 and D4 share a rank but not a class.
        assert_eq!(is_mutation_equivalent(&path(4), &d(4), &ctx, &cancel), Ok(Some(false)));
    }

    #[test]
    fn mode_and_outcome_display() {
        assert_eq!(EnumerationMode::UpToEquivalence.to_string(), "up-to-equivalence");
        assert_eq!(ClassSize::Finite(14).to_string(), "14");
        assert_eq!(ClassSize::Infinite.is_finite(), Some(false));
        assert_eq!(ClassSize::Cancelled.finite(), None);
    }
}
