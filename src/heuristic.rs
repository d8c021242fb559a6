//! Randomized proof of infinite mutation type.
//!
//! A random walk through the mutation graph that stops at the first matrix with
//! an entry of absolute value at least 3. For a connected quiver with at least
//! three mutable vertices such an entry certifies an infinite mutation class, so
//! the walk can only ever prove infiniteness, never finiteness.

use crate::matrix::ExchangeMatrix;
use crate::pipeline::CancelToken;
use rand::prelude::*;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Default number of random mutations per walk.
pub const DEFAULT_MAX_STEPS: usize = 3000;

/// How often a walk checks whether another chain already succeeded.
const STOP_POLL_EVERY: usize = 64;

// ============================================================================
// Configuration
// ============================================================================

/// Random-walk parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeuristicConfig {
    /// Maximum number of mutations per chain.
    pub max_steps: usize,
    /// Number of independent chains; more than one runs them in parallel.
    pub chains: usize,
    /// Optional deterministic base seed.
    pub seed: Option<u64>,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            chains: 1,
            seed: None,
        }
    }
}

/// Outcome of the heuristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heuristic {
    /// A certificate was found after `steps` mutations on chain `chain`.
    Infinite {
        /// Mutations performed before the certificate appeared.
        steps: usize,
        /// Chain that found it.
        chain: usize,
    },
    /// No certificate within the step budget; nothing is proven.
    Unknown,
}

impl Heuristic {
    /// Returns `true` for [`Heuristic::Infinite`].
    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite { .. })
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Runs the configured chains on `seed` and reports the first certificate found.
///
/// Stops early if `cancel` is stopped, reporting [`Heuristic::Unknown`].
pub fn prove_infinite(seed: &ExchangeMatrix, cfg: &HeuristicConfig, cancel: &CancelToken) -> Heuristic {
    if seed.certifies_infinite() {
        return Heuristic::Infinite { steps: 0, chain: 0 };
    }
    // Square matrices below rank 3 are always finite; with frozen rows the walk
    // can still prove growth.
    if seed.rank() < 2 || (seed.is_square() && seed.rank() < 3) {
        return Heuristic::Unknown;
    }

    let base_seed = cfg.seed.unwrap_or_else(random_u64);
    let found_flag = AtomicBool::new(false);
    let run_chain = |chain: usize| {
        let mut rng = SmallRng::seed_from_u64(splitmix64(base_seed ^ (chain as u64)));
        random_walk(seed, cfg.max_steps, &mut rng, &found_flag, cancel).map(|steps| {
            found_flag.store(true, Ordering::Relaxed);
            Heuristic::Infinite { steps, chain }
        })
    };

    let result = if cfg.chains <= 1 {
        run_chain(0)
    } else {
        (0..cfg.chains).into_par_iter().find_map_any(run_chain)
    };

    match result {
        Some(found @ Heuristic::Infinite { steps, chain }) => {
            debug!(steps, chain, rank = seed.rank(), "random walk found an infinite certificate");
            found
        }
        _ => Heuristic::Unknown,
    }
}

/// Performs up to `max_steps` random mutations from `seed`, never mutating twice
/// in a row at the same vertex.
///
/// Only two matrices are live: the current one and the buffer the next mutation
/// is written into. Returns the number of steps after which a matrix passing
/// [`ExchangeMatrix::certifies_infinite`] appeared, or an entry left the `i32`
/// range, or `None`.
pub fn random_walk<R: Rng>(
    seed: &ExchangeMatrix,
    max_steps: usize,
    rng: &mut R,
    found_flag: &AtomicBool,
    cancel: &CancelToken,
) -> Option<usize> {
    let n = seed.rank();
    if n < 2 {
        return None;
    }

    let mut current = seed.clone();
    let mut next = ExchangeMatrix::zeros(seed.rows(), seed.cols());
    let mut last: Option<usize> = None;

    for step in 1..=max_steps {
        if step % STOP_POLL_EVERY == 0
            && (found_flag.load(Ordering::Relaxed) || cancel.is_stopped())
        {
            return None;
        }
        let k = pick_index(rng, n, last);
        if current.mutate_into(k, &mut next).is_err() {
            return Some(step);
        }
        std::mem::swap(&mut current, &mut next);
        last = Some(k);
        if current.certifies_infinite() {
            return Some(step);
        }
    }
    None
}

/// Uniform index in `0..n` different from `last`.
#[inline]
fn pick_index<R: Rng>(rng: &mut R, n: usize, last: Option<usize>) -> usize {
    match last {
        None => rng.random_range(0..n),
        Some(l) => {
            let k = rng.random_range(0..n - 1);
            if k >= l {
                k + 1
            } else {
                k
            }
        }
    }
}

fn random_u64() -> u64 {
    rand::random::<u64>()
}

/// SplitMix64 mixer for deriving per-chain seeds from a base seed.
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand_xorshift::XorShiftRng;

    fn tournament(n: usize) -> ExchangeMatrix {
        let mut m = ExchangeMatrix::zeros(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                m = m.with_arrow(i, j, 1).unwrap();
            }
        }
        m
    }

    fn path(n: usize) -> ExchangeMatrix {
        let mut m = ExchangeMatrix::zeros(n, n);
        for i in 0..n.saturating_sub(1) {
            m = m.with_arrow(i, i + 1, 1).unwrap();
        }
        m
    }

    fn seeded(chains: usize) -> HeuristicConfig {
        HeuristicConfig {
            chains,
            seed: Some(0x5EED),
            ..Default::default()
        }
    }

    #[test]
    fn splitmix64_is_deterministic() {
        assert_eq!(splitmix64(0), splitmix64(0));
        assert_ne!(splitmix64(0), splitmix64(1));
    }

    #[test]
    fn pick_index_never_repeats_last() {
        let mut rng = XorShiftRng::seed_from_u64(11);
        for _ in 0..10_000 {
            let last = rng.random_range(0..5);
            let k = pick_index(&mut rng, 5, Some(last));
            assert!(k < 5);
            assert_ne!(k, last);
        }
    }

    #[test]
    fn acyclic_tournament_is_proven_infinite() {
        let out = prove_infinite(&tournament(4), &seeded(1), &CancelToken::new());
        assert!(out.is_infinite(), "expected a certificate, got {out:?}");
    }

    #[test]
    fn parallel_chains_find_certificate() {
        let out = prove_infinite(&tournament(5), &seeded(4), &CancelToken::new());
        assert!(out.is_infinite());
    }

    #[test]
    fn finite_types_never_produce_a_certificate() {
        for m in [path(3), path(5), path(6)] {
            let out = prove_infinite(&m, &seeded(2), &CancelToken::new());
            assert_eq!(out, Heuristic::Unknown);
        }
    }

    #[test]
    fn seed_with_large_entry_is_immediately_infinite() {
        let m = path(3).with_arrow(0, 1, 3).unwrap();
        assert_eq!(
            prove_infinite(&m, &seeded(1), &CancelToken::new()),
            Heuristic::Infinite { steps: 0, chain: 0 }
        );
    }

    #[test]
    fn unbounded_frozen_growth_is_infinite() {
        // Rank 2 with a frozen row: mutations alternate and the row overflows.
        let pair = ExchangeMatrix::from_rows(&[[0, 3], [-3, 0], [1, 0]]).unwrap();
        assert!(!pair.certifies_infinite());
        let out = prove_infinite(&pair, &seeded(1), &CancelToken::new());
        assert!(matches!(out, Heuristic::Infinite { steps, .. } if steps > 10), "{out:?}");

        // An isolated third vertex slows the walk down but cannot stop the growth.
        let padded = ExchangeMatrix::from_rows(&[[0, 3, 0], [-3, 0, 0], [0, 0, 0], [1, 0, 0]]).unwrap();
        let cfg = HeuristicConfig {
            max_steps: 100_000,
            ..seeded(1)
        };
        assert!(prove_infinite(&padded, &cfg, &CancelToken::new()).is_infinite());
    }

    #[test]
    fn affine_g2_is_not_certified() {
        let g2 = ExchangeMatrix::from_rows(&[[0, 1, 0], [-1, 0, 1], [0, -3, 0]]).unwrap();
        assert_eq!(prove_infinite(&g2, &seeded(2), &CancelToken::new()), Heuristic::Unknown);
    }

    #[test]
    fn rank_one_walk_reports_unknown() {
        let m = ExchangeMatrix::zeros(1, 1);
        assert_eq!(prove_infinite(&m, &seeded(1), &CancelToken::new()), Heuristic::Unknown);
    }

    #[test]
    fn zero_step_budget_reports_unknown() {
        let cfg = HeuristicConfig {
            max_steps: 0,
            ..seeded(1)
        };
        assert_eq!(prove_infinite(&tournament(4), &cfg, &CancelToken::new()), Heuristic::Unknown);
    }

    #[test]
    fn walk_is_deterministic_for_a_seed() {
        let flag = AtomicBool::new(false);
        let cancel = CancelToken::new();
        let run = |seed| {
            let mut rng = XorShiftRng::seed_from_u64(seed);
            random_walk(&tournament(4), 3000, &mut rng, &flag, &cancel)
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn found_flag_stops_walk() {
        let flag = AtomicBool::new(true);
        let mut rng = XorShiftRng::seed_from_u64(1);
        // A finite type never certifies, so only the flag can end the walk early.
        assert_eq!(
            random_walk(&path(4), 1_000_000, &mut rng, &flag, &CancelToken::new()),
            None
        );
    }
}
