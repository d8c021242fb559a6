//! # Quiver Mutation Classes
//!
//! Exploration and classification of the mutation classes of quiver exchange
//! matrices.
//!
//! This crate provides:
//! - An integer exchange matrix with the **mutation** operator, vertex deletion
//!   and one-vertex extensions.
//! - A breadth-first **enumeration** of mutation classes, counting either raw
//!   matrices or matrices up to relabelling, with eager eviction of finished
//!   vertices so memory follows the frontier.
//! - A cached **equivalence oracle** deciding equality up to permutation.
//! - A randomized walk that proves infinite mutation type quickly.
//! - A producer/worker/aggregator **pipeline** with cooperative cancellation,
//!   used to check vertex deletions and extensions in parallel.
//!
//! ## Quick Start
//!
//! ```
//! use quiver_mutation::prelude::*;
//!
//! // A3 with linear orientation.
//! let a3 = ExchangeMatrix::from_rows(&[[0, 1, 0], [-1, 0, 1], [0, -1, 0]]).unwrap();
//!
//! let ctx = EquivalenceContext::default();
//! let cancel = CancelToken::new();
//! let exact = enumerate_mutation_class(&a3, &EnumerationConfig::default(), &ctx, &cancel).unwrap();
//! assert_eq!(exact.outcome, ClassSize::Finite(14));
//!
//! let cfg = EnumerationConfig::with_mode(EnumerationMode::UpToEquivalence);
//! let collapsed = enumerate_mutation_class(&a3, &cfg, &ctx, &cancel).unwrap();
//! assert_eq!(collapsed.outcome, ClassSize::Finite(4));
//! ```
//!
//! ## Classification
//!
//! ```
//! use quiver_mutation::prelude::*;
//!
//! let classifier = Classifier::default();
//! let tournament = parse_exchange_matrix("0 1 1 1; -1 0 1 1; -1 -1 0 1; -1 -1 -1 0").unwrap();
//! let result = classifier.classify(&tournament, &CancelToken::new()).unwrap();
//! assert_eq!(result.finite(), Some(false));
//! assert_eq!(result.minimally_mutation_infinite(), Some(true));
//! ```
//!
//! ## Modules
//!
//! - [`matrix`]: Exchange matrices, mutation, deletion, extension and parsing.
//! - [`link`]: Per-matrix bookkeeping of explored mutation edges.
//! - [`permutation`]: Permutation sets and brute-force witness search.
//! - [`equivalence`]: Cached equivalence oracle and its instance cache.
//! - [`enumerate`]: Exact and collapsed mutation-class enumeration.
//! - [`heuristic`]: Random walk proving infinite type.
//! - [`pipeline`]: Concurrent task pipeline and cancel tokens.
//! - [`classify`]: Finiteness, minimality and extension verdicts.
//! - [`catalogue`]: Dynkin fixtures and their known class sizes.
//!
//! ## Performance Notes
//!
//! - Link records are `u64` bitsets, limiting enumeration to 64 mutable vertices.
//! - Collapsed enumeration brute-forces `n!` permutations per candidate pair;
//!   a permutation-invariant fingerprint rejects most pairs first.
//! - For maximum performance, compile with: `RUSTFLAGS="-C target-cpu=native" cargo build --release`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::inline_always)]
#![allow(clippy::many_single_char_names)] // Mathematical variable names
#![allow(clippy::needless_range_loop)] // Often clearer for matrix indexing
#![allow(clippy::doc_markdown)]
#![allow(clippy::multiple_crate_versions)] // Cargo.lock management is external

pub mod catalogue;
pub mod classify;
pub mod enumerate;
pub mod equivalence;
pub mod error;
pub mod heuristic;
pub mod link;
pub mod matrix;
pub mod permutation;
pub mod pipeline;

pub use error::{QuiverError, Result};

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::catalogue::{minimally_infinite_examples, recognize, validate_catalogue, DynkinType};
    pub use crate::classify::{ClassificationResult, Classifier, ClassifierConfig, ExtensionSurvey, Finiteness};
    pub use crate::enumerate::{
        enumerate_mutation_class, is_mutation_equivalent, ClassSize, EnumerationConfig, EnumerationMode,
    };
    pub use crate::equivalence::{EquivalenceConfig, EquivalenceContext};
    pub use crate::error::{QuiverError, Result};
    pub use crate::heuristic::{prove_infinite, Heuristic, HeuristicConfig};
    pub use crate::matrix::{parse_exchange_matrix, ExchangeMatrix};
    pub use crate::pipeline::{CancelToken, PipelineConfig};
}
