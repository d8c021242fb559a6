//! Finiteness verdicts and composite classifications.
//!
//! [`Classifier`] combines the cheap checks (rank, certificate, random walk)
//! with full enumeration, and fans out over vertex deletions or one-vertex
//! extensions through the worker pipeline.

use crate::catalogue::{self, DynkinType};
use crate::enumerate::{enumerate_mutation_class, ClassSize, EnumerationConfig, EnumerationMode};
use crate::equivalence::{EquivalenceConfig, EquivalenceContext};
use crate::error::{QuiverError, Result};
use crate::heuristic::{prove_infinite, HeuristicConfig};
use crate::matrix::ExchangeMatrix;
use crate::pipeline::{run_pipeline, Aggregator, CancelToken, Flow, PipelineConfig};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// ClassificationResult
// ============================================================================

/// Properties of a mutation class, each `None` until decided.
///
/// The setters keep the fields consistent: a finite class is never minimally
/// mutation-infinite, and an infinite class has no size or Dynkin type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassificationResult {
    finite: Option<bool>,
    mutation_class_size: Option<u64>,
    minimally_mutation_infinite: Option<bool>,
    canonical_type: Option<DynkinType>,
}

impl ClassificationResult {
    /// Whether the class is finite.
    pub fn finite(&self) -> Option<bool> {
        self.finite
    }

    /// Size of the class, if finite and counted.
    pub fn mutation_class_size(&self) -> Option<u64> {
        self.mutation_class_size
    }

    /// Whether the class is minimally mutation-infinite.
    pub fn minimally_mutation_infinite(&self) -> Option<bool> {
        self.minimally_mutation_infinite
    }

    /// Dynkin type of the class, if recognized.
    pub fn canonical_type(&self) -> Option<DynkinType> {
        self.canonical_type
    }

    /// Records finiteness. `true` rules out minimal infiniteness; `false`
    /// clears the size and type.
    pub fn set_finite(&mut self, finite: bool) {
        self.finite = Some(finite);
        if finite {
            self.minimally_mutation_infinite = Some(false);
        } else {
            self.mutation_class_size = None;
            self.canonical_type = None;
        }
    }

    /// Records the class size, which implies finiteness.
    pub fn set_mutation_class_size(&mut self, size: u64) {
        self.set_finite(true);
        self.mutation_class_size = Some(size);
    }

    /// Records minimal infiniteness; `true` implies an infinite class.
    pub fn set_minimally_mutation_infinite(&mut self, minimal: bool) {
        if minimal {
            self.set_finite(false);
        }
        self.minimally_mutation_infinite = Some(minimal);
    }

    /// Records the Dynkin type, which implies finiteness.
    pub fn set_canonical_type(&mut self, t: DynkinType) {
        self.set_finite(true);
        self.canonical_type = Some(t);
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn yes_no(v: Option<bool>) -> &'static str {
            match v {
                Some(true) => "yes",
                Some(false) => "no",
                None => "unknown",
            }
        }
        writeln!(f, "finite:                      {}", yes_no(self.finite))?;
        match self.mutation_class_size {
            Some(n) => writeln!(f, "mutation class size:         {n}")?,
            None => writeln!(f, "mutation class size:         unknown")?,
        }
        writeln!(
            f,
            "minimally mutation-infinite: {}",
            yes_no(self.minimally_mutation_infinite)
        )?;
        match self.canonical_type {
            Some(t) => write!(f, "type:                        {t}"),
            None => write!(f, "type:                        unknown"),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Classifier parameters.
#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    /// Counting mode for class sizes.
    pub mode: EnumerationMode,
    /// Random-walk parameters.
    pub heuristic: HeuristicConfig,
    /// Worker pool used for deletions and extensions.
    pub pipeline: PipelineConfig,
    /// Equivalence cache limits.
    pub equivalence: EquivalenceConfig,
    /// Arrow weights `[-w, w]` tried by extension surveys.
    pub extension_weight: i32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: EnumerationMode::Exact,
            heuristic: HeuristicConfig::default(),
            pipeline: PipelineConfig::default(),
            equivalence: EquivalenceConfig::default(),
            extension_weight: 2,
        }
    }
}

// ============================================================================
// Verdicts
// ============================================================================

/// Finiteness of a single mutation class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finiteness {
    /// Exhausted; `size` counts matrices in the configured mode.
    Finite {
        /// Class size.
        size: u64,
    },
    /// Certified infinite.
    Infinite,
    /// Cancelled before a verdict.
    Unknown,
}

impl fmt::Display for Finiteness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite { size } => write!(f, "finite ({size})"),
            Self::Infinite => f.write_str("infinite"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Counts from [`Classifier::survey_extensions`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionSurvey {
    /// Extensions checked.
    pub checked: usize,
    /// Extensions with a finite class.
    pub finite: usize,
    /// Extensions with an infinite class.
    pub infinite: usize,
    /// Extensions left undecided.
    pub unknown: usize,
    /// First finite extension to complete.
    pub first_finite: Option<ExchangeMatrix>,
    /// Every extension was checked.
    pub complete: bool,
}

// ============================================================================
// Aggregators
// ============================================================================

/// Folds the finiteness of every vertex deletion into a minimality verdict.
struct MinimalityAggregator {
    expected: usize,
    folded: usize,
    infinite_found: bool,
    unknown_found: bool,
    error: Option<QuiverError>,
}

impl Aggregator<Result<Finiteness>> for MinimalityAggregator {
    type Output = Result<Option<bool>>;

    fn fold(&mut self, result: Result<Finiteness>) -> Flow {
        self.folded += 1;
        match result {
            Ok(Finiteness::Finite { .. }) => Flow::Continue,
            Ok(Finiteness::Unknown) => {
                self.unknown_found = true;
                Flow::Continue
            }
            Ok(Finiteness::Infinite) => {
                self.infinite_found = true;
                Flow::Stop
            }
            Err(e) => {
                self.error = Some(e);
                Flow::Stop
            }
        }
    }

    fn finish(self) -> Result<Option<bool>> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(if self.infinite_found {
            Some(false)
        } else if self.unknown_found || self.folded < self.expected {
            None
        } else {
            Some(true)
        })
    }
}

struct SurveyAggregator {
    survey: ExtensionSurvey,
    expected: usize,
    stop_at_first_finite: bool,
    error: Option<QuiverError>,
}

impl Aggregator<(ExchangeMatrix, Result<Finiteness>)> for SurveyAggregator {
    type Output = Result<ExtensionSurvey>;

    fn fold(&mut self, (m, result): (ExchangeMatrix, Result<Finiteness>)) -> Flow {
        let verdict = match result {
            Ok(v) => v,
            Err(e) => {
                self.error = Some(e);
                return Flow::Stop;
            }
        };
        let survey = &mut self.survey;
        survey.checked += 1;
        match verdict {
            Finiteness::Finite { .. } => {
                survey.finite += 1;
                if survey.first_finite.is_none() {
                    survey.first_finite = Some(m);
                }
                if self.stop_at_first_finite {
                    return Flow::Stop;
                }
            }
            Finiteness::Infinite => survey.infinite += 1,
            Finiteness::Unknown => survey.unknown += 1,
        }
        Flow::Continue
    }

    fn finish(mut self) -> Result<ExtensionSurvey> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.survey.complete = self.survey.checked == self.expected;
        Ok(self.survey)
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Entry point for finiteness checks and composite classifications.
///
/// Cheap to clone; clones share the equivalence caches.
#[derive(Clone, Debug)]
pub struct Classifier {
    cfg: ClassifierConfig,
    ctx: Arc<EquivalenceContext>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl Classifier {
    /// Creates a classifier with its own equivalence caches.
    pub fn new(cfg: ClassifierConfig) -> Self {
        let ctx = EquivalenceContext::shared(cfg.equivalence.clone());
        Self { cfg, ctx }
    }

    /// Creates a classifier sharing existing equivalence caches.
    pub fn with_context(cfg: ClassifierConfig, ctx: Arc<EquivalenceContext>) -> Self {
        Self { cfg, ctx }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClassifierConfig {
        &self.cfg
    }

    /// Shared equivalence caches.
    pub fn context(&self) -> &Arc<EquivalenceContext> {
        &self.ctx
    }

    /// Decides whether the mutation class of `m` is finite.
    ///
    /// Square matrices of rank at most 2 are finite without further checks and
    /// are counted directly. Otherwise a certificate on `m` or a random walk can
    /// prove infiniteness early; failing that the class is enumerated until it
    /// is exhausted, a certificate appears, or an entry leaves the `i32` range.
    /// An infinite class has unbounded entries, so the search always ends; with
    /// frozen rows that may take until the overflow, unless `cancel` fires first.
    ///
    /// # Errors
    /// Returns [`QuiverError::TooManyMutableVertices`] for more than 64 mutable
    /// vertices.
    pub fn check_finite(&self, m: &ExchangeMatrix, cancel: &CancelToken) -> Result<Finiteness> {
        let small = m.is_square() && m.rank() <= 2;
        if !small {
            if m.certifies_infinite() {
                debug!("seed carries an infinite certificate");
                return Ok(Finiteness::Infinite);
            }
            if prove_infinite(m, &self.cfg.heuristic, cancel).is_infinite() {
                return Ok(Finiteness::Infinite);
            }
        }

        let mut cfg = EnumerationConfig::with_mode(self.cfg.mode);
        cfg.stop_on_certificate = !small;
        let out = enumerate_mutation_class(m, &cfg, &self.ctx, cancel)?;
        Ok(match out.outcome {
            ClassSize::Finite(size) => Finiteness::Finite { size },
            ClassSize::Infinite => Finiteness::Infinite,
            ClassSize::Cancelled => Finiteness::Unknown,
        })
    }

    /// Size of the mutation class in the configured mode, or `None` if the class
    /// is infinite or the search was cancelled.
    ///
    /// # Errors
    /// See [`Classifier::check_finite`].
    pub fn class_size(&self, m: &ExchangeMatrix, cancel: &CancelToken) -> Result<Option<u64>> {
        Ok(match self.check_finite(m, cancel)? {
            Finiteness::Finite { size } => Some(size),
            Finiteness::Infinite | Finiteness::Unknown => None,
        })
    }

    /// Full classification: finiteness, size, Dynkin type and minimality.
    ///
    /// # Errors
    /// See [`Classifier::check_finite`].
    pub fn classify(&self, m: &ExchangeMatrix, cancel: &CancelToken) -> Result<ClassificationResult> {
        let mut result = ClassificationResult::default();
        match self.check_finite(m, cancel)? {
            Finiteness::Finite { size } => {
                result.set_mutation_class_size(size);
                if let Some(t) = catalogue::recognize(m, &self.ctx, cancel)? {
                    result.set_canonical_type(t);
                }
            }
            Finiteness::Infinite => {
                result.set_finite(false);
                if let Some(minimal) = self.deletions_all_finite(m, cancel)? {
                    result.set_minimally_mutation_infinite(minimal);
                }
            }
            Finiteness::Unknown => {}
        }
        info!(rows = m.rows(), cols = m.cols(), finite = ?result.finite(), size = ?result.mutation_class_size(), "classified");
        Ok(result)
    }

    /// Returns whether `m` is mutation-infinite while every one-vertex deletion
    /// is mutation-finite.
    ///
    /// Deletions are checked in parallel; the first infinite one decides the
    /// answer and stops the rest. `None` means some check was left undecided.
    ///
    /// # Errors
    /// See [`Classifier::check_finite`].
    pub fn is_minimally_mutation_infinite(&self, m: &ExchangeMatrix, cancel: &CancelToken) -> Result<Option<bool>> {
        match self.check_finite(m, cancel)? {
            Finiteness::Finite { .. } => Ok(Some(false)),
            Finiteness::Unknown => Ok(None),
            Finiteness::Infinite => self.deletions_all_finite(m, cancel),
        }
    }

    fn deletions_all_finite(&self, m: &ExchangeMatrix, cancel: &CancelToken) -> Result<Option<bool>> {
        let deletions = m.vertex_deletions();
        let aggregator = MinimalityAggregator {
            expected: deletions.len(),
            folded: 0,
            infinite_found: false,
            unknown_found: false,
            error: None,
        };
        let outcome = run_pipeline(
            &self.cfg.pipeline,
            deletions,
            |sub: ExchangeMatrix, token: &CancelToken| self.check_finite(&sub, token),
            aggregator,
            cancel,
        );
        debug!(
            submitted = outcome.submitted,
            completed = outcome.completed,
            stopped_early = outcome.stopped_early,
            "vertex deletions checked"
        );
        outcome.value
    }

    /// Checks every one-vertex extension of the square matrix `m` with arrow
    /// weights in `[-max_weight, max_weight]`.
    ///
    /// # Errors
    /// Returns [`QuiverError::NotSquare`] for non-square input, otherwise see
    /// [`Classifier::check_finite`].
    pub fn survey_extensions(&self, m: &ExchangeMatrix, max_weight: i32, cancel: &CancelToken) -> Result<ExtensionSurvey> {
        self.run_survey(m, max_weight, false, cancel)
    }

    /// Returns whether `m` is mutation-finite while every one-vertex extension
    /// with arrow weights in `[-w, w]`, `w` = [`ClassifierConfig::extension_weight`],
    /// is mutation-infinite. Stops at the first finite extension.
    ///
    /// # Errors
    /// Returns [`QuiverError::NotSquare`] for non-square input, otherwise see
    /// [`Classifier::check_finite`].
    pub fn is_maximally_mutation_finite(&self, m: &ExchangeMatrix, cancel: &CancelToken) -> Result<Option<bool>> {
        if !m.is_square() {
            return Err(QuiverError::NotSquare {
                rows: m.rows(),
                cols: m.cols(),
            });
        }
        match self.check_finite(m, cancel)? {
            Finiteness::Infinite => return Ok(Some(false)),
            Finiteness::Unknown => return Ok(None),
            Finiteness::Finite { .. } => {}
        }
        let survey = self.run_survey(m, self.cfg.extension_weight, true, cancel)?;
        Ok(if survey.finite > 0 {
            Some(false)
        } else if survey.complete && survey.unknown == 0 {
            Some(true)
        } else {
            None
        })
    }

    fn run_survey(
        &self,
        m: &ExchangeMatrix,
        max_weight: i32,
        stop_at_first_finite: bool,
        cancel: &CancelToken,
    ) -> Result<ExtensionSurvey> {
        let extensions = m.extensions(max_weight)?;
        let expected = extensions.total();
        let aggregator = SurveyAggregator {
            survey: ExtensionSurvey::default(),
            expected,
            stop_at_first_finite,
            error: None,
        };
        let outcome = run_pipeline(
            &self.cfg.pipeline,
            extensions,
            |ext: ExchangeMatrix, token: &CancelToken| {
                let verdict = self.check_finite(&ext, token);
                (ext, verdict)
            },
            aggregator,
            cancel,
        );
        debug!(
            expected,
            completed = outcome.completed,
            stopped_early = outcome.stopped_early,
            cancelled = outcome.cancelled,
            "extension survey finished"
        );
        outcome.value
    }
}

// ============================================================================
// Tests
// ============================================================================
