//! Producer / worker-pool / aggregator pipeline with cooperative cancellation.
//!
//! ```text
//!  producer ──bounded──▶ workers (N threads) ──unbounded──▶ aggregator
//!     ▲                      ▲                                  │
//!     └──────────── CancelToken (request_stop) ◀────────────────┘
//! ```
//!
//! - The producer pulls sub-tasks from an iterator and blocks (never drops) when
//!   the task queue is full.
//! - Workers run one sub-task at a time and push results in completion order.
//! - The aggregator runs on the calling thread, folds every result and may stop
//!   the run as soon as the combined answer is decided. Results arriving after
//!   that point are discarded.
//!
//! Cancellation is advisory: a stopped pipeline submits nothing new, but a task
//! already running finishes (it can poll the token to finish early).

use crossbeam::channel::{self, RecvTimeoutError, SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

// ============================================================================
// CancelToken
// ============================================================================

#[derive(Debug, Default)]
struct CancelInner {
    stopped: AtomicBool,
    parent: Option<Arc<CancelInner>>,
}

impl CancelInner {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
            || self.parent.as_ref().is_some_and(|p| p.is_stopped())
    }
}

/// Cloneable cooperative cancellation flag.
///
/// A child token observes its parent's stop request, but stopping the child
/// leaves the parent running.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    /// Creates a token that has not been stopped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that is stopped whenever `self` is.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(CancelInner {
                stopped: AtomicBool::new(false),
                parent: Some(Arc::clone(&self.inner)),
            }),
        }
    }

    /// Asks every holder of this token (and its children) to stop.
    pub fn request_stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
    }

    /// Returns `true` once this token or one of its ancestors was stopped.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Sizing of a pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Capacity of the task queue between producer and workers.
    pub queue_capacity: usize,
    /// How long blocked threads wait before re-checking for cancellation.
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(std::num::NonZero::get)
            .unwrap_or(4);
        Self {
            workers,
            queue_capacity: workers * 2,
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl PipelineConfig {
    /// Default sizing with a fixed number of workers.
    pub fn with_workers(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            queue_capacity: workers * 2,
            ..Self::default()
        }
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Whether the aggregator needs more results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep folding results.
    Continue,
    /// The answer is decided; stop the pipeline.
    Stop,
}

/// Folds sub-task results, in completion order, into one answer.
///
/// Folding must be order independent: results arrive as workers finish.
pub trait Aggregator<R> {
    /// Final answer.
    type Output;

    /// Folds one result.
    fn fold(&mut self, result: R) -> Flow;

    /// Produces the answer from everything folded so far.
    fn finish(self) -> Self::Output;
}

/// Lifecycle of a pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Producer still emitting, aggregator draining.
    Running,
    /// Producer finished; remaining results are being drained.
    Draining,
    /// The aggregator returned its answer.
    Done,
}

/// Result of [`run_pipeline`].
#[derive(Clone, Debug)]
pub struct PipelineOutcome<T> {
    /// The aggregator's answer.
    pub value: T,
    /// Tasks handed to the worker queue.
    pub submitted: usize,
    /// Results folded by the aggregator.
    pub completed: usize,
    /// The aggregator stopped the run before all tasks were folded.
    pub stopped_early: bool,
    /// The caller's token was stopped before the run finished.
    pub cancelled: bool,
    /// States visited, in order; always ends with [`PipelineState::Done`].
    pub transitions: Vec<PipelineState>,
}

// ============================================================================
// Runner
// ============================================================================

/// Runs `tasks` through a pool of `config.workers` threads executing `worker`,
/// folding results with `aggregator`.
///
/// Returns once the aggregator is done: either every result was folded, the
/// aggregator returned [`Flow::Stop`], or `cancel` was stopped. In every case
/// all threads have been joined on return.
pub fn run_pipeline<I, T, R, W, A>(
    config: &PipelineConfig,
    tasks: I,
    worker: W,
    mut aggregator: A,
    cancel: &CancelToken,
) -> PipelineOutcome<A::Output>
where
    I: IntoIterator<Item = T>,
    I::IntoIter: Send,
    T: Send,
    R: Send,
    W: Fn(T, &CancelToken) -> R + Sync,
    A: Aggregator<R>,
{
    let stop = cancel.child();
    let poll = config.poll_interval;
    let (task_tx, task_rx) = channel::bounded::<T>(config.queue_capacity.max(1));
    let (done_tx, done_rx) = channel::unbounded::<R>();
    let submitted = AtomicUsize::new(0);
    let producer_done = AtomicBool::new(false);

    let mut transitions = vec![PipelineState::Running];
    let mut completed = 0usize;
    let mut stopped_early = false;
    let mut cancelled = false;

    thread::scope(|s| {
        {
            let stop = stop.clone();
            let submitted = &submitted;
            let producer_done = &producer_done;
            let tasks = tasks.into_iter();
            s.spawn(move || {
                produce(tasks, task_tx, &stop, poll, submitted);
                producer_done.store(true, Ordering::Release);
            });
        }

        for worker_id in 0..config.workers.max(1) {
            let rx = task_rx.clone();
            let tx = done_tx.clone();
            let stop = stop.clone();
            let worker = &worker;
            s.spawn(move || {
                while !stop.is_stopped() {
                    match rx.recv_timeout(poll) {
                        Ok(task) => {
                            if stop.is_stopped() {
                                break;
                            }
                            let result = worker(task, &stop);
                            if tx.send(result).is_err() {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                trace!(worker_id, "pipeline worker exiting");
            });
        }
        drop(task_rx);
        drop(done_tx);

        let mut state = PipelineState::Running;
        loop {
            if cancel.is_stopped() {
                cancelled = true;
                break;
            }
            if state == PipelineState::Running && producer_done.load(Ordering::Acquire) {
                state = PipelineState::Draining;
                transitions.push(state);
                debug!(submitted = submitted.load(Ordering::Relaxed), "pipeline draining");
            }
            match done_rx.recv_timeout(poll) {
                Ok(result) => {
                    completed += 1;
                    if aggregator.fold(result) == Flow::Stop {
                        stopped_early = true;
                        debug!(completed, "aggregator decided, stopping pipeline");
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    if state == PipelineState::Running {
                        transitions.push(PipelineState::Draining);
                    }
                    break;
                }
            }
        }
        // Releases a producer blocked on a full queue and idle workers.
        stop.request_stop();
        drop(done_rx);
    });

    transitions.push(PipelineState::Done);
    PipelineOutcome {
        value: aggregator.finish(),
        submitted: submitted.load(Ordering::Relaxed),
        completed,
        stopped_early,
        cancelled,
        transitions,
    }
}

fn produce<T, I: Iterator<Item = T>>(
    tasks: I,
    tx: Sender<T>,
    stop: &CancelToken,
    poll: Duration,
    submitted: &AtomicUsize,
) {
    for mut task in tasks {
        loop {
            if stop.is_stopped() {
                return;
            }
            match tx.send_timeout(task, poll) {
                Ok(()) => {
                    submitted.fetch_add(1, Ordering::Relaxed);
                    break;
                }
                // Queue full: keep the task and wait again.
                Err(SendTimeoutError::Timeout(back)) => task = back,
                Err(SendTimeoutError::Disconnected(_)) => return,
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct Sum {
        total: u64,
        folds: usize,
        stop_at: Option<u64>,
    }

    impl Aggregator<u64> for Sum {
        type Output = (u64, usize);

        fn fold(&mut self, result: u64) -> Flow {
            self.total += result;
            self.folds += 1;
            match self.stop_at {
                Some(limit) if result >= limit => Flow::Stop,
                _ => Flow::Continue,
            }
        }

        fn finish(self) -> (u64, usize) {
            (self.total, self.folds)
        }
    }

    fn sum(stop_at: Option<u64>) -> Sum {
        Sum { total: 0, folds: 0, stop_at }
    }

    fn fast_config(workers: usize, capacity: usize) -> PipelineConfig {
        PipelineConfig {
            workers,
            queue_capacity: capacity,
            poll_interval: Duration::from_millis(5),
        }
    }

    #[test]
    fn all_results_are_folded() {
        let out = run_pipeline(
            &fast_config(4, 8),
            0..100u64,
            |x, _| x * 2,
            sum(None),
            &CancelToken::new(),
        );
        assert_eq!(out.value, (9_900, 100));
        assert_eq!(out.submitted, 100);
        assert_eq!(out.completed, 100);
        assert!(!out.stopped_early);
        assert!(!out.cancelled);
        assert_eq!(
            out.transitions,
            vec![PipelineState::Running, PipelineState::Draining, PipelineState::Done]
        );
    }

    #[test]
    fn backpressure_loses_no_results() {
        let out = run_pipeline(
            &fast_config(1, 1),
            0..50u64,
            |x, _| {
                thread::sleep(Duration::from_millis(1));
                x
            },
            sum(None),
            &CancelToken::new(),
        );
        assert_eq!(out.value, (1_225, 50));
        assert_eq!(out.completed, 50);
    }

    #[test]
    fn aggregator_stop_ends_run_early() {
        let started = Instant::now();
        let out = run_pipeline(
            &fast_config(2, 2),
            0..10_000u64,
            |x, _| {
                thread::sleep(Duration::from_millis(1));
                x
            },
            sum(Some(5)),
            &CancelToken::new(),
        );
        assert!(out.stopped_early);
        assert!(out.completed < 10_000);
        // Nothing is folded after the deciding result.
        assert_eq!(out.value.1, out.completed);
        assert!(out.submitted < 10_000);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(out.transitions.last(), Some(&PipelineState::Done));
    }

    #[test]
    fn stop_does_not_cancel_the_parent_token() {
        let parent = CancelToken::new();
        let out = run_pipeline(&fast_config(2, 2), 0..100u64, |x, _| x, sum(Some(0)), &parent);
        assert!(out.stopped_early);
        assert!(!parent.is_stopped());
    }

    #[test]
    fn cancelled_token_returns_without_work() {
        let cancel = CancelToken::new();
        cancel.request_stop();
        let out = run_pipeline(&fast_config(2, 2), 0..100u64, |x, _| x, sum(None), &cancel);
        assert!(out.cancelled);
        assert_eq!(out.completed, 0);
        assert_eq!(out.transitions, vec![PipelineState::Running, PipelineState::Done]);
    }

    #[test]
    fn running_tasks_observe_stop_request() {
        // The first task finishes immediately and decides the answer; the others
        // spin until they see the stop request.
        let out = run_pipeline(
            &fast_config(3, 3),
            0..3u64,
            |x, stop| {
                if x == 0 {
                    return 100;
                }
                let deadline = Instant::now() + Duration::from_secs(30);
                while !stop.is_stopped() && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(1));
                }
                x
            },
            sum(Some(100)),
            &CancelToken::new(),
        );
        assert!(out.stopped_early);
        assert_eq!(out.value, (100, 1));
    }

    #[test]
    fn empty_task_stream_finishes() {
        let out = run_pipeline(
            &fast_config(2, 2),
            std::iter::empty::<u64>(),
            |x, _| x,
            sum(None),
            &CancelToken::new(),
        );
        assert_eq!(out.value, (0, 0));
        assert_eq!(out.transitions.last(), Some(&PipelineState::Done));
    }

    #[test]
    fn child_token_follows_parent() {
        let parent = CancelToken::new();
        let child = parent.child();
        let grandchild = child.child();
        assert!(!grandchild.is_stopped());
        parent.request_stop();
        assert!(child.is_stopped());
        assert!(grandchild.is_stopped());

        let other = CancelToken::new();
        let sub = other.child();
        sub.request_stop();
        assert!(!other.is_stopped());
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.workers > 0);
        assert!(cfg.queue_capacity >= cfg.workers);
        assert_eq!(PipelineConfig::with_workers(0).workers, 1);
    }
}
