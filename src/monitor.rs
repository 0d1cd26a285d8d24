//! Progress reporting and cooperative cancellation.
//!
//! Long computations report `(percent, phase)` events to a [`Monitor`] and
//! poll it for cancellation at safe points (between trial batches). A
//! cancelled computation returns [`Outcome::Cancelled`], which is neither a
//! result nor an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Highest percentage reported before a phase has completed.
pub const MAX_RUNNING_PERCENT: u32 = 99;

/// Sink for progress events and source of the cancellation request.
pub trait Monitor: Sync {
    /// Called at milestones with a percentage in `0..=99` and a phase name.
    fn progress(&self, percent: u32, phase: &str);

    /// Whether the caller has asked the computation to stop.
    fn is_cancelled(&self) -> bool;
}

/// No reporting, never cancelled.
impl Monitor for () {
    fn progress(&self, _percent: u32, _phase: &str) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Result of a computation that may be cancelled.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Complete(T),
    Cancelled,
}

impl<T> Outcome<T> {
    /// Whether the computation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// The completed value, if any.
    pub fn complete(self) -> Option<T> {
        match self {
            Outcome::Complete(v) => Some(v),
            Outcome::Cancelled => None,
        }
    }

    /// Map the completed value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Complete(v) => Outcome::Complete(f(v)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

type ProgressCallback = Arc<dyn Fn(u32, &str) + Send + Sync>;

/// [`Monitor`] backed by a shared cancellation flag and an optional callback.
///
/// Cloning shares the flag, so a clone handed to another thread can cancel a
/// computation running on this one.
#[derive(Clone, Default)]
pub struct Controller {
    cancelled: Arc<AtomicBool>,
    callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("cancelled", &self.is_cancelled())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl Controller {
    /// A controller without progress callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// A controller forwarding progress events to `callback`.
    pub fn with_callback<F>(callback: F) -> Self
    where
        F: Fn(u32, &str) + Send + Sync + 'static,
    {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            callback: Some(Arc::new(callback)),
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation request.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Shared handle to the cancellation flag.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

impl Monitor for Controller {
    fn progress(&self, percent: u32, phase: &str) {
        if let Some(cb) = &self.callback {
            cb(percent.min(MAX_RUNNING_PERCENT), phase);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Percentage of `done` out of `total` units, clamped to `0..=99`.
pub fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let p = (done as u128 * 100 / total as u128) as u32;
    p.min(MAX_RUNNING_PERCENT)
}

/// Monitor handed to one unit of a job made of `total` equal units.
///
/// The unit's own progress is rescaled into its share of the job and reported
/// under the job's phase, so the parent sees one non-decreasing percentage.
/// Cancellation is forwarded unchanged.
pub(crate) struct Subtask<'a, M: ?Sized> {
    parent: &'a M,
    phase: &'a str,
    done: usize,
    total: usize,
}

impl<'a, M: Monitor + ?Sized> Subtask<'a, M> {
    /// Unit `done` (0-based) of `total`.
    pub(crate) fn new(parent: &'a M, phase: &'a str, done: usize, total: usize) -> Self {
        Self {
            parent,
            phase,
            done,
            total,
        }
    }
}

impl<M: Monitor + ?Sized> Monitor for Subtask<'_, M> {
    fn progress(&self, percent: u32, _phase: &str) {
        if self.total == 0 {
            return;
        }
        let within = u128::from(percent.min(100));
        let overall = (self.done as u128 * 100 + within) / self.total as u128;
        self.parent
            .progress((overall as u32).min(MAX_RUNNING_PERCENT), self.phase);
    }

    fn is_cancelled(&self) -> bool {
        self.parent.is_cancelled()
    }
}
