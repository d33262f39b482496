use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::{Result, StitchError};

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Resizing,
    FeatureExtraction,
    Matching,
    Compositing,
    LoadingChips,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resizing => write!(f, "Harmonizing dimensions"),
            Self::FeatureExtraction => write!(f, "Extracting features"),
            Self::Matching => write!(f, "Matching borders"),
            Self::Compositing => write!(f, "Compositing"),
            Self::LoadingChips => write!(f, "Loading chip images"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// One progress milestone: overall percentage plus a human-readable message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub message: String,
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., tile count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}

    /// Overall progress in percent (0-100, non-decreasing) with a message.
    fn report(&self, _event: ProgressEvent) {}
}

/// No-op progress reporter.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Cooperative cancellation flag shared between a job and its owner.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(StitchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Maps stage-local progress onto the overall 0-100 scale and keeps it
/// monotonic.
pub(crate) struct Milestones<'a> {
    reporter: &'a dyn ProgressReporter,
    last: AtomicU8,
}

impl<'a> Milestones<'a> {
    pub(crate) fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            reporter,
            last: AtomicU8::new(0),
        }
    }

    pub(crate) fn reporter(&self) -> &'a dyn ProgressReporter {
        self.reporter
    }

    pub(crate) fn emit(&self, percent: u8, message: impl Into<String>) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        self.reporter.report(ProgressEvent {
            percent: percent.max(previous),
            message: message.into(),
        });
    }
}

/// Position `done` of `total` within a percent span.
pub(crate) fn span_percent(span: (u8, u8), done: usize, total: usize) -> u8 {
    if total == 0 {
        return span.1;
    }
    let width = (span.1 - span.0) as usize;
    span.0 + (width * done.min(total) / total) as u8
}
