//! Operator feedback for long history walks.
//!
//! Analyzers report through an injected [`Progress`] capability and through
//! `tracing`; neither affects the results.

use std::fmt;

/// Commits between two [`Progress::advanced`] notifications.
pub const REPORT_INTERVAL: usize = 100;

/// The analysis pass a notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Analysis {
    FileChanges,
    Contributors,
    Coupling,
    Timeline,
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Analysis::FileChanges => write!(f, "file changes"),
            Analysis::Contributors => write!(f, "contributors"),
            Analysis::Coupling => write!(f, "change coupling"),
            Analysis::Timeline => write!(f, "timeline"),
        }
    }
}

/// Receiver of progress notifications. Every hook defaults to a no-op.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use oracle_history::progress::{Analysis, Progress};
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl Progress for Counter {
///     fn finished(&self, _analysis: Analysis, commits_processed: usize) {
///         self.0.fetch_add(commits_processed, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait Progress: Send + Sync {
    /// A pass is about to walk history.
    fn started(&self, _analysis: Analysis) {}

    /// Called every [`REPORT_INTERVAL`] commits.
    fn advanced(&self, _analysis: Analysis, _commits_processed: usize) {}

    /// A pass has walked all of its commits.
    fn finished(&self, _analysis: Analysis, _commits_processed: usize) {}
}

/// Discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Progress for Silent {}

/// Per-pass commit counter that fans out to `tracing` and a [`Progress`].
pub(crate) struct Tracker<'a> {
    analysis: Analysis,
    progress: &'a dyn Progress,
    processed: usize,
}

impl<'a> Tracker<'a> {
    pub(crate) fn start(analysis: Analysis, location: &str, progress: &'a dyn Progress) -> Self {
        tracing::info!(%analysis, repository = location, "starting analysis");
        progress.started(analysis);
        Self {
            analysis,
            progress,
            processed: 0,
        }
    }

    pub(crate) fn tick(&mut self) {
        self.processed += 1;
        if self.processed % REPORT_INTERVAL == 0 {
            tracing::debug!(
                analysis = %self.analysis,
                commits = self.processed,
                "processed commits"
            );
            self.progress.advanced(self.analysis, self.processed);
        }
    }

    pub(crate) fn finish(self) -> usize {
        tracing::info!(analysis = %self.analysis, commits = self.processed, "finished analysis");
        self.progress.finished(self.analysis, self.processed);
        self.processed
    }
}
