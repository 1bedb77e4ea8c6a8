//! Contributor analysis.
//!
//! Ranks author identities by commit count and totals the lines each one
//! added and deleted.

use chrono::{DateTime, FixedOffset, Utc};
use oracle_core::{DateRange, OracleError};
use serde::{Deserialize, Serialize};

use crate::ledger::{top_n, Ledger};
use crate::progress::{Analysis, Progress, Tracker};
use crate::source::{Commit, CommitSource};

/// Options for [`analyze_contributors`].
#[derive(Debug, Clone, Copy)]
pub struct ContributorOptions {
    /// Number of contributors to return (default: 10).
    pub top: usize,
    /// Author-date window to analyze (default: all history).
    pub range: DateRange,
}

impl Default for ContributorOptions {
    fn default() -> Self {
        Self {
            top: 10,
            range: DateRange::UNBOUNDED,
        }
    }
}

/// Activity of one `(name, email)` identity.
///
/// Name and email variants of the same person are separate identities.
///
/// # Examples
///
/// ```
/// use oracle_history::contributors::ContributorStat;
///
/// let at = |s| chrono::DateTime::parse_from_rfc3339(s).unwrap();
/// let stat = ContributorStat {
///     name: "alice".into(),
///     email: "alice@example.com".into(),
///     commit_count: 4,
///     lines_added: 300,
///     lines_deleted: 100,
///     first_commit: at("2024-01-01T09:00:00Z"),
///     last_commit: at("2024-01-15T09:00:00Z"),
///     average_lines_per_week: 200.0,
/// };
/// assert_eq!(stat.total_lines_changed(), 400);
/// assert_eq!(stat.active_weeks(), 2.0);
/// assert_eq!(stat.average_lines_per_commit(), 100.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorStat {
    pub name: String,
    pub email: String,
    /// Commits authored, merges included.
    pub commit_count: u32,
    pub lines_added: u64,
    pub lines_deleted: u64,
    /// Earliest author time seen.
    pub first_commit: DateTime<FixedOffset>,
    /// Latest author time seen.
    pub last_commit: DateTime<FixedOffset>,
    /// Lines changed per active week; the plain total when every commit
    /// falls on the same calendar day.
    pub average_lines_per_week: f64,
}

impl ContributorStat {
    fn new(commit: &Commit) -> Self {
        Self {
            name: commit.author_name.clone(),
            email: commit.author_email.clone(),
            commit_count: 0,
            lines_added: 0,
            lines_deleted: 0,
            first_commit: commit.time,
            last_commit: commit.time,
            average_lines_per_week: 0.0,
        }
    }

    pub fn total_lines_changed(&self) -> u64 {
        self.lines_added + self.lines_deleted
    }

    pub fn average_lines_per_commit(&self) -> f64 {
        if self.commit_count == 0 {
            return 0.0;
        }
        self.total_lines_changed() as f64 / f64::from(self.commit_count)
    }

    /// Calendar days between the first and last commit.
    pub fn active_days(&self) -> i64 {
        self.last_commit
            .date_naive()
            .signed_duration_since(self.first_commit.date_naive())
            .num_days()
            .max(0)
    }

    /// Active span in weeks, fractional: `active_days() / 7`.
    pub fn active_weeks(&self) -> f64 {
        self.active_days() as f64 / 7.0
    }

    fn record(&mut self, commit: &Commit) {
        self.commit_count += 1;
        if commit.time < self.first_commit {
            self.first_commit = commit.time;
        }
        if commit.time > self.last_commit {
            self.last_commit = commit.time;
        }
    }

    fn finalize(&mut self) {
        let total = self.total_lines_changed() as f64;
        self.average_lines_per_week = match self.active_days() {
            0 => total,
            _ => total / self.active_weeks(),
        };
    }
}

/// Result of [`analyze_contributors`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorReport {
    pub repository_path: String,
    pub analyzed_at: DateTime<Utc>,
    /// Top contributors by commit count, then by lines changed.
    pub contributors: Vec<ContributorStat>,
    pub total_commits: usize,
    /// Distinct identities seen, not just those returned.
    pub total_contributors: usize,
}

/// Rank contributors by commit count.
///
/// Every listed commit counts toward its author's total. Line counts come
/// from a diff against the single parent; merges and commits whose diff
/// fails add no lines.
///
/// # Errors
///
/// Returns an error only if the source cannot list commits.
pub fn analyze_contributors<S: CommitSource + ?Sized>(
    source: &S,
    options: &ContributorOptions,
    progress: &dyn Progress,
) -> Result<ContributorReport, OracleError> {
    let repository_path = source.location();
    let commits = source.list_commits(&options.range)?;
    let mut tracker = Tracker::start(Analysis::Contributors, &repository_path, progress);

    let mut contributors: Ledger<String, ContributorStat> = Ledger::new();

    for commit in &commits {
        tracker.tick();

        let stat = contributors
            .get_or_insert_with(commit.identity().as_str(), || ContributorStat::new(commit));
        stat.record(commit);

        let Some(base) = commit.diff_base() else {
            continue;
        };
        match source.diff_line_counts(base, &commit.id) {
            Ok(deltas) => {
                for delta in deltas {
                    stat.lines_added += delta.added;
                    stat.lines_deleted += delta.deleted;
                }
            }
            Err(e) => {
                tracing::warn!(
                    commit = commit.short_id(),
                    error = %e,
                    "no line counts for commit: diff failed"
                );
            }
        }
    }

    tracker.finish();
    let total_contributors = contributors.len();
    tracing::info!(contributors = total_contributors, "found contributors");

    let mut stats = contributors.into_values();
    for stat in &mut stats {
        stat.finalize();
    }
    let ranked = top_n(stats, options.top, |a, b| {
        b.commit_count
            .cmp(&a.commit_count)
            .then_with(|| b.total_lines_changed().cmp(&a.total_lines_changed()))
    });

    Ok(ContributorReport {
        repository_path,
        analyzed_at: Utc::now(),
        contributors: ranked,
        total_commits: commits.len(),
        total_contributors,
    })
}
