//! Change frequency analysis.
//!
//! Counts how often each file changes, when it was first and last touched,
//! and who commits to it most.

use chrono::{DateTime, FixedOffset, Utc};
use oracle_core::{DateRange, OracleError};
use serde::{Deserialize, Serialize};

use crate::ledger::{top_n, Ledger};
use crate::progress::{Analysis, Progress, Tracker};
use crate::source::{unique_paths, Commit, CommitSource};

/// Committers listed per file.
const TOP_COMMITTERS: usize = 3;

/// Options for [`analyze_file_changes`].
///
/// # Examples
///
/// ```
/// use oracle_history::frequency::FrequencyOptions;
///
/// let opts = FrequencyOptions::default();
/// assert_eq!(opts.top, 10);
/// assert!(opts.range.is_unbounded());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FrequencyOptions {
    /// Number of files to return (default: 10).
    pub top: usize,
    /// Author-date window to analyze (default: all history).
    pub range: DateRange,
}

impl Default for FrequencyOptions {
    fn default() -> Self {
        Self {
            top: 10,
            range: DateRange::UNBOUNDED,
        }
    }
}

/// The commit at one end of a file's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    pub commit_id: String,
    pub author_name: String,
    pub date: DateTime<FixedOffset>,
}

impl From<&Commit> for CommitRef {
    fn from(commit: &Commit) -> Self {
        Self {
            commit_id: commit.id.clone(),
            author_name: commit.author_name.clone(),
            date: commit.time,
        }
    }
}

/// How many of a file's changes one committer made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitterStat {
    pub name: String,
    pub commit_count: u32,
}

/// Change history summary for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangeStat {
    /// File path relative to repo root.
    pub path: String,
    /// Non-merge commits that changed the file.
    pub change_count: u32,
    /// Oldest commit that changed the file.
    pub first_change: CommitRef,
    /// Newest commit that changed the file.
    pub last_change: CommitRef,
    /// Up to three committers, most frequent first.
    pub top_committers: Vec<CommitterStat>,
}

/// Result of [`analyze_file_changes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangeReport {
    pub repository_path: String,
    pub analyzed_at: DateTime<Utc>,
    /// Most frequently changed files, highest change count first.
    pub files: Vec<FileChangeStat>,
    /// Distinct paths seen across all analyzed commits.
    pub total_files_analyzed: usize,
    /// Commits listed by the source, merges included.
    pub total_commits_analyzed: usize,
}

struct FileTally<'a> {
    path: String,
    change_count: u32,
    first: &'a Commit,
    last: &'a Commit,
    committers: Ledger<String, CommitterStat>,
}

impl<'a> FileTally<'a> {
    fn new(path: &str, commit: &'a Commit) -> Self {
        Self {
            path: path.to_string(),
            change_count: 0,
            first: commit,
            last: commit,
            committers: Ledger::new(),
        }
    }

    fn record(&mut self, commit: &'a Commit) {
        self.change_count += 1;
        // History arrives newest first, so every later sighting is older.
        self.first = commit;
        self.committers
            .get_or_insert_with(commit.committer_name.as_str(), || CommitterStat {
                name: commit.committer_name.clone(),
                commit_count: 0,
            })
            .commit_count += 1;
    }

    fn into_stat(self) -> FileChangeStat {
        let top_committers = top_n(self.committers.into_values(), TOP_COMMITTERS, |a, b| {
            b.commit_count.cmp(&a.commit_count)
        });
        FileChangeStat {
            path: self.path,
            change_count: self.change_count,
            first_change: CommitRef::from(self.first),
            last_change: CommitRef::from(self.last),
            top_committers,
        }
    }
}

/// Rank files by how many non-merge commits changed them.
///
/// The root commit counts as changing every file in its tree. A commit whose
/// diff cannot be computed is logged and skipped.
///
/// # Errors
///
/// Returns an error only if the source cannot list commits.
///
/// # Examples
///
/// ```
/// use oracle_history::frequency::{analyze_file_changes, FrequencyOptions};
/// use oracle_history::memory::MemorySource;
/// use oracle_history::progress::Silent;
/// use oracle_history::source::LineDelta;
///
/// let when = chrono::DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z").unwrap();
/// let mut history = MemorySource::new("memory://demo");
/// history
///     .record("c1", "alice", "alice@example.com", when, vec![LineDelta::new("a.txt", 3, 0)])
///     .record("c2", "bob", "bob@example.com", when, vec![LineDelta::new("a.txt", 1, 1)]);
///
/// let report = analyze_file_changes(&history, &FrequencyOptions::default(), &Silent).unwrap();
/// assert_eq!(report.files[0].path, "a.txt");
/// assert_eq!(report.files[0].change_count, 2);
/// ```
pub fn analyze_file_changes<S: CommitSource + ?Sized>(
    source: &S,
    options: &FrequencyOptions,
    progress: &dyn Progress,
) -> Result<FileChangeReport, OracleError> {
    let repository_path = source.location();
    let commits = source.list_commits(&options.range)?;
    let mut tracker = Tracker::start(Analysis::FileChanges, &repository_path, progress);

    let mut files: Ledger<String, FileTally<'_>> = Ledger::new();

    for commit in &commits {
        tracker.tick();

        let Some(base) = commit.diff_base() else {
            continue;
        };
        let paths = match source.diff_paths(base, &commit.id) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!(
                    commit = commit.short_id(),
                    error = %e,
                    "skipping commit: diff failed"
                );
                continue;
            }
        };

        for path in unique_paths(paths) {
            files
                .get_or_insert_with(path.as_str(), || FileTally::new(&path, commit))
                .record(commit);
        }
    }

    tracker.finish();
    let total_files_analyzed = files.len();
    tracing::info!(files = total_files_analyzed, "found files with changes");

    let ranked = top_n(files.into_values(), options.top, |a, b| {
        b.change_count.cmp(&a.change_count)
    });

    Ok(FileChangeReport {
        repository_path,
        analyzed_at: Utc::now(),
        files: ranked.into_iter().map(FileTally::into_stat).collect(),
        total_files_analyzed,
        total_commits_analyzed: commits.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySource;
    use crate::progress::Silent;
    use crate::source::LineDelta;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn touch(paths: &[&str]) -> Vec<LineDelta> {
        paths.iter().map(|p| LineDelta::new(*p, 1, 0)).collect()
    }

    fn analyze(history: &MemorySource, top: usize) -> FileChangeReport {
        let options = FrequencyOptions {
            top,
            ..FrequencyOptions::default()
        };
        analyze_file_changes(history, &options, &Silent).unwrap()
    }

    fn three_commit_history() -> MemorySource {
        let mut history = MemorySource::new("memory://test");
        history
            .record(
                "c1",
                "alice",
                "alice@e.com",
                at("2024-01-01T10:00:00Z"),
                touch(&["a.txt", "b.txt"]),
            )
            .record(
                "c2",
                "bob",
                "bob@e.com",
                at("2024-01-02T10:00:00Z"),
                touch(&["a.txt", "b.txt"]),
            )
            .record("c3", "alice", "alice@e.com", at("2024-01-03T10:00:00Z"), touch(&["a.txt"]));
        history
    }

    #[test]
    fn counts_changes_including_root_commit() {
        let report = analyze(&three_commit_history(), 10);
        assert_eq!(report.total_files_analyzed, 2);
        assert_eq!(report.total_commits_analyzed, 3);
        assert_eq!(report.files[0].path, "a.txt");
        assert_eq!(report.files[0].change_count, 3);
        assert_eq!(report.files[1].path, "b.txt");
        assert_eq!(report.files[1].change_count, 2);
    }

    #[test]
    fn first_and_last_change_follow_history() {
        let report = analyze(&three_commit_history(), 10);
        let a = &report.files[0];
        assert_eq!(a.first_change.commit_id, "c1");
        assert_eq!(a.last_change.commit_id, "c3");
        assert_eq!(a.last_change.author_name, "alice");

        let b = &report.files[1];
        assert_eq!(b.first_change.commit_id, "c1");
        assert_eq!(b.last_change.commit_id, "c2");
        assert_eq!(b.last_change.date, at("2024-01-02T10:00:00Z"));
    }

    #[test]
    fn top_committers_are_ranked_and_capped() {
        let mut history = MemorySource::new("memory://test");
        let authors = ["ann", "bo", "bo", "cy", "cy", "cy", "di"];
        for (i, author) in authors.iter().enumerate() {
            history.record(
                &format!("c{i}"),
                author,
                &format!("{author}@e.com"),
                at("2024-01-01T10:00:00Z"),
                touch(&["main.rs"]),
            );
        }

        let report = analyze(&history, 10);
        let committers = &report.files[0].top_committers;
        assert_eq!(committers.len(), 3);
        assert_eq!(committers[0].name, "cy");
        assert_eq!(committers[0].commit_count, 3);
        assert_eq!(committers[1].name, "bo");
        assert_eq!(committers[1].commit_count, 2);
    }

    #[test]
    fn merge_commits_are_excluded() {
        let mut history = three_commit_history();
        history.record_commit(
            Commit {
                id: "m1".into(),
                author_name: "alice".into(),
                author_email: "alice@e.com".into(),
                committer_name: "alice".into(),
                time: at("2024-01-04T10:00:00Z"),
                parents: vec!["c3".into(), "side".into()],
            },
            touch(&["a.txt", "c.txt"]),
        );

        let report = analyze(&history, 10);
        assert_eq!(report.total_commits_analyzed, 4);
        assert_eq!(report.files[0].change_count, 3);
        assert!(report.files.iter().all(|f| f.path != "c.txt"));
    }

    #[test]
    fn failed_diff_skips_only_that_commit() {
        let mut history = three_commit_history();
        history.break_diff("c2");

        let report = analyze(&history, 10);
        assert_eq!(report.files[0].change_count, 2);
        assert_eq!(report.files[1].change_count, 1);
    }

    #[test]
    fn result_is_truncated_and_sorted() {
        let mut history = MemorySource::new("memory://test");
        for i in 0..6 {
            let paths: Vec<String> = (0..=i).map(|n| format!("f{n}.rs")).collect();
            let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
            history.record(
                &format!("c{i}"),
                "alice",
                "a@e.com",
                at("2024-01-01T10:00:00Z"),
                touch(&paths),
            );
        }

        let report = analyze(&history, 3);
        assert_eq!(report.files.len(), 3);
        assert_eq!(report.total_files_analyzed, 6);
        assert!(report
            .files
            .windows(2)
            .all(|w| w[0].change_count >= w[1].change_count));
        assert_eq!(report.files[0].path, "f0.rs");
    }

    #[test]
    fn ties_keep_first_sighting_order() {
        // Equal counts rank in the order the walk first met each path. The
        // walk is newest first, so recording the same two commits in the
        // opposite order flips the tie.
        let mut forward = MemorySource::new("memory://test");
        forward
            .record("c1", "alice", "a@e.com", at("2024-01-01T10:00:00Z"), touch(&["x.rs"]))
            .record("c2", "alice", "a@e.com", at("2024-01-02T10:00:00Z"), touch(&["y.rs"]));
        let mut reversed = MemorySource::new("memory://test");
        reversed
            .record("c1", "alice", "a@e.com", at("2024-01-01T10:00:00Z"), touch(&["y.rs"]))
            .record("c2", "alice", "a@e.com", at("2024-01-02T10:00:00Z"), touch(&["x.rs"]));

        let paths = |report: FileChangeReport| -> Vec<String> {
            report.files.into_iter().map(|f| f.path).collect()
        };
        assert_eq!(paths(analyze(&forward, 10)), vec!["y.rs", "x.rs"]);
        assert_eq!(paths(analyze(&reversed, 10)), vec!["x.rs", "y.rs"]);
    }

    #[test]
    fn range_limits_analyzed_commits() {
        let options = FrequencyOptions {
            top: 10,
            range: DateRange::parse(Some("2024-01-02"), None).unwrap(),
        };
        let report = analyze_file_changes(&three_commit_history(), &options, &Silent).unwrap();
        assert_eq!(report.total_commits_analyzed, 2);
        assert_eq!(report.files[0].change_count, 2);
        assert_eq!(report.files[0].first_change.commit_id, "c2");
    }

    #[test]
    fn repeated_runs_are_identical() {
        let history = three_commit_history();
        let first = analyze(&history, 10);
        let second = analyze(&history, 10);
        assert_eq!(first.files, second.files);
        assert_eq!(first.total_files_analyzed, second.total_files_analyzed);
        assert_eq!(first.total_commits_analyzed, second.total_commits_analyzed);
    }
}
