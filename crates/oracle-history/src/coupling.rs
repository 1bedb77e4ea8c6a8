//! Change coupling detection.
//!
//! Identifies pairs of files that change together in the same commits,
//! which may indicate hidden dependencies between them.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use oracle_core::{validate_threshold, DateRange, OracleError};
use serde::{Deserialize, Serialize};

use crate::ledger::{top_n, Ledger};
use crate::progress::{Analysis, Progress, Tracker};
use crate::source::{unique_paths, CommitSource};

/// Options for [`analyze_coupling`].
#[derive(Debug, Clone, Copy)]
pub struct CouplingOptions {
    /// Number of pairs to return (default: 10).
    pub top: usize,
    /// Author-date window to analyze (default: all history).
    pub range: DateRange,
    /// Minimum coupling strength in `[0, 1]` (default: 0.1).
    pub min_strength: f64,
}

impl Default for CouplingOptions {
    fn default() -> Self {
        Self {
            top: 10,
            range: DateRange::UNBOUNDED,
            min_strength: 0.1,
        }
    }
}

/// A pair of files that changed together.
///
/// # Examples
///
/// ```
/// use oracle_history::coupling::FileCouplingStat;
///
/// let at = chrono::DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z").unwrap();
/// let pair = FileCouplingStat {
///     file_path1: "src/auth.rs".into(),
///     file_path2: "src/session.rs".into(),
///     coupling_count: 15,
///     coupling_strength: 0.75,
///     shared_commits: vec![],
///     first_shared_commit: at,
///     last_shared_commit: at,
/// };
/// assert!(pair.file_path1 < pair.file_path2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCouplingStat {
    /// Ordinally lesser path of the pair.
    pub file_path1: String,
    /// Ordinally greater path of the pair.
    pub file_path2: String,
    /// Non-merge commits that changed both files.
    pub coupling_count: u32,
    /// `coupling_count / min(changes of file1, changes of file2)`.
    pub coupling_strength: f64,
    /// Commits that changed both files, newest first.
    pub shared_commits: Vec<String>,
    pub first_shared_commit: DateTime<FixedOffset>,
    pub last_shared_commit: DateTime<FixedOffset>,
}

/// Change count of one file, with the commits that changed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangeFrequency {
    pub file_path: String,
    pub change_count: u32,
    /// Newest first.
    pub commit_ids: Vec<String>,
}

/// Result of [`analyze_coupling`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplingReport {
    pub repository_path: String,
    pub analyzed_at: DateTime<Utc>,
    pub since: Option<NaiveDateTime>,
    pub min_coupling_strength: f64,
    /// Strongest pairs by coupling count, then strength.
    pub coupled_files: Vec<FileCouplingStat>,
    /// Every file seen, most frequently changed first.
    pub file_frequencies: Vec<FileChangeFrequency>,
    pub total_commits_analyzed: usize,
    pub total_files_analyzed: usize,
}

struct PairTally {
    file_path1: String,
    file_path2: String,
    count: u32,
    first: DateTime<FixedOffset>,
    last: DateTime<FixedOffset>,
}

impl PairTally {
    fn record(&mut self, when: DateTime<FixedOffset>) {
        self.count += 1;
        if when < self.first {
            self.first = when;
        }
        if when > self.last {
            self.last = when;
        }
    }
}

/// Find file pairs that change together.
///
/// Merge commits are ignored. Pairs weaker than `min_strength` are dropped
/// before ranking. A commit whose diff fails is logged and skipped.
///
/// # Errors
///
/// Returns [`OracleError::Config`] for a threshold outside `[0, 1]`, checked
/// before any history is read, or an error if the source cannot list commits.
///
/// # Examples
///
/// ```
/// use oracle_history::coupling::{analyze_coupling, CouplingOptions};
/// use oracle_history::memory::MemorySource;
/// use oracle_history::progress::Silent;
/// use oracle_history::source::LineDelta;
///
/// let when = chrono::DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z").unwrap();
/// let both = || vec![LineDelta::new("a.rs", 1, 0), LineDelta::new("b.rs", 1, 0)];
/// let mut history = MemorySource::new("memory://demo");
/// history
///     .record("c1", "alice", "alice@example.com", when, both())
///     .record("c2", "alice", "alice@example.com", when, both());
///
/// let report = analyze_coupling(&history, &CouplingOptions::default(), &Silent).unwrap();
/// assert_eq!(report.coupled_files.len(), 1);
/// assert_eq!(report.coupled_files[0].coupling_count, 2);
/// ```
pub fn analyze_coupling<S: CommitSource + ?Sized>(
    source: &S,
    options: &CouplingOptions,
    progress: &dyn Progress,
) -> Result<CouplingReport, OracleError> {
    validate_threshold(options.min_strength)?;

    let repository_path = source.location();
    let commits = source.list_commits(&options.range)?;
    let mut tracker = Tracker::start(Analysis::Coupling, &repository_path, progress);

    let mut frequencies: Ledger<String, FileChangeFrequency> = Ledger::new();
    let mut pairs: Ledger<(String, String), PairTally> = Ledger::new();

    for commit in &commits {
        tracker.tick();

        let Some(base) = commit.diff_base() else {
            continue;
        };
        let paths = match source.diff_paths(base, &commit.id) {
            Ok(paths) => unique_paths(paths),
            Err(e) => {
                tracing::warn!(
                    commit = commit.short_id(),
                    error = %e,
                    "skipping commit: diff failed"
                );
                continue;
            }
        };

        for path in &paths {
            let freq = frequencies.get_or_insert_with(path.as_str(), || FileChangeFrequency {
                file_path: path.clone(),
                change_count: 0,
                commit_ids: Vec::new(),
            });
            freq.change_count += 1;
            freq.commit_ids.push(commit.id.clone());
        }

        for i in 0..paths.len() {
            for j in (i + 1)..paths.len() {
                let key = normalize_pair(&paths[i], &paths[j]);
                pairs
                    .get_or_insert_with(&key, || PairTally {
                        file_path1: key.0.clone(),
                        file_path2: key.1.clone(),
                        count: 0,
                        first: commit.time,
                        last: commit.time,
                    })
                    .record(commit.time);
            }
        }
    }

    tracker.finish();
    tracing::info!(
        files = frequencies.len(),
        pairs = pairs.len(),
        "collected co-changes"
    );

    let change_count = |path: &str| frequencies.get(path).map_or(0, |f| f.change_count);

    let candidates: Vec<(PairTally, f64)> = pairs
        .into_values()
        .into_iter()
        .map(|pair| {
            let strength = coupling_strength(
                pair.count,
                change_count(&pair.file_path1),
                change_count(&pair.file_path2),
            );
            (pair, strength)
        })
        .filter(|(_, strength)| *strength >= options.min_strength)
        .collect();

    let ranked = top_n(candidates, options.top, |(a, sa), (b, sb)| {
        b.count.cmp(&a.count).then_with(|| sb.total_cmp(sa))
    });

    let coupled_files = ranked
        .into_iter()
        .map(|(pair, strength)| FileCouplingStat {
            shared_commits: shared_commits(
                frequencies.get(pair.file_path1.as_str()),
                frequencies.get(pair.file_path2.as_str()),
            ),
            file_path1: pair.file_path1,
            file_path2: pair.file_path2,
            coupling_count: pair.count,
            coupling_strength: strength,
            first_shared_commit: pair.first,
            last_shared_commit: pair.last,
        })
        .collect();

    let total_files_analyzed = frequencies.len();
    let mut file_frequencies = frequencies.into_values();
    file_frequencies.sort_by(|a, b| b.change_count.cmp(&a.change_count));

    Ok(CouplingReport {
        repository_path,
        analyzed_at: Utc::now(),
        since: options.range.since,
        min_coupling_strength: options.min_strength,
        coupled_files,
        file_frequencies,
        total_commits_analyzed: commits.len(),
        total_files_analyzed,
    })
}

/// Share of the less frequently changed file's changes that also touched
/// the other file. Zero when either file has no recorded change.
///
/// # Examples
///
/// ```
/// use oracle_history::coupling::coupling_strength;
///
/// assert_eq!(coupling_strength(2, 3, 2), 1.0);
/// assert_eq!(coupling_strength(1, 4, 0), 0.0);
/// ```
pub fn coupling_strength(coupling_count: u32, changes1: u32, changes2: u32) -> f64 {
    match changes1.min(changes2) {
        0 => 0.0,
        fewest => f64::from(coupling_count) / f64::from(fewest),
    }
}

fn normalize_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Commits present in both files' histories, in the first file's order.
fn shared_commits(
    file1: Option<&FileChangeFrequency>,
    file2: Option<&FileChangeFrequency>,
) -> Vec<String> {
    let (Some(file1), Some(file2)) = (file1, file2) else {
        return Vec::new();
    };
    let other: HashSet<&str> = file2.commit_ids.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    file1
        .commit_ids
        .iter()
        .filter(|id| other.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}
