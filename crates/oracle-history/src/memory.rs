//! In-memory Commit Source.
//!
//! Histories are recorded oldest first, the way they were written, and
//! listed newest first like a revwalk. Each commit's changes are stated
//! relative to its first parent.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset};
use oracle_core::{DateRange, OracleError};

use crate::source::{Commit, CommitSource, DiffBase, LineDelta, OpenSource};

/// A hand-built history.
///
/// # Examples
///
/// ```
/// use oracle_history::memory::MemorySource;
/// use oracle_history::source::{CommitSource, LineDelta};
/// use oracle_core::DateRange;
///
/// let when = chrono::DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z").unwrap();
/// let mut history = MemorySource::new("memory://demo");
/// history
///     .record("c1", "alice", "alice@example.com", when, vec![LineDelta::new("a.txt", 3, 0)])
///     .record("c2", "bob", "bob@example.com", when, vec![LineDelta::new("a.txt", 1, 1)]);
///
/// let commits = history.list_commits(&DateRange::UNBOUNDED).unwrap();
/// assert_eq!(commits[0].id, "c2");
/// assert_eq!(commits[0].parents, vec!["c1".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    location: String,
    commits: Vec<Commit>,
    changes: HashMap<String, Vec<LineDelta>>,
    broken: HashSet<String>,
}

impl MemorySource {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Append a commit whose only parent is the previously recorded commit.
    /// The committer is the author.
    pub fn record(
        &mut self,
        id: &str,
        author_name: &str,
        author_email: &str,
        time: DateTime<FixedOffset>,
        changes: Vec<LineDelta>,
    ) -> &mut Self {
        let parents = self.head().map(|head| vec![head.to_string()]).unwrap_or_default();
        self.record_commit(
            Commit {
                id: id.to_string(),
                author_name: author_name.to_string(),
                author_email: author_email.to_string(),
                committer_name: author_name.to_string(),
                time,
                parents,
            },
            changes,
        )
    }

    /// Append an arbitrary commit, e.g. a merge with explicit parents.
    pub fn record_commit(&mut self, commit: Commit, changes: Vec<LineDelta>) -> &mut Self {
        self.changes.insert(commit.id.clone(), changes);
        self.commits.push(commit);
        self
    }

    /// Make every diff of commit `id` fail, as an unreadable tree would.
    pub fn break_diff(&mut self, id: &str) -> &mut Self {
        self.broken.insert(id.to_string());
        self
    }

    /// Id of the most recently recorded commit.
    pub fn head(&self) -> Option<&str> {
        self.commits.last().map(|commit| commit.id.as_str())
    }

    fn changes_of(&self, commit: &str) -> Result<&[LineDelta], OracleError> {
        if self.broken.contains(commit) {
            return Err(OracleError::Git(format!(
                "failed to compute diff for {commit}: tree is unreadable"
            )));
        }
        self.changes
            .get(commit)
            .map(Vec::as_slice)
            .ok_or_else(|| OracleError::Git(format!("failed to find commit {commit}")))
    }
}

impl CommitSource for MemorySource {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn list_commits(&self, range: &DateRange) -> Result<Vec<Commit>, OracleError> {
        Ok(self
            .commits
            .iter()
            .rev()
            .filter(|commit| range.contains(&commit.time))
            .cloned()
            .collect())
    }

    fn diff_paths(&self, _base: DiffBase<'_>, commit: &str) -> Result<Vec<String>, OracleError> {
        Ok(self
            .changes_of(commit)?
            .iter()
            .map(|delta| delta.path.clone())
            .collect())
    }

    fn diff_line_counts(
        &self,
        _base: DiffBase<'_>,
        commit: &str,
    ) -> Result<Vec<LineDelta>, OracleError> {
        Ok(self.changes_of(commit)?.to_vec())
    }
}

impl OpenSource for MemorySource {
    type Source = MemorySource;

    fn open_source(&self) -> Result<MemorySource, OracleError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn records_linear_parents_and_lists_newest_first() {
        let mut history = MemorySource::new("memory://test");
        history
            .record("c1", "alice", "a@e.com", at("2024-01-01T00:00:00Z"), vec![])
            .record("c2", "alice", "a@e.com", at("2024-01-02T00:00:00Z"), vec![])
            .record("c3", "alice", "a@e.com", at("2024-01-03T00:00:00Z"), vec![]);

        let commits = history.list_commits(&DateRange::UNBOUNDED).unwrap();
        let ids: Vec<&str> = commits.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c2", "c1"]);
        assert!(commits[2].parents.is_empty());
        assert_eq!(commits[0].parents, vec!["c2"]);
    }

    #[test]
    fn range_filters_listing() {
        let mut history = MemorySource::new("memory://test");
        history
            .record("old", "alice", "a@e.com", at("2023-12-31T12:00:00Z"), vec![])
            .record("new", "alice", "a@e.com", at("2024-01-01T12:00:00Z"), vec![]);

        let range = DateRange::parse(Some("2024-01-01"), None).unwrap();
        let commits = history.list_commits(&range).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].id, "new");
    }

    #[test]
    fn broken_commits_fail_to_diff() {
        let mut history = MemorySource::new("memory://test");
        history
            .record(
                "c1",
                "alice",
                "a@e.com",
                at("2024-01-01T00:00:00Z"),
                vec![LineDelta::new("a.txt", 1, 0)],
            )
            .break_diff("c1");

        assert!(history.diff_paths(DiffBase::EmptyTree, "c1").is_err());
        assert!(history.diff_line_counts(DiffBase::EmptyTree, "c1").is_err());
    }

    #[test]
    fn unknown_commit_is_an_error() {
        let history = MemorySource::new("memory://test");
        assert!(history.diff_paths(DiffBase::EmptyTree, "nope").is_err());
    }
}
