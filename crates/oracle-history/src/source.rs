//! Commit Source interface.
//!
//! Analyzers read history exclusively through [`CommitSource`]: an ordered
//! commit listing plus two tree diffs. [`OpenSource`] hands every analyzer
//! its own handle so concurrent passes never share a revwalk cursor.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use oracle_core::{DateRange, OracleError};

/// A commit as listed by a [`CommitSource`].
///
/// # Examples
///
/// ```
/// use oracle_history::source::{Commit, DiffBase};
///
/// let commit = Commit {
///     id: "4f1c2a9e".into(),
///     author_name: "alice".into(),
///     author_email: "alice@example.com".into(),
///     committer_name: "alice".into(),
///     time: chrono::DateTime::parse_from_rfc3339("2024-03-06T12:00:00+01:00").unwrap(),
///     parents: vec![],
/// };
/// assert_eq!(commit.diff_base(), Some(DiffBase::EmptyTree));
/// assert_eq!(commit.identity(), "alice <alice@example.com>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Full commit id.
    pub id: String,
    /// Author name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Committer name.
    pub committer_name: String,
    /// Author time, in the author's own UTC offset.
    pub time: DateTime<FixedOffset>,
    /// Parent ids, first parent first.
    pub parents: Vec<String>,
}

impl Commit {
    /// Whether the commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Tree to diff against when computing this commit's change set.
    ///
    /// Merges have no single base and return `None`; they are left out of
    /// change-set analyses so merge resolutions are not counted twice.
    pub fn diff_base(&self) -> Option<DiffBase<'_>> {
        match self.parents.as_slice() {
            [] => Some(DiffBase::EmptyTree),
            [parent] => Some(DiffBase::Parent(parent)),
            _ => None,
        }
    }

    /// Contributor identity, `"Name <email>"`.
    pub fn identity(&self) -> String {
        format!("{} <{}>", self.author_name, self.author_email)
    }

    /// Abbreviated id for log output.
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// Base side of a tree diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffBase<'a> {
    /// The root commit is compared against an empty tree.
    EmptyTree,
    /// Compare against this parent commit's tree.
    Parent(&'a str),
}

/// Lines added and deleted in one file by one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDelta {
    /// File path relative to the repository root.
    pub path: String,
    /// Lines added.
    pub added: u64,
    /// Lines deleted.
    pub deleted: u64,
}

impl LineDelta {
    pub fn new(path: impl Into<String>, added: u64, deleted: u64) -> Self {
        Self {
            path: path.into(),
            added,
            deleted,
        }
    }
}

/// Read-only access to a repository's history.
///
/// Implementations are not required to be thread-safe; use [`OpenSource`]
/// to give each concurrent pass its own instance.
pub trait CommitSource {
    /// Human-readable location of the repository, used in report headers.
    fn location(&self) -> String;

    /// Commits whose author time falls inside `range`, newest first.
    ///
    /// # Errors
    ///
    /// Fails when history cannot be enumerated at all; callers treat this as
    /// fatal.
    fn list_commits(&self, range: &DateRange) -> Result<Vec<Commit>, OracleError>;

    /// Paths changed between `base` and `commit`.
    ///
    /// # Errors
    ///
    /// Fails for a single unreadable commit; callers log and skip it.
    fn diff_paths(&self, base: DiffBase<'_>, commit: &str) -> Result<Vec<String>, OracleError>;

    /// Per-file added/deleted line counts between `base` and `commit`.
    ///
    /// # Errors
    ///
    /// Fails for a single unreadable commit; callers log and skip it.
    fn diff_line_counts(
        &self,
        base: DiffBase<'_>,
        commit: &str,
    ) -> Result<Vec<LineDelta>, OracleError>;
}

/// Factory for independent [`CommitSource`] handles onto one repository.
pub trait OpenSource: Send + Sync {
    /// Source type produced for each analyzer.
    type Source: CommitSource;

    /// Open a fresh handle.
    ///
    /// # Errors
    ///
    /// Fails if the repository can no longer be opened.
    fn open_source(&self) -> Result<Self::Source, OracleError>;
}

/// Drop repeated paths from one commit's change set, keeping first occurrences.
pub(crate) fn unique_paths(paths: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}
