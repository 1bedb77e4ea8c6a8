//! Commit Source backed by a local git checkout via git2.
//!
//! Walks history from HEAD newest first and computes tree-to-tree diffs,
//! comparing the root commit against an empty tree.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use git2::{Delta, DiffDelta, DiffOptions, ErrorCode, Oid, Patch, Repository, Sort};
use oracle_core::{DateRange, OracleError};

use crate::source::{Commit, CommitSource, DiffBase, LineDelta, OpenSource};

/// A validated path to a local repository.
///
/// Opening checks the path once; each [`OpenSource::open_source`] call then
/// opens an independent [`GitSource`], so analyzers running on separate
/// threads never share a `git2::Repository`.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use oracle_history::git::GitRepository;
/// use oracle_history::source::OpenSource;
///
/// let repo = GitRepository::open(Path::new(".")).unwrap();
/// let source = repo.open_source().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct GitRepository {
    path: PathBuf,
}

impl GitRepository {
    /// Validate that `path` exists and is a git repository.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::RepositoryNotFound`] for a missing path and
    /// [`OracleError::NotARepository`] when git cannot open it.
    pub fn open(path: &Path) -> Result<Self, OracleError> {
        open_repository(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl OpenSource for GitRepository {
    type Source = GitSource;

    fn open_source(&self) -> Result<GitSource, OracleError> {
        GitSource::open(&self.path)
    }
}

/// A single git2 session onto a repository.
pub struct GitSource {
    repo: Repository,
    path: PathBuf,
}

impl GitSource {
    /// Open a session on the repository at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`GitRepository::open`].
    pub fn open(path: &Path) -> Result<Self, OracleError> {
        let repo = open_repository(path)?;
        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    fn tree_of(&self, id: &str) -> Result<git2::Tree<'_>, OracleError> {
        let oid = Oid::from_str(id)
            .map_err(|e| OracleError::Git(format!("invalid commit id '{id}': {e}")))?;
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|e| OracleError::Git(format!("failed to find commit {id}: {e}")))?;
        commit
            .tree()
            .map_err(|e| OracleError::Git(format!("failed to get tree of {id}: {e}")))
    }

    fn diff(&self, base: DiffBase<'_>, commit: &str) -> Result<git2::Diff<'_>, OracleError> {
        let commit_tree = self.tree_of(commit)?;
        let base_tree = match base {
            DiffBase::EmptyTree => None,
            DiffBase::Parent(parent) => Some(self.tree_of(parent)?),
        };

        let mut diff_opts = DiffOptions::new();
        self.repo
            .diff_tree_to_tree(
                base_tree.as_ref(),
                Some(&commit_tree),
                Some(&mut diff_opts),
            )
            .map_err(|e| OracleError::Git(format!("failed to compute diff for {commit}: {e}")))
    }
}

impl CommitSource for GitSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn list_commits(&self, range: &DateRange) -> Result<Vec<Commit>, OracleError> {
        match self.repo.head() {
            Ok(_) => {}
            // A freshly initialised repository has no history yet
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(Vec::new()),
            Err(e) => return Err(OracleError::Git(format!("failed to resolve HEAD: {e}"))),
        }

        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| OracleError::Git(format!("failed to create revwalk: {e}")))?;
        revwalk
            .set_sorting(Sort::TIME)
            .map_err(|e| OracleError::Git(format!("failed to sort revwalk: {e}")))?;
        revwalk
            .push_head()
            .map_err(|e| OracleError::Git(format!("failed to push HEAD: {e}")))?;

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result.map_err(|e| OracleError::Git(format!("revwalk error: {e}")))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| OracleError::Git(format!("failed to find commit: {e}")))?;

            let commit = to_commit(&commit)?;
            // Sort::TIME orders by committer time, so an author-time window
            // cannot stop the walk early.
            if range.contains(&commit.time) {
                commits.push(commit);
            }
        }

        Ok(commits)
    }

    fn diff_paths(&self, base: DiffBase<'_>, commit: &str) -> Result<Vec<String>, OracleError> {
        let diff = self.diff(base, commit)?;
        Ok(diff.deltas().filter_map(|delta| delta_path(&delta)).collect())
    }

    fn diff_line_counts(
        &self,
        base: DiffBase<'_>,
        commit: &str,
    ) -> Result<Vec<LineDelta>, OracleError> {
        let diff = self.diff(base, commit)?;
        let mut deltas = Vec::new();

        for idx in 0..diff.deltas().len() {
            let Some(path) = diff.get_delta(idx).and_then(|delta| delta_path(&delta)) else {
                continue;
            };

            let patch = Patch::from_diff(&diff, idx)
                .map_err(|e| OracleError::Git(format!("failed to build patch for {path}: {e}")))?;
            // Binary files have no patch and no line counts
            let (added, deleted) = match patch {
                Some(patch) => {
                    let (_context, added, deleted) = patch.line_stats().map_err(|e| {
                        OracleError::Git(format!("failed to count lines for {path}: {e}"))
                    })?;
                    (added as u64, deleted as u64)
                }
                None => (0, 0),
            };

            deltas.push(LineDelta {
                path,
                added,
                deleted,
            });
        }

        Ok(deltas)
    }
}

fn open_repository(path: &Path) -> Result<Repository, OracleError> {
    if !path.exists() {
        return Err(OracleError::RepositoryNotFound(path.to_path_buf()));
    }
    Repository::open(path).map_err(|e| OracleError::NotARepository {
        path: path.to_path_buf(),
        reason: e.message().to_string(),
    })
}

fn to_commit(commit: &git2::Commit<'_>) -> Result<Commit, OracleError> {
    let author = commit.author();
    let committer = commit.committer();

    Ok(Commit {
        id: commit.id().to_string(),
        author_name: author.name().unwrap_or("unknown").to_string(),
        author_email: author.email().unwrap_or("unknown").to_string(),
        committer_name: committer.name().unwrap_or("unknown").to_string(),
        time: to_datetime(author.when())?,
        parents: commit.parent_ids().map(|id| id.to_string()).collect(),
    })
}

fn to_datetime(time: git2::Time) -> Result<DateTime<FixedOffset>, OracleError> {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
    offset
        .timestamp_opt(time.seconds(), 0)
        .single()
        .ok_or_else(|| OracleError::Git(format!("invalid commit timestamp {}", time.seconds())))
}

/// Path a delta is attributed to: the old path for deletions, the new one otherwise.
fn delta_path(delta: &DiffDelta<'_>) -> Option<String> {
    let file = match delta.status() {
        Delta::Deleted => delta.old_file(),
        _ => delta.new_file(),
    };
    file.path()
        .map(|path| path.to_string_lossy().into_owned())
        .filter(|path| !path.is_empty())
}
