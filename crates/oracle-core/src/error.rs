use std::path::PathBuf;

/// Errors that can occur across git-oracle.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary reports it through `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use oracle_core::OracleError;
///
/// let err = OracleError::Config("threshold must be within [0, 1]".into());
/// assert!(err.to_string().contains("threshold"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum OracleError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value, rejected before any history is read.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(oracle::config),
        help("dates use YYYY-MM-DD, periods are daily/weekly/monthly, thresholds lie in [0, 1]")
    )]
    Config(String),

    /// The repository path does not exist.
    #[error("repository path '{}' does not exist", .0.display())]
    #[diagnostic(code(oracle::input))]
    RepositoryNotFound(PathBuf),

    /// The path exists but cannot be opened as a git repository.
    #[error("not a git repository: {} ({reason})", .path.display())]
    #[diagnostic(
        code(oracle::input),
        help("point --path at a local git checkout")
    )]
    NotARepository {
        /// Path that was rejected.
        path: PathBuf,
        /// Underlying git failure.
        reason: String,
    },

    /// Git operation failure.
    #[error("git error: {0}")]
    #[diagnostic(code(oracle::git))]
    Git(String),

    /// One of the concurrent analyses could not run to completion.
    #[error("analysis failed: {0}")]
    #[diagnostic(code(oracle::analysis))]
    Analysis(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
