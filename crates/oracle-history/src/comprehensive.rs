//! Combined report over all four analyses.
//!
//! Each analysis runs on its own blocking task with its own source handle;
//! the report is assembled only once every task has settled.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use oracle_core::{OracleError, ReportConfig, ReportSettings};
use serde::{Deserialize, Serialize};
use tokio::task::{JoinError, JoinHandle};

use crate::contributors::{analyze_contributors, ContributorOptions, ContributorReport};
use crate::coupling::{analyze_coupling, CouplingOptions, CouplingReport};
use crate::frequency::{analyze_file_changes, FileChangeReport, FrequencyOptions};
use crate::git::GitRepository;
use crate::progress::Progress;
use crate::source::OpenSource;
use crate::timeline::{analyze_timeline, TimelineOptions, TimelineReport};

/// Name recorded as the report's producer.
pub const GENERATED_BY: &str = "git-oracle";

/// All four analyses of one repository over one commit range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveReport {
    pub repository_path: String,
    pub repository_name: String,
    pub generated_at: DateTime<Utc>,
    pub since: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
    pub file_analysis: FileChangeReport,
    pub contributor_analysis: ContributorReport,
    pub coupling_analysis: CouplingReport,
    pub timeline_analysis: TimelineReport,
    pub generated_by: String,
    pub version: String,
}

/// Run every analysis on the git repository at `repo_path`.
///
/// The configuration is validated and the repository opened before any
/// analysis starts. Any failing analysis fails the whole call; no partial
/// report is returned.
///
/// # Errors
///
/// Returns [`OracleError::Config`] for invalid settings,
/// [`OracleError::RepositoryNotFound`] or [`OracleError::NotARepository`]
/// for a bad path, and the first analysis error otherwise.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use oracle_core::ReportConfig;
/// use oracle_history::comprehensive::analyze_repository;
/// use oracle_history::progress::Silent;
///
/// # async fn run() -> Result<(), oracle_core::OracleError> {
/// let config = ReportConfig::default();
/// let report = analyze_repository(Path::new("."), &config, Arc::new(Silent)).await?;
/// println!("{} commits", report.timeline_analysis.total_commits_analyzed);
/// # Ok(())
/// # }
/// ```
pub async fn analyze_repository(
    repo_path: &Path,
    config: &ReportConfig,
    progress: Arc<dyn Progress>,
) -> Result<ComprehensiveReport, OracleError> {
    let settings = config.validate()?;
    let repo = GitRepository::open(repo_path)?;
    let mut report = analyze_with(Arc::new(repo), &settings, progress).await?;

    let resolved = repo_path
        .canonicalize()
        .unwrap_or_else(|_| repo_path.to_path_buf());
    report.repository_name = repository_name(&resolved.display().to_string());
    Ok(report)
}

/// Run every analysis against sources produced by `opener`.
///
/// `settings.range` applies to all four analyses.
///
/// # Errors
///
/// Returns the first error among the analyses, in report order, after all
/// of them have settled. A panicking analysis surfaces as
/// [`OracleError::Analysis`].
pub async fn analyze_with<O>(
    opener: Arc<O>,
    settings: &ReportSettings,
    progress: Arc<dyn Progress>,
) -> Result<ComprehensiveReport, OracleError>
where
    O: OpenSource + 'static,
{
    let range = settings.range;
    let file_opts = FrequencyOptions {
        top: settings.top_files,
        range,
    };
    let contributor_opts = ContributorOptions {
        top: settings.top_contributors,
        range,
    };
    let coupling_opts = CouplingOptions {
        top: settings.top_couples,
        range,
        min_strength: settings.min_coupling_strength,
    };
    let timeline_opts = TimelineOptions {
        period: settings.timeline_period,
        top_contributors: settings.timeline_contributors,
        range,
    };

    tracing::info!("starting comprehensive analysis");
    let (files, contributors, coupling, timeline) = tokio::join!(
        spawn_analysis(&opener, &progress, move |source, progress| {
            analyze_file_changes(source, &file_opts, progress)
        }),
        spawn_analysis(&opener, &progress, move |source, progress| {
            analyze_contributors(source, &contributor_opts, progress)
        }),
        spawn_analysis(&opener, &progress, move |source, progress| {
            analyze_coupling(source, &coupling_opts, progress)
        }),
        spawn_analysis(&opener, &progress, move |source, progress| {
            analyze_timeline(source, &timeline_opts, progress)
        }),
    );

    let file_analysis = settle(files)?;
    let contributor_analysis = settle(contributors)?;
    let coupling_analysis = settle(coupling)?;
    let timeline_analysis = settle(timeline)?;
    tracing::info!("comprehensive analysis complete");

    let repository_path = file_analysis.repository_path.clone();
    Ok(ComprehensiveReport {
        repository_name: repository_name(&repository_path),
        repository_path,
        generated_at: Utc::now(),
        since: range.since,
        until: range.until,
        file_analysis,
        contributor_analysis,
        coupling_analysis,
        timeline_analysis,
        generated_by: GENERATED_BY.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Last path component of a repository location, or the location itself.
///
/// # Examples
///
/// ```
/// use oracle_history::comprehensive::repository_name;
///
/// assert_eq!(repository_name("/home/dev/projects/oracle"), "oracle");
/// assert_eq!(repository_name("memory://demo"), "demo");
/// ```
pub fn repository_name(location: &str) -> String {
    Path::new(location)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| location.to_string())
}

fn spawn_analysis<O, T, F>(
    opener: &Arc<O>,
    progress: &Arc<dyn Progress>,
    run: F,
) -> JoinHandle<Result<T, OracleError>>
where
    O: OpenSource + 'static,
    T: Send + 'static,
    F: FnOnce(&O::Source, &dyn Progress) -> Result<T, OracleError> + Send + 'static,
{
    let opener = Arc::clone(opener);
    let progress = Arc::clone(progress);
    tokio::task::spawn_blocking(move || {
        let source = opener.open_source()?;
        run(&source, progress.as_ref())
    })
}

fn settle<T>(joined: Result<Result<T, OracleError>, JoinError>) -> Result<T, OracleError> {
    joined.map_err(|e| OracleError::Analysis(format!("analysis task did not complete: {e}")))?
}
