use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};

use oracle_core::{OracleConfig, OutputFormat, ReportConfig, ReportSettings, TimePeriod};
use oracle_history::comprehensive::{analyze_repository, ComprehensiveReport};
use oracle_history::contributors::{analyze_contributors, ContributorOptions, ContributorReport};
use oracle_history::coupling::{analyze_coupling, CouplingOptions, CouplingReport};
use oracle_history::frequency::{analyze_file_changes, FileChangeReport, FrequencyOptions};
use oracle_history::git::{GitRepository, GitSource};
use oracle_history::progress::{Analysis, Progress};
use oracle_history::source::OpenSource;
use oracle_history::timeline::{analyze_timeline, TimelineOptions, TimelineReport};

#[derive(Parser)]
#[command(
    name = "git-oracle",
    version,
    about = "Mine git history for change hotspots, contributors, coupling, and activity",
    long_about = "git-oracle walks a repository's commit history and reports which files change\n\
                   most, who contributes, which files change together, and how activity is\n\
                   spread over time.\n\n\
                   Examples:\n  \
                     git-oracle files --path .                  Most frequently changed files\n  \
                     git-oracle contributors --since 2024-01-01 Contributors since a date\n  \
                     git-oracle coupling --min-strength 0.5     Strongly coupled file pairs\n  \
                     git-oracle timeline --period weekly        Weekly activity timeline\n  \
                     git-oracle report --output report.json     Everything, as JSON"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .oracle.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  Human-readable listing (default)\n  \
                         json  Machine-readable JSON with camelCase keys"
    )]
    format: OutputFormat,

    /// Enable verbose (debug) logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Repository and commit window shared by every analysis.
#[derive(Args)]
struct HistoryArgs {
    /// Repository path (default: current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Only analyze commits authored on or after this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<String>,

    /// Only analyze commits authored on or before this date (YYYY-MM-DD)
    #[arg(long)]
    until: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// List the most frequently changed files
    #[command(long_about = "List the most frequently changed files.\n\n\
        Counts the non-merge commits touching each file and shows its first and last\n\
        change plus its most frequent committers.\n\n\
        Examples:\n  git-oracle files\n  git-oracle files --top 50 --since 2024-01-01")]
    Files {
        #[command(flatten)]
        history: HistoryArgs,

        /// Number of files to show (default: report.top_files)
        #[arg(long)]
        top: Option<usize>,
    },
    /// Rank contributors by commits and lines changed
    #[command(long_about = "Rank contributors by commits and lines changed.\n\n\
        Contributors are keyed by name and email; variants of the same person are\n\
        listed separately.\n\n\
        Examples:\n  git-oracle contributors\n  git-oracle contributors --top 5 --format json")]
    Contributors {
        #[command(flatten)]
        history: HistoryArgs,

        /// Number of contributors to show (default: report.top_contributors)
        #[arg(long)]
        top: Option<usize>,
    },
    /// Find files that change together
    #[command(long_about = "Find files that change together.\n\n\
        Coupling strength is the share of the less frequently changed file's commits\n\
        that also touched the other file.\n\n\
        Examples:\n  git-oracle coupling\n  git-oracle coupling --min-strength 0.5 --top 10")]
    Coupling {
        #[command(flatten)]
        history: HistoryArgs,

        /// Number of pairs to show (default: report.top_couples)
        #[arg(long)]
        top: Option<usize>,

        /// Minimum coupling strength between 0.0 and 1.0 (default: report.min_coupling_strength)
        #[arg(long)]
        min_strength: Option<f64>,
    },
    /// Show commit activity over time
    #[command(long_about = "Show commit activity over time.\n\n\
        Buckets commits by day, Monday-aligned week, or month and breaks each\n\
        period down by the most active contributors.\n\n\
        Examples:\n  git-oracle timeline --period weekly\n  \
        git-oracle timeline --since 2024-01-01 --top-contributors 5")]
    Timeline {
        #[command(flatten)]
        history: HistoryArgs,

        /// Bucket size: daily, weekly, or monthly (default: report.timeline_period)
        #[arg(long)]
        period: Option<TimePeriod>,

        /// Contributors itemized per period (default: report.timeline_contributors)
        #[arg(long)]
        top_contributors: Option<usize>,
    },
    /// Run every analysis and combine the results
    #[command(long_about = "Run every analysis and combine the results.\n\n\
        The four analyses run concurrently over the same commit window. With\n\
        --output the combined report is written to a file as JSON.\n\n\
        Examples:\n  git-oracle report\n  \
        git-oracle report --since 2024-01-01 --output oracle.json")]
    Report {
        #[command(flatten)]
        history: HistoryArgs,

        /// Write the JSON report to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Create a default .oracle.toml configuration file
    #[command(long_about = "Create a default .oracle.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .oracle.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# git-oracle configuration

[report]
# top_files = 20
# top_contributors = 20
# top_couples = 20
# min_coupling_strength = 0.1
# timeline_period = "monthly"   # daily, weekly, or monthly
# timeline_contributors = 20
# since = "2024-01-01"
# until = "2024-12-31"
"#;

/// Spinner on stderr that follows analysis progress.
struct Feedback {
    bar: Option<indicatif::ProgressBar>,
}

impl Feedback {
    fn new() -> Self {
        if !std::io::stderr().is_terminal() {
            return Self { bar: None };
        }
        let bar = indicatif::ProgressBar::new_spinner();
        bar.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    fn done(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl Progress for Feedback {
    fn started(&self, analysis: Analysis) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("Analyzing {analysis}..."));
        }
    }

    fn advanced(&self, analysis: Analysis, commits_processed: usize) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("Analyzing {analysis}: {commits_processed} commits"));
        }
    }

    fn finished(&self, analysis: Analysis, commits_processed: usize) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("Finished {analysis} ({commits_processed} commits)"));
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<OracleConfig> {
    let config = match path {
        Some(path) => OracleConfig::from_file(path)
            .wrap_err_with(|| format!("loading {}", path.display()))?,
        None => {
            let default_path = Path::new(".oracle.toml");
            if default_path.exists() {
                OracleConfig::from_file(default_path).wrap_err("loading .oracle.toml")?
            } else {
                OracleConfig::default()
            }
        }
    };
    Ok(config)
}

/// Apply the command line date window on top of the configured one.
fn with_window(mut report: ReportConfig, history: &HistoryArgs) -> ReportConfig {
    if let Some(since) = &history.since {
        report.since = Some(since.clone());
    }
    if let Some(until) = &history.until {
        report.until = Some(until.clone());
    }
    report
}

fn open_source(path: &Path) -> Result<GitSource> {
    let repo = GitRepository::open(path)?;
    Ok(repo.open_source()?)
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "git_oracle=debug,oracle_history=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn print_file_changes(report: &FileChangeReport) {
    println!(
        "Most changed files ({} of {} files, {} commits):",
        report.files.len(),
        report.total_files_analyzed,
        report.total_commits_analyzed
    );
    println!("{:-<72}", "");
    for (i, file) in report.files.iter().enumerate() {
        let committers: Vec<String> = file
            .top_committers
            .iter()
            .map(|c| format!("{} ({})", c.name, c.commit_count))
            .collect();
        println!("{:>2}. {:<48} {} changes", i + 1, file.path, file.change_count);
        println!(
            "    first {} by {}, last {} by {}",
            file.first_change.date.format("%Y-%m-%d"),
            file.first_change.author_name,
            file.last_change.date.format("%Y-%m-%d"),
            file.last_change.author_name,
        );
        println!("    committers: {}", committers.join(", "));
    }
    println!();
}

fn print_contributors(report: &ContributorReport) {
    println!(
        "Contributors ({} of {}, {} commits):",
        report.contributors.len(),
        report.total_contributors,
        report.total_commits
    );
    println!("{:-<72}", "");
    for (i, c) in report.contributors.iter().enumerate() {
        println!(
            "{:>2}. {} <{}>  commits={}  +{} -{}  lines/week={:.1}",
            i + 1,
            c.name,
            c.email,
            c.commit_count,
            c.lines_added,
            c.lines_deleted,
            c.average_lines_per_week,
        );
        println!(
            "    active {} .. {}  lines/commit={:.1}",
            c.first_commit.format("%Y-%m-%d"),
            c.last_commit.format("%Y-%m-%d"),
            c.average_lines_per_commit(),
        );
    }
    println!();
}

fn print_coupling(report: &CouplingReport) {
    println!(
        "Change coupling (min strength: {:.2}, {} commits):",
        report.min_coupling_strength, report.total_commits_analyzed
    );
    println!("{:-<72}", "");
    if report.coupled_files.is_empty() {
        println!("  No coupled files above the threshold.");
    }
    for pair in &report.coupled_files {
        println!(
            "  {} <-> {} (strength={:.2}, together={})",
            pair.file_path1, pair.file_path2, pair.coupling_strength, pair.coupling_count,
        );
    }
    println!();
}

fn print_timeline(report: &TimelineReport) {
    println!(
        "Timeline ({}, {} commits, {} contributors):",
        report.period, report.total_commits_analyzed, report.total_contributors
    );
    println!("{:-<72}", "");
    for entry in &report.timeline {
        let mut shares: Vec<_> = entry.contributors.values().collect();
        shares.sort_by(|a, b| b.commit_count.cmp(&a.commit_count));
        let shares: Vec<String> = shares
            .iter()
            .map(|c| format!("{} {:.0}%", c.name, c.percentage))
            .collect();
        println!(
            "  {:<16} {:>5}  {}",
            entry.label,
            entry.total_commits,
            shares.join(", ")
        );
    }
    if let Some(busiest) = &report.busiest_period {
        println!("\n  Busiest period: {} ({} commits)", busiest.label, busiest.total_commits);
    }
    println!();
}

fn print_report(report: &ComprehensiveReport) {
    println!("Repository: {} ({})", report.repository_name, report.repository_path);
    println!();
    print_file_changes(&report.file_analysis);
    print_contributors(&report.contributor_analysis);
    print_coupling(&report.coupling_analysis);
    print_timeline(&report.timeline_analysis);
}

/// Run one analysis behind the spinner, clearing it whatever the outcome.
fn with_feedback<T>(run: impl FnOnce(&Feedback) -> Result<T>) -> Result<T> {
    let feedback = Feedback::new();
    let result = run(&feedback);
    feedback.done();
    result
}

fn emit<T: serde::Serialize>(format: OutputFormat, report: &T, text: fn(&T)) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Text => {
            text(report);
            Ok(())
        }
    }
}

fn settings_for(report: &ReportConfig, history: &HistoryArgs) -> Result<ReportSettings> {
    Ok(with_window(report.clone(), history).validate()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(format = %cli.format, "configuration loaded");

    match &cli.command {
        Command::Files { history, top } => {
            let settings = settings_for(&config.report, history)?;
            let options = FrequencyOptions {
                top: top.unwrap_or(settings.top_files),
                range: settings.range,
            };
            let report = with_feedback(|feedback| {
                let source = open_source(&history.path)?;
                Ok(analyze_file_changes(&source, &options, feedback)?)
            })?;
            emit(cli.format, &report, print_file_changes)?;
        }
        Command::Contributors { history, top } => {
            let settings = settings_for(&config.report, history)?;
            let options = ContributorOptions {
                top: top.unwrap_or(settings.top_contributors),
                range: settings.range,
            };
            let report = with_feedback(|feedback| {
                let source = open_source(&history.path)?;
                Ok(analyze_contributors(&source, &options, feedback)?)
            })?;
            emit(cli.format, &report, print_contributors)?;
        }
        Command::Coupling {
            history,
            top,
            min_strength,
        } => {
            let mut report_config = config.report.clone();
            if let Some(min_strength) = min_strength {
                report_config.min_coupling_strength = *min_strength;
            }
            let settings = settings_for(&report_config, history)?;
            let options = CouplingOptions {
                top: top.unwrap_or(settings.top_couples),
                range: settings.range,
                min_strength: settings.min_coupling_strength,
            };
            let report = with_feedback(|feedback| {
                let source = open_source(&history.path)?;
                Ok(analyze_coupling(&source, &options, feedback)?)
            })?;
            emit(cli.format, &report, print_coupling)?;
        }
        Command::Timeline {
            history,
            period,
            top_contributors,
        } => {
            let settings = settings_for(&config.report, history)?;
            let options = TimelineOptions {
                period: period.unwrap_or(settings.timeline_period),
                top_contributors: top_contributors.unwrap_or(settings.timeline_contributors),
                range: settings.range,
            };
            let report = with_feedback(|feedback| {
                let source = open_source(&history.path)?;
                Ok(analyze_timeline(&source, &options, feedback)?)
            })?;
            emit(cli.format, &report, print_timeline)?;
        }
        Command::Report { history, output } => {
            let report_config = with_window(config.report.clone(), history);
            let feedback = Arc::new(Feedback::new());
            let progress: Arc<dyn Progress> = feedback.clone();
            let result = analyze_repository(&history.path, &report_config, progress).await;
            feedback.done();
            let report = result?;

            match output {
                Some(path) => {
                    let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
                    std::fs::write(path, json)
                        .into_diagnostic()
                        .wrap_err_with(|| format!("writing {}", path.display()))?;
                    eprintln!("Report written to {}", path.display());
                }
                None => emit(cli.format, &report, print_report)?,
            }
        }
        Command::Init => {
            let path = Path::new(".oracle.toml");
            if path.exists() {
                miette::bail!(".oracle.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .oracle.toml with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "git-oracle", &mut std::io::stdout());
        }
    }

    Ok(())
}
