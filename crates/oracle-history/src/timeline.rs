//! Contributor activity timeline.
//!
//! Buckets commits into calendar periods and breaks each period down by the
//! repository's most active contributors.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, Utc};
use oracle_core::{DateRange, OracleError, TimePeriod};
use serde::{Deserialize, Serialize};

use crate::ledger::{top_n, Ledger};
use crate::progress::{Analysis, Progress, Tracker};
use crate::source::CommitSource;

/// Display colours handed to top contributors in rank order, reused from
/// the start once exhausted.
pub const PALETTE: [&str; 24] = [
    "blue",
    "green",
    "red",
    "yellow",
    "magenta",
    "cyan",
    "orange1",
    "purple",
    "lime",
    "pink1",
    "aqua",
    "gold1",
    "violet",
    "springgreen1",
    "orangered1",
    "deeppink1",
    "lightblue",
    "lightgreen",
    "lightcoral",
    "lightyellow",
    "lightpink",
    "lightcyan",
    "wheat1",
    "khaki1",
];

/// Options for [`analyze_timeline`].
#[derive(Debug, Clone, Copy)]
pub struct TimelineOptions {
    /// Bucket granularity (default: monthly).
    pub period: TimePeriod,
    /// Contributors itemized per bucket (default: 10).
    pub top_contributors: usize,
    /// Author-date window to analyze (default: all history).
    pub range: DateRange,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            period: TimePeriod::Monthly,
            top_contributors: 10,
            range: DateRange::UNBOUNDED,
        }
    }
}

/// One contributor's share of a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodContribution {
    pub name: String,
    pub email: String,
    pub commit_count: u32,
    /// Share of the period's commits, `0..=100`.
    pub percentage: f64,
    pub color: String,
}

/// A populated calendar period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub period_start: NaiveDate,
    /// Last day of the period, inclusive.
    pub period_end: NaiveDate,
    pub label: String,
    /// All commits in the period, including those of contributors not itemized.
    pub total_commits: u32,
    /// Top contributors active in the period, keyed by `"Name <email>"`.
    pub contributors: BTreeMap<String, PeriodContribution>,
}

/// Result of [`analyze_timeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineReport {
    pub repository_path: String,
    pub analyzed_at: DateTime<Utc>,
    pub period: TimePeriod,
    pub since: Option<NaiveDateTime>,
    /// Populated periods in chronological order.
    pub timeline: Vec<TimelineEntry>,
    /// Colour of each top contributor, keyed by identity.
    pub contributor_colors: BTreeMap<String, String>,
    /// Top contributor identities, most commits first.
    pub top_contributors: Vec<String>,
    pub total_commits_analyzed: usize,
    pub total_contributors: usize,
    pub max_commits_in_period: u32,
    /// Earliest period holding `max_commits_in_period` commits.
    pub busiest_period: Option<TimelineEntry>,
}

struct ContributorTotal {
    identity: String,
    name: String,
    email: String,
    commits: u32,
}

/// Build a commit timeline bucketed by `options.period`.
///
/// Every listed commit, merges included, lands in the bucket of its author
/// date as seen in the author's own timezone.
///
/// # Errors
///
/// Returns an error only if the source cannot list commits.
///
/// # Examples
///
/// ```
/// use oracle_core::TimePeriod;
/// use oracle_history::memory::MemorySource;
/// use oracle_history::progress::Silent;
/// use oracle_history::timeline::{analyze_timeline, TimelineOptions};
///
/// let at = |s| chrono::DateTime::parse_from_rfc3339(s).unwrap();
/// let mut history = MemorySource::new("memory://demo");
/// history
///     .record("c1", "alice", "alice@example.com", at("2024-03-05T09:00:00Z"), vec![])
///     .record("c2", "alice", "alice@example.com", at("2024-04-01T09:00:00Z"), vec![]);
///
/// let options = TimelineOptions { period: TimePeriod::Monthly, ..TimelineOptions::default() };
/// let report = analyze_timeline(&history, &options, &Silent).unwrap();
/// let labels: Vec<_> = report.timeline.iter().map(|e| e.label.as_str()).collect();
/// assert_eq!(labels, vec!["2024-03", "2024-04"]);
/// ```
pub fn analyze_timeline<S: CommitSource + ?Sized>(
    source: &S,
    options: &TimelineOptions,
    progress: &dyn Progress,
) -> Result<TimelineReport, OracleError> {
    let repository_path = source.location();
    let commits = source.list_commits(&options.range)?;
    let mut tracker = Tracker::start(Analysis::Timeline, &repository_path, progress);

    let mut totals: Ledger<String, ContributorTotal> = Ledger::new();
    let mut buckets: BTreeMap<NaiveDate, HashMap<String, u32>> = BTreeMap::new();

    for commit in &commits {
        tracker.tick();

        let identity = commit.identity();
        let start = period_start(options.period, commit.time.date_naive());
        *buckets
            .entry(start)
            .or_default()
            .entry(identity.clone())
            .or_default() += 1;

        totals
            .get_or_insert_with(identity.as_str(), || ContributorTotal {
                identity: identity.clone(),
                name: commit.author_name.clone(),
                email: commit.author_email.clone(),
                commits: 0,
            })
            .commits += 1;
    }

    tracker.finish();
    let total_contributors = totals.len();
    tracing::info!(
        contributors = total_contributors,
        periods = buckets.len(),
        "bucketed commits"
    );

    let top = top_n(totals.into_values(), options.top_contributors, |a, b| {
        b.commits.cmp(&a.commits)
    });
    let colored: HashMap<&str, (&ContributorTotal, &str)> = top
        .iter()
        .enumerate()
        .map(|(rank, total)| (total.identity.as_str(), (total, color_for(rank))))
        .collect();

    let mut timeline = Vec::with_capacity(buckets.len());
    for (start, counts) in &buckets {
        let total_commits: u32 = counts.values().sum();
        let contributors = counts
            .iter()
            .filter_map(|(identity, &commit_count)| {
                let (total, color) = colored.get(identity.as_str())?;
                Some((
                    identity.clone(),
                    PeriodContribution {
                        name: total.name.clone(),
                        email: total.email.clone(),
                        commit_count,
                        percentage: f64::from(commit_count) / f64::from(total_commits) * 100.0,
                        color: (*color).to_string(),
                    },
                ))
            })
            .collect();

        let end = period_end(options.period, *start);
        timeline.push(TimelineEntry {
            period_start: *start,
            period_end: end,
            label: period_label(options.period, *start, end),
            total_commits,
            contributors,
        });
    }

    let max_commits_in_period = timeline.iter().map(|e| e.total_commits).max().unwrap_or(0);
    let busiest_period = timeline
        .iter()
        .find(|e| e.total_commits == max_commits_in_period)
        .cloned();

    Ok(TimelineReport {
        repository_path,
        analyzed_at: Utc::now(),
        period: options.period,
        since: options.range.since,
        timeline,
        contributor_colors: top
            .iter()
            .enumerate()
            .map(|(rank, total)| (total.identity.clone(), color_for(rank).to_string()))
            .collect(),
        top_contributors: top.into_iter().map(|total| total.identity).collect(),
        total_commits_analyzed: commits.len(),
        total_contributors,
        max_commits_in_period,
        busiest_period,
    })
}

fn color_for(rank: usize) -> &'static str {
    PALETTE[rank % PALETTE.len()]
}

/// First day of the period containing `date`. Weeks start on Monday.
fn period_start(period: TimePeriod, date: NaiveDate) -> NaiveDate {
    match period {
        TimePeriod::Daily => date,
        TimePeriod::Weekly => {
            let back = Days::new(u64::from(date.weekday().num_days_from_monday()));
            date.checked_sub_days(back).unwrap_or(date)
        }
        TimePeriod::Monthly => date.with_day(1).unwrap_or(date),
    }
}

/// Last day of the period starting at `start`.
fn period_end(period: TimePeriod, start: NaiveDate) -> NaiveDate {
    let end = match period {
        TimePeriod::Daily => Some(start),
        TimePeriod::Weekly => start.checked_add_days(Days::new(6)),
        TimePeriod::Monthly => start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt()),
    };
    end.unwrap_or(start)
}

fn period_label(period: TimePeriod, start: NaiveDate, end: NaiveDate) -> String {
    match period {
        TimePeriod::Daily => start.format("%Y-%m-%d").to_string(),
        TimePeriod::Weekly => format!("{} - {}", start.format("%b %d"), end.format("%b %d")),
        TimePeriod::Monthly => start.format("%Y-%m").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Weekday};

    use super::*;
    use crate::memory::MemorySource;
    use crate::progress::Silent;
    use crate::source::Commit;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn options(period: TimePeriod, top_contributors: usize) -> TimelineOptions {
        TimelineOptions {
            period,
            top_contributors,
            range: DateRange::UNBOUNDED,
        }
    }

    fn team_history() -> MemorySource {
        let mut history = MemorySource::new("memory://test");
        history
            .record("c1", "alice", "a@e.com", at("2024-03-04T09:00:00Z"), vec![])
            .record("c2", "alice", "a@e.com", at("2024-03-06T09:00:00Z"), vec![])
            .record("c3", "bob", "b@e.com", at("2024-03-07T09:00:00Z"), vec![])
            .record("c4", "carol", "c@e.com", at("2024-03-12T09:00:00Z"), vec![])
            .record("c5", "alice", "a@e.com", at("2024-04-02T09:00:00Z"), vec![]);
        history
    }

    #[test]
    fn weekly_buckets_start_on_monday() {
        // 2024-03-04 is a Monday.
        for day in 4..=10 {
            let d = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
            let start = period_start(TimePeriod::Weekly, d);
            assert_eq!(start, date("2024-03-04"), "day {day}");
            assert_eq!(start.weekday(), Weekday::Mon);
        }
        assert_eq!(period_start(TimePeriod::Weekly, date("2024-03-11")), date("2024-03-11"));
    }

    #[test]
    fn weeks_cross_year_boundaries() {
        let start = period_start(TimePeriod::Weekly, date("2025-01-01"));
        assert_eq!(start, date("2024-12-30"));
        assert_eq!(period_end(TimePeriod::Weekly, start), date("2025-01-05"));
    }

    #[test]
    fn month_ends_are_inclusive() {
        let feb = period_start(TimePeriod::Monthly, date("2024-02-17"));
        assert_eq!(feb, date("2024-02-01"));
        assert_eq!(period_end(TimePeriod::Monthly, feb), date("2024-02-29"));
        assert_eq!(period_end(TimePeriod::Monthly, date("2023-12-01")), date("2023-12-31"));
        assert_eq!(period_end(TimePeriod::Daily, date("2024-02-17")), date("2024-02-17"));
    }

    #[test]
    fn labels_match_period() {
        let d = date("2024-03-05");
        assert_eq!(period_label(TimePeriod::Daily, d, d), "2024-03-05");
        let week = period_start(TimePeriod::Weekly, d);
        assert_eq!(
            period_label(TimePeriod::Weekly, week, period_end(TimePeriod::Weekly, week)),
            "Mar 04 - Mar 10"
        );
        assert_eq!(period_label(TimePeriod::Monthly, date("2024-03-01"), d), "2024-03");
    }

    #[test]
    fn bucket_totals_sum_to_commit_count() {
        let history = team_history();
        for period in [TimePeriod::Daily, TimePeriod::Weekly, TimePeriod::Monthly] {
            let report = analyze_timeline(&history, &options(period, 10), &Silent).unwrap();
            let sum: u32 = report.timeline.iter().map(|e| e.total_commits).sum();
            assert_eq!(sum as usize, report.total_commits_analyzed, "{period}");
            assert!(report
                .timeline
                .windows(2)
                .all(|w| w[0].period_start < w[1].period_start));
        }
    }

    #[test]
    fn weekly_timeline_groups_midweek_commits() {
        let report =
            analyze_timeline(&team_history(), &options(TimePeriod::Weekly, 10), &Silent).unwrap();
        let starts: Vec<NaiveDate> = report.timeline.iter().map(|e| e.period_start).collect();
        assert_eq!(
            starts,
            vec![date("2024-03-04"), date("2024-03-11"), date("2024-04-01")]
        );
        assert_eq!(report.timeline[0].total_commits, 3);
    }

    #[test]
    fn only_top_contributors_are_itemized() {
        let report =
            analyze_timeline(&team_history(), &options(TimePeriod::Monthly, 1), &Silent).unwrap();
        assert_eq!(report.top_contributors, vec!["alice <a@e.com>"]);
        assert_eq!(report.total_contributors, 3);

        let march = &report.timeline[0];
        assert_eq!(march.total_commits, 4);
        assert_eq!(march.contributors.len(), 1);
        let alice = &march.contributors["alice <a@e.com>"];
        assert_eq!(alice.commit_count, 2);
        assert!((alice.percentage - 50.0).abs() < f64::EPSILON);
        assert_eq!(alice.color, "blue");
    }

    #[test]
    fn percentages_cover_fully_itemized_periods() {
        let report =
            analyze_timeline(&team_history(), &options(TimePeriod::Monthly, 10), &Silent).unwrap();
        for entry in &report.timeline {
            let share: f64 = entry.contributors.values().map(|c| c.percentage).sum();
            assert!((share - 100.0).abs() < 1e-9, "{}", entry.label);
        }
    }

    #[test]
    fn palette_wraps_for_large_top_lists() {
        let mut history = MemorySource::new("memory://test");
        for i in 0..30 {
            let name = format!("dev{i:02}");
            // Fewer commits for later devs keeps the rank order obvious.
            for n in 0..(30 - i) {
                history.record(
                    &format!("c{i}-{n}"),
                    &name,
                    "d@e.com",
                    at("2024-03-04T09:00:00Z"),
                    vec![],
                );
            }
        }

        let report = analyze_timeline(&history, &options(TimePeriod::Daily, 30), &Silent).unwrap();
        assert_eq!(report.contributor_colors.len(), 30);
        assert_eq!(report.contributor_colors["dev00 <d@e.com>"], PALETTE[0]);
        assert_eq!(report.contributor_colors["dev24 <d@e.com>"], PALETTE[0]);
        assert_eq!(report.contributor_colors["dev29 <d@e.com>"], PALETTE[5]);
    }

    #[test]
    fn busiest_period_is_the_earliest_maximum() {
        let mut history = MemorySource::new("memory://test");
        history
            .record("c1", "alice", "a@e.com", at("2024-01-10T09:00:00Z"), vec![])
            .record("c2", "alice", "a@e.com", at("2024-01-20T09:00:00Z"), vec![])
            .record("c3", "alice", "a@e.com", at("2024-02-10T09:00:00Z"), vec![])
            .record("c4", "alice", "a@e.com", at("2024-03-10T09:00:00Z"), vec![])
            .record("c5", "alice", "a@e.com", at("2024-03-20T09:00:00Z"), vec![]);

        let report = analyze_timeline(&history, &TimelineOptions::default(), &Silent).unwrap();
        assert_eq!(report.max_commits_in_period, 2);
        assert_eq!(report.busiest_period.unwrap().label, "2024-01");
    }

    #[test]
    fn merges_and_local_dates_are_bucketed() {
        let mut history = MemorySource::new("memory://test");
        history.record("c1", "alice", "a@e.com", at("2024-03-31T23:30:00-05:00"), vec![]);
        history.record_commit(
            Commit {
                id: "m1".into(),
                author_name: "alice".into(),
                author_email: "a@e.com".into(),
                committer_name: "alice".into(),
                time: at("2024-04-01T10:00:00+02:00"),
                parents: vec!["c1".into(), "side".into()],
            },
            vec![],
        );

        let report = analyze_timeline(&history, &TimelineOptions::default(), &Silent).unwrap();
        let labels: Vec<&str> = report.timeline.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-03", "2024-04"]);
        assert_eq!(report.total_commits_analyzed, 2);
    }

    #[test]
    fn since_filters_before_bucketing() {
        let opts = TimelineOptions {
            range: DateRange::parse(Some("2024-03-12"), None).unwrap(),
            ..options(TimePeriod::Monthly, 10)
        };
        let report = analyze_timeline(&team_history(), &opts, &Silent).unwrap();
        assert_eq!(report.total_commits_analyzed, 2);
        let sum: u32 = report.timeline.iter().map(|e| e.total_commits).sum();
        assert_eq!(sum, 2);
        assert!(report.since.is_some());
    }

    #[test]
    fn empty_history_has_no_busiest_period() {
        let report = analyze_timeline(
            &MemorySource::new("memory://empty"),
            &TimelineOptions::default(),
            &Silent,
        )
        .unwrap();
        assert!(report.timeline.is_empty());
        assert_eq!(report.max_commits_in_period, 0);
        assert!(report.busiest_period.is_none());
    }
}
