use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// Calendar granularity used to bucket commits on a timeline.
///
/// # Examples
///
/// ```
/// use oracle_core::TimePeriod;
///
/// let period: TimePeriod = "week".parse().unwrap();
/// assert_eq!(period, TimePeriod::Weekly);
/// assert_eq!(period.to_string(), "weekly");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    /// One bucket per calendar day.
    Daily,
    /// One bucket per Monday-aligned week.
    Weekly,
    /// One bucket per calendar month.
    #[default]
    Monthly,
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePeriod::Daily => write!(f, "daily"),
            TimePeriod::Weekly => write!(f, "weekly"),
            TimePeriod::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for TimePeriod {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" | "d" => Ok(TimePeriod::Daily),
            "weekly" | "week" | "w" => Ok(TimePeriod::Weekly),
            "monthly" | "month" | "m" => Ok(TimePeriod::Monthly),
            other => Err(OracleError::Config(format!(
                "invalid period '{other}': use 'daily', 'weekly', or 'monthly'"
            ))),
        }
    }
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`OracleError::Config`] when the string is not a valid calendar date.
///
/// # Examples
///
/// ```
/// use oracle_core::parse_date;
///
/// let date = parse_date("2024-02-29").unwrap();
/// assert_eq!(date.to_string(), "2024-02-29");
/// assert!(parse_date("2023-02-29").is_err());
/// ```
pub fn parse_date(value: &str) -> Result<NaiveDate, OracleError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        OracleError::Config(format!(
            "invalid date '{value}': {e}. Use YYYY-MM-DD format."
        ))
    })
}

/// Inclusive window of author dates a history walk is restricted to.
///
/// Bounds are wall-clock times compared against each commit's author-local
/// time, so a commit written at 23:30 in UTC-5 belongs to that calendar day.
///
/// # Examples
///
/// ```
/// use oracle_core::DateRange;
///
/// let range = DateRange::parse(Some("2024-01-01"), Some("2024-01-31")).unwrap();
/// let inside = chrono::DateTime::parse_from_rfc3339("2024-01-31T23:30:00-05:00").unwrap();
/// let outside = chrono::DateTime::parse_from_rfc3339("2023-12-31T23:59:59+00:00").unwrap();
/// assert!(range.contains(&inside));
/// assert!(!range.contains(&outside));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// Earliest author time included (start of the `since` day).
    pub since: Option<NaiveDateTime>,
    /// Latest author time included (end of the `until` day).
    pub until: Option<NaiveDateTime>,
}

impl DateRange {
    /// A range that admits every commit.
    pub const UNBOUNDED: DateRange = DateRange {
        since: None,
        until: None,
    };

    /// Build a range from optional `YYYY-MM-DD` bounds.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Config`] if either date is malformed or
    /// `since` falls after `until`.
    pub fn parse(since: Option<&str>, until: Option<&str>) -> Result<Self, OracleError> {
        let since = since
            .filter(|s| !s.trim().is_empty())
            .map(parse_date)
            .transpose()?;
        let until = until
            .filter(|s| !s.trim().is_empty())
            .map(parse_date)
            .transpose()?;
        Self::from_dates(since, until)
    }

    /// Build a range from already-parsed calendar dates.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Config`] if `since` falls after `until`.
    pub fn from_dates(
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
    ) -> Result<Self, OracleError> {
        if let (Some(s), Some(u)) = (since, until) {
            if s > u {
                return Err(OracleError::Config(format!(
                    "since date {s} is after until date {u}"
                )));
            }
        }
        Ok(Self {
            since: since.and_then(|d| d.and_hms_opt(0, 0, 0)),
            until: until.and_then(|d| d.and_hms_nano_opt(23, 59, 59, 999_999_999)),
        })
    }

    /// Whether a commit authored at `when` falls inside the range.
    pub fn contains(&self, when: &DateTime<FixedOffset>) -> bool {
        let local = when.naive_local();
        self.since.map_or(true, |since| local >= since)
            && self.until.map_or(true, |until| local <= until)
    }

    /// Whether no bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }
}

/// Output format for command results.
///
/// # Examples
///
/// ```
/// use oracle_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain-text listing.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
