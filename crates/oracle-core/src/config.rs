use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::types::{DateRange, TimePeriod};

/// Top-level configuration loaded from `.oracle.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use oracle_core::OracleConfig;
///
/// let config = OracleConfig::default();
/// assert_eq!(config.report.top_files, 20);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Analysis parameters shared by every subcommand.
    #[serde(default)]
    pub report: ReportConfig,
}

impl OracleConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Io`] if the file cannot be read, or
    /// [`OracleError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use oracle_core::OracleConfig;
    /// use std::path::Path;
    ///
    /// let config = OracleConfig::from_file(Path::new(".oracle.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, OracleError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use oracle_core::OracleConfig;
    ///
    /// let toml = r#"
    /// [report]
    /// top_couples = 5
    /// "#;
    /// let config = OracleConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.report.top_couples, 5);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, OracleError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Raw analysis parameters as written by the user.
///
/// Values are kept as written so that a bad date or period token surfaces
/// as [`OracleError::Config`] from [`ReportConfig::validate`] instead of as a
/// TOML error.
///
/// # Examples
///
/// ```
/// use oracle_core::{ReportConfig, TimePeriod};
///
/// let config = ReportConfig::default();
/// assert_eq!(config.min_coupling_strength, 0.1);
/// assert_eq!(config.timeline_period, "monthly");
///
/// let settings = config.validate().unwrap();
/// assert_eq!(settings.timeline_period, TimePeriod::Monthly);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Most-changed files to keep (default: 20).
    #[serde(default = "default_top")]
    pub top_files: usize,
    /// Contributors to keep (default: 20).
    #[serde(default = "default_top")]
    pub top_contributors: usize,
    /// Coupled file pairs to keep (default: 20).
    #[serde(default = "default_top")]
    pub top_couples: usize,
    /// Minimum coupling strength in `[0, 1]` (default: 0.1).
    #[serde(default = "default_min_coupling_strength")]
    pub min_coupling_strength: f64,
    /// Timeline bucket granularity (default: `"monthly"`).
    #[serde(default = "default_timeline_period")]
    pub timeline_period: String,
    /// Contributors itemized on the timeline (default: 20).
    #[serde(default = "default_top")]
    pub timeline_contributors: usize,
    /// Only analyze commits authored on or after this date (`YYYY-MM-DD`).
    #[serde(default)]
    pub since: Option<String>,
    /// Only analyze commits authored on or before this date (`YYYY-MM-DD`).
    #[serde(default)]
    pub until: Option<String>,
}

fn default_top() -> usize {
    20
}

fn default_min_coupling_strength() -> f64 {
    0.1
}

fn default_timeline_period() -> String {
    "monthly".into()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_files: default_top(),
            top_contributors: default_top(),
            top_couples: default_top(),
            min_coupling_strength: default_min_coupling_strength(),
            timeline_period: default_timeline_period(),
            timeline_contributors: default_top(),
            since: None,
            until: None,
        }
    }
}

/// Validated, typed analysis parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub top_files: usize,
    pub top_contributors: usize,
    pub top_couples: usize,
    pub min_coupling_strength: f64,
    pub timeline_period: TimePeriod,
    pub timeline_contributors: usize,
    pub range: DateRange,
}

impl ReportConfig {
    /// Resolve the raw values into [`ReportSettings`].
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Config`] for a malformed date, a `since` later
    /// than `until`, a threshold outside `[0, 1]`, or an unknown period.
    pub fn validate(&self) -> Result<ReportSettings, OracleError> {
        let range = DateRange::parse(self.since.as_deref(), self.until.as_deref())?;
        let timeline_period: TimePeriod = self.timeline_period.parse()?;
        validate_threshold(self.min_coupling_strength)?;

        Ok(ReportSettings {
            top_files: self.top_files,
            top_contributors: self.top_contributors,
            top_couples: self.top_couples,
            min_coupling_strength: self.min_coupling_strength,
            timeline_period,
            timeline_contributors: self.timeline_contributors,
            range,
        })
    }
}

/// Check that a coupling-strength threshold lies in `[0, 1]`.
///
/// # Errors
///
/// Returns [`OracleError::Config`] for values outside the interval and NaN.
pub fn validate_threshold(value: f64) -> Result<(), OracleError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(OracleError::Config(format!(
            "minimum coupling strength {value} must be within [0, 1]"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = OracleConfig::default();
        assert_eq!(config.report.top_files, 20);
        assert_eq!(config.report.top_contributors, 20);
        assert_eq!(config.report.top_couples, 20);
        assert_eq!(config.report.timeline_contributors, 20);
        assert_eq!(config.report.min_coupling_strength, 0.1);
        assert_eq!(config.report.timeline_period, "monthly");
        assert!(config.report.since.is_none());
        assert!(config.report.until.is_none());
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[report]
top_files = 5
top_contributors = 3
top_couples = 7
min_coupling_strength = 0.4
timeline_period = "weekly"
timeline_contributors = 4
since = "2024-01-01"
until = "2024-06-30"
"#;
        let config = OracleConfig::from_toml(toml).unwrap();
        let settings = config.report.validate().unwrap();
        assert_eq!(settings.top_files, 5);
        assert_eq!(settings.top_contributors, 3);
        assert_eq!(settings.top_couples, 7);
        assert_eq!(settings.min_coupling_strength, 0.4);
        assert_eq!(settings.timeline_period, TimePeriod::Weekly);
        assert_eq!(settings.timeline_contributors, 4);
        assert!(settings.range.since.is_some());
        assert!(settings.range.until.is_some());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = OracleConfig::from_toml("").unwrap();
        assert_eq!(config.report.top_files, 20);
        let settings = config.report.validate().unwrap();
        assert!(settings.range.is_unbounded());
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = OracleConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(OracleError::Toml(_))));
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        for bad in [-0.1, 1.5, f64::NAN] {
            let config = ReportConfig {
                min_coupling_strength: bad,
                ..ReportConfig::default()
            };
            assert!(matches!(config.validate(), Err(OracleError::Config(_))));
        }
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
    }

    #[test]
    fn unknown_period_is_rejected() {
        let config = ReportConfig {
            timeline_period: "hourly".into(),
            ..ReportConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("hourly"));
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let config = ReportConfig {
            since: Some("2024-1-1x".into()),
            ..ReportConfig::default()
        };
        assert!(matches!(config.validate(), Err(OracleError::Config(_))));

        let config = ReportConfig {
            since: Some("2024-02-01".into()),
            until: Some("2024-01-01".into()),
            ..ReportConfig::default()
        };
        assert!(matches!(config.validate(), Err(OracleError::Config(_))));
    }
}
