//! Core types, configuration, and error handling for git-oracle.
//!
//! This crate provides the shared foundation used by the other git-oracle crates:
//! - [`OracleError`]: unified error type using `thiserror`
//! - [`OracleConfig`]: configuration loaded from `.oracle.toml`
//! - Shared types: [`TimePeriod`], [`DateRange`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{validate_threshold, OracleConfig, ReportConfig, ReportSettings};
pub use error::OracleError;
pub use types::{parse_date, DateRange, OutputFormat, TimePeriod};

/// A convenience `Result` type for git-oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
