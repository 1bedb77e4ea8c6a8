//! Git history mining: change frequency, contributors, change coupling, and
//! activity timelines.
//!
//! Every analysis reads history through a [`source::CommitSource`], walking
//! commits newest first in a single sequential pass. [`git::GitRepository`]
//! opens real repositories with git2; [`memory::MemorySource`] replays a
//! hand-built history. [`comprehensive::analyze_repository`] runs all four
//! analyses concurrently and combines them into one report.

pub mod comprehensive;
pub mod contributors;
pub mod coupling;
pub mod frequency;
pub mod git;
mod ledger;
pub mod memory;
pub mod progress;
pub mod source;
pub mod timeline;
