//! chronotidy - organize files into Year/Month folders by creation date
//!
//! This library deduplicates files by content hash, resolves a canonical
//! creation date for each file through a prioritized chain of metadata
//! sources, and plans a `Year/Month` target layout. Scanning and planning
//! never touch the filesystem; moves and deletions happen only in the
//! explicit apply step, after a plan and its CSV report exist.

pub mod actions;
pub mod cli;
pub mod config;
pub mod exiftool;
pub mod hasher;
pub mod output;
pub mod planner;
pub mod report;
pub mod scanner;
pub mod timestamp;

pub use config::{ConfigError, ScanConfig, ScanFilters};
pub use exiftool::ExifToolClient;
pub use planner::{ActionKind, DuplicateGroup, Plan, PlanError, PlannedAction};
pub use scanner::{FileRecord, ScanError};
pub use timestamp::{FileKind, FileTimes, Provenance, ResolvedDate, ToolMetadata};

pub use cli::{Cli, run};
