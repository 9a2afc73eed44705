//! Command-line interface module for chronotidy.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and validation
//! - Scan/plan/report orchestration
//! - Dispatch to the explicit apply passes (organize, delete duplicates,
//!   delete empty folders)
//!
//! Without a mode flag every run is a dry run: the tree is scanned, a plan
//! is computed and the CSV report is written, but nothing on disk changes.

use crate::actions;
use crate::config::ScanConfig;
use crate::exiftool::ExifToolClient;
use crate::output::OutputFormatter;
use crate::planner::{self, Plan};
use crate::report;
use crate::scanner;
use clap::Parser;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Organize duplicate files into Year/Month folders.
#[derive(Debug, Parser)]
#[command(
    name = "chronotidy",
    version,
    about = "Organize duplicate files into Year/Month folders."
)]
pub struct Cli {
    /// Organize files under PATH into Year/Month folders.
    #[arg(long, value_name = "PATH", group = "mode")]
    pub organize: Option<PathBuf>,

    /// Delete duplicates under PATH (originals remain in place).
    #[arg(long, value_name = "PATH", group = "mode")]
    pub delete_duplicates: Option<PathBuf>,

    /// Delete empty folders in the current working directory.
    #[arg(long)]
    pub delete_empty_folders: bool,

    /// CSV report path.
    #[arg(long, value_name = "PATH", default_value = "duplicate_report.csv")]
    pub report: PathBuf,

    /// Output folder to organize into (default: the scanned root).
    #[arg(long, value_name = "PATH")]
    pub output_root: Option<PathBuf>,

    /// Path to a TOML scan configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Runs the CLI application with parsed arguments.
///
/// This is the main entry point for CLI operations. The returned error
/// string is what the user sees; the process exit code is handled by
/// `main`.
pub fn run(cli: Cli) -> Result<(), String> {
    let config = ScanConfig::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let filters = config
        .compile()
        .map_err(|e| format!("Error compiling filters: {}", e))?;

    let cwd = env::current_dir().map_err(|e| format!("Cannot determine working directory: {}", e))?;
    let report_path = absolute(&cli.report, &cwd);

    if cli.delete_empty_folders {
        let summary = actions::delete_empty_folders(&cwd);
        if let Err(e) =
            report::append_cleanup_summary(&report_path, summary.deleted, summary.skipped)
        {
            OutputFormatter::warning(&format!("Could not record cleanup in report: {}", e));
        }
        OutputFormatter::plain(&format!(
            "Empty folders cleanup. Deleted: {}, Skipped: {}.",
            summary.deleted, summary.skipped
        ));
        if cli.organize.is_none() && cli.delete_duplicates.is_none() {
            return Ok(());
        }
    }

    let scan_root = cli
        .organize
        .clone()
        .or_else(|| cli.delete_duplicates.clone())
        .map(|p| absolute(&p, &cwd))
        .unwrap_or_else(|| cwd.clone());
    let scan_root = fs::canonicalize(&scan_root).unwrap_or(scan_root);
    let output_root = cli
        .output_root
        .as_deref()
        .map(|p| absolute(p, &cwd))
        .unwrap_or_else(|| scan_root.clone());

    let exiftool = ExifToolClient::detect();
    if !exiftool.is_available() {
        OutputFormatter::warning(
            "exiftool not found; dates will come from embedded metadata, file names, and file times",
        );
    }

    OutputFormatter::info(&format!("Scanning files under: {}", scan_root.display()));
    let paths =
        scanner::collect_paths(&scan_root, &filters, Some(&output_root)).map_err(|e| e.to_string())?;
    if paths.is_empty() {
        OutputFormatter::plain("No files found to process.");
        return Ok(());
    }

    let progress = OutputFormatter::create_progress_bar(paths.len() as u64);
    let records = scanner::process_files(&paths, &exiftool, Some(&progress));
    progress.finish_and_clear();

    let plan = planner::plan(records, &output_root).map_err(|e| e.to_string())?;
    report::write_report(&report_path, &plan).map_err(|e| e.to_string())?;
    OutputFormatter::success(&format!("CSV report written to: {}", report_path.display()));

    if cli.organize.is_some() {
        let summary = actions::organize(&plan);
        OutputFormatter::success(&format!(
            "Done. Moved: {}, Skipped: {}.",
            summary.moved, summary.skipped
        ));
    } else if cli.delete_duplicates.is_some() {
        let summary = actions::delete_duplicates(&plan);
        OutputFormatter::success(&format!(
            "Done. Deleted: {}, Skipped: {}.",
            summary.deleted, summary.skipped
        ));
    } else {
        print_dry_run_summary(&plan);
    }

    Ok(())
}

fn print_dry_run_summary(plan: &Plan) {
    let mut provenance_counts: HashMap<String, usize> = HashMap::new();
    for action in plan.actions() {
        *provenance_counts
            .entry(action.record.provenance.to_string())
            .or_insert(0) += 1;
    }

    OutputFormatter::provenance_table(&provenance_counts, plan.len());
    OutputFormatter::plain(&format!(
        "Keep: {}, duplicates: {}.",
        plan.keep_count(),
        plan.duplicate_count()
    ));
    OutputFormatter::dry_run_notice(
        "No files were modified. Use --organize or --delete-duplicates to apply changes.",
    );
}

fn absolute(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
