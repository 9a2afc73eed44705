//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored
//! output, progress tracking during the scan phase, and the dry-run summary
//! table. This module abstracts away output details, making it easy to
//! change formatting globally.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for the scan phase
/// - Summary tables for the computed plan
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates and returns a progress bar for per-file scan work.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of files to process
    ///
    /// # Example
    ///
    /// ```no_run
    /// use chronotidy::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints a summary table of scanned files by date provenance.
    ///
    /// Shows how the resolved dates were obtained, which is the quickest
    /// way to judge how trustworthy a plan is before applying it.
    ///
    /// # Arguments
    ///
    /// * `provenance_counts` - Map of provenance tag to file count
    /// * `total_files` - Total number of files planned
    pub fn provenance_table(provenance_counts: &HashMap<String, usize>, total_files: usize) {
        Self::header("DATE SOURCES");

        // Sort tags for consistent output
        let mut sources: Vec<_> = provenance_counts.iter().collect();
        sources.sort_by_key(|&(name, _)| name);

        let max_source_len = sources
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(6); // At least "Source" width

        println!(
            "{:<width$} | {}",
            "Source".bold(),
            "Files".bold(),
            width = max_source_len
        );
        println!("{}", "-".repeat(max_source_len + 10));

        for (source, count) in &sources {
            let file_word = if **count == 1 { "file" } else { "files" };
            println!(
                "{:<width$} | {} {}",
                source,
                count.to_string().green(),
                file_word,
                width = max_source_len
            );
        }

        println!("{}", "-".repeat(max_source_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            if total_files == 1 { "file" } else { "files" },
            width = max_source_len
        );
    }
}
