//! CSV report writing.
//!
//! Every run writes one row per scanned file, in plan (= scan) order. When
//! the report file already exists and its header matches, new rows are
//! appended so successive runs accumulate in one place; anything else at
//! that path is truncated and rewritten with a fresh header.

use crate::planner::{ActionKind, Plan};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Report column names, in order.
pub const REPORT_FIELDS: [&str; 9] = [
    "md5",
    "file_path",
    "original_path",
    "is_original",
    "year",
    "month",
    "created_source",
    "target_path",
    "action",
];

/// Errors that can occur while writing a report.
#[derive(Debug)]
pub enum ReportError {
    /// The report file could not be opened or created.
    OpenFailed { path: PathBuf, source: std::io::Error },
    /// A row or the header failed to serialize or flush.
    WriteFailed { path: PathBuf, source: csv::Error },
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::OpenFailed { path, source } => {
                write!(f, "Failed to open report {}: {}", path.display(), source)
            }
            ReportError::WriteFailed { path, source } => {
                write!(f, "Failed to write report {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ReportError {}

/// Writes the plan to a CSV report.
///
/// # Arguments
///
/// * `report_path` - Destination CSV file
/// * `plan` - The computed plan; one row is written per action
///
/// # Errors
///
/// Returns a `ReportError` if the file cannot be opened or a row cannot be
/// written. The plan itself is never modified.
pub fn write_report(report_path: &Path, plan: &Plan) -> Result<(), ReportError> {
    let mut writer = open_writer(report_path)?;

    for action in plan.actions() {
        let record = &action.record;
        let target = action
            .target_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let is_original = match action.kind {
            ActionKind::Keep => "yes",
            ActionKind::Duplicate => "no",
        };

        let row = [
            record.digest.clone(),
            record.path.display().to_string(),
            action.canonical_path.display().to_string(),
            is_original.to_string(),
            record.resolved.year.to_string(),
            format!("{:02}", record.resolved.month),
            record.provenance.to_string(),
            target,
            action.kind.as_str().to_string(),
        ];
        writer
            .write_record(&row)
            .map_err(|e| write_failed(report_path, e))?;
    }

    writer
        .flush()
        .map_err(|e| write_failed(report_path, csv::Error::from(e)))
}

/// Appends a single summary row for an empty-folder cleanup run.
///
/// All data columns are left blank; the `action` column carries the
/// deleted/skipped counts.
pub fn append_cleanup_summary(
    report_path: &Path,
    deleted: usize,
    skipped: usize,
) -> Result<(), ReportError> {
    let mut writer = open_writer(report_path)?;
    let action = format!("delete_empty_folders deleted={} skipped={}", deleted, skipped);

    let mut row = vec![""; REPORT_FIELDS.len() - 1];
    row.push(action.as_str());
    writer
        .write_record(&row)
        .map_err(|e| write_failed(report_path, e))?;
    writer
        .flush()
        .map_err(|e| write_failed(report_path, csv::Error::from(e)))
}

fn write_failed(path: &Path, source: csv::Error) -> ReportError {
    ReportError::WriteFailed {
        path: path.to_path_buf(),
        source,
    }
}

/// Opens a CSV writer in append mode when the existing file starts with
/// the expected header, otherwise truncating and writing a fresh header.
fn open_writer(report_path: &Path) -> Result<csv::Writer<File>, ReportError> {
    let append = has_matching_header(report_path);

    let file = if append {
        OpenOptions::new().append(true).open(report_path)
    } else {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(report_path)
    }
    .map_err(|source| ReportError::OpenFailed {
        path: report_path.to_path_buf(),
        source,
    })?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if !append {
        writer
            .write_record(REPORT_FIELDS)
            .map_err(|e| write_failed(report_path, e))?;
    }
    Ok(writer)
}

fn has_matching_header(report_path: &Path) -> bool {
    let Ok(file) = File::open(report_path) else {
        return false;
    };
    let mut first_line = String::new();
    if BufReader::new(file).read_line(&mut first_line).is_err() {
        return false;
    }
    first_line.trim_end() == REPORT_FIELDS.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner;
    use crate::scanner::FileRecord;
    use crate::timestamp::{Provenance, ResolvedDate};
    use std::fs;
    use tempfile::TempDir;

    fn sample_plan() -> Plan {
        let records = vec![
            FileRecord {
                path: PathBuf::from("/scan/a.jpg"),
                size: 3,
                digest: "d1".to_string(),
                resolved: ResolvedDate {
                    year: 2021,
                    month: 7,
                },
                provenance: Provenance::Filename,
            },
            FileRecord {
                path: PathBuf::from("/scan/b.jpg"),
                size: 3,
                digest: "d1".to_string(),
                resolved: ResolvedDate {
                    year: 2021,
                    month: 7,
                },
                provenance: Provenance::Mtime,
            },
        ];
        planner::plan(records, Path::new("/out")).unwrap()
    }

    #[test]
    fn test_report_rows_and_header() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("report.csv");

        write_report(&report, &sample_plan()).unwrap();

        let content = fs::read_to_string(&report).unwrap();
        let lines: Vec<_> = content.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], REPORT_FIELDS.join(","));
        assert!(lines[1].starts_with("d1,/scan/a.jpg,/scan/a.jpg,yes,2021,07,filename"));
        assert!(lines[1].ends_with("/out/2021/07/a.jpg,keep"));
        // Duplicates carry no target path.
        assert!(lines[2].contains(",no,2021,07,mtime,,duplicate"));
    }

    #[test]
    fn test_report_appends_when_header_matches() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("report.csv");

        write_report(&report, &sample_plan()).unwrap();
        write_report(&report, &sample_plan()).unwrap();

        let content = fs::read_to_string(&report).unwrap();
        let lines: Vec<_> = content.lines().collect();

        // One header, two runs of two rows each.
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], REPORT_FIELDS.join(","));
        assert!(!lines[1].contains("md5"));
    }

    #[test]
    fn test_report_truncates_foreign_file() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("report.csv");
        fs::write(&report, "something,else\n1,2\n").unwrap();

        write_report(&report, &sample_plan()).unwrap();

        let content = fs::read_to_string(&report).unwrap();
        assert!(content.starts_with(&REPORT_FIELDS.join(",")));
        assert!(!content.contains("something,else"));
    }

    #[test]
    fn test_cleanup_summary_row() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("report.csv");

        append_cleanup_summary(&report, 3, 1).unwrap();

        let content = fs::read_to_string(&report).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], REPORT_FIELDS.join(","));
        assert!(lines[1].ends_with("delete_empty_folders deleted=3 skipped=1"));
    }
}
