//! Directory scanning.
//!
//! The scan happens in two phases. First the tree is walked in a
//! deterministic order (walkdir sorted by file name) collecting candidate
//! paths; the walk order is what later defines "first seen" for duplicate
//! resolution, so it must be stable for a fixed filesystem state. Then the
//! per-file work (stat, content hash, exiftool lookup, date resolution)
//! runs on the rayon worker pool. The parallel map is indexed, so records
//! come back in walk order and the first-seen invariant survives
//! parallelism.
//!
//! A file that cannot be read is reported and dropped from the scan; it is
//! neither organized nor deleted this run. Only an unusable scan root
//! aborts the whole scan.

use crate::config::ScanFilters;
use crate::exiftool::ExifToolClient;
use crate::hasher;
use crate::output::OutputFormatter;
use crate::timestamp::{self, FileTimes, Provenance, ResolvedDate};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One scanned regular file. Created here, never mutated afterwards; the
/// planner derives groups and actions from records instead of editing them.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Path as produced by the walk.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Lowercase hex MD5 of the file content.
    pub digest: String,
    /// Resolved creation period.
    pub resolved: ResolvedDate,
    /// Which source supplied the resolved date.
    pub provenance: Provenance,
}

/// Errors that abort a scan before any file is processed.
#[derive(Debug)]
pub enum ScanError {
    /// The scan root does not exist.
    RootNotFound(PathBuf),
    /// The scan root exists but is not a directory.
    RootNotADirectory(PathBuf),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::RootNotFound(path) => {
                write!(f, "Scan root not found: {}", path.display())
            }
            ScanError::RootNotADirectory(path) => {
                write!(f, "Scan root is not a directory: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ScanError {}

/// Walks the tree and returns the paths of all regular files to process,
/// in deterministic walk order.
///
/// Pruned during the walk: hidden and excluded directories (per the
/// compiled filters), and the output root itself when it sits inside the
/// scan root, so already-organized files are not rescanned. Symbolic links
/// are never followed and never recorded.
///
/// # Arguments
///
/// * `root` - Directory to scan
/// * `filters` - Compiled exclusion rules
/// * `output_root` - Target directory of the plan, pruned if inside `root`
///
/// # Errors
///
/// Returns a `ScanError` only when `root` itself is unusable. Unreadable
/// entries deeper in the tree are reported and skipped.
pub fn collect_paths(
    root: &Path,
    filters: &ScanFilters,
    output_root: Option<&Path>,
) -> Result<Vec<PathBuf>, ScanError> {
    if !root.exists() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::RootNotADirectory(root.to_path_buf()));
    }

    let pruned_output = output_root.and_then(|path| fs::canonicalize(path).ok());

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if filters.skip_dir(&name) {
                return false;
            }
            if let Some(output) = &pruned_output
                && fs::canonicalize(entry.path()).ok().as_deref() == Some(output)
            {
                return false;
            }
            true
        });

    let mut paths = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                OutputFormatter::warning(&format!("Skipping unreadable entry: {}", err));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if filters.include_file(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Hashes and date-resolves the given files on the rayon worker pool.
///
/// Records come back in the same order as `paths` regardless of which
/// worker finished first. Files that fail to stat or hash are reported via
/// the output formatter and omitted from the result.
///
/// # Arguments
///
/// * `paths` - Files to process, in walk order
/// * `exiftool` - External tool handle; unavailable clients are free no-ops
/// * `progress` - Optional progress bar, incremented once per file
pub fn process_files(
    paths: &[PathBuf],
    exiftool: &ExifToolClient,
    progress: Option<&ProgressBar>,
) -> Vec<FileRecord> {
    let records: Vec<Option<FileRecord>> = paths
        .par_iter()
        .map(|path| {
            let result = process_file(path, exiftool);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            match result {
                Ok(record) => Some(record),
                Err(err) => {
                    OutputFormatter::error(&format!("Skipping {}: {}", path.display(), err));
                    None
                }
            }
        })
        .collect();

    records.into_iter().flatten().collect()
}

/// Convenience wrapper: walk, then process.
pub fn scan(
    root: &Path,
    filters: &ScanFilters,
    exiftool: &ExifToolClient,
    output_root: Option<&Path>,
    progress: Option<&ProgressBar>,
) -> Result<Vec<FileRecord>, ScanError> {
    let paths = collect_paths(root, filters, output_root)?;
    Ok(process_files(&paths, exiftool, progress))
}

fn process_file(path: &Path, exiftool: &ExifToolClient) -> io::Result<FileRecord> {
    let metadata = fs::metadata(path)?;
    let digest = hasher::hash_file(path)?;
    let times = FileTimes::from_metadata(&metadata);
    let tool_meta = exiftool.read_metadata(path);
    let (resolved, provenance) = timestamp::resolve(path, tool_meta.as_ref(), &times);

    Ok(FileRecord {
        path: path.to_path_buf(),
        size: metadata.len(),
        digest,
        resolved,
        provenance,
    })
}
