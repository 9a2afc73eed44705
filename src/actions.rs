//! The apply step: moves and deletions.
//!
//! Everything here consumes a fully computed [`Plan`](crate::planner::Plan)
//! and only then touches the filesystem. Per-file failures are reported and
//! counted as skips; they never abort the rest of the pass.

use crate::output::OutputFormatter;
use crate::planner::{ActionKind, Plan};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Errors that can occur while applying a single planned move.
#[derive(Debug)]
pub enum ApplyError {
    /// Failed to create the target's parent directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move a file to its target.
    FileMoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    /// No free target name within the probing limit.
    TargetExhausted(PathBuf),
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyError::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            ApplyError::FileMoveFailed { from, to, source } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    from.display(),
                    to.display(),
                    source
                )
            }
            ApplyError::TargetExhausted(path) => {
                write!(
                    f,
                    "Unable to find a free name for {}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for ApplyError {}

/// Outcome of an organize pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrganizeSummary {
    pub moved: usize,
    pub skipped: usize,
}

/// Outcome of a deletion pass (duplicates or empty folders).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub deleted: usize,
    pub skipped: usize,
}

/// Moves every Keep action to its planned target.
///
/// Duplicates are left in place; deleting them is a separate, explicit
/// pass. Files already sitting at their target are skipped. When a
/// different file already exists on disk at the planned target (left over
/// from an earlier run, or created since planning), the name is probed
/// with `stem__1`, `stem__2`, … until a free slot is found. Moves that
/// cross a filesystem boundary fall back to copy + remove, preserving the
/// source's modification time.
pub fn organize(plan: &Plan) -> OrganizeSummary {
    let mut summary = OrganizeSummary::default();

    for action in plan.actions() {
        let Some(target) = &action.target_path else {
            continue;
        };
        if same_file(&action.record.path, target) {
            summary.skipped += 1;
            continue;
        }
        match move_file(&action.record.path, target) {
            Ok(_) => summary.moved += 1,
            Err(err) => {
                OutputFormatter::error(&err.to_string());
                summary.skipped += 1;
            }
        }
    }
    summary
}

/// Deletes every Duplicate action's file.
///
/// A duplicate whose path resolves to its group's canonical path is never
/// deleted (that would destroy the kept copy); it is counted as skipped.
pub fn delete_duplicates(plan: &Plan) -> DeleteSummary {
    let mut summary = DeleteSummary::default();

    let duplicates = plan
        .actions()
        .iter()
        .filter(|action| action.kind == ActionKind::Duplicate);

    for action in duplicates {
        if same_file(&action.record.path, &action.canonical_path) {
            summary.skipped += 1;
            continue;
        }
        match fs::remove_file(&action.record.path) {
            Ok(()) => summary.deleted += 1,
            Err(err) => {
                OutputFormatter::error(&format!(
                    "Failed to delete {}: {}",
                    action.record.path.display(),
                    err
                ));
                summary.skipped += 1;
            }
        }
    }
    summary
}

/// Removes empty directories under `root`, bottom-up.
///
/// A directory counts as empty when it contains nothing but hidden files;
/// those are unlinked first. Directories containing real entries or hidden
/// subdirectories are skipped, as is the root itself.
pub fn delete_empty_folders(root: &Path) -> DeleteSummary {
    let mut summary = DeleteSummary::default();
    if !root.exists() {
        return summary;
    }

    let dirs = WalkDir::new(root)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.depth() > 0 && entry.file_type().is_dir());

    for entry in dirs {
        let path = entry.path();
        let entries = match fs::read_dir(path) {
            Ok(iter) => match iter.collect::<Result<Vec<_>, _>>() {
                Ok(entries) => entries,
                Err(_) => {
                    summary.skipped += 1;
                    continue;
                }
            },
            Err(_) => {
                summary.skipped += 1;
                continue;
            }
        };

        let is_hidden =
            |entry: &fs::DirEntry| entry.file_name().to_string_lossy().starts_with('.');
        let has_visible = entries.iter().any(|e| !is_hidden(e));
        let has_hidden_dir = entries
            .iter()
            .any(|e| is_hidden(e) && e.path().is_dir());
        if has_visible || has_hidden_dir {
            summary.skipped += 1;
            continue;
        }

        for hidden in &entries {
            if hidden.path().is_file() && fs::remove_file(hidden.path()).is_err() {
                break;
            }
        }
        match fs::remove_dir(path) {
            Ok(()) => summary.deleted += 1,
            Err(_) => summary.skipped += 1,
        }
    }
    summary
}

fn move_file(from: &Path, planned_target: &Path) -> Result<PathBuf, ApplyError> {
    let target = free_target(planned_target)?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| ApplyError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::rename(from, &target)
        .or_else(|_| copy_then_remove(from, &target))
        .map_err(|source| ApplyError::FileMoveFailed {
            from: from.to_path_buf(),
            to: target.clone(),
            source,
        })?;
    Ok(target)
}

/// Fallback for moves that rename cannot do, such as a target on a
/// different filesystem: copy the bytes, carry the source's modification
/// time onto the copy, then remove the source.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    // Timestamp carry-over is best effort; the copy stays valid without it.
    if let (Ok(mtime), Ok(dest)) = (
        fs::metadata(from).and_then(|m| m.modified()),
        fs::OpenOptions::new().write(true).open(to),
    ) {
        let _ = dest.set_modified(mtime);
    }
    fs::remove_file(from)
}

/// Probes for a target path not already occupied on disk.
fn free_target(target: &Path) -> Result<PathBuf, ApplyError> {
    if !target.exists() {
        return Ok(target.to_path_buf());
    }

    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = target.extension().map(|e| e.to_string_lossy().to_string());
    let parent = target.parent().unwrap_or_else(|| Path::new(""));

    for index in 1..1000 {
        let candidate_name = match &extension {
            Some(ext) => format!("{}__{}.{}", stem, index, ext),
            None => format!("{}__{}", stem, index),
        };
        let candidate = parent.join(candidate_name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(ApplyError::TargetExhausted(target.to_path_buf()))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
