//! Plan computation.
//!
//! The planner turns the scanner's record list into an immutable `Plan`:
//! records are grouped by content digest, the first-seen member of each
//! group becomes the canonical copy to keep, and every canonical gets a
//! `output_root/year/MM/name` target. Duplicates get no destination; they
//! are candidates for deletion in a separate pass.
//!
//! The planner performs no I/O and is deterministic: planning the same
//! record sequence twice produces an identical plan, including collision
//! suffixes. Nothing here mutates the filesystem; only the apply step in
//! [`crate::actions`] does, and it requires a fully computed `Plan` first.

use crate::scanner::FileRecord;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// What the plan intends to do with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// The canonical copy of its group; moved to its target on apply.
    Keep,
    /// A redundant copy; deleted by an explicit duplicate pass.
    Duplicate,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Keep => "keep",
            ActionKind::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned action for one scanned file.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub record: FileRecord,
    pub kind: ActionKind,
    /// Path of the canonical record of this file's group.
    pub canonical_path: PathBuf,
    /// Destination under the output root; `Some` only for keeps, and
    /// unique across the whole plan.
    pub target_path: Option<PathBuf>,
}

/// The complete, immutable, pre-mutation description of every intended
/// action, one per scanned file, in scan order.
#[derive(Debug, Clone)]
pub struct Plan {
    actions: Vec<PlannedAction>,
}

impl Plan {
    pub fn actions(&self) -> &[PlannedAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn keep_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| action.kind == ActionKind::Keep)
            .count()
    }

    pub fn duplicate_count(&self) -> usize {
        self.len() - self.keep_count()
    }
}

/// All records sharing one digest, in first-seen scan order.
///
/// Borrowed view over the record slice; built during grouping and read-only
/// afterwards.
#[derive(Debug)]
pub struct DuplicateGroup<'a> {
    pub digest: &'a str,
    /// Non-empty; `members[0]` is the canonical record.
    pub members: Vec<&'a FileRecord>,
}

impl<'a> DuplicateGroup<'a> {
    /// The record kept as the group's single representative: the one seen
    /// first in scan order.
    pub fn canonical(&self) -> &'a FileRecord {
        self.members[0]
    }
}

/// Planner failures. The planner does no I/O; the only way it can fail is
/// malformed input that indicates an upstream bug, which aborts the run.
#[derive(Debug)]
pub enum PlanError {
    /// A record reached the planner without a content digest.
    MissingDigest(PathBuf),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::MissingDigest(path) => write!(
                f,
                "Record for {} has no content digest; this is a bug in the scanner",
                path.display()
            ),
        }
    }
}

impl std::error::Error for PlanError {}

/// Groups records by digest, preserving first-seen order both within each
/// group and across groups.
///
/// # Errors
///
/// Returns `PlanError::MissingDigest` if any record carries an empty
/// digest.
pub fn group_by_digest(records: &[FileRecord]) -> Result<Vec<DuplicateGroup<'_>>, PlanError> {
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<&FileRecord>> = HashMap::new();

    for record in records {
        if record.digest.is_empty() {
            return Err(PlanError::MissingDigest(record.path.clone()));
        }
        let entry = members.entry(&record.digest).or_default();
        if entry.is_empty() {
            order.push(&record.digest);
        }
        entry.push(record);
    }

    Ok(order
        .into_iter()
        .map(|digest| DuplicateGroup {
            digest,
            members: members.remove(digest).unwrap_or_default(),
        })
        .collect())
}

/// Computes the plan for a record sequence.
///
/// Grouping, canonical selection and target computation are described in
/// the module docs. Target collisions between different groups (same
/// resolved period and file name, different content) are resolved by
/// appending `_1`, `_2`, … to the later groups' names, in scan order, so
/// the suffix assignment is stable under re-planning.
///
/// # Arguments
///
/// * `records` - Scanner output, in scan order
/// * `output_root` - Root under which `year/MM` folders are planned
pub fn plan(records: Vec<FileRecord>, output_root: &Path) -> Result<Plan, PlanError> {
    let mut canonical_paths: HashMap<String, PathBuf> = HashMap::new();
    let mut target_paths: HashMap<String, PathBuf> = HashMap::new();

    {
        let groups = group_by_digest(&records)?;
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        for group in &groups {
            let canonical = group.canonical();
            let dir = output_root
                .join(canonical.resolved.year.to_string())
                .join(format!("{:02}", canonical.resolved.month));
            let name = canonical
                .path
                .file_name()
                .map(OsString::from)
                .unwrap_or_else(|| OsString::from("unnamed"));

            let target = claim_target(&dir, &name, &mut claimed);
            canonical_paths.insert(group.digest.to_string(), canonical.path.clone());
            target_paths.insert(group.digest.to_string(), target);
        }
    }

    // Emit actions in original scan order, not grouped order, so the
    // report stays human-navigable.
    let mut seen: HashSet<String> = HashSet::new();
    let mut actions = Vec::with_capacity(records.len());
    for record in records {
        let first_seen = seen.insert(record.digest.clone());
        let kind = if first_seen {
            ActionKind::Keep
        } else {
            ActionKind::Duplicate
        };
        let canonical_path = canonical_paths[&record.digest].clone();
        let target_path = if first_seen {
            Some(target_paths[&record.digest].clone())
        } else {
            None
        };
        actions.push(PlannedAction {
            record,
            kind,
            canonical_path,
            target_path,
        });
    }

    Ok(Plan { actions })
}

/// Claims a unique target path within the plan, suffixing the stem with
/// `_1`, `_2`, … when the preferred name is already taken.
fn claim_target(dir: &Path, file_name: &OsString, claimed: &mut HashSet<PathBuf>) -> PathBuf {
    let preferred = dir.join(file_name);
    if claimed.insert(preferred.clone()) {
        return preferred;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = name.extension().map(|e| e.to_string_lossy().to_string());

    let mut index = 1usize;
    loop {
        let candidate_name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, index, ext),
            None => format!("{}_{}", stem, index),
        };
        let candidate = dir.join(candidate_name);
        if claimed.insert(candidate.clone()) {
            return candidate;
        }
        index += 1;
    }
}
