use std::fmt;
use std::path::Path;

use crate::storage::{FileRecord, ScanCounts};

/// Fate of a file as decided by a reconciliation scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    New,
    Moved,
    Renamed,
    MovedAndRenamed,
    Untouched,
    Deleted,
    Duplicate,
}

impl FileStatus {
    pub fn label(self) -> &'static str {
        match self {
            FileStatus::New => "new",
            FileStatus::Moved => "moved",
            FileStatus::Renamed => "renamed",
            FileStatus::MovedAndRenamed => "moved and renamed",
            FileStatus::Untouched => "untouched",
            FileStatus::Deleted => "deleted",
            FileStatus::Duplicate => "duplicate",
        }
    }

    /// Statuses whose stored path no longer matches the file on disk.
    pub fn is_relocation(self) -> bool {
        matches!(
            self,
            FileStatus::Moved | FileStatus::Renamed | FileStatus::MovedAndRenamed
        )
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ScanCounts {
    pub fn record(&mut self, status: FileStatus) {
        match status {
            FileStatus::New => self.new += 1,
            FileStatus::Moved => self.moved += 1,
            FileStatus::Renamed => self.renamed += 1,
            FileStatus::MovedAndRenamed => self.moved_and_renamed += 1,
            FileStatus::Untouched => self.untouched += 1,
            FileStatus::Deleted => self.deleted += 1,
            FileStatus::Duplicate => self.duplicate += 1,
        }
    }
}

/// Classify a freshly scanned candidate against the record stored under the
/// same fingerprint.
///
/// When the path changed and a file still sits at the stored location, the
/// candidate is a second copy of the same content rather than a move.
pub fn classify(
    candidate: &FileRecord,
    existing: Option<&FileRecord>,
    storage_root: &Path,
) -> FileStatus {
    let existing = match existing {
        Some(existing) => existing,
        None => return FileStatus::New,
    };

    let is_replaced = candidate.directory != existing.directory;
    let is_renamed = candidate.filename != existing.filename;
    if !is_replaced && !is_renamed {
        return FileStatus::Untouched;
    }

    if existing.abspath(storage_root).exists() {
        return FileStatus::Duplicate;
    }

    match (is_replaced, is_renamed) {
        (true, false) => FileStatus::Moved,
        (false, true) => FileStatus::Renamed,
        _ => FileStatus::MovedAndRenamed,
    }
}
