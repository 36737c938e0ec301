use crate::config::{DuplicatePolicy, LibraryConfig};
use crate::error::Error;
use crate::hasher;
use crate::progress::ProgressReporter;
use crate::scanner::LibraryWalker;
use crate::status::{classify, FileStatus};
use crate::storage::{Database, FileRecord, ScanCounts};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Incremental reconciliation scanner for one storage root.
pub struct ScanEngine {
    config: LibraryConfig,
}

/// One classified row, handed to the caller's result callback.
///
/// `candidate` is the file just seen on disk (absent for `Deleted`);
/// `existing` is the record previously stored under the same fingerprint.
#[derive(Debug, Clone, Copy)]
pub struct ScanOutcome<'a> {
    pub status: FileStatus,
    pub candidate: Option<&'a FileRecord>,
    pub existing: Option<&'a FileRecord>,
}

#[derive(Debug)]
pub struct ScanResult {
    pub session_id: i64,
    pub counts: ScanCounts,
    pub duration: Duration,
}

impl ScanEngine {
    pub fn new(config: LibraryConfig) -> Self {
        Self { config }
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.process_duplicate = policy;
        self
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Reconcile the catalog with the storage root:
    /// 1. Flag every stored record deleted
    /// 2. Walk and hash files, flushing candidates in batches and classifying each row
    /// 3. Report records still flagged deleted as `Deleted`
    ///
    /// I/O and database failures abort the scan; records not yet seen stay
    /// flagged deleted until the next run.
    pub fn scan<F>(
        &self,
        db: &mut Database,
        reporter: &dyn ProgressReporter,
        mut on_result: F,
    ) -> Result<ScanResult, Error>
    where
        F: FnMut(&ScanOutcome<'_>),
    {
        let start = Instant::now();
        let root = self.config.storage_books.as_path();
        info!(
            "Scanning {} (duplicate policy: {})",
            root.display(),
            self.config.process_duplicate
        );

        db.mark_all_deleted()?;
        let session_id = db.create_scan_session(&root.to_string_lossy())?;

        let walker = LibraryWalker::new(
            root,
            &self.config.ignore_extensions,
            &self.config.ignore_patterns,
        );
        let mut counts = ScanCounts::default();
        let mut files_scanned = 0usize;

        for entry in walker.walk() {
            let entry = entry?;
            reporter.on_current_file(&entry.relpath());

            let hash = hasher::get_file_hash(&entry.path)?;
            trace!("{} -> {}", entry.relpath(), hash);
            files_scanned += 1;
            reporter.on_scanned_count(files_scanned);

            db.append_pending_row(FileRecord::candidate(&hash, &entry.directory, &entry.filename));
            if db.is_batch_full() {
                self.flush_pending(db, &mut counts, &mut on_result)?;
            }
        }
        self.flush_pending(db, &mut counts, &mut on_result)?;

        for record in db.select_deleted()? {
            counts.record(FileStatus::Deleted);
            on_result(&ScanOutcome {
                status: FileStatus::Deleted,
                candidate: None,
                existing: Some(&record),
            });
        }

        counts.scanned = files_scanned as i64;
        db.complete_scan_session(session_id, &counts)?;
        let duration = start.elapsed();
        info!(
            "Scan completed in {:.2}s: {} files, {} new, {} moved, {} renamed, \
             {} moved and renamed, {} duplicate, {} deleted",
            duration.as_secs_f64(),
            counts.scanned,
            counts.new,
            counts.moved,
            counts.renamed,
            counts.moved_and_renamed,
            counts.duplicate,
            counts.deleted,
        );
        reporter.on_finish();

        Ok(ScanResult {
            session_id,
            counts,
            duration,
        })
    }

    fn flush_pending<F>(
        &self,
        db: &mut Database,
        counts: &mut ScanCounts,
        on_result: &mut F,
    ) -> Result<usize, Error>
    where
        F: FnMut(&ScanOutcome<'_>),
    {
        let root = self.config.storage_books.as_path();
        let policy = self.config.process_duplicate;

        db.flush_batch(|db, candidate, existing| {
            let status = classify(candidate, existing, root);
            counts.record(status);

            if policy == DuplicatePolicy::Original && status.is_relocation() {
                db.update_path(&candidate.hash, &candidate.directory, &candidate.filename)?;
                debug!(
                    "Updated stored path for {} to {} ({})",
                    candidate.hash,
                    candidate.relpath(),
                    status
                );
            }

            on_result(&ScanOutcome {
                status,
                candidate: Some(candidate),
                existing,
            });
            Ok(())
        })
    }
}
