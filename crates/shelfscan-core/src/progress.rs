/// Trait for reporting scan, export and import progress.
///
/// The CLI implements it with indicatif bars; other front ends can forward to
/// their own widgets. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A file is about to be hashed. `path` is relative to the storage root.
    fn on_current_file(&self, _path: &str) {}
    fn on_scanned_count(&self, _files_scanned: usize) {}
    fn on_exported(&self, _rows_exported: usize, _total_rows: usize, _page: usize) {}
    fn on_imported(&self, _rows_imported: usize) {}
    fn on_finish(&self) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
