use indicatif::{ProgressBar, ProgressStyle};
use shelfscan_core::ProgressReporter;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif.
///
/// - Scan: spinner with the running file count and current path
/// - Export: bar over the live record count
/// - Import: spinner with the imported row count
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        match self.bar.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current bar, creating a spinner on first use.
    fn spinner(&self) -> ProgressBar {
        let mut guard = self.lock();
        guard
            .get_or_insert_with(|| {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} [{prefix}] {msg}") {
                    pb.set_style(style.tick_chars(TICK_CHARS));
                }
                pb.enable_steady_tick(Duration::from_millis(80));
                pb
            })
            .clone()
    }

    fn export_bar(&self, total_rows: usize) -> ProgressBar {
        let mut guard = self.lock();
        guard
            .get_or_insert_with(|| {
                let pb = ProgressBar::new(total_rows as u64);
                if let Ok(style) = ProgressStyle::with_template(
                    "  {spinner:.cyan} Exporting [{bar:30.cyan/dim}] {pos}/{len} rows, page {msg}",
                ) {
                    pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
                }
                pb
            })
            .clone()
    }
}

impl CliReporter {
    /// Print a line to stdout without tearing the active bar.
    pub fn println(&self, line: &str) {
        let bar = self.lock().clone();
        match bar {
            Some(pb) => pb.suspend(|| println!("{}", line)),
            None => println!("{}", line),
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_current_file(&self, path: &str) {
        self.spinner().set_message(path.to_string());
    }

    fn on_scanned_count(&self, files_scanned: usize) {
        self.spinner().set_prefix(files_scanned.to_string());
    }

    fn on_exported(&self, rows_exported: usize, total_rows: usize, page: usize) {
        let pb = self.export_bar(total_rows);
        pb.set_position(rows_exported as u64);
        pb.set_message(page.to_string());
    }

    fn on_imported(&self, rows_imported: usize) {
        self.spinner()
            .set_message(format!("Importing... {} rows", rows_imported));
    }

    fn on_finish(&self) {
        if let Some(pb) = self.lock().take() {
            pb.finish_and_clear();
        }
    }
}
