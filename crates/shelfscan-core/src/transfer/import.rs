use csv::{Reader, ReaderBuilder};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::csv_pages::list_pages;
use super::{FileRow, TagLinkRow, TagRow, TAGS_FILE, TAG_LINKS_FILE};
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::storage::Database;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows: usize,
    pub pages: usize,
    pub tags: usize,
    pub links: usize,
}

/// Restores a catalog written by `CatalogExporter`, keeping every id.
pub struct CatalogImporter {
    notes_dir: PathBuf,
}

fn csv_reader(path: &Path) -> Result<Reader<File>, Error> {
    Ok(ReaderBuilder::new().has_headers(false).from_path(path)?)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Deserialize every row of `path`, tagging failures with file and line.
fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<(u64, T)>, Error> {
    let label = file_label(path);
    let mut reader = csv_reader(path)?;
    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<T>().enumerate() {
        let line = index as u64 + 1;
        let row = result.map_err(|e| Error::import(&label, line, e.to_string()))?;
        rows.push((line, row));
    }
    Ok(rows)
}

impl CatalogImporter {
    pub fn new(notes_dir: &Path) -> Self {
        Self {
            notes_dir: notes_dir.to_path_buf(),
        }
    }

    /// Replay file pages, then tags, then tag links, in one transaction.
    ///
    /// Row order encodes the dependencies, so any unknown id or malformed
    /// row aborts the whole import and nothing is kept.
    pub fn import(
        &self,
        db: &Database,
        reporter: &dyn ProgressReporter,
    ) -> Result<ImportSummary, Error> {
        info!("Importing catalog from {}", self.notes_dir.display());
        let mut summary = ImportSummary::default();

        let tx = db.connection().unchecked_transaction()?;
        // tags may reference a parent that appears later in the file
        tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;

        for (page, path) in list_pages(&self.notes_dir)? {
            for (_, row) in read_rows::<FileRow>(&path)? {
                db.insert_file_with_id(&row.into_record())?;
                summary.rows += 1;
                reporter.on_imported(summary.rows);
            }
            summary.pages += 1;
            debug!("Imported page {} ({} rows so far)", page, summary.rows);
        }

        let tags_path = self.notes_dir.join(TAGS_FILE);
        let tag_rows = read_rows::<TagRow>(&tags_path)?;
        for (_, tag) in &tag_rows {
            db.insert_tag_with_id(tag.id, &tag.name, tag.parent_id)?;
        }
        for (line, tag) in &tag_rows {
            if let Some(parent_id) = tag.parent_id {
                if db.get_tag(parent_id)?.is_none() {
                    return Err(Error::import(
                        TAGS_FILE,
                        *line,
                        format!("tag {} references unknown parent {}", tag.id, parent_id),
                    ));
                }
            }
        }
        summary.tags = tag_rows.len();

        let links_path = self.notes_dir.join(TAG_LINKS_FILE);
        for (line, link) in read_rows::<TagLinkRow>(&links_path)? {
            if db.get_file_by_id(link.file_id)?.is_none() {
                return Err(Error::import(
                    TAG_LINKS_FILE,
                    line,
                    format!("unknown file id {}", link.file_id),
                ));
            }
            if db.get_tag(link.tag_id)?.is_none() {
                return Err(Error::import(
                    TAG_LINKS_FILE,
                    line,
                    format!("unknown tag id {}", link.tag_id),
                ));
            }
            if db.assign_tag(link.tag_id, link.file_id)? {
                summary.links += 1;
            } else {
                debug!(
                    "Skipping repeated link of tag {} to file {}",
                    link.tag_id, link.file_id
                );
            }
        }

        tx.commit()?;
        info!(
            "Imported {} records from {} pages, {} tags, {} tag assignments",
            summary.rows, summary.pages, summary.tags, summary.links
        );
        Ok(summary)
    }
}
