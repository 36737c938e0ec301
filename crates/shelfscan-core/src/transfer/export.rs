use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::csv_pages::{csv_writer, CsvPageWriter};
use super::{FileRow, PageWriter, TagLinkRow, TagRow, TAGS_FILE, TAG_LINKS_FILE};
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::storage::Database;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows: usize,
    pub pages: usize,
    pub tags: usize,
    pub links: usize,
}

/// Writes the catalog to paged flat files plus the tag tables.
pub struct CatalogExporter {
    notes_dir: PathBuf,
    page_size: usize,
}

impl CatalogExporter {
    pub fn new(notes_dir: &Path, page_size: usize) -> Self {
        Self {
            notes_dir: notes_dir.to_path_buf(),
            page_size: page_size.max(1),
        }
    }

    /// Export into CSV pages in the notes directory.
    pub fn export(
        &self,
        db: &Database,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExportSummary, Error> {
        let mut writer = CsvPageWriter::create(&self.notes_dir)?;
        self.export_with(db, &mut writer, reporter)
    }

    /// Export file rows through `writer`, then write `tags.csv` and
    /// `tags-files.csv` to the notes directory.
    ///
    /// Records flagged deleted are left out, as are their tag links.
    /// N rows produce exactly ceil(N / page_size) pages; an empty catalog
    /// opens none.
    pub fn export_with(
        &self,
        db: &Database,
        writer: &mut dyn PageWriter,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExportSummary, Error> {
        let total_rows = db.count_live_files()? as usize;
        info!(
            "Exporting {} records to {} ({} rows per page)",
            total_rows,
            self.notes_dir.display(),
            self.page_size
        );

        let page_size = self.page_size;
        let mut rows = 0usize;
        let mut page = 0usize;
        db.for_each_live_file(|record| {
            if rows % page_size == 0 {
                if page > 0 {
                    writer.close(false)?;
                }
                page += 1;
                writer.open_new_page(page)?;
                if page > 1 {
                    reporter.on_exported(rows, total_rows, page);
                }
            }
            writer.write_row(&FileRow::from(record))?;
            rows += 1;
            Ok(())
        })?;

        if page > 0 {
            writer.close(true)?;
            reporter.on_exported(rows, total_rows, page);
        }
        debug!("Exported {} rows across {} pages", rows, page);

        let tags = self.write_tags(db)?;
        let links = self.write_tag_links(db)?;
        info!("Exported {} tags and {} tag assignments", tags, links);

        Ok(ExportSummary {
            rows,
            pages: page,
            tags,
            links,
        })
    }

    fn write_tags(&self, db: &Database) -> Result<usize, Error> {
        let tags = db.select_all_tags()?;
        let mut writer = csv_writer(&self.notes_dir.join(TAGS_FILE))?;
        for tag in &tags {
            writer.serialize(TagRow {
                id: tag.id,
                name: tag.name.clone(),
                parent_id: tag.parent_id,
            })?;
        }
        writer.flush()?;
        Ok(tags.len())
    }

    fn write_tag_links(&self, db: &Database) -> Result<usize, Error> {
        let links = db.select_all_tag_links()?;
        let mut writer = csv_writer(&self.notes_dir.join(TAG_LINKS_FILE))?;
        for (file_id, tag_id) in &links {
            writer.serialize(TagLinkRow {
                file_id: *file_id,
                tag_id: *tag_id,
            })?;
        }
        writer.flush()?;
        Ok(links.len())
    }
}
