pub mod csv_pages;
pub mod export;
pub mod import;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::storage::FileRecord;

pub use csv_pages::CsvPageWriter;
pub use export::{CatalogExporter, ExportSummary};
pub use import::{CatalogImporter, ImportSummary};

pub const TAGS_FILE: &str = "tags.csv";
pub const TAG_LINKS_FILE: &str = "tags-files.csv";

/// One exported file record: `hash,id,directory,filename`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRow {
    pub hash: String,
    pub id: i64,
    pub directory: String,
    pub filename: String,
}

impl From<&FileRecord> for FileRow {
    fn from(record: &FileRecord) -> Self {
        FileRow {
            hash: record.hash.clone(),
            id: record.id,
            directory: record.directory.clone(),
            filename: record.filename.clone(),
        }
    }
}

impl FileRow {
    pub fn into_record(self) -> FileRecord {
        let mut record = FileRecord::candidate(&self.hash, &self.directory, &self.filename);
        record.id = self.id;
        record
    }
}

/// One exported tag: `id,name,parent_id` (parent empty for roots).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// One exported tag assignment: `file_id,tag_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagLinkRow {
    pub file_id: i64,
    pub tag_id: i64,
}

/// Persists exported file rows page by page.
///
/// The exporter decides page boundaries; implementations only store rows.
/// Pages are numbered from 1 and exactly one `close` call per export passes
/// `is_last_page = true`.
pub trait PageWriter {
    fn open_new_page(&mut self, page: usize) -> Result<(), Error>;
    fn write_row(&mut self, row: &FileRow) -> Result<(), Error>;
    fn close(&mut self, is_last_page: bool) -> Result<(), Error>;
}
