use csv::{Terminator, Writer, WriterBuilder};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{FileRow, PageWriter};
use crate::error::Error;

const PAGE_PREFIX: &str = "files-";
const PAGE_SUFFIX: &str = ".csv";

pub(crate) fn csv_writer(path: &Path) -> Result<Writer<File>, Error> {
    Ok(WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)?)
}

pub fn page_file_name(page: usize) -> String {
    format!("{}{:05}{}", PAGE_PREFIX, page, PAGE_SUFFIX)
}

/// Page number encoded in a page file name, `None` for any other file.
pub fn page_number(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(PAGE_PREFIX)?
        .strip_suffix(PAGE_SUFFIX)?
        .parse()
        .ok()
}

/// Page files in `dir`, ordered by page number.
pub fn list_pages(dir: &Path) -> Result<Vec<(usize, PathBuf)>, Error> {
    let mut pages = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(page) = page_number(&entry.file_name().to_string_lossy()) {
            pages.push((page, entry.path()));
        }
    }
    pages.sort_by_key(|(page, _)| *page);
    Ok(pages)
}

/// Writes each page to `files-NNNNN.csv` in the notes directory.
pub struct CsvPageWriter {
    dir: PathBuf,
    writer: Option<Writer<File>>,
    page: usize,
    rows_on_page: usize,
}

impl CsvPageWriter {
    /// Prepare `dir` for a fresh export, removing pages left by an earlier one.
    pub fn create(dir: &Path) -> Result<Self, Error> {
        fs::create_dir_all(dir)?;
        for (page, path) in list_pages(dir)? {
            fs::remove_file(&path)?;
            debug!("Removed stale export page {}", page);
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            writer: None,
            page: 0,
            rows_on_page: 0,
        })
    }

    pub fn page_path(&self, page: usize) -> PathBuf {
        self.dir.join(page_file_name(page))
    }
}

impl PageWriter for CsvPageWriter {
    fn open_new_page(&mut self, page: usize) -> Result<(), Error> {
        if let Some(mut previous) = self.writer.take() {
            previous.flush()?;
        }
        self.writer = Some(csv_writer(&self.page_path(page))?);
        self.page = page;
        self.rows_on_page = 0;
        Ok(())
    }

    fn write_row(&mut self, row: &FileRow) -> Result<(), Error> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Other("write_row called with no open page".to_string()))?;
        writer.serialize(row)?;
        self.rows_on_page += 1;
        Ok(())
    }

    fn close(&mut self, is_last_page: bool) -> Result<(), Error> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        debug!(
            "Closed export page {} ({} rows, last: {})",
            self.page, self.rows_on_page, is_last_page
        );
        Ok(())
    }
}
