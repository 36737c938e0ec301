use super::models::FileRecord;
use super::queries::{file_from_row, FILE_COLUMNS};
use super::sqlite::Database;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Result};
use std::collections::VecDeque;

/// Filter for catalog listings. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    /// Keep files carrying any of these tag ids.
    pub tags: Vec<i64>,
    /// Keep files whose directory or filename contains this substring.
    pub search: String,
}

impl FileFilter {
    pub fn search(text: impl Into<String>) -> Self {
        FileFilter {
            tags: Vec::new(),
            search: text.into(),
        }
    }

    pub fn tags(tags: impl Into<Vec<i64>>) -> Self {
        FileFilter {
            tags: tags.into(),
            search: String::new(),
        }
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if !self.search.is_empty() {
            clauses.push("(instr(directory, ?) > 0 OR instr(filename, ?) > 0)".to_string());
            values.push(Value::Text(self.search.clone()));
            values.push(Value::Text(self.search.clone()));
        }

        if !self.tags.is_empty() {
            let placeholders = vec!["?"; self.tags.len()].join(", ");
            clauses.push(format!(
                "id IN (SELECT file_id FROM tag_file WHERE tag_id IN ({}))",
                placeholders
            ));
            values.extend(self.tags.iter().map(|id| Value::Integer(*id)));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

impl Database {
    pub fn select_count(&self, filter: &FileFilter) -> Result<i64> {
        let (where_sql, values) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM any_file{}", where_sql);
        self.connection()
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))
    }

    /// Lazily iterate matching records ordered by filename, one page at a time.
    /// Call again to restart from the first row.
    pub fn select_rows(&self, filter: &FileFilter) -> FileRows<'_> {
        FileRows {
            db: self,
            filter: filter.clone(),
            page_count: None,
            next_page: 0,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    pub fn count_pages(&self, total_rows: i64) -> usize {
        let total = total_rows.max(0) as usize;
        total.div_ceil(self.settings().page_size)
    }

    fn select_page(&self, filter: &FileFilter, page: usize) -> Result<Vec<FileRecord>> {
        let page_size = self.settings().page_size;
        let (where_sql, mut values) = filter.where_clause();
        let sql = format!(
            "SELECT {} FROM any_file{} ORDER BY filename, id LIMIT ? OFFSET ?",
            FILE_COLUMNS, where_sql
        );
        values.push(Value::Integer(page_size as i64));
        values.push(Value::Integer((page * page_size) as i64));

        let mut stmt = self.connection().prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// Finite lazy sequence over a filtered listing.
///
/// The page count is fixed from the row count when iteration starts, so rows
/// inserted mid-iteration cannot make it run forever.
pub struct FileRows<'a> {
    db: &'a Database,
    filter: FileFilter,
    page_count: Option<usize>,
    next_page: usize,
    buffer: VecDeque<FileRecord>,
    done: bool,
}

impl Iterator for FileRows<'_> {
    type Item = Result<FileRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }

            let page_count = match self.page_count {
                Some(count) => count,
                None => match self.db.select_count(&self.filter) {
                    Ok(total) => {
                        let count = self.db.count_pages(total);
                        self.page_count = Some(count);
                        count
                    }
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
            };

            if self.next_page >= page_count {
                self.done = true;
                return None;
            }

            match self.db.select_page(&self.filter, self.next_page) {
                Ok(rows) => {
                    self.next_page += 1;
                    self.buffer.extend(rows);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
