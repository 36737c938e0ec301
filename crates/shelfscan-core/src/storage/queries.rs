use super::models::*;
use super::sqlite::Database;
use crate::error::Error;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Result, Row};
use serde_json::{Map, Value};
use tracing::debug;

pub(crate) const FILE_COLUMNS: &str =
    "id, hash, directory, filename, is_deleted, media_group, is_archive, extra";

pub(crate) fn file_from_row(row: &Row<'_>) -> Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        hash: row.get(1)?,
        directory: row.get(2)?,
        filename: row.get(3)?,
        is_deleted: row.get(4)?,
        media_group: MediaGroup::from_code(row.get(5)?),
        is_archive: row.get(6)?,
        extra: json_column(row, 7)?,
    })
}

fn json_column(row: &Row<'_>, idx: usize) -> Result<Map<String, Value>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn json_text(map: &Map<String, Value>) -> Result<String> {
    serde_json::to_string(map).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn tag_from_row(row: &Row<'_>) -> Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
    })
}

impl Database {
    // ── File Records ─────────────────────────────────────────────

    /// Flag every record deleted. A scan clears the flag for each file it sees.
    pub fn mark_all_deleted(&self) -> Result<usize> {
        let count = self
            .connection()
            .execute("UPDATE any_file SET is_deleted = 1", [])?;
        debug!("Marked {} records as tentatively deleted", count);
        Ok(count)
    }

    pub fn get_file_by_hash(&self, hash: &str) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {} FROM any_file WHERE hash = ?1", FILE_COLUMNS);
        self.connection()
            .prepare_cached(&sql)?
            .query_row(params![hash], file_from_row)
            .optional()
    }

    pub fn get_file_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {} FROM any_file WHERE id = ?1", FILE_COLUMNS);
        self.connection()
            .prepare_cached(&sql)?
            .query_row(params![id], file_from_row)
            .optional()
    }

    pub fn count_files(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM any_file", [], |row| row.get(0))
    }

    pub fn count_live_files(&self) -> Result<i64> {
        self.connection().query_row(
            "SELECT COUNT(*) FROM any_file WHERE is_deleted = 0",
            [],
            |row| row.get(0),
        )
    }

    pub fn select_deleted(&self) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM any_file WHERE is_deleted = 1 ORDER BY id",
            FILE_COLUMNS
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let files = stmt
            .query_map([], file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Stream every non-deleted record in id order without materializing the table.
    pub fn for_each_live_file<F>(&self, mut f: F) -> std::result::Result<(), Error>
    where
        F: FnMut(&FileRecord) -> std::result::Result<(), Error>,
    {
        let sql = format!(
            "SELECT {} FROM any_file WHERE is_deleted = 0 ORDER BY id",
            FILE_COLUMNS
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let record = file_from_row(row)?;
            f(&record)?;
        }
        Ok(())
    }

    /// Insert a new record and return its assigned id.
    pub fn insert_file(&self, record: &FileRecord) -> Result<i64> {
        self.connection()
            .prepare_cached(
                "INSERT INTO any_file \
                 (hash, directory, filename, is_deleted, media_group, is_archive, extra) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?
            .execute(params![
                record.hash,
                record.directory,
                record.filename,
                record.is_deleted,
                record.media_group.code(),
                record.is_archive,
                json_text(&record.extra)?,
            ])?;
        Ok(self.connection().last_insert_rowid())
    }

    /// Insert a record keeping its id, as restored from an export.
    pub fn insert_file_with_id(&self, record: &FileRecord) -> Result<()> {
        self.connection()
            .prepare_cached(
                "INSERT INTO any_file \
                 (id, hash, directory, filename, is_deleted, media_group, is_archive, extra) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?
            .execute(params![
                record.id,
                record.hash,
                record.directory,
                record.filename,
                record.is_deleted,
                record.media_group.code(),
                record.is_archive,
                json_text(&record.extra)?,
            ])?;
        Ok(())
    }

    /// Point the record with this fingerprint at a new location.
    /// Returns false when no such record exists.
    pub fn update_path(&self, hash: &str, directory: &str, filename: &str) -> Result<bool> {
        let changed = self.connection().execute(
            "UPDATE any_file SET directory = ?1, filename = ?2 WHERE hash = ?3",
            params![directory, filename, hash],
        )?;
        Ok(changed > 0)
    }

    pub fn set_file_extra(&self, id: i64, extra: &Map<String, Value>) -> Result<bool> {
        let changed = self.connection().execute(
            "UPDATE any_file SET extra = ?1 WHERE id = ?2",
            params![json_text(extra)?, id],
        )?;
        Ok(changed > 0)
    }

    // ── Batched Reconciliation Writes ────────────────────────────

    pub fn append_pending_row(&mut self, record: FileRecord) {
        self.pending.push(record);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_batch_full(&self) -> bool {
        self.pending.len() >= self.settings().batch_size
    }

    /// Persist the buffered candidates in one transaction, reporting each one
    /// before the next is looked up.
    ///
    /// A candidate whose fingerprint is already stored has that record's
    /// deleted flag cleared; otherwise the candidate is inserted and gets its id.
    /// `on_each_row(db, candidate, existing)` runs inside the transaction in
    /// buffer order, so path updates it makes are visible to later rows of
    /// the same batch. The outcome is the same for any batch size.
    ///
    /// The buffer is empty when this returns, even on error.
    pub fn flush_batch<F>(&mut self, mut on_each_row: F) -> std::result::Result<usize, Error>
    where
        F: FnMut(&Database, &FileRecord, Option<&FileRecord>) -> std::result::Result<(), Error>,
    {
        let batch = std::mem::take(&mut self.pending);
        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.len();
        let tx = self.connection().unchecked_transaction()?;
        for mut candidate in batch {
            match self.get_file_by_hash(&candidate.hash)? {
                Some(mut existing) => {
                    self.connection()
                        .prepare_cached("UPDATE any_file SET is_deleted = 0 WHERE id = ?1")?
                        .execute(params![existing.id])?;
                    existing.is_deleted = false;
                    candidate.id = existing.id;
                    on_each_row(self, &candidate, Some(&existing))?;
                }
                None => {
                    candidate.id = self.insert_file(&candidate)?;
                    on_each_row(self, &candidate, None)?;
                }
            }
        }
        tx.commit()?;
        debug!("Flushed batch of {} rows", count);
        Ok(count)
    }

    // ── Tags ─────────────────────────────────────────────────────

    pub fn insert_tag(&self, name: &str, parent_id: Option<i64>) -> Result<Tag> {
        self.connection().execute(
            "INSERT INTO tag (name, parent_id) VALUES (?1, ?2)",
            params![name, parent_id],
        )?;
        Ok(Tag {
            id: self.connection().last_insert_rowid(),
            name: name.to_string(),
            parent_id,
        })
    }

    pub fn insert_tag_with_id(&self, id: i64, name: &str, parent_id: Option<i64>) -> Result<()> {
        self.connection().execute(
            "INSERT INTO tag (id, name, parent_id) VALUES (?1, ?2, ?3)",
            params![id, name, parent_id],
        )?;
        Ok(())
    }

    pub fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        self.connection()
            .query_row(
                "SELECT id, name, parent_id FROM tag WHERE id = ?1",
                params![id],
                tag_from_row,
            )
            .optional()
    }

    /// Children of `parent_id`, or the root tags when `None`.
    pub fn select_tags(&self, parent_id: Option<i64>) -> Result<Vec<Tag>> {
        match parent_id {
            Some(parent_id) => {
                let mut stmt = self.connection().prepare(
                    "SELECT id, name, parent_id FROM tag WHERE parent_id = ?1 ORDER BY name, id",
                )?;
                let tags = stmt
                    .query_map(params![parent_id], tag_from_row)?
                    .collect::<Result<Vec<_>>>()?;
                Ok(tags)
            }
            None => {
                let mut stmt = self.connection().prepare(
                    "SELECT id, name, parent_id FROM tag WHERE parent_id IS NULL ORDER BY name, id",
                )?;
                let tags = stmt
                    .query_map([], tag_from_row)?
                    .collect::<Result<Vec<_>>>()?;
                Ok(tags)
            }
        }
    }

    pub fn select_all_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT id, name, parent_id FROM tag ORDER BY id")?;
        let tags = stmt
            .query_map([], tag_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Delete a tag together with its whole subtree and their file links.
    pub fn delete_tag(&self, id: i64) -> Result<bool> {
        let changed = self
            .connection()
            .execute("DELETE FROM tag WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Link a tag to a file. Returns false if the link already exists or
    /// either id is unknown.
    pub fn assign_tag(&self, tag_id: i64, file_id: i64) -> Result<bool> {
        let changed = self.connection().execute(
            "INSERT OR IGNORE INTO tag_file (tag_id, file_id) \
             SELECT ?1, ?2 \
             WHERE EXISTS (SELECT 1 FROM tag WHERE id = ?1) \
               AND EXISTS (SELECT 1 FROM any_file WHERE id = ?2)",
            params![tag_id, file_id],
        )?;
        Ok(changed == 1)
    }

    pub fn unassign_tag(&self, tag_id: i64, file_id: i64) -> Result<bool> {
        let changed = self.connection().execute(
            "DELETE FROM tag_file WHERE tag_id = ?1 AND file_id = ?2",
            params![tag_id, file_id],
        )?;
        Ok(changed > 0)
    }

    pub fn select_file_tags(&self, file_id: i64) -> Result<Vec<Tag>> {
        let mut stmt = self.connection().prepare(
            "SELECT t.id, t.name, t.parent_id FROM tag t \
             JOIN tag_file tf ON tf.tag_id = t.id \
             WHERE tf.file_id = ?1 ORDER BY t.name, t.id",
        )?;
        let tags = stmt
            .query_map(params![file_id], tag_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// (file_id, tag_id) pairs for files that are not flagged deleted.
    pub fn select_all_tag_links(&self) -> Result<Vec<(i64, i64)>> {
        let mut stmt = self.connection().prepare(
            "SELECT tf.file_id, tf.tag_id FROM tag_file tf \
             JOIN any_file f ON f.id = tf.file_id \
             WHERE f.is_deleted = 0 \
             ORDER BY tf.tag_id, tf.file_id",
        )?;
        let links = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>>>()?;
        Ok(links)
    }

    // ── Books ────────────────────────────────────────────────────

    pub fn upsert_book(&self, file_id: i64, book: &Book) -> Result<()> {
        self.connection().execute(
            "INSERT INTO book (file_id, title, isbn, public_year, other_fields) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(file_id) DO UPDATE SET \
                 title = excluded.title, \
                 isbn = excluded.isbn, \
                 public_year = excluded.public_year, \
                 other_fields = excluded.other_fields",
            params![
                file_id,
                book.title,
                book.isbn,
                book.public_year,
                json_text(&book.other_fields)?,
            ],
        )?;
        Ok(())
    }

    pub fn get_book(&self, file_id: i64) -> Result<Option<Book>> {
        self.connection()
            .query_row(
                "SELECT title, isbn, public_year, other_fields FROM book WHERE file_id = ?1",
                params![file_id],
                |row| {
                    Ok(Book {
                        title: row.get(0)?,
                        isbn: row.get(1)?,
                        public_year: row.get(2)?,
                        other_fields: json_column(row, 3)?,
                    })
                },
            )
            .optional()
    }

    // ── Scan Sessions ────────────────────────────────────────────

    pub fn create_scan_session(&self, root_path: &str) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        self.connection().execute(
            "INSERT INTO scan_session (started_at, status, root_path) VALUES (?1, 'running', ?2)",
            params![now, root_path],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    pub fn complete_scan_session(&self, session_id: i64, counts: &ScanCounts) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.connection().execute(
            "UPDATE scan_session SET completed_at = ?1, status = 'completed', \
             files_scanned = ?2, new_count = ?3, moved_count = ?4, renamed_count = ?5, \
             moved_renamed_count = ?6, untouched_count = ?7, duplicate_count = ?8, \
             deleted_count = ?9 WHERE id = ?10",
            params![
                now,
                counts.scanned,
                counts.new,
                counts.moved,
                counts.renamed,
                counts.moved_and_renamed,
                counts.untouched,
                counts.duplicate,
                counts.deleted,
                session_id
            ],
        )?;
        Ok(())
    }

    /// Scan sessions newest-first. Returns (sessions, total_session_count).
    pub fn list_sessions(&self, offset: i64, limit: i64) -> Result<(Vec<ScanSession>, i64)> {
        let total: i64 = self
            .connection()
            .query_row("SELECT COUNT(*) FROM scan_session", [], |row| row.get(0))?;

        let mut stmt = self.connection().prepare(
            "SELECT id, started_at, completed_at, status, root_path, files_scanned, \
                    new_count, moved_count, renamed_count, moved_renamed_count, \
                    untouched_count, duplicate_count, deleted_count \
             FROM scan_session ORDER BY id DESC LIMIT ?1 OFFSET ?2",
        )?;
        let sessions = stmt
            .query_map(params![limit, offset], |row| {
                Ok(ScanSession {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    completed_at: row.get(2)?,
                    status: row.get(3)?,
                    root_path: row.get(4)?,
                    counts: ScanCounts {
                        scanned: row.get(5)?,
                        new: row.get(6)?,
                        moved: row.get(7)?,
                        renamed: row.get(8)?,
                        moved_and_renamed: row.get(9)?,
                        untouched: row.get(10)?,
                        duplicate: row.get(11)?,
                        deleted: row.get(12)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok((sessions, total))
    }
}
