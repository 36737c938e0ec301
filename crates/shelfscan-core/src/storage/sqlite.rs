use rusqlite::{Connection, Result};
use std::path::Path;
use tracing::debug;

use super::models::FileRecord;

const SCHEMA_VERSION: i64 = 1;

/// Explicit sizing for batched writes and paged reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    /// Buffered candidates that make a batch full.
    pub batch_size: usize,
    /// Rows fetched per page by `select_rows`.
    pub page_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            batch_size: 30,
            page_size: 30,
        }
    }
}

/// The catalog store: a SQLite connection plus the pending-row buffer used
/// while scanning.
pub struct Database {
    conn: Connection,
    settings: StoreSettings,
    pub(crate) pending: Vec<FileRecord>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        let db = Database {
            conn,
            settings: StoreSettings::default(),
            pending: Vec::new(),
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn with_settings(mut self, settings: StoreSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> StoreSettings {
        self.settings
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -16000;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, foreign keys on)");
        Ok(())
    }

    /// Create tables on a fresh database. Catalog data (tags in particular)
    /// is not recomputable, so existing tables are never dropped.
    fn migrate_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < SCHEMA_VERSION {
            debug!("Schema version {} < {}, creating tables", version, SCHEMA_VERSION);
        }

        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema initialized (version {})", SCHEMA_VERSION);
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn truncate_all(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM book;
             DELETE FROM tag_file;
             DELETE FROM tag;
             DELETE FROM any_file;
             DELETE FROM scan_session;",
        )?;
        debug!("All tables truncated");
        Ok(())
    }
}
