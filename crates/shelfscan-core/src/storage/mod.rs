pub mod models;
pub mod queries;
pub mod rows;
pub mod sqlite;

pub use models::{Book, FileRecord, MediaGroup, ScanCounts, ScanSession, Tag};
pub use rows::{FileFilter, FileRows};
pub use sqlite::{Database, StoreSettings};
