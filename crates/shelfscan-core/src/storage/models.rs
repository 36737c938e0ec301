use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Media classification of a catalogued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaGroup {
    #[default]
    Book,
    Image,
    Audio,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff", "svg"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "m4a", "m4b", "aac", "opus"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"];

impl MediaGroup {
    pub fn code(self) -> i64 {
        match self {
            MediaGroup::Book => 1,
            MediaGroup::Image => 2,
            MediaGroup::Audio => 3,
        }
    }

    /// Unknown codes fall back to `Book`, the column default.
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => MediaGroup::Image,
            3 => MediaGroup::Audio,
            _ => MediaGroup::Book,
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaGroup::Image
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            MediaGroup::Audio
        } else {
            MediaGroup::Book
        }
    }
}

pub fn is_archive_extension(ext: &str) -> bool {
    ARCHIVE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// A catalogued file, identified by its content hash.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: i64,
    pub hash: String,
    pub directory: String,
    pub filename: String,
    pub is_deleted: bool,
    pub media_group: MediaGroup,
    pub is_archive: bool,
    pub extra: Map<String, Value>,
}

impl FileRecord {
    /// A not-yet-persisted record for a file seen at `directory/filename`.
    /// Media group and archive flag are derived from the extension.
    pub fn candidate(hash: &str, directory: &str, filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        FileRecord {
            id: 0,
            hash: hash.to_string(),
            directory: directory.to_string(),
            filename: filename.to_string(),
            is_deleted: false,
            media_group: MediaGroup::from_extension(&ext),
            is_archive: is_archive_extension(&ext),
            extra: Map::new(),
        }
    }

    /// Path relative to the storage root, `/`-separated.
    pub fn relpath(&self) -> String {
        let joined = format!("{}/{}", self.directory, self.filename);
        joined.strip_prefix('/').unwrap_or(&joined).to_string()
    }

    pub fn abspath(&self, storage_root: &Path) -> PathBuf {
        self.absdirpath(storage_root).join(&self.filename)
    }

    pub fn absdirpath(&self, storage_root: &Path) -> PathBuf {
        let mut path = storage_root.to_path_buf();
        for part in self.directory.split('/').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }

    pub fn note_name(&self) -> String {
        format!("book_{}.md", self.id)
    }

    pub fn note_path(&self, notes_dir: &Path) -> PathBuf {
        notes_dir.join(self.note_name())
    }
}

/// A node in the tag forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// Book metadata attached one-to-one to a file record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Book {
    pub title: String,
    pub isbn: String,
    pub public_year: String,
    pub other_fields: Map<String, Value>,
}

/// Per-status tallies of one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounts {
    pub scanned: i64,
    pub new: i64,
    pub moved: i64,
    pub renamed: i64,
    pub moved_and_renamed: i64,
    pub untouched: i64,
    pub duplicate: i64,
    pub deleted: i64,
}

/// One invocation of the reconciliation scan.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub id: i64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub root_path: String,
    pub counts: ScanCounts,
}
