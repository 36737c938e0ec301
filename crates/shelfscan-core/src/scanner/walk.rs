use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{error, trace};
use walkdir::WalkDir;

use crate::error::Error;

/// A regular file found under the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    /// Parent directory relative to the root, `/`-separated, empty at the root.
    pub directory: String,
    pub filename: String,
}

impl WalkEntry {
    pub fn relpath(&self) -> String {
        if self.directory.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.directory, self.filename)
        }
    }
}

/// Depth-first traversal of the storage root that skips ignorable files.
pub struct LibraryWalker {
    root: PathBuf,
    ignore_extensions: Vec<String>,
    ignore_patterns: Vec<Pattern>,
}

impl LibraryWalker {
    pub fn new(root: &Path, ignore_extensions: &[String], ignore_globs: &[String]) -> Self {
        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            root: root.to_path_buf(),
            ignore_extensions: ignore_extensions.to_vec(),
            ignore_patterns,
        }
    }

    /// True for files whose text after the last `.` is an ignored extension,
    /// or whose relative path matches an ignore glob.
    pub fn is_ignored(&self, relpath: &str, filename: &str) -> bool {
        if let Some((_, ext)) = filename.rsplit_once('.') {
            if self.ignore_extensions.iter().any(|ignored| ignored == ext) {
                return true;
            }
        }
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches(relpath))
    }

    /// Files in depth-first order, siblings sorted by name. Walk errors are
    /// yielded, not swallowed.
    pub fn walk(&self) -> impl Iterator<Item = Result<WalkEntry, Error>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => return Some(Err(Error::Walk(e))),
                };
                if !entry.file_type().is_file() {
                    return None;
                }

                let walk_entry = self.to_walk_entry(entry.path())?;
                if self.is_ignored(&walk_entry.relpath(), &walk_entry.filename) {
                    trace!("Ignoring {}", entry.path().display());
                    return None;
                }
                Some(Ok(walk_entry))
            })
    }

    fn to_walk_entry(&self, path: &Path) -> Option<WalkEntry> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let filename = relative.file_name()?.to_string_lossy().into_owned();
        let directory = relative
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();

        Some(WalkEntry {
            path: path.to_path_buf(),
            directory,
            filename,
        })
    }
}
