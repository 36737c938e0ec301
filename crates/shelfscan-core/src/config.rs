use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

use crate::storage::StoreSettings;

pub const DEFAULT_IGNORE_EXTENSIONS: &[&str] = &["db", "db-journal", "db-wal", "db-shm"];

/// How a scan treats a file whose content is already catalogued under another path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum DuplicatePolicy {
    /// Rewrite the stored path to the newly observed location.
    #[default]
    Original,
    /// Leave the stored path alone and only report the change.
    ReportOnly,
}

impl From<String> for DuplicatePolicy {
    fn from(value: String) -> Self {
        DuplicatePolicy::from(value.as_str())
    }
}

impl From<&str> for DuplicatePolicy {
    fn from(value: &str) -> Self {
        if value == "original" {
            DuplicatePolicy::Original
        } else {
            DuplicatePolicy::ReportOnly
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::Original => write!(f, "original"),
            DuplicatePolicy::ReportOnly => write!(f, "report-only"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root of the catalogued library. Catalog paths are relative to it.
    pub storage_books: PathBuf,
    /// Directory holding notes and exported catalog pages.
    pub storage_notes: PathBuf,
    pub database_path: PathBuf,
    pub ignore_extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub process_duplicate: DuplicatePolicy,
    pub batch_size: usize,
    pub page_size: usize,
    pub export_page_size: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            storage_books: PathBuf::from("./books"),
            storage_notes: PathBuf::from("./notes"),
            database_path: PathBuf::from("shelfscan.db"),
            ignore_extensions: DEFAULT_IGNORE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            ignore_patterns: Vec::new(),
            process_duplicate: DuplicatePolicy::Original,
            batch_size: 30,
            page_size: 30,
            export_page_size: 100,
        }
    }
}

impl LibraryConfig {
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            batch_size: self.batch_size.max(1),
            page_size: self.page_size.max(1),
        }
    }
}

/// Load `Config.toml` (optional) overlaid with `SHELFSCAN_*` environment variables.
pub fn load_configuration() -> Result<LibraryConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("SHELFSCAN")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_extensions")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<LibraryConfig>()
}
