pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod scanner;
pub mod status;
pub mod storage;
pub mod transfer;

pub use config::{DuplicatePolicy, LibraryConfig};
pub use engine::{ScanEngine, ScanOutcome, ScanResult};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
pub use status::FileStatus;
