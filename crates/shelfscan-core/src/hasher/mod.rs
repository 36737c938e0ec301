pub mod content;

pub use content::{get_file_hash, hash_reader};
