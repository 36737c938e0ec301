pub mod walk;

pub use walk::{LibraryWalker, WalkEntry};
