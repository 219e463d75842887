#![forbid(unsafe_code)]

pub mod json_file;
pub mod repository;

pub use json_file::JsonProgressStore;
pub use repository::{InMemoryProgressStore, ProgressRepository, StorageError};
