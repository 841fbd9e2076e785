//! tabwire storage layer
//!
//! SQLite persistence for the headless surface: windows, tabs, bookmarks,
//! history, downloads and extensions.

mod database;
mod error;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
