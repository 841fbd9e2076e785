//! Headless surface error types

use tabwire_storage::StorageError;
use tabwire_surface::{SurfaceError, TabId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeadlessError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Selection {start}..{end} is outside the document of tab {tab_id}")]
    InvalidSelection {
        tab_id: TabId,
        start: usize,
        end: usize,
    },

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<rusqlite::Error> for HeadlessError {
    fn from(e: rusqlite::Error) -> Self {
        HeadlessError::Storage(StorageError::from(e))
    }
}

impl From<HeadlessError> for SurfaceError {
    fn from(e: HeadlessError) -> Self {
        match e {
            HeadlessError::Surface(inner) => inner,
            other => SurfaceError::Storage(other.to_string()),
        }
    }
}
