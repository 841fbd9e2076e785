//! Host surface error types
//!
//! Messages follow the wording browsers use for the same failures, since they
//! are passed through to the remote peer verbatim.

use thiserror::Error;

use crate::tab::TabId;
use crate::window::WindowId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("No tab with id: {0}.")]
    TabNotFound(TabId),

    #[error("No window with id: {0}.")]
    WindowNotFound(WindowId),

    #[error("No current window")]
    NoCurrentWindow,

    #[error("Can't find bookmark for id.")]
    BookmarkNotFound(String),

    #[error("Can't find parent bookmark for id.")]
    BookmarkParentNotFound(String),

    #[error("No download with id: {0}.")]
    DownloadNotFound(i64),

    #[error("Can't modify the root bookmark folders.")]
    RootBookmarkFolder,

    #[error("Can't remove non-empty folder (use recursive to force).")]
    NonEmptyFolder,

    #[error("Cannot access contents of url \"{0}\".")]
    ScriptingDenied(String),

    #[error("Invalid url pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid url: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
