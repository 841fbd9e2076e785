//! tabwire host surface
//!
//! The capability set a host application exposes to the bridge: tabs and
//! windows, scripted access to a tab's document, bookmarks, history,
//! downloads, extensions and display geometry. Types serialize the way
//! browser extension APIs present them on the wire (camelCase).

mod error;
mod library;
mod page;
mod pattern;
mod surface;
mod tab;
mod window;

pub use error::SurfaceError;
pub use library::{
    BookmarkNode, CreateBookmark, DownloadItem, DownloadQuery, DownloadState, ExtensionInfo,
    HistoryItem, HistoryQuery,
};
pub use page::{FetchRequest, FetchResponse};
pub use pattern::UrlPattern;
pub use surface::HostSurface;
pub use tab::{CreateTab, Tab, TabId, TabQuery, TabStatus, TabUpdate};
pub use window::{
    CreateWindow, DisplayInfo, Rect, Window, WindowId, WindowKind, WindowState, WindowUpdate,
};

pub type Result<T> = std::result::Result<T, SurfaceError>;
