//! tabwire headless surface
//!
//! A complete [`HostSurface`](tabwire_surface::HostSurface) without a
//! rendering engine: windows, tabs, bookmarks, history, downloads and
//! extensions persist in SQLite; page documents and selections live in
//! memory; in-page requests go through a [`PageFetcher`].

mod bookmarks;
mod documents;
mod downloads;
mod error;
mod extensions;
mod fetcher;
mod history;
mod surface;
mod tabs;
mod windows;

pub use error::HeadlessError;
pub use fetcher::{HttpFetcher, PageFetcher, StaticFetcher};
pub use surface::{HeadlessOptions, HeadlessSurface};

pub type Result<T> = std::result::Result<T, HeadlessError>;
