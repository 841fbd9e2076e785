//! The host capability set

use async_trait::async_trait;

use crate::library::{
    BookmarkNode, CreateBookmark, DownloadItem, DownloadQuery, ExtensionInfo, HistoryItem,
    HistoryQuery,
};
use crate::page::{FetchRequest, FetchResponse};
use crate::tab::{CreateTab, Tab, TabId, TabQuery, TabUpdate};
use crate::window::{CreateWindow, DisplayInfo, Window, WindowId, WindowUpdate};
use crate::Result;

/// Everything the bridge may ask of the host application.
///
/// The host is the only owner and mutator of this state; callers re-read it
/// for every request instead of caching.
#[async_trait]
pub trait HostSurface: Send + Sync {
    // === Tabs ===

    async fn query_tabs(&self, query: &TabQuery) -> Result<Vec<Tab>>;

    async fn get_tab(&self, tab_id: TabId) -> Result<Tab>;

    async fn create_tab(&self, create: CreateTab) -> Result<Tab>;

    async fn update_tab(&self, tab_id: TabId, update: TabUpdate) -> Result<Tab>;

    async fn remove_tab(&self, tab_id: TabId) -> Result<()>;

    async fn reload_tab(&self, tab_id: TabId) -> Result<()>;

    // === Windows ===

    /// All windows; each carries its tabs when `populate` is set
    async fn list_windows(&self, populate: bool) -> Result<Vec<Window>>;

    /// The focused window, if any
    async fn current_window(&self) -> Result<Option<Window>>;

    async fn create_window(&self, create: CreateWindow) -> Result<Window>;

    async fn update_window(&self, window_id: WindowId, update: WindowUpdate) -> Result<Window>;

    async fn remove_window(&self, window_id: WindowId) -> Result<()>;

    // === Scripted access to a tab's document ===

    /// Issue a network request from inside the tab's document context
    async fn fetch_in_page(&self, tab_id: TabId, request: FetchRequest) -> Result<FetchResponse>;

    /// Full markup of the rendered document
    async fn document_markup(&self, tab_id: TabId) -> Result<String>;

    /// Text of the current selection, empty when nothing is selected
    async fn selection_text(&self, tab_id: TabId) -> Result<String>;

    /// Replace the first selection range with `text` and collapse the cursor
    /// to its end. Returns `false` when there was no range to replace.
    async fn replace_selection(&self, tab_id: TabId, text: &str) -> Result<bool>;

    // === Bookmarks, history, downloads, extensions ===

    async fn bookmark_tree(&self) -> Result<Vec<BookmarkNode>>;

    async fn create_bookmark(&self, create: CreateBookmark) -> Result<BookmarkNode>;

    async fn remove_bookmark(&self, id: &str) -> Result<()>;

    async fn search_downloads(&self, query: &DownloadQuery) -> Result<Vec<DownloadItem>>;

    async fn search_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryItem>>;

    async fn list_extensions(&self) -> Result<Vec<ExtensionInfo>>;

    // === Displays ===

    async fn displays(&self) -> Result<Vec<DisplayInfo>>;
}
