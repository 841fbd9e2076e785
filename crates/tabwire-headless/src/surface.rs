//! Headless host surface

use async_trait::async_trait;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use tabwire_storage::Database;
use tabwire_surface::{
    BookmarkNode, CreateBookmark, CreateTab, CreateWindow, DisplayInfo, DownloadItem,
    DownloadQuery, DownloadState, ExtensionInfo, FetchRequest, FetchResponse, HistoryItem,
    HistoryQuery, HostSurface, Rect, SurfaceError, Tab, TabId, TabQuery, TabUpdate, Window,
    WindowId, WindowUpdate,
};
use url::Url;

use crate::bookmarks::BookmarkStore;
use crate::documents::{document_title, DocumentStore};
use crate::downloads::DownloadStore;
use crate::extensions::ExtensionStore;
use crate::fetcher::PageFetcher;
use crate::history::HistoryStore;
use crate::tabs::TabStore;
use crate::windows::WindowStore;
use crate::Result;

/// Schemes whose documents may be scripted
const SCRIPTABLE_SCHEMES: &[&str] = &["http", "https", "file"];

#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    /// Reported by `displays()`; the first entry is the primary display
    pub displays: Vec<DisplayInfo>,
    /// Geometry of windows created without explicit bounds
    pub window_bounds: Rect,
}

impl HeadlessOptions {
    /// A single primary display whose work area is `width`x`height`
    pub fn with_work_area(width: i32, height: i32) -> Self {
        let area = Rect {
            left: 0,
            top: 0,
            width,
            height,
        };
        Self {
            displays: vec![DisplayInfo {
                id: "0".to_string(),
                name: "Headless display".to_string(),
                is_primary: true,
                bounds: area,
                work_area: area,
            }],
            window_bounds: Rect {
                left: 0,
                top: 0,
                width: 1280.min(width),
                height: 800.min(height),
            },
        }
    }
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self::with_work_area(1920, 1080)
    }
}

pub struct HeadlessSurface {
    tabs: TabStore,
    windows: WindowStore,
    bookmarks: BookmarkStore,
    history: HistoryStore,
    downloads: DownloadStore,
    extensions: ExtensionStore,
    documents: DocumentStore,
    fetcher: Arc<dyn PageFetcher>,
    displays: Vec<DisplayInfo>,
}

impl HeadlessSurface {
    pub fn new(db: Database, fetcher: Arc<dyn PageFetcher>, options: HeadlessOptions) -> Self {
        Self {
            tabs: TabStore::new(db.clone()),
            windows: WindowStore::new(db.clone(), options.window_bounds),
            bookmarks: BookmarkStore::new(db.clone()),
            history: HistoryStore::new(db.clone()),
            downloads: DownloadStore::new(db.clone()),
            extensions: ExtensionStore::new(db),
            documents: DocumentStore::new(),
            fetcher,
            displays: options.displays,
        }
    }

    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(
        path: P,
        fetcher: Arc<dyn PageFetcher>,
        options: HeadlessOptions,
    ) -> Result<Self> {
        let db = Database::open(path)?;
        Ok(Self::new(db, fetcher, options))
    }

    pub fn in_memory(fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::new(db, fetcher, HeadlessOptions::default()))
    }

    /// Set a tab's document directly instead of fetching it
    pub fn load_document(&self, tab_id: TabId, markup: impl Into<String>) -> Result<()> {
        let (tab, _) = self.scriptable_tab(tab_id)?;
        self.install_document(&tab, markup.into())
    }

    /// Select a byte range of a loaded document
    pub fn select_range(&self, tab_id: TabId, range: Range<usize>) -> Result<()> {
        self.tabs.get(tab_id)?;
        self.documents.select(tab_id, range)
    }

    /// Select the first occurrence of `text`; false when it does not occur
    pub fn select_text(&self, tab_id: TabId, text: &str) -> Result<bool> {
        self.tabs.get(tab_id)?;
        Ok(self.documents.select_text(tab_id, text))
    }

    pub fn record_download(
        &self,
        url: &str,
        file_name: &str,
        mime_type: Option<&str>,
        total_bytes: i64,
    ) -> Result<DownloadItem> {
        self.downloads.record(url, file_name, mime_type, total_bytes)
    }

    pub fn update_download(
        &self,
        id: i64,
        bytes_received: i64,
        state: DownloadState,
    ) -> Result<DownloadItem> {
        self.downloads.update_progress(id, bytes_received, state)
    }

    pub fn install_extension(&self, info: &ExtensionInfo) -> Result<()> {
        self.extensions.install(info)
    }

    fn scriptable_tab(&self, tab_id: TabId) -> Result<(Tab, Url)> {
        let tab = self.tabs.get(tab_id)?;
        match Url::parse(&tab.url) {
            Ok(url) if SCRIPTABLE_SCHEMES.contains(&url.scheme()) => Ok((tab, url)),
            _ => Err(SurfaceError::ScriptingDenied(tab.url).into()),
        }
    }

    fn install_document(&self, tab: &Tab, markup: String) -> Result<()> {
        if let Some(title) = document_title(&markup) {
            self.tabs.set_title(tab.id, &title)?;
            self.history.update_title(&tab.url, &title)?;
        }
        self.documents.load(tab.id, markup);
        Ok(())
    }

    /// Fetch the tab's document unless it is already loaded
    async fn ensure_document(&self, tab_id: TabId) -> Result<()> {
        let (tab, url) = self.scriptable_tab(tab_id)?;
        if self.documents.is_loaded(tab_id) {
            return Ok(());
        }

        let response = self
            .fetcher
            .fetch(&url, &FetchRequest::get(url.as_str()))
            .await?;
        tracing::debug!(tab_id = tab_id, status = response.status, "Loaded document");
        self.install_document(&tab, response.body)
    }

    fn navigated(&self, tab: &Tab) -> Result<()> {
        self.documents.discard(tab.id);
        if tab.url.starts_with("http://") || tab.url.starts_with("https://") {
            self.history.record_visit(&tab.url, &tab.title)?;
        }
        Ok(())
    }
}

#[async_trait]
impl HostSurface for HeadlessSurface {
    async fn query_tabs(&self, query: &TabQuery) -> tabwire_surface::Result<Vec<Tab>> {
        Ok(self.tabs.query(query)?)
    }

    async fn get_tab(&self, tab_id: TabId) -> tabwire_surface::Result<Tab> {
        Ok(self.tabs.get(tab_id)?)
    }

    async fn create_tab(&self, create: CreateTab) -> tabwire_surface::Result<Tab> {
        let tab = self.tabs.create(create)?;
        self.navigated(&tab)?;
        Ok(tab)
    }

    async fn update_tab(&self, tab_id: TabId, update: TabUpdate) -> tabwire_surface::Result<Tab> {
        let tab = self.tabs.update(tab_id, &update)?;
        if update.url.is_some() {
            self.navigated(&tab)?;
        }
        Ok(tab)
    }

    async fn remove_tab(&self, tab_id: TabId) -> tabwire_surface::Result<()> {
        self.tabs.remove(tab_id)?;
        self.documents.discard(tab_id);
        Ok(())
    }

    async fn reload_tab(&self, tab_id: TabId) -> tabwire_surface::Result<()> {
        self.tabs.reload(tab_id)?;
        self.documents.discard(tab_id);
        Ok(())
    }

    async fn list_windows(&self, populate: bool) -> tabwire_surface::Result<Vec<Window>> {
        Ok(self.windows.list(populate)?)
    }

    async fn current_window(&self) -> tabwire_surface::Result<Option<Window>> {
        Ok(self.windows.current()?)
    }

    async fn create_window(&self, create: CreateWindow) -> tabwire_surface::Result<Window> {
        let window = self.windows.create(&create)?;
        for tab in window.tabs.iter().flatten() {
            self.navigated(tab)?;
        }
        Ok(window)
    }

    async fn update_window(
        &self,
        window_id: WindowId,
        update: WindowUpdate,
    ) -> tabwire_surface::Result<Window> {
        Ok(self.windows.update(window_id, &update)?)
    }

    async fn remove_window(&self, window_id: WindowId) -> tabwire_surface::Result<()> {
        for tab_id in self.windows.remove(window_id)? {
            self.documents.discard(tab_id);
        }
        Ok(())
    }

    async fn fetch_in_page(
        &self,
        tab_id: TabId,
        request: FetchRequest,
    ) -> tabwire_surface::Result<FetchResponse> {
        let (_, page_url) = self.scriptable_tab(tab_id)?;
        tracing::debug!(tab_id = tab_id, url = %request.url, "Fetching from page");
        self.fetcher.fetch(&page_url, &request).await
    }

    async fn document_markup(&self, tab_id: TabId) -> tabwire_surface::Result<String> {
        self.ensure_document(tab_id).await?;
        Ok(self.documents.markup(tab_id).unwrap_or_default())
    }

    async fn selection_text(&self, tab_id: TabId) -> tabwire_surface::Result<String> {
        self.scriptable_tab(tab_id)?;
        Ok(self.documents.selection_text(tab_id))
    }

    async fn replace_selection(&self, tab_id: TabId, text: &str) -> tabwire_surface::Result<bool> {
        self.scriptable_tab(tab_id)?;
        Ok(self.documents.replace_selection(tab_id, text))
    }

    async fn bookmark_tree(&self) -> tabwire_surface::Result<Vec<BookmarkNode>> {
        Ok(self.bookmarks.tree()?)
    }

    async fn create_bookmark(
        &self,
        create: CreateBookmark,
    ) -> tabwire_surface::Result<BookmarkNode> {
        Ok(self.bookmarks.create(create)?)
    }

    async fn remove_bookmark(&self, id: &str) -> tabwire_surface::Result<()> {
        Ok(self.bookmarks.remove(id)?)
    }

    async fn search_downloads(
        &self,
        query: &DownloadQuery,
    ) -> tabwire_surface::Result<Vec<DownloadItem>> {
        Ok(self.downloads.search(query)?)
    }

    async fn search_history(
        &self,
        query: &HistoryQuery,
    ) -> tabwire_surface::Result<Vec<HistoryItem>> {
        Ok(self.history.search(query)?)
    }

    async fn list_extensions(&self) -> tabwire_surface::Result<Vec<ExtensionInfo>> {
        Ok(self.extensions.list()?)
    }

    async fn displays(&self) -> tabwire_surface::Result<Vec<DisplayInfo>> {
        Ok(self.displays.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::StaticFetcher;
    use std::time::Duration;

    const PAGE: &str = "<html><head><title>Example Domain</title></head><body><p>Hello world</p></body></html>";

    fn surface_with(fetcher: StaticFetcher) -> HeadlessSurface {
        HeadlessSurface::in_memory(Arc::new(fetcher)).unwrap()
    }

    async fn open_window(surface: &HeadlessSurface, url: &str) -> Tab {
        let window = surface
            .create_window(CreateWindow::with_urls(vec![url.to_string()]))
            .await
            .unwrap();
        window.tabs.unwrap().remove(0)
    }

    #[tokio::test]
    async fn test_document_markup_fetches_and_copies_title() {
        let fetcher = StaticFetcher::new().route(
            "https://example.com/",
            FetchResponse::new(200, "OK", PAGE).with_content_type("text/html"),
        );
        let surface = surface_with(fetcher);
        let tab = open_window(&surface, "https://example.com/").await;

        let markup = surface.document_markup(tab.id).await.unwrap();
        assert_eq!(markup, PAGE);
        assert_eq!(surface.get_tab(tab.id).await.unwrap().title, "Example Domain");

        let history = surface
            .search_history(&HistoryQuery {
                text: "example".to_string(),
                max_results: 10,
                start_time: None,
            })
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].title, "Example Domain");
    }

    #[tokio::test]
    async fn test_scripting_denied_for_internal_pages() {
        let surface = surface_with(StaticFetcher::new());
        let window = surface
            .create_window(CreateWindow::default())
            .await
            .unwrap();
        let tab = &window.tabs.unwrap()[0];

        let err = surface.document_markup(tab.id).await.unwrap_err();
        assert_eq!(
            err,
            SurfaceError::ScriptingDenied("about:blank".to_string())
        );
        assert!(surface.selection_text(tab.id).await.is_err());
        assert!(surface
            .fetch_in_page(tab.id, FetchRequest::get("/x"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_selection_replace_and_read() {
        let surface = surface_with(StaticFetcher::new());
        let tab = open_window(&surface, "https://example.com/").await;
        surface.load_document(tab.id, PAGE).unwrap();

        assert_eq!(surface.selection_text(tab.id).await.unwrap(), "");
        assert!(!surface.replace_selection(tab.id, "x").await.unwrap());

        assert!(surface.select_text(tab.id, "world").unwrap());
        assert_eq!(surface.selection_text(tab.id).await.unwrap(), "world");
        assert!(surface.replace_selection(tab.id, "there").await.unwrap());

        let markup = surface.document_markup(tab.id).await.unwrap();
        assert!(markup.contains("<p>Hello there</p>"));
    }

    #[tokio::test]
    async fn test_navigation_discards_document() {
        let surface = surface_with(StaticFetcher::new());
        let tab = open_window(&surface, "https://example.com/").await;
        surface.load_document(tab.id, PAGE).unwrap();
        surface.select_text(tab.id, "Hello").unwrap();

        surface
            .update_tab(tab.id, TabUpdate::navigate("https://example.org/"))
            .await
            .unwrap();
        assert_eq!(surface.selection_text(tab.id).await.unwrap(), "");

        // unrouted page loads as the fetcher's 404 body
        assert_eq!(surface.document_markup(tab.id).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_fetch_in_page_resolves_against_tab() {
        let fetcher = Arc::new(StaticFetcher::new().route_delayed(
            "https://example.com/api",
            FetchResponse::new(200, "OK", "ok"),
            Duration::from_millis(5),
        ));
        let surface = HeadlessSurface::in_memory(fetcher.clone()).unwrap();
        let tab = open_window(&surface, "https://example.com/page").await;

        let resp = surface
            .fetch_in_page(tab.id, FetchRequest::get("/api"))
            .await
            .unwrap();
        assert_eq!(resp.body, "ok");
        assert_eq!(fetcher.requests(), vec!["https://example.com/api"]);
    }

    #[tokio::test]
    async fn test_displays_and_library_helpers() {
        let surface = surface_with(StaticFetcher::new());
        let displays = surface.displays().await.unwrap();
        assert_eq!(displays.len(), 1);
        assert_eq!(displays[0].work_area.width, 1920);

        surface
            .record_download("https://a.test/f.zip", "f.zip", None, 3)
            .unwrap();
        assert_eq!(
            surface
                .search_downloads(&DownloadQuery::default())
                .await
                .unwrap()
                .len(),
            1
        );

        surface
            .install_extension(&ExtensionInfo {
                id: "wesh".to_string(),
                name: "wesh".to_string(),
                version: "0.1.0".to_string(),
                description: String::new(),
                enabled: true,
            })
            .unwrap();
        assert_eq!(surface.list_extensions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_window_closes_tabs() {
        let surface = surface_with(StaticFetcher::new());
        let tab = open_window(&surface, "https://example.com/").await;
        surface.load_document(tab.id, PAGE).unwrap();

        surface.remove_window(tab.window_id).await.unwrap();
        assert_eq!(
            surface.get_tab(tab.id).await.unwrap_err(),
            SurfaceError::TabNotFound(tab.id)
        );
        assert!(surface.current_window().await.unwrap().is_none());
    }
}
