//! Side-channel triggers
//!
//! Menu clicks, icon clicks and text-command entry act directly on the
//! surface. Nothing here produces a correlated reply.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabwire_surface::{CreateTab, CreateWindow, HostSurface, Tab, TabUpdate, Window, WindowKind};

use crate::config::{Config, PopupConfig};
use crate::error::BridgeError;
use crate::target::active_tab_id;
use crate::Result;

pub const OPEN_TERMINAL_TAB: &str = "open-terminal-tab";
pub const OPEN_TERMINAL_WINDOW: &str = "open-terminal-window";

/// A context menu entry registered on the toolbar icon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub id: &'static str,
    pub title: &'static str,
    pub contexts: &'static [&'static str],
}

pub fn menu_items() -> [MenuItem; 2] {
    [
        MenuItem {
            id: OPEN_TERMINAL_TAB,
            title: "Open Terminal in New Tab",
            contexts: &["action"],
        },
        MenuItem {
            id: OPEN_TERMINAL_WINDOW,
            title: "Open Terminal in New Window",
            contexts: &["action"],
        },
    ]
}

/// Where text-command entry should open the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Disposition {
    CurrentTab,
    NewForegroundTab,
    NewBackgroundTab,
}

/// What a trigger opened or navigated
#[derive(Debug, Clone, PartialEq)]
pub enum Opened {
    Tab(Tab),
    Window(Window),
}

pub struct Triggers {
    surface: Arc<dyn HostSurface>,
    terminal_page: String,
    popup: PopupConfig,
}

impl Triggers {
    pub fn new(
        surface: Arc<dyn HostSurface>,
        terminal_page: impl Into<String>,
        popup: PopupConfig,
    ) -> Self {
        Self {
            surface,
            terminal_page: terminal_page.into(),
            popup,
        }
    }

    pub fn from_config(surface: Arc<dyn HostSurface>, config: &Config) -> Self {
        Self::new(surface, config.terminal_page.clone(), config.popup)
    }

    pub async fn menu_clicked(&self, menu_item_id: &str) -> Result<Opened> {
        tracing::info!(menu_item = menu_item_id, "Menu item clicked");

        match menu_item_id {
            OPEN_TERMINAL_TAB => self.open_tab(&self.terminal_page).await,
            OPEN_TERMINAL_WINDOW => {
                let window = self
                    .surface
                    .create_window(CreateWindow::with_urls(vec![self.terminal_page.clone()]))
                    .await?;
                Ok(Opened::Window(window))
            }
            other => Err(BridgeError::UnknownMenuItem(other.to_string())),
        }
    }

    pub async fn icon_clicked(&self) -> Result<Opened> {
        tracing::info!("Icon clicked");
        self.open_tab(&self.terminal_page).await
    }

    /// Page URL seeded with a command line
    pub fn command_url(&self, text: &str) -> String {
        format!("{}?command={}", self.terminal_page, encode_component(text))
    }

    pub async fn text_entered(&self, text: &str, disposition: Disposition) -> Result<Opened> {
        let url = self.command_url(text);
        tracing::info!(disposition = ?disposition, url = %url, "Text command entered");

        match disposition {
            Disposition::CurrentTab => {
                let tab_id = active_tab_id(self.surface.as_ref()).await?;
                let tab = self
                    .surface
                    .update_tab(tab_id, TabUpdate::navigate(url))
                    .await?;
                Ok(Opened::Tab(tab))
            }
            Disposition::NewForegroundTab => self.open_tab(&url).await,
            Disposition::NewBackgroundTab => {
                let PopupConfig { width, height } = self.popup;
                let origin = self
                    .surface
                    .displays()
                    .await?
                    .first()
                    .map(|display| display.work_area.centered(width, height));

                let window = self
                    .surface
                    .create_window(CreateWindow {
                        urls: vec![format!("{url}&popup=true")],
                        kind: WindowKind::Popup,
                        left: origin.map(|(left, _)| left),
                        top: origin.map(|(_, top)| top),
                        width: Some(width),
                        height: Some(height),
                    })
                    .await?;
                Ok(Opened::Window(window))
            }
        }
    }

    /// Suggestion shown while a command is being typed
    pub fn default_suggestion(text: &str) -> String {
        if text.is_empty() {
            "Run command".to_string()
        } else {
            format!("Run: {text}")
        }
    }

    /// Answer the popup's query for the page it was opened over
    pub async fn active_tab_url(&self) -> Option<String> {
        let tab_id = active_tab_id(self.surface.as_ref()).await.ok()?;
        self.surface.get_tab(tab_id).await.ok().map(|tab| tab.url)
    }

    async fn open_tab(&self, url: &str) -> Result<Opened> {
        let tab = self.surface.create_tab(CreateTab::new(url)).await?;
        Ok(Opened::Tab(tab))
    }
}

/// Percent-encode a query component. Leaves the same characters unescaped
/// as a page's `decodeURIComponent` expects, so a space becomes `%20`.
fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, START_URL};
    use tabwire_surface::{TabQuery, WindowState};

    fn triggers(fx: &Fixture) -> Triggers {
        Triggers::new(fx.headless.clone(), "/src/index.html", PopupConfig::default())
    }

    #[test]
    fn test_menu_items() {
        let items = menu_items();
        assert_eq!(items[0].id, "open-terminal-tab");
        assert_eq!(items[0].title, "Open Terminal in New Tab");
        assert_eq!(items[1].id, "open-terminal-window");
        assert_eq!(items[1].contexts, &["action"]);
    }

    #[test]
    fn test_default_suggestion() {
        assert_eq!(Triggers::default_suggestion(""), "Run command");
        assert_eq!(Triggers::default_suggestion("tab list"), "Run: tab list");
    }

    #[test]
    fn test_disposition_wire_names() {
        let d: Disposition = serde_json::from_str("\"newBackgroundTab\"").unwrap();
        assert_eq!(d, Disposition::NewBackgroundTab);
        assert_eq!(
            serde_json::to_string(&Disposition::CurrentTab).unwrap(),
            "\"currentTab\""
        );
    }

    #[tokio::test]
    async fn test_command_url_encoding() {
        let fx = Fixture::new().await;
        assert_eq!(
            triggers(&fx).command_url("tab list & more"),
            "/src/index.html?command=tab%20list%20%26%20more"
        );
        assert_eq!(
            triggers(&fx).command_url("a+b=(c)/é"),
            "/src/index.html?command=a%2Bb%3D(c)%2F%C3%A9"
        );
    }

    #[tokio::test]
    async fn test_menu_open_tab() {
        let fx = Fixture::new().await;
        let opened = triggers(&fx).menu_clicked(OPEN_TERMINAL_TAB).await.unwrap();

        let Opened::Tab(tab) = opened else {
            panic!("expected a tab");
        };
        assert_eq!(tab.url, "/src/index.html");
        assert_eq!(tab.window_id, fx.window_id);
        assert!(tab.active);
    }

    #[tokio::test]
    async fn test_menu_open_window() {
        let fx = Fixture::new().await;
        let opened = triggers(&fx)
            .menu_clicked(OPEN_TERMINAL_WINDOW)
            .await
            .unwrap();

        let Opened::Window(window) = opened else {
            panic!("expected a window");
        };
        assert_ne!(window.id, fx.window_id);
        assert!(window.focused);
        assert_eq!(window.kind, WindowKind::Normal);
    }

    #[tokio::test]
    async fn test_unknown_menu_item() {
        let fx = Fixture::new().await;
        let err = triggers(&fx).menu_clicked("settings").await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown menu item: settings");
    }

    #[tokio::test]
    async fn test_icon_opens_tab() {
        let fx = Fixture::new().await;
        triggers(&fx).icon_clicked().await.unwrap();

        let tabs = fx.surface().query_tabs(&TabQuery::default()).await.unwrap();
        assert_eq!(tabs.len(), 2);
        assert!(tabs.iter().any(|t| t.url == "/src/index.html"));
    }

    #[tokio::test]
    async fn test_text_entry_current_tab() {
        let fx = Fixture::new().await;
        let t = triggers(&fx);
        assert_eq!(t.active_tab_url().await.as_deref(), Some(START_URL));

        t.text_entered("tab list", Disposition::CurrentTab)
            .await
            .unwrap();

        let tab = fx.surface().get_tab(fx.first_tab).await.unwrap();
        assert_eq!(tab.url, "/src/index.html?command=tab%20list");
        assert_eq!(
            t.active_tab_url().await.as_deref(),
            Some("/src/index.html?command=tab%20list")
        );
    }

    #[tokio::test]
    async fn test_text_entry_foreground_tab() {
        let fx = Fixture::new().await;
        let opened = triggers(&fx)
            .text_entered("ls", Disposition::NewForegroundTab)
            .await
            .unwrap();

        let Opened::Tab(tab) = opened else {
            panic!("expected a tab");
        };
        assert_ne!(tab.id, fx.first_tab);
        assert_eq!(tab.url, "/src/index.html?command=ls");
    }

    #[tokio::test]
    async fn test_text_entry_background_popup_is_centered() {
        let fx = Fixture::new().await;
        let opened = triggers(&fx)
            .text_entered("ls", Disposition::NewBackgroundTab)
            .await
            .unwrap();

        let Opened::Window(window) = opened else {
            panic!("expected a window");
        };
        assert_eq!(window.kind, WindowKind::Popup);
        assert_eq!(window.state, WindowState::Normal);
        assert_eq!((window.width, window.height), (750, 500));
        assert_eq!((window.left, window.top), ((1920 - 750) / 2, (1080 - 500) / 2));

        let tabs = fx
            .surface()
            .query_tabs(&TabQuery {
                window_id: Some(window.id),
                ..TabQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(tabs[0].url, "/src/index.html?command=ls&popup=true");
    }

    #[tokio::test]
    async fn test_no_active_tab_url_without_windows() {
        let fx = Fixture::new().await;
        fx.surface().remove_window(fx.window_id).await.unwrap();
        assert_eq!(triggers(&fx).active_tab_url().await, None);
    }
}
