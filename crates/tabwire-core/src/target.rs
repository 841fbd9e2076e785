//! Implicit target resolution
//!
//! Commands that omit a `tabId` act on the active tab of the focused
//! window. The lookup happens per request and is never cached.

use tabwire_surface::{HostSurface, TabId, TabQuery, WindowId};

use crate::error::{ActiveTarget, BridgeError};
use crate::Result;

pub async fn active_tab_id(surface: &dyn HostSurface) -> Result<TabId> {
    let tabs = surface
        .query_tabs(&TabQuery::active_in_current_window())
        .await?;
    tabs.first()
        .map(|tab| tab.id)
        .ok_or(BridgeError::ActiveTargetNotFound(ActiveTarget::Tab))
}

/// The explicit tab, or the active one
pub async fn tab_or_active(surface: &dyn HostSurface, tab_id: Option<TabId>) -> Result<TabId> {
    match tab_id {
        Some(id) => Ok(id),
        None => active_tab_id(surface).await,
    }
}

/// The explicit tabs, or just the active one
pub async fn tabs_or_active(
    surface: &dyn HostSurface,
    tab_ids: Option<Vec<TabId>>,
) -> Result<Vec<TabId>> {
    match tab_ids {
        Some(ids) => Ok(ids),
        None => Ok(vec![active_tab_id(surface).await?]),
    }
}

pub async fn current_window_id(surface: &dyn HostSurface) -> Result<WindowId> {
    surface
        .current_window()
        .await?
        .map(|window| window.id)
        .ok_or(BridgeError::ActiveTargetNotFound(ActiveTarget::Window))
}

/// First tab whose URL matches a match pattern
pub async fn first_matching_tab(surface: &dyn HostSurface, pattern: &str) -> Result<TabId> {
    let tabs = surface.query_tabs(&TabQuery::matching(pattern)).await?;
    tabs.first()
        .map(|tab| tab.id)
        .ok_or_else(|| BridgeError::NoMatchingTarget(pattern.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use tabwire_surface::{CreateTab, WindowUpdate};

    #[tokio::test]
    async fn test_active_tab_follows_focus() {
        let fx = Fixture::new().await;
        let surface = fx.surface();
        let first = active_tab_id(surface).await.unwrap();
        assert_eq!(first, fx.first_tab);

        let second = surface
            .create_tab(CreateTab::new("https://b.test/"))
            .await
            .unwrap();
        assert_eq!(active_tab_id(surface).await.unwrap(), second.id);
        assert_eq!(tab_or_active(surface, Some(99)).await.unwrap(), 99);
        assert_eq!(
            tabs_or_active(surface, None).await.unwrap(),
            vec![second.id]
        );
    }

    #[tokio::test]
    async fn test_no_focused_window() {
        let fx = Fixture::new().await;
        let surface = fx.surface();
        surface
            .update_window(
                fx.window_id,
                WindowUpdate {
                    focused: Some(false),
                    ..WindowUpdate::default()
                },
            )
            .await
            .unwrap();

        let err = active_tab_id(surface).await.unwrap_err();
        assert_eq!(err.to_string(), "Active tab not found");
        let err = current_window_id(surface).await.unwrap_err();
        assert_eq!(err.to_string(), "Current window not found");
    }

    #[tokio::test]
    async fn test_first_matching_tab() {
        let fx = Fixture::new().await;
        let surface = fx.surface();
        assert_eq!(
            first_matching_tab(surface, "https://example.com/*")
                .await
                .unwrap(),
            fx.first_tab
        );

        let err = first_matching_tab(surface, "*://nowhere.test/*")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No tabs matching *://nowhere.test/*");
    }
}
