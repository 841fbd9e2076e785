//! Tab data structures

use serde::{Deserialize, Serialize};

use crate::window::WindowId;

pub type TabId = i64;

/// Loading state of a tab's document. Headless navigations finish as soon
/// as they start, so every tab is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Complete,
}

impl TabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabStatus::Complete => "complete",
        }
    }
}

impl std::str::FromStr for TabStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(TabStatus::Complete),
            _ => Err(format!("Unknown tab status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    /// Window this tab belongs to
    pub window_id: WindowId,
    /// Zero-based position within the window
    pub index: usize,
    pub url: String,
    pub title: String,
    /// Whether this is the selected tab of its window
    pub active: bool,
    pub pinned: bool,
    pub status: TabStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
}

/// Filter for tab queries. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    /// Restrict to the focused window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_window: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<WindowId>,
    /// URL match patterns; a tab matches if any pattern matches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub url: Vec<String>,
}

impl TabQuery {
    /// The active tab of the focused window
    pub fn active_in_current_window() -> Self {
        Self {
            active: Some(true),
            current_window: Some(true),
            ..Self::default()
        }
    }

    pub fn in_current_window() -> Self {
        Self {
            current_window: Some(true),
            ..Self::default()
        }
    }

    pub fn in_window(window_id: WindowId) -> Self {
        Self {
            window_id: Some(window_id),
            ..Self::default()
        }
    }

    pub fn matching(pattern: impl Into<String>) -> Self {
        Self {
            url: vec![pattern.into()],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTab {
    /// Target window; the focused window when unset
    #[serde(default)]
    pub window_id: Option<WindowId>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
}

fn default_true() -> bool {
    true
}

impl CreateTab {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            window_id: None,
            url: Some(url.into()),
            active: true,
            pinned: false,
        }
    }

    pub fn in_window(mut self, window_id: WindowId) -> Self {
        self.window_id = Some(window_id);
        self
    }
}

/// Properties to change on a tab. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabUpdate {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub pinned: Option<bool>,
}

impl TabUpdate {
    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn activate() -> Self {
        Self {
            active: Some(true),
            ..Self::default()
        }
    }

    pub fn pin(pinned: bool) -> Self {
        Self {
            pinned: Some(pinned),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tab_wire_shape() {
        let tab = Tab {
            id: 3,
            window_id: 1,
            index: 0,
            url: "https://example.com/".to_string(),
            title: String::new(),
            active: true,
            pinned: false,
            status: TabStatus::Complete,
            fav_icon_url: None,
        };

        assert_eq!(
            serde_json::to_value(&tab).unwrap(),
            json!({
                "id": 3,
                "windowId": 1,
                "index": 0,
                "url": "https://example.com/",
                "title": "",
                "active": true,
                "pinned": false,
                "status": "complete"
            })
        );
    }

    #[test]
    fn test_status_parses_stored_value() {
        assert_eq!("complete".parse::<TabStatus>(), Ok(TabStatus::Complete));
        assert!("loading".parse::<TabStatus>().is_err());
    }

    #[test]
    fn test_create_tab_defaults_to_active() {
        let create: CreateTab = serde_json::from_value(json!({"url": "https://a"})).unwrap();
        assert!(create.active);
        assert!(!create.pinned);
        assert_eq!(create.window_id, None);
    }
}
