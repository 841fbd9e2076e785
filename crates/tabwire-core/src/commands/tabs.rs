//! `tab.*` commands

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::future::Future;
use tabwire_surface::{CreateTab, HostSurface, TabId, TabQuery, TabUpdate, WindowId, WindowUpdate};

use super::{parse_args, to_payload, Command, CommandContext};
use crate::error::{BridgeError, TargetFailure};
use crate::target::{current_window_id, tab_or_active, tabs_or_active};
use crate::Result;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabArgs {
    #[serde(default)]
    tab_id: Option<TabId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabsArgs {
    #[serde(default)]
    tab_ids: Option<Vec<TabId>>,
}

/// Apply `op` to every tab in order, collecting failures.
///
/// A lone target's failure is reported as-is; with several targets the
/// reply lists every failed id.
async fn for_each_tab<F, Fut>(command: &str, tab_ids: Vec<TabId>, mut op: F) -> Result<Value>
where
    F: FnMut(TabId) -> Fut,
    Fut: Future<Output = tabwire_surface::Result<()>>,
{
    let total = tab_ids.len();
    let mut failures = Vec::new();

    for tab_id in tab_ids {
        if let Err(e) = op(tab_id).await {
            tracing::warn!(command = %command, tab_id = tab_id, error = %e, "Target failed");
            if total == 1 {
                return Err(e.into());
            }
            failures.push(TargetFailure {
                tab_id,
                message: e.to_string(),
            });
        }
    }

    if failures.is_empty() {
        Ok(Value::Null)
    } else {
        Err(BridgeError::PartialFailure { total, failures })
    }
}

async fn set_pinned(
    cx: &CommandContext,
    command: &str,
    args: Map<String, Value>,
    pinned: bool,
) -> Result<Value> {
    let args: TabsArgs = parse_args(command, args)?;
    let surface = cx.surface();
    let tab_ids = tabs_or_active(surface, args.tab_ids).await?;

    for_each_tab(command, tab_ids, |tab_id| async move {
        surface.update_tab(tab_id, TabUpdate::pin(pinned)).await.map(|_| ())
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListArgs {
    #[serde(default)]
    all_windows: bool,
    #[serde(default)]
    window_id: Option<WindowId>,
}

/// `tab.list`: tabs of every window, one window, or the focused window
pub struct ListTabs;

#[async_trait]
impl Command for ListTabs {
    fn name(&self) -> &'static str {
        "tab.list"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: ListArgs = parse_args(self.name(), args)?;
        let query = if args.all_windows {
            TabQuery::default()
        } else if let Some(window_id) = args.window_id {
            TabQuery::in_window(window_id)
        } else {
            TabQuery::in_current_window()
        };

        let tabs = cx.surface().query_tabs(&query).await?;
        to_payload(&tabs)
    }
}

/// `tab.get`
pub struct GetTab;

#[async_trait]
impl Command for GetTab {
    fn name(&self) -> &'static str {
        "tab.get"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: TabArgs = parse_args(self.name(), args)?;
        let tab_id = tab_or_active(cx.surface(), args.tab_id).await?;
        let tab = cx.surface().get_tab(tab_id).await?;
        to_payload(&tab)
    }
}

/// `tab.pin`
pub struct PinTabs;

#[async_trait]
impl Command for PinTabs {
    fn name(&self) -> &'static str {
        "tab.pin"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        set_pinned(cx, self.name(), args, true).await
    }
}

/// `tab.unpin`
pub struct UnpinTabs;

#[async_trait]
impl Command for UnpinTabs {
    fn name(&self) -> &'static str {
        "tab.unpin"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        set_pinned(cx, self.name(), args, false).await
    }
}

/// `tab.focus`: activate the tab, then focus its window
pub struct FocusTab;

#[async_trait]
impl Command for FocusTab {
    fn name(&self) -> &'static str {
        "tab.focus"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: TabArgs = parse_args(self.name(), args)?;
        let surface = cx.surface();
        let tab_id = tab_or_active(surface, args.tab_id).await?;

        let tab = surface.update_tab(tab_id, TabUpdate::activate()).await?;
        surface
            .update_window(tab.window_id, WindowUpdate::focus())
            .await?;
        Ok(Value::Null)
    }
}

/// `tab.remove`
pub struct RemoveTabs;

#[async_trait]
impl Command for RemoveTabs {
    fn name(&self) -> &'static str {
        "tab.remove"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: TabsArgs = parse_args(self.name(), args)?;
        let surface = cx.surface();
        let tab_ids = tabs_or_active(surface, args.tab_ids).await?;

        for_each_tab(self.name(), tab_ids, |tab_id| surface.remove_tab(tab_id)).await
    }
}

/// `tab.reload`
pub struct ReloadTabs;

#[async_trait]
impl Command for ReloadTabs {
    fn name(&self) -> &'static str {
        "tab.reload"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: TabsArgs = parse_args(self.name(), args)?;
        let surface = cx.surface();
        let tab_ids = tabs_or_active(surface, args.tab_ids).await?;

        for_each_tab(self.name(), tab_ids, |tab_id| surface.reload_tab(tab_id)).await
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateArgs {
    #[serde(default)]
    tab_id: Option<TabId>,
    #[serde(flatten)]
    update: TabUpdate,
}

/// `tab.update`: navigate, activate or (un)pin one tab
pub struct UpdateTab;

#[async_trait]
impl Command for UpdateTab {
    fn name(&self) -> &'static str {
        "tab.update"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: UpdateArgs = parse_args(self.name(), args)?;
        let tab_id = tab_or_active(cx.surface(), args.tab_id).await?;
        cx.surface().update_tab(tab_id, args.update).await?;
        Ok(Value::Null)
    }
}

#[derive(Debug, Default, Deserialize)]
struct CreateArgs {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    urls: Option<Vec<String>>,
}

/// `tab.create`: open `url`, or each of `urls` in order, in the focused
/// window, then focus it
pub struct CreateTabs;

#[async_trait]
impl Command for CreateTabs {
    fn name(&self) -> &'static str {
        "tab.create"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: CreateArgs = parse_args(self.name(), args)?;
        let urls = match (args.url, args.urls) {
            (Some(url), _) => vec![url],
            (None, Some(urls)) => urls,
            (None, None) => {
                return Err(BridgeError::invalid_arguments(
                    self.name(),
                    "either `url` or `urls` is required",
                ))
            }
        };

        let surface = cx.surface();
        let window_id = current_window_id(surface).await?;
        for url in urls {
            surface
                .create_tab(CreateTab::new(url).in_window(window_id))
                .await?;
        }
        surface
            .update_window(window_id, WindowUpdate::focus())
            .await?;
        Ok(Value::Null)
    }
}

/// Shared by [`TabSource`](super::TabSource) and the selection commands
pub(crate) async fn target_tab(
    surface: &dyn HostSurface,
    command: &str,
    args: Map<String, Value>,
) -> Result<TabId> {
    let args: TabArgs = parse_args(command, args)?;
    tab_or_active(surface, args.tab_id).await
}
