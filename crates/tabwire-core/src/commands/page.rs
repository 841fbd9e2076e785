//! Commands scripted inside a tab's page: `fetch`, `tab.source`,
//! `selection.get`, `selection.set`

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tabwire_surface::{FetchRequest, FetchResponse, TabId};

use super::tabs::target_tab;
use super::{parse_args, Command, CommandContext};
use crate::error::BridgeError;
use crate::target::{first_matching_tab, tab_or_active};
use crate::Result;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchArgs {
    url: String,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    tab_id: Option<TabId>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<String>,
}

/// Turn a page response into a command result: JSON bodies are parsed,
/// anything else is returned as text.
fn negotiate(response: FetchResponse) -> Result<Value> {
    if !response.ok() {
        return Err(BridgeError::FetchFailed(response.status_text));
    }

    if response.is_json() {
        return serde_json::from_str(&response.body)
            .map_err(|e| BridgeError::FetchFailed(format!("invalid JSON body: {e}")));
    }

    Ok(Value::String(response.body))
}

/// `fetch`: run a request from inside a tab so it carries the page's
/// origin and credentials
pub struct Fetch;

#[async_trait]
impl Command for Fetch {
    fn name(&self) -> &'static str {
        "fetch"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: FetchArgs = parse_args(self.name(), args)?;
        let surface = cx.surface();

        let tab_id = match &args.pattern {
            Some(pattern) => first_matching_tab(surface, pattern).await?,
            None => tab_or_active(surface, args.tab_id).await?,
        };

        let request = FetchRequest {
            url: args.url,
            method: args.method.unwrap_or_else(|| "GET".to_string()),
            headers: args.headers,
            body: args.body,
        };
        tracing::debug!(tab_id = tab_id, url = %request.url, "Fetching in tab");

        let response = surface.fetch_in_page(tab_id, request).await?;
        negotiate(response)
    }
}

/// `tab.source`: full markup of the tab's document
pub struct TabSource;

#[async_trait]
impl Command for TabSource {
    fn name(&self) -> &'static str {
        "tab.source"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let tab_id = target_tab(cx.surface(), self.name(), args).await?;
        let markup = cx.surface().document_markup(tab_id).await?;
        Ok(Value::String(markup))
    }
}

/// `selection.get`: selected text, empty when nothing is selected
pub struct GetSelection;

#[async_trait]
impl Command for GetSelection {
    fn name(&self) -> &'static str {
        "selection.get"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let tab_id = target_tab(cx.surface(), self.name(), args).await?;
        let text = cx.surface().selection_text(tab_id).await?;
        Ok(Value::String(text))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetSelectionArgs {
    #[serde(default)]
    tab_id: Option<TabId>,
    text: String,
}

/// `selection.set`: replace the selection with text, leaving the cursor
/// after it. Without a selection nothing changes.
pub struct SetSelection;

#[async_trait]
impl Command for SetSelection {
    fn name(&self) -> &'static str {
        "selection.set"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: SetSelectionArgs = parse_args(self.name(), args)?;
        let surface = cx.surface();
        let tab_id = tab_or_active(surface, args.tab_id).await?;

        tracing::debug!(tab_id = tab_id, len = args.text.len(), "Setting selection text");
        if !surface.replace_selection(tab_id, &args.text).await? {
            tracing::debug!(tab_id = tab_id, "No selection to replace");
        }
        Ok(Value::Null)
    }
}
