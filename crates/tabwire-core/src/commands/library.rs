//! Bookmark, download, history and extension commands

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tabwire_surface::{CreateBookmark, DownloadQuery, HistoryQuery};

use super::{parse_args, to_payload, Command, CommandContext};
use crate::Result;

/// `extension.list`
pub struct ListExtensions;

#[async_trait]
impl Command for ListExtensions {
    fn name(&self) -> &'static str {
        "extension.list"
    }

    async fn execute(&self, cx: &CommandContext, _args: Map<String, Value>) -> Result<Value> {
        let extensions = cx.surface().list_extensions().await?;
        to_payload(&extensions)
    }
}

/// `bookmark.list`: the whole tree
pub struct ListBookmarks;

#[async_trait]
impl Command for ListBookmarks {
    fn name(&self) -> &'static str {
        "bookmark.list"
    }

    async fn execute(&self, cx: &CommandContext, _args: Map<String, Value>) -> Result<Value> {
        let tree = cx.surface().bookmark_tree().await?;
        to_payload(&tree)
    }
}

/// `bookmark.create`: a bookmark, or a folder when `url` is omitted
pub struct AddBookmark;

#[async_trait]
impl Command for AddBookmark {
    fn name(&self) -> &'static str {
        "bookmark.create"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let create: CreateBookmark = parse_args(self.name(), args)?;
        let node = cx.surface().create_bookmark(create).await?;
        to_payload(&node)
    }
}

#[derive(Debug, Deserialize)]
struct RemoveArgs {
    id: String,
}

/// `bookmark.remove`
pub struct RemoveBookmark;

#[async_trait]
impl Command for RemoveBookmark {
    fn name(&self) -> &'static str {
        "bookmark.remove"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: RemoveArgs = parse_args(self.name(), args)?;
        cx.surface().remove_bookmark(&args.id).await?;
        Ok(Value::Null)
    }
}

/// `download.list`
pub struct ListDownloads;

#[async_trait]
impl Command for ListDownloads {
    fn name(&self) -> &'static str {
        "download.list"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let query: DownloadQuery = parse_args(self.name(), args)?;
        let downloads = cx.surface().search_downloads(&query).await?;
        to_payload(&downloads)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    #[serde(default)]
    query: String,
    #[serde(default)]
    max_results: Option<usize>,
    #[serde(default)]
    start_time: Option<i64>,
}

/// `history.search`
pub struct SearchHistory;

#[async_trait]
impl Command for SearchHistory {
    fn name(&self) -> &'static str {
        "history.search"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: SearchArgs = parse_args(self.name(), args)?;
        let query = HistoryQuery {
            text: args.query,
            max_results: args.max_results.unwrap_or(cx.history_max_results()),
            start_time: args.start_time,
        };

        let items = cx.surface().search_history(&query).await?;
        to_payload(&items)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::Fixture;
    use serde_json::json;
    use tabwire_protocol::ErrorKind;
    use tabwire_surface::{DownloadState, ExtensionInfo, HostSurface, TabUpdate};

    #[tokio::test]
    async fn test_bookmark_create_list_remove() {
        let fx = Fixture::new().await;

        let node = fx
            .run(
                "bookmark.create",
                json!({"title": "Rust", "url": "https://www.rust-lang.org/"}),
            )
            .await
            .unwrap();
        assert_eq!(node["parentId"], json!("2"));
        let id = node["id"].as_str().unwrap().to_string();

        let tree = fx.run("bookmark.list", json!({})).await.unwrap();
        assert_eq!(tree[0]["children"][1]["children"][0]["title"], json!("Rust"));

        let result = fx.run("bookmark.remove", json!({"id": id})).await.unwrap();
        assert_eq!(result, json!(null));

        let err = fx
            .run("bookmark.remove", json!({"id": "1"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HostSurface);
        assert_eq!(err.to_string(), "Can't modify the root bookmark folders.");
    }

    #[tokio::test]
    async fn test_history_search_uses_visits() {
        let fx = Fixture::new().await;
        fx.surface()
            .update_tab(fx.first_tab, TabUpdate::navigate("https://docs.rs/serde"))
            .await
            .unwrap();

        let items = fx
            .run("history.search", json!({"query": "docs"}))
            .await
            .unwrap();
        assert_eq!(items.as_array().unwrap().len(), 1);
        assert_eq!(items[0]["url"], json!("https://docs.rs/serde"));

        let all = fx
            .run("history.search", json!({"query": "", "maxResults": 1}))
            .await
            .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_downloads_and_extensions() {
        let fx = Fixture::new().await;
        let item = fx
            .headless
            .record_download("https://a.test/a.zip", "a.zip", Some("application/zip"), 10)
            .unwrap();
        fx.headless
            .update_download(item.id, 10, DownloadState::Complete)
            .unwrap();
        fx.headless
            .record_download("https://a.test/b.zip", "b.zip", None, 10)
            .unwrap();

        let all = fx.run("download.list", json!({})).await.unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);
        let complete = fx
            .run("download.list", json!({"state": "complete"}))
            .await
            .unwrap();
        assert_eq!(complete[0]["filename"], json!("a.zip"));
        assert_eq!(complete[0]["bytesReceived"], json!(10));

        fx.headless
            .install_extension(&ExtensionInfo {
                id: "wesh".to_string(),
                name: "wesh".to_string(),
                version: "0.1.0".to_string(),
                description: "Terminal in the browser".to_string(),
                enabled: true,
            })
            .unwrap();
        let extensions = fx.run("extension.list", json!({})).await.unwrap();
        assert_eq!(extensions[0]["id"], json!("wesh"));
    }
}
