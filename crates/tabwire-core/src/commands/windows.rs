//! `window.*` commands

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tabwire_surface::{CreateWindow, WindowId, WindowUpdate};

use super::{parse_args, to_payload, Command, CommandContext};
use crate::Result;

#[derive(Debug, Default, Deserialize)]
struct ListArgs {
    #[serde(default)]
    populate: bool,
}

/// `window.list`
pub struct ListWindows;

#[async_trait]
impl Command for ListWindows {
    fn name(&self) -> &'static str {
        "window.list"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: ListArgs = parse_args(self.name(), args)?;
        let windows = cx.surface().list_windows(args.populate).await?;
        to_payload(&windows)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WindowArgs {
    window_id: WindowId,
}

/// `window.focus`, replying with the focused window
pub struct FocusWindow;

#[async_trait]
impl Command for FocusWindow {
    fn name(&self) -> &'static str {
        "window.focus"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: WindowArgs = parse_args(self.name(), args)?;
        let window = cx
            .surface()
            .update_window(args.window_id, WindowUpdate::focus())
            .await?;
        to_payload(&window)
    }
}

/// `window.remove`
pub struct RemoveWindow;

#[async_trait]
impl Command for RemoveWindow {
    fn name(&self) -> &'static str {
        "window.remove"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: WindowArgs = parse_args(self.name(), args)?;
        cx.surface().remove_window(args.window_id).await?;
        Ok(Value::Null)
    }
}

/// A single url or a list of them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Urls {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
struct CreateArgs {
    #[serde(default)]
    url: Option<Urls>,
}

/// `window.create`: a normal window with the given url(s)
pub struct OpenWindow;

#[async_trait]
impl Command for OpenWindow {
    fn name(&self) -> &'static str {
        "window.create"
    }

    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value> {
        let args: CreateArgs = parse_args(self.name(), args)?;
        let urls = match args.url {
            Some(Urls::One(url)) => vec![url],
            Some(Urls::Many(urls)) => urls,
            None => Vec::new(),
        };

        let window = cx
            .surface()
            .create_window(CreateWindow::with_urls(urls))
            .await?;
        to_payload(&window)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Fixture, START_URL};
    use serde_json::json;
    use tabwire_protocol::ErrorKind;
    use tabwire_surface::HostSurface;

    #[tokio::test]
    async fn test_create_with_one_or_many_urls() {
        let fx = Fixture::new().await;

        let one = fx
            .run("window.create", json!({"url": "https://a.test/"}))
            .await
            .unwrap();
        assert_eq!(one["type"], json!("normal"));
        assert_eq!(one["focused"], json!(true));
        assert_eq!(one["tabs"][0]["url"], json!("https://a.test/"));

        let many = fx
            .run(
                "window.create",
                json!({"url": ["https://a.test/", "https://b.test/"]}),
            )
            .await
            .unwrap();
        assert_eq!(many["tabs"].as_array().unwrap().len(), 2);

        let blank = fx.run("window.create", json!({})).await.unwrap();
        assert_eq!(blank["tabs"][0]["url"], json!("about:blank"));
    }

    #[tokio::test]
    async fn test_list_focus_remove() {
        let fx = Fixture::new().await;
        fx.run("window.create", json!({})).await.unwrap();

        let listed = fx.run("window.list", json!({})).await.unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 2);
        assert!(listed[0].get("tabs").is_none());

        let populated = fx
            .run("window.list", json!({"populate": true}))
            .await
            .unwrap();
        assert_eq!(populated[0]["tabs"][0]["url"], json!(START_URL));

        let focused = fx
            .run("window.focus", json!({"windowId": fx.window_id}))
            .await
            .unwrap();
        assert_eq!(focused["id"], json!(fx.window_id));
        assert_eq!(focused["focused"], json!(true));

        let result = fx
            .run("window.remove", json!({"windowId": fx.window_id}))
            .await
            .unwrap();
        assert_eq!(result, json!(null));
        assert_eq!(fx.surface().list_windows(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_window_id_is_required() {
        let fx = Fixture::new().await;
        let err = fx.run("window.focus", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);

        let err = fx
            .run("window.remove", json!({"windowId": 404}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HostSurface);
    }
}
