//! Shared fixtures for unit tests

use serde_json::{Map, Value};
use std::sync::Arc;
use tabwire_headless::{HeadlessSurface, StaticFetcher};
use tabwire_surface::{CreateWindow, HostSurface, TabId, WindowId};

use crate::commands::{CommandContext, CommandTable};

pub const START_URL: &str = "https://example.com/";

/// A headless surface with one focused window holding one tab at
/// [`START_URL`]
pub struct Fixture {
    pub headless: Arc<HeadlessSurface>,
    pub fetcher: Arc<StaticFetcher>,
    pub window_id: WindowId,
    pub first_tab: TabId,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_fetcher(StaticFetcher::new()).await
    }

    pub async fn with_fetcher(fetcher: StaticFetcher) -> Self {
        let fetcher = Arc::new(fetcher);
        let headless = Arc::new(HeadlessSurface::in_memory(fetcher.clone()).unwrap());
        let window = headless
            .create_window(CreateWindow::with_urls(vec![START_URL.to_string()]))
            .await
            .unwrap();
        let first_tab = window.tabs.as_ref().unwrap()[0].id;

        Self {
            headless,
            fetcher,
            window_id: window.id,
            first_tab,
        }
    }

    pub fn surface(&self) -> &dyn HostSurface {
        self.headless.as_ref()
    }

    pub fn context(&self) -> CommandContext {
        CommandContext::new(self.headless.clone())
    }

    /// Dispatch through the builtin table
    pub async fn run(&self, command: &str, args: Value) -> crate::Result<Value> {
        CommandTable::builtin()
            .dispatch(&self.context(), command, object(args))
            .await
    }
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => panic!("expected an object, got {other}"),
    }
}
