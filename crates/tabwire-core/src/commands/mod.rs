//! Command table
//!
//! Each command is a unit type implementing [`Command`]; the table maps the
//! exact command name to its handler. Adding a command means adding one
//! type and registering it.

mod library;
mod page;
mod tabs;
mod windows;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tabwire_surface::HostSurface;

use crate::config::Config;
use crate::error::BridgeError;
use crate::Result;

pub use library::{
    AddBookmark, ListBookmarks, ListDownloads, ListExtensions, RemoveBookmark, SearchHistory,
};
pub use page::{Fetch, GetSelection, SetSelection, TabSource};
pub use tabs::{
    CreateTabs, FocusTab, GetTab, ListTabs, PinTabs, ReloadTabs, RemoveTabs, UnpinTabs, UpdateTab,
};
pub use windows::{FocusWindow, ListWindows, OpenWindow, RemoveWindow};

/// What a command executes against
#[derive(Clone)]
pub struct CommandContext {
    surface: Arc<dyn HostSurface>,
    history_max_results: usize,
}

impl CommandContext {
    pub fn new(surface: Arc<dyn HostSurface>) -> Self {
        Self {
            surface,
            history_max_results: 100,
        }
    }

    pub fn from_config(surface: Arc<dyn HostSurface>, config: &Config) -> Self {
        Self {
            surface,
            history_max_results: config.history_max_results,
        }
    }

    pub fn surface(&self) -> &dyn HostSurface {
        self.surface.as_ref()
    }

    pub fn history_max_results(&self) -> usize {
        self.history_max_results
    }
}

#[async_trait]
pub trait Command: Send + Sync {
    /// Exact name matched against `payload.command`
    fn name(&self) -> &'static str;

    /// Run with the payload fields (including `command` itself)
    async fn execute(&self, cx: &CommandContext, args: Map<String, Value>) -> Result<Value>;
}

/// Deserialize a payload into a command's argument type
pub(crate) fn parse_args<T: DeserializeOwned>(
    command: &str,
    args: Map<String, Value>,
) -> Result<T> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| BridgeError::invalid_arguments(command, e))
}

/// Serialize a command result
pub(crate) fn to_payload<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| BridgeError::InvalidRequest(e.to_string()))
}

#[derive(Default)]
pub struct CommandTable {
    commands: HashMap<&'static str, Box<dyn Command>>,
}

impl CommandTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The full command vocabulary
    pub fn builtin() -> Self {
        let builtin: Vec<Box<dyn Command>> = vec![
            Box::new(Fetch),
            Box::new(ListTabs),
            Box::new(GetTab),
            Box::new(PinTabs),
            Box::new(UnpinTabs),
            Box::new(FocusTab),
            Box::new(RemoveTabs),
            Box::new(ReloadTabs),
            Box::new(UpdateTab),
            Box::new(CreateTabs),
            Box::new(TabSource),
            Box::new(GetSelection),
            Box::new(SetSelection),
            Box::new(ListWindows),
            Box::new(FocusWindow),
            Box::new(RemoveWindow),
            Box::new(OpenWindow),
            Box::new(ListExtensions),
            Box::new(ListBookmarks),
            Box::new(AddBookmark),
            Box::new(RemoveBookmark),
            Box::new(ListDownloads),
            Box::new(SearchHistory),
        ];

        let mut table = Self::new();
        for command in builtin {
            table.commands.insert(command.name(), command);
        }
        table
    }

    /// Add a command. Names must be unique.
    pub fn register(&mut self, command: Box<dyn Command>) -> Result<()> {
        let name = command.name();
        if self.commands.contains_key(name) {
            return Err(BridgeError::DuplicateCommand(name.to_string()));
        }
        self.commands.insert(name, command);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub async fn dispatch(
        &self,
        cx: &CommandContext,
        name: &str,
        args: Map<String, Value>,
    ) -> Result<Value> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| BridgeError::UnknownCommand(name.to_string()))?;

        command.execute(cx, args).await
    }
}
