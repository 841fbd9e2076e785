//! Bridge configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabwire_protocol::EnvelopeCodec;

use crate::error::BridgeError;
use crate::Result;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "TABWIRE_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the headless surface database
    pub database_path: PathBuf,
    /// Interactive page opened by the side-channel triggers
    pub terminal_page: String,
    /// Geometry of the popup opened for background text entry
    pub popup: PopupConfig,
    /// Default `maxResults` for `history.search`
    pub history_max_results: usize,
    /// Largest frame accepted on the channel
    pub max_message_bytes: usize,
    /// Largest reply written; bigger replies become error replies
    pub max_reply_bytes: usize,
    /// Timeout for in-page requests
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Work area reported by the headless surface
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    pub width: i32,
    pub height: i32,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            width: 750,
            height: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: i32,
    pub height: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("tabwire.db"),
            terminal_page: "/src/index.html".to_string(),
            popup: PopupConfig::default(),
            history_max_results: 100,
            max_message_bytes: tabwire_protocol::MAX_MESSAGE_SIZE,
            max_reply_bytes: tabwire_protocol::MAX_REPLY_SIZE,
            fetch_timeout_secs: 12,
            user_agent: format!("Mozilla/5.0 (tabwire {})", env!("CARGO_PKG_VERSION")),
            display: DisplayConfig::default(),
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("tabwire"))
            .unwrap_or_else(|| PathBuf::from(".tabwire"))
    }

    /// `$TABWIRE_CONFIG`, or `config.json` in the data directory
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::data_dir().join("config.json"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Read a config file. A missing file yields the defaults; missing
    /// fields take their default values.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(BridgeError::Config(format!("{}: {}", path.display(), e))),
        };

        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_message_bytes == 0 || self.max_reply_bytes == 0 {
            return Err(BridgeError::Config(
                "max_message_bytes and max_reply_bytes must be positive".to_string(),
            ));
        }
        if self.popup.width <= 0 || self.popup.height <= 0 {
            return Err(BridgeError::Config(
                "popup width and height must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Frame codec with both channel limits applied
    pub fn codec(&self) -> EnvelopeCodec {
        EnvelopeCodec::with_max_frame(self.max_message_bytes).with_max_reply(self.max_reply_bytes)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Platform data directory lookup
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
