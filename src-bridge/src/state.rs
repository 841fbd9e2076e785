//! Bridge state: surface, command table and triggers wired from config

use std::sync::Arc;
use tabwire_core::triggers::{menu_items, Triggers};
use tabwire_core::{CommandContext, CommandTable, Config, Correlator, HostSurface};
use tabwire_headless::{HeadlessOptions, HeadlessSurface, HttpFetcher, PageFetcher};
use tabwire_surface::CreateWindow;

pub struct BridgeState {
    surface: Arc<HeadlessSurface>,
    correlator: Correlator,
    triggers: Triggers,
}

impl BridgeState {
    /// Open the on-disk surface described by `config`
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(
            config.fetch_timeout(),
            &config.user_agent,
        )?);
        let surface = HeadlessSurface::open(
            &config.database_path,
            fetcher,
            HeadlessOptions::with_work_area(config.display.width, config.display.height),
        )?;
        Self::with_surface(Arc::new(surface), config).await
    }

    pub async fn in_memory(fetcher: Arc<dyn PageFetcher>, config: &Config) -> anyhow::Result<Self> {
        let surface = HeadlessSurface::in_memory(fetcher)?;
        Self::with_surface(Arc::new(surface), config).await
    }

    async fn with_surface(surface: Arc<HeadlessSurface>, config: &Config) -> anyhow::Result<Self> {
        let state = Self {
            correlator: Correlator::new(
                CommandTable::builtin(),
                CommandContext::from_config(surface.clone(), config),
            ),
            triggers: Triggers::from_config(surface.clone(), config),
            surface,
        };
        state.initialize().await?;
        Ok(state)
    }

    /// Make sure there is a window to act on and announce the menu items
    async fn initialize(&self) -> anyhow::Result<()> {
        if self.surface.list_windows(false).await?.is_empty() {
            let window = self
                .surface
                .create_window(CreateWindow::default())
                .await?;
            tracing::info!(window_id = window.id, "Opened initial window");
        }

        for item in menu_items() {
            tracing::debug!(id = item.id, title = item.title, "Registered menu item");
        }
        Ok(())
    }

    pub fn surface(&self) -> &HeadlessSurface {
        &self.surface
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn triggers(&self) -> &Triggers {
        &self.triggers
    }
}
