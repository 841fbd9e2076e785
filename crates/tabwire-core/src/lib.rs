//! tabwire core
//!
//! Serves browser-control commands arriving over a framed duplex channel.
//! Every inbound envelope is dispatched through the [`CommandTable`] against
//! a [`HostSurface`](tabwire_surface::HostSurface) and answered with exactly
//! one reply carrying the same correlation id. The [`triggers`] module
//! covers the host's own entry points (menus, icon click, text entry).

pub mod commands;
mod config;
mod correlator;
mod error;
mod target;
pub mod triggers;

#[cfg(test)]
mod testing;

pub use commands::{Command, CommandContext, CommandTable};
pub use config::{Config, DisplayConfig, PopupConfig};
pub use correlator::{ChannelStats, Correlator};
pub use error::{ActiveTarget, BridgeError, TargetFailure};
pub use target::{active_tab_id, current_window_id, tab_or_active};

// Re-export the wire and surface layers
pub use tabwire_protocol::{Envelope, EnvelopeCodec, ErrorKind, Inbound};
pub use tabwire_surface::{HostSurface, SurfaceError};

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Initialize logging
///
/// Logs go to stderr: stdout carries the framed channel.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
