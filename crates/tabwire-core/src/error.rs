//! Bridge error types

use std::fmt;
use tabwire_protocol::{CodecError, ErrorKind, RequestError};
use tabwire_surface::{SurfaceError, TabId};
use thiserror::Error;

/// Implicit target that could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveTarget {
    Tab,
    Window,
}

impl fmt::Display for ActiveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveTarget::Tab => write!(f, "Active tab not found"),
            ActiveTarget::Window => write!(f, "Current window not found"),
        }
    }
}

/// One failed element of a plural-target command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub tab_id: TabId,
    pub message: String,
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab {}: {}", self.tab_id, self.message)
    }
}

fn describe(failures: &[TargetFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid arguments for {command}: {reason}")]
    InvalidArguments { command: String, reason: String },

    #[error("{0}")]
    ActiveTargetNotFound(ActiveTarget),

    #[error("No tabs matching {0}")]
    NoMatchingTarget(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("{count} of {total} targets failed: {details}", count = .failures.len(), details = describe(.failures))]
    PartialFailure {
        total: usize,
        failures: Vec<TargetFailure>,
    },

    #[error("Command already registered: {0}")]
    DuplicateCommand(String),

    #[error("Unknown menu item: {0}")]
    UnknownMenuItem(String),

    #[error("Channel error: {0}")]
    Channel(#[from] CodecError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    pub fn invalid_arguments(command: &str, reason: impl fmt::Display) -> Self {
        BridgeError::InvalidArguments {
            command: command.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Wire discriminant for an error reply
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::UnknownCommand(_) => ErrorKind::UnknownCommand,
            BridgeError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            BridgeError::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            BridgeError::ActiveTargetNotFound(_) => ErrorKind::ActiveTargetNotFound,
            BridgeError::NoMatchingTarget(_) => ErrorKind::NoMatchingTarget,
            BridgeError::FetchFailed(_) => ErrorKind::FetchFailed,
            BridgeError::Surface(_) => ErrorKind::HostSurface,
            BridgeError::PartialFailure { .. } => ErrorKind::PartialFailure,
            BridgeError::DuplicateCommand(_)
            | BridgeError::UnknownMenuItem(_)
            | BridgeError::Channel(_)
            | BridgeError::Config(_) => ErrorKind::Internal,
        }
    }
}

impl From<RequestError> for BridgeError {
    fn from(e: RequestError) -> Self {
        BridgeError::InvalidRequest(e.to_string())
    }
}
