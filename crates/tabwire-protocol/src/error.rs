//! Wire-level error discriminant

use serde::{Deserialize, Serialize};

/// Coarse classification carried next to the free-text `error` of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    UnknownCommand,
    InvalidRequest,
    InvalidArguments,
    ActiveTargetNotFound,
    NoMatchingTarget,
    FetchFailed,
    HostSurface,
    PartialFailure,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownCommand => "unknownCommand",
            ErrorKind::InvalidRequest => "invalidRequest",
            ErrorKind::InvalidArguments => "invalidArguments",
            ErrorKind::ActiveTargetNotFound => "activeTargetNotFound",
            ErrorKind::NoMatchingTarget => "noMatchingTarget",
            ErrorKind::FetchFailed => "fetchFailed",
            ErrorKind::HostSurface => "hostSurface",
            ErrorKind::PartialFailure => "partialFailure",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
