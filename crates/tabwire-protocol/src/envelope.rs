//! Envelope wire type
//!
//! Inbound:  `{"id": "...", "payload": {"command": "tab.list", ...}}`
//! Outbound: `{"id": "...", "payload": <result>}` or
//!           `{"id": "...", "error": "message", "errorKind": "unknownCommand"}`

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Correlation id, echoed verbatim in the reply
    pub id: String,
    /// Command payload (inbound) or result value (outbound). A present `null`
    /// is kept as `Some(Value::Null)` so void results stay distinguishable.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        rename = "errorKind",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub error_kind: Option<ErrorKind>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Why an inbound envelope cannot be dispatched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Message has no payload")]
    MissingPayload,

    #[error("Inbound message must not carry an error")]
    UnexpectedError,

    #[error("Payload must be an object")]
    PayloadNotObject,

    #[error("Payload is missing a string \"command\" field")]
    MissingCommand,
}

/// A validated inbound request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: String,
    pub command: String,
    /// The whole payload object, `command` included
    pub args: Map<String, Value>,
}

impl Envelope {
    pub fn request(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload: Some(payload),
            error: None,
            error_kind: None,
        }
    }

    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            payload: Some(result),
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(id: impl Into<String>, message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            id: id.into(),
            payload: None,
            error: Some(message.into()),
            error_kind: Some(kind),
        }
    }

    /// A reply is well formed when exactly one of `payload`/`error` is set.
    pub fn is_well_formed_reply(&self) -> bool {
        self.payload.is_some() != self.error.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Validate an inbound envelope and split out the command name.
    pub fn into_request(self) -> Result<Request, RequestError> {
        if self.error.is_some() {
            return Err(RequestError::UnexpectedError);
        }

        let args = match self.payload {
            None => return Err(RequestError::MissingPayload),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(RequestError::PayloadNotObject),
        };

        let command = match args.get("command") {
            Some(Value::String(command)) => command.clone(),
            _ => return Err(RequestError::MissingCommand),
        };

        Ok(Request {
            id: self.id,
            command,
            args,
        })
    }
}
