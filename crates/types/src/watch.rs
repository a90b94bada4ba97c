//! Envelope of the Kubernetes watch protocol.
//!
//! A watch response is a stream of JSON documents, one per line, each of the
//! form `{"type": "MODIFIED", "object": {...}}`. `ERROR` events carry a
//! [`ApiStatus`] instead of the watched resource.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
    Bookmark,
    Error,
}

/// A single change notification. The object stays untyped until the consumer decodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent<T = Value> {
    #[serde(rename = "type")]
    pub event_type: WatchEventType,
    pub object: T,
}

impl WatchEvent<Value> {
    /// Decode the payload of an `ERROR` event, if it looks like a `Status`.
    pub fn error_status(&self) -> Option<ApiStatus> {
        if self.event_type != WatchEventType::Error {
            return None;
        }
        serde_json::from_value(self.object.clone()).ok()
    }
}

/// Kubernetes `Status` object returned on failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub code: Option<u16>,
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = self.reason.as_deref().unwrap_or("Unknown");
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{} ({}): {}", reason, code, message),
            (None, Some(message)) => write!(f, "{}: {}", reason, message),
            (Some(code), None) => write!(f, "{} ({})", reason, code),
            (None, None) => f.write_str(reason),
        }
    }
}
