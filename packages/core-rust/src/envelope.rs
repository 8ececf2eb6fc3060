//! The `{"message": ...}` reply envelope shared by every JSON response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of every JSON reply: a single `message` field carrying either a
/// human-readable string or structured content relayed from downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message: Value,
}

impl MessageEnvelope {
    /// Envelope carrying arbitrary JSON content.
    #[must_use]
    pub fn new(message: impl Into<Value>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Envelope carrying a plain text message.
    #[must_use]
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: Value::String(message.into()),
        }
    }
}
