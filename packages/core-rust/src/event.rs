//! Entity lifecycle events and the message builder that shapes them.
//!
//! Every mutating operation produces exactly one [`EntityEvent`]. The builder
//! is a pure function: it starts from the caller-supplied body (if any) and
//! overlays the identifying fields taken from the request path, so identity
//! supplied by the path always wins over identically-named body fields.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// EventType
// ---------------------------------------------------------------------------

/// Fixed vocabulary of entity event types carried as the broker message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "pipeline/create")]
    PipelineCreate,
    #[serde(rename = "pipeline/delete")]
    PipelineDelete,
    #[serde(rename = "pipeline/start")]
    PipelineStart,
    #[serde(rename = "pipeline/stop")]
    PipelineStop,
    #[serde(rename = "resource-provider/create")]
    ResourceProviderCreate,
    #[serde(rename = "resource-provider/delete")]
    ResourceProviderDelete,
    #[serde(rename = "artifact-store/create")]
    ArtifactStoreCreate,
    #[serde(rename = "artifact-store/delete")]
    ArtifactStoreDelete,
}

impl EventType {
    /// The complete vocabulary.
    pub const ALL: [EventType; 8] = [
        Self::PipelineCreate,
        Self::PipelineDelete,
        Self::PipelineStart,
        Self::PipelineStop,
        Self::ResourceProviderCreate,
        Self::ResourceProviderDelete,
        Self::ArtifactStoreCreate,
        Self::ArtifactStoreDelete,
    ];

    /// Wire label, e.g. `"pipeline/stop"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PipelineCreate => "pipeline/create",
            Self::PipelineDelete => "pipeline/delete",
            Self::PipelineStart => "pipeline/start",
            Self::PipelineStop => "pipeline/stop",
            Self::ResourceProviderCreate => "resource-provider/create",
            Self::ResourceProviderDelete => "resource-provider/delete",
            Self::ArtifactStoreCreate => "artifact-store/create",
            Self::ArtifactStoreDelete => "artifact-store/delete",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityParams
// ---------------------------------------------------------------------------

/// Identifying fields taken from the request path.
///
/// Pipelines are addressed by `group` + `name` (plus a run `number` when
/// stopping); resource providers and artifact stores by `name` alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityParams {
    pub name: String,
    pub group: Option<String>,
    pub number: Option<u64>,
}

impl EntityParams {
    /// Parameters addressing a pipeline.
    #[must_use]
    pub fn pipeline(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: Some(group.into()),
            number: None,
        }
    }

    /// Parameters addressing a single run of a pipeline.
    #[must_use]
    pub fn pipeline_run(group: impl Into<String>, name: impl Into<String>, number: u64) -> Self {
        Self {
            number: Some(number),
            ..Self::pipeline(group, name)
        }
    }

    /// Parameters addressing a named entity (resource provider, artifact store).
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            number: None,
        }
    }

    /// Overlays the identifying fields onto `payload` in the order
    /// `name`, `group`, `number`. Existing keys are replaced.
    fn overlay(self, payload: &mut Map<String, Value>) {
        payload.insert("name".to_string(), Value::String(self.name));
        if let Some(group) = self.group {
            payload.insert("group".to_string(), Value::String(group));
        }
        if let Some(number) = self.number {
            payload.insert("number".to_string(), Value::from(number));
        }
    }
}

// ---------------------------------------------------------------------------
// EntityEvent
// ---------------------------------------------------------------------------

/// A message bound for the broker's entity channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEvent {
    /// Message type attribute the consumers route on.
    pub event_type: EventType,
    /// JSON object sent as the message body.
    pub payload: Map<String, Value>,
}

impl EntityEvent {
    /// Builds the event for `event_type`.
    ///
    /// The payload starts as `body` (or empty) and is overlaid with `params`;
    /// the overlay always wins on key collision. Never fails.
    #[must_use]
    pub fn build(
        event_type: EventType,
        params: EntityParams,
        body: Option<Map<String, Value>>,
    ) -> Self {
        let mut payload = body.unwrap_or_default();
        params.overlay(&mut payload);
        Self {
            event_type,
            payload,
        }
    }

    /// JSON encoding of the payload, as published on the wire.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        Value::Object(self.payload.clone()).to_string().into_bytes()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
