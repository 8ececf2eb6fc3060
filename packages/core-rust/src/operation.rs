//! The declared API operation vocabulary.
//!
//! Every capability the gateway exposes is identified by an [`OperationName`]
//! whose string form is the operation identifier from the API contract
//! (e.g. `"PipelineCreate"`). The set is closed: the HTTP layer only ever
//! constructs names from this enum, so an unknown name can never reach the
//! dispatch table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::event::EventType;

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// Broad category of an operation, deciding which collaborator serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Entity lifecycle change, published to the broker and acknowledged immediately.
    Mutation,
    /// Read forwarded to the downstream query service.
    Query,
    /// Composite dependency health check.
    Health,
    /// Static resource served from disk (API document, artifact file).
    Static,
}

impl OperationKind {
    /// Lowercase label used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mutation => "mutation",
            Self::Query => "query",
            Self::Health => "health",
            Self::Static => "static",
        }
    }
}

// ---------------------------------------------------------------------------
// OperationName
// ---------------------------------------------------------------------------

/// Identifier of one declared API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationName {
    HealthCheck,
    GetApiSpec,
    PipelineCreate,
    PipelineDelete,
    PipelineStart,
    PipelineStop,
    PipelineLogs,
    PipelineStatus,
    PipelineList,
    PipelineArtifactFetch,
    ResourceProviderCreate,
    ResourceProviderDelete,
    ResourceProviderList,
    ArtifactStoreCreate,
    ArtifactStoreDelete,
    ArtifactStoreList,
    CCTray,
}

impl OperationName {
    /// Every declared operation, in contract order.
    pub const ALL: [OperationName; 17] = [
        Self::HealthCheck,
        Self::GetApiSpec,
        Self::PipelineCreate,
        Self::PipelineDelete,
        Self::PipelineStart,
        Self::PipelineStop,
        Self::PipelineLogs,
        Self::PipelineStatus,
        Self::PipelineList,
        Self::PipelineArtifactFetch,
        Self::ResourceProviderCreate,
        Self::ResourceProviderDelete,
        Self::ResourceProviderList,
        Self::ArtifactStoreCreate,
        Self::ArtifactStoreDelete,
        Self::ArtifactStoreList,
        Self::CCTray,
    ];

    /// The contract identifier, identical to the variant name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HealthCheck => "HealthCheck",
            Self::GetApiSpec => "GetApiSpec",
            Self::PipelineCreate => "PipelineCreate",
            Self::PipelineDelete => "PipelineDelete",
            Self::PipelineStart => "PipelineStart",
            Self::PipelineStop => "PipelineStop",
            Self::PipelineLogs => "PipelineLogs",
            Self::PipelineStatus => "PipelineStatus",
            Self::PipelineList => "PipelineList",
            Self::PipelineArtifactFetch => "PipelineArtifactFetch",
            Self::ResourceProviderCreate => "ResourceProviderCreate",
            Self::ResourceProviderDelete => "ResourceProviderDelete",
            Self::ResourceProviderList => "ResourceProviderList",
            Self::ArtifactStoreCreate => "ArtifactStoreCreate",
            Self::ArtifactStoreDelete => "ArtifactStoreDelete",
            Self::ArtifactStoreList => "ArtifactStoreList",
            Self::CCTray => "CCTray",
        }
    }

    /// Which collaborator serves this operation.
    #[must_use]
    pub fn kind(self) -> OperationKind {
        match self {
            Self::HealthCheck => OperationKind::Health,
            Self::GetApiSpec | Self::PipelineArtifactFetch => OperationKind::Static,
            Self::PipelineLogs
            | Self::PipelineStatus
            | Self::PipelineList
            | Self::ResourceProviderList
            | Self::ArtifactStoreList
            | Self::CCTray => OperationKind::Query,
            Self::PipelineCreate
            | Self::PipelineDelete
            | Self::PipelineStart
            | Self::PipelineStop
            | Self::ResourceProviderCreate
            | Self::ResourceProviderDelete
            | Self::ArtifactStoreCreate
            | Self::ArtifactStoreDelete => OperationKind::Mutation,
        }
    }

    /// The broker event type emitted by this operation, if it is a mutation.
    #[must_use]
    pub fn event_type(self) -> Option<EventType> {
        match self {
            Self::PipelineCreate => Some(EventType::PipelineCreate),
            Self::PipelineDelete => Some(EventType::PipelineDelete),
            Self::PipelineStart => Some(EventType::PipelineStart),
            Self::PipelineStop => Some(EventType::PipelineStop),
            Self::ResourceProviderCreate => Some(EventType::ResourceProviderCreate),
            Self::ResourceProviderDelete => Some(EventType::ResourceProviderDelete),
            Self::ArtifactStoreCreate => Some(EventType::ArtifactStoreCreate),
            Self::ArtifactStoreDelete => Some(EventType::ArtifactStoreDelete),
            _ => None,
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a declared operation identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for OperationName {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
