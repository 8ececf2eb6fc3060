//! Typed operations, responses, and errors flowing through the dispatch pipeline.

use bob_core::OperationName;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::health::HealthReport;
use crate::query::QueryError;

/// Optional caller-supplied JSON object merged into an entity event.
pub type EntityBody = Option<Map<String, Value>>;

// ---------------------------------------------------------------------------
// OperationContext
// ---------------------------------------------------------------------------

/// Context carried with every operation through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    /// Process-unique, monotonically increasing identifier.
    pub call_id: u64,
    /// Deadline enforced by the timeout middleware.
    pub call_timeout_ms: u64,
    /// The `x-request-id` of the inbound HTTP request, when there is one.
    pub request_id: Option<String>,
}

impl OperationContext {
    #[must_use]
    pub fn new(call_id: u64, call_timeout_ms: u64) -> Self {
        Self {
            call_id,
            call_timeout_ms,
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Identifies a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineRef {
    pub group: String,
    pub name: String,
}

/// Identifies one run of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineRun {
    pub group: String,
    pub name: String,
    pub number: u64,
}

/// Optional filters for listing pipelines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PipelineFilter {
    pub group: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

/// Locates an artifact produced by a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactRef {
    pub group: String,
    pub name: String,
    pub number: u64,
    pub store: String,
    pub artifact: String,
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// One declared API operation with its parameters.
///
/// Variants mirror [`OperationName`] one to one.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    HealthCheck {
        ctx: OperationContext,
    },
    GetApiSpec {
        ctx: OperationContext,
    },
    PipelineCreate {
        ctx: OperationContext,
        pipeline: PipelineRef,
        body: EntityBody,
    },
    PipelineDelete {
        ctx: OperationContext,
        pipeline: PipelineRef,
    },
    PipelineStart {
        ctx: OperationContext,
        pipeline: PipelineRef,
    },
    PipelineStop {
        ctx: OperationContext,
        run: PipelineRun,
    },
    PipelineLogs {
        ctx: OperationContext,
        run: PipelineRun,
        offset: u64,
        lines: u64,
    },
    PipelineStatus {
        ctx: OperationContext,
        run: PipelineRun,
    },
    PipelineList {
        ctx: OperationContext,
        filter: PipelineFilter,
    },
    PipelineArtifactFetch {
        ctx: OperationContext,
        artifact: ArtifactRef,
    },
    ResourceProviderCreate {
        ctx: OperationContext,
        name: String,
        body: EntityBody,
    },
    ResourceProviderDelete {
        ctx: OperationContext,
        name: String,
    },
    ResourceProviderList {
        ctx: OperationContext,
    },
    ArtifactStoreCreate {
        ctx: OperationContext,
        name: String,
        body: EntityBody,
    },
    ArtifactStoreDelete {
        ctx: OperationContext,
        name: String,
    },
    ArtifactStoreList {
        ctx: OperationContext,
    },
    CCTray {
        ctx: OperationContext,
    },
}

impl Operation {
    /// Returns the operation context.
    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Self::HealthCheck { ctx }
            | Self::GetApiSpec { ctx }
            | Self::PipelineCreate { ctx, .. }
            | Self::PipelineDelete { ctx, .. }
            | Self::PipelineStart { ctx, .. }
            | Self::PipelineStop { ctx, .. }
            | Self::PipelineLogs { ctx, .. }
            | Self::PipelineStatus { ctx, .. }
            | Self::PipelineList { ctx, .. }
            | Self::PipelineArtifactFetch { ctx, .. }
            | Self::ResourceProviderCreate { ctx, .. }
            | Self::ResourceProviderDelete { ctx, .. }
            | Self::ResourceProviderList { ctx }
            | Self::ArtifactStoreCreate { ctx, .. }
            | Self::ArtifactStoreDelete { ctx, .. }
            | Self::ArtifactStoreList { ctx }
            | Self::CCTray { ctx } => ctx,
        }
    }

    /// The declared name this operation is dispatched by.
    #[must_use]
    pub fn name(&self) -> OperationName {
        match self {
            Self::HealthCheck { .. } => OperationName::HealthCheck,
            Self::GetApiSpec { .. } => OperationName::GetApiSpec,
            Self::PipelineCreate { .. } => OperationName::PipelineCreate,
            Self::PipelineDelete { .. } => OperationName::PipelineDelete,
            Self::PipelineStart { .. } => OperationName::PipelineStart,
            Self::PipelineStop { .. } => OperationName::PipelineStop,
            Self::PipelineLogs { .. } => OperationName::PipelineLogs,
            Self::PipelineStatus { .. } => OperationName::PipelineStatus,
            Self::PipelineList { .. } => OperationName::PipelineList,
            Self::PipelineArtifactFetch { .. } => OperationName::PipelineArtifactFetch,
            Self::ResourceProviderCreate { .. } => OperationName::ResourceProviderCreate,
            Self::ResourceProviderDelete { .. } => OperationName::ResourceProviderDelete,
            Self::ResourceProviderList { .. } => OperationName::ResourceProviderList,
            Self::ArtifactStoreCreate { .. } => OperationName::ArtifactStoreCreate,
            Self::ArtifactStoreDelete { .. } => OperationName::ArtifactStoreDelete,
            Self::ArtifactStoreList { .. } => OperationName::ArtifactStoreList,
            Self::CCTray { .. } => OperationName::CCTray,
        }
    }
}

// ---------------------------------------------------------------------------
// OperationResponse / OperationError
// ---------------------------------------------------------------------------

/// Successful outcome of an operation handler.
#[derive(Debug)]
pub enum OperationResponse {
    /// Rendered as `{"message": ...}`.
    Message(Value),
    /// Composite dependency check.
    Health(HealthReport),
    /// Raw document served with the given content type.
    Document {
        content_type: &'static str,
        body: Bytes,
    },
    /// File streamed to the caller as an attachment.
    File {
        file_name: String,
        file: tokio::fs::File,
    },
}

/// Errors returned by operation handlers and middleware.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("no handler bound for operation {name}")]
    UnknownOperation { name: OperationName },
    #[error("operation {name} routed to the wrong handler")]
    WrongHandler { name: OperationName },
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error(transparent)]
    Downstream(#[from] QueryError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl OperationError {
    /// Short label used for the `outcome` of failed operations in logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownOperation { .. } => "unknown_operation",
            Self::WrongHandler { .. } => "wrong_handler",
            Self::Timeout { .. } => "timeout",
            Self::Overloaded => "overloaded",
            Self::Downstream(_) => "downstream",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
