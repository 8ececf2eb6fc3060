//! Operation routing and execution framework.
//!
//! 1. **Operations** (`operation`): typed `Operation` per declared name
//! 2. **Middleware** (`middleware`): Tower layers (load-shedding, timeout, metrics)
//! 3. **Dispatch** (`router`): `DispatchTable` from `OperationName` to handler
//! 4. **Domain handlers** (`domain`): entity events, queries, health, static resources
//! 5. **Entry point** (`dispatcher`): assigns call ids and drives the pipeline

pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod middleware;
pub mod operation;
pub mod router;

pub use config::ServerConfig;
pub use dispatcher::Dispatcher;
pub use domain::{build_dispatch_table, Collaborators};
pub use operation::{
    ArtifactRef, EntityBody, Operation, OperationContext, OperationError, OperationResponse,
    PipelineFilter, PipelineRef, PipelineRun,
};
pub use router::{DispatchTable, DispatchTableBuilder, DispatchTableError};
