//! Tower middleware layers for the operation pipeline.
//!
//! - [`instrument`]: Per-operation deadline, spans, logs, and Prometheus counters
//! - [`pipeline`]: Composes instrumentation with tower's load shedding and
//!   concurrency limit into a single service stack

pub mod instrument;
pub mod pipeline;

pub use instrument::InstrumentLayer;
pub use pipeline::{build_operation_pipeline, OperationPipeline};
