//! Bob Core: operation vocabulary, entity lifecycle events, and the JSON
//! response envelope shared by the API server.

pub mod envelope;
pub mod event;
pub mod operation;

pub use envelope::MessageEnvelope;
pub use event::{EntityEvent, EntityParams, EventType};
pub use operation::{OperationKind, OperationName, UnknownOperation};
