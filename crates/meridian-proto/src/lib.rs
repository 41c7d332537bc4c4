//! Protocol-level types shared across Meridian node components.
//!
//! This crate defines the vocabulary that the local scheduler, the object
//! store client, and the cluster task table agree on:
//!
//! - **Identifiers**: ULID-backed IDs for tasks, objects, actors, drivers,
//!   workers, and nodes
//! - **Resources**: the fixed set of resource kinds and the vectors used for
//!   capacity accounting
//! - **Task specifications**: the immutable description of a unit of work,
//!   including its resource demand and object arguments
//! - **Task-table records**: the entries a local scheduler publishes to the
//!   cluster task table

mod error;
mod resources;
mod table;
mod task;
mod types;

// Re-export core types
pub use error::ProtoError;
pub use resources::{ResourceKind, ResourceVector};
pub use table::{TaskRecord, TaskStatus};
pub use task::{TaskArg, TaskSpec};
pub use types::{ActorId, DriverId, NodeId, ObjectId, TaskId, WorkerId};
