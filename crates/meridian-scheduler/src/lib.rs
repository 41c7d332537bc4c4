//! Meridian local scheduler - per-node task queueing and dispatch.
//!
//! The scheduling core decides which queued task is handed to which local
//! worker, and when. It is responsible for:
//!
//! - **Two-stage admission**: tasks wait for their object dependencies, then
//!   for a worker and resources, in two separate queues
//! - **Dependency tracking**: missing objects are fetched (and periodically
//!   re-fetched) until they arrive; arrivals promote waiting tasks
//! - **Worker bookkeeping**: non-actor workers move through disjoint
//!   available/executing/blocked sets
//! - **Actor execution**: per-actor queues dispatched strictly in submission
//!   counter order, plus a spillover list for tasks whose actor placement is
//!   not yet known
//! - **Driver cancellation**: removing a driver scrubs its tasks from every
//!   queue and dependency list
//!
//! # Architecture
//!
//! The core is a single-threaded state machine embedded in the node's event
//! loop. Handlers run to completion and never block; every side effect goes
//! through the [`LocalNode`] seam, whose completions come back as further
//! [`SchedulerEvent`]s. There are no locks and no suspension points.
//!
//! # Example
//!
//! ```
//! use meridian_scheduler::{InMemoryNode, SchedulerCore, SchedulerEvent};
//!
//! let mut node = InMemoryNode::default();
//! let mut core = SchedulerCore::default();
//! core.handle(&mut node, SchedulerEvent::FetchTick);
//! ```

pub mod actors;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod node;
pub mod objects;
pub mod pool;
pub mod queues;

// Re-export main types
pub use config::SchedulerConfig;
pub use engine::{SchedulerCore, SchedulerInfo};
pub use error::{Result, SchedulerError};
pub use events::SchedulerEvent;
pub use node::{InMemoryNode, LocalNode, WorkerInfo};
pub use queues::{Lane, TaskEntry, TaskKey};
