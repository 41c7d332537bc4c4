//! Records published to the cluster task table.

use serde::{Deserialize, Serialize};

use crate::task::TaskSpec;
use crate::types::NodeId;

/// Scheduling status of a task as recorded in the task table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Waiting for placement by the global scheduler.
    Waiting,
    /// Placed on a node but not yet queued there.
    Scheduled,
    /// Queued by the local scheduler that will run it.
    Queued,
}

/// An entry a local scheduler hands to the cluster task table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// The task specification.
    pub spec: TaskSpec,
    /// Serialised size of the spec, in bytes.
    pub spec_size: u64,
    /// Current scheduling status.
    pub status: TaskStatus,
    /// Node responsible for the task, if one has been chosen.
    pub assignee: Option<NodeId>,
}

impl TaskRecord {
    /// Creates a record for the given spec.
    #[must_use]
    pub fn new(spec: &TaskSpec, spec_size: u64, status: TaskStatus, assignee: Option<NodeId>) -> Self {
        Self {
            spec: spec.clone(),
            spec_size,
            status,
            assignee,
        }
    }
}
