//! Seam between the scheduling core and the node that embeds it.
//!
//! The core is a pure state machine; the object store client, the cluster
//! task table, worker control, and the node-level scheduler state all sit
//! behind [`LocalNode`]. Calls are fire-and-forget: completions come back
//! as further scheduler events.

use std::collections::HashMap;

use meridian_proto::{ActorId, NodeId, ObjectId, ResourceVector, TaskRecord, WorkerId};

use crate::queues::TaskEntry;

/// A worker process as observed by the core.
///
/// The embedding node owns and mutates these fields; the core only reads
/// them.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerInfo {
    /// The actor this worker hosts, if any.
    pub actor_id: Option<ActorId>,
    /// True while the worker has an assigned task it has not finished.
    pub task_in_progress: bool,
}

/// Everything the scheduling core needs from the embedding node.
pub trait LocalNode {
    /// True when the connection to the object store manager is up.
    fn object_store_connected(&self) -> bool;

    /// Asks the object store to fetch the given objects from remote nodes.
    fn fetch_objects(&mut self, object_ids: &[ObjectId]);

    /// Asks for an object to be rebuilt by re-executing its producing task.
    fn reconstruct_object(&mut self, object_id: ObjectId);

    /// Identity of this node in the cluster, if the task table is connected.
    fn node_id(&self) -> Option<NodeId>;

    /// Adds a new entry to the cluster task table.
    fn task_table_add(&mut self, record: TaskRecord);

    /// Updates an existing entry in the cluster task table.
    fn task_table_update(&mut self, record: TaskRecord);

    /// Hands a task to a worker for execution. The node acquires the task's
    /// dynamic resources as part of the assignment.
    fn assign_task(&mut self, worker_id: WorkerId, entry: &TaskEntry);

    /// Starts a new worker process. `None` starts a plain worker, `Some`
    /// one that will host the given actor.
    fn start_worker(&mut self, actor_id: Option<ActorId>);

    /// Total resources configured on this node.
    fn static_resources(&self) -> ResourceVector;

    /// Resources currently unclaimed by executing tasks.
    fn dynamic_resources(&self) -> ResourceVector;

    /// True when a global scheduler participates in placement.
    fn global_scheduler_exists(&self) -> bool;

    /// Node responsible for an actor, per the cluster actor mapping.
    fn actor_owner(&self, actor_id: ActorId) -> Option<NodeId>;

    /// Worker processes started but not yet registered.
    fn pending_worker_starts(&self) -> usize;

    /// Observed state of a registered worker.
    fn worker(&self, worker_id: WorkerId) -> Option<WorkerInfo>;
}

/// In-memory [`LocalNode`] that records every outbound call.
///
/// Used by the integration tests, and usable for embedding the core without
/// a live cluster.
#[derive(Default)]
pub struct InMemoryNode {
    /// Whether the object store connection is up.
    pub connected: bool,
    /// This node's identity; `None` simulates a missing table connection.
    pub node_id: Option<NodeId>,
    /// Whether a global scheduler exists in the cluster.
    pub global_scheduler: bool,
    /// Configured node resources.
    pub static_resources: ResourceVector,
    /// Currently unclaimed resources.
    pub dynamic_resources: ResourceVector,
    /// Cluster actor mapping as known to this node.
    pub actor_mapping: HashMap<ActorId, NodeId>,
    /// Registered workers.
    pub workers: HashMap<WorkerId, WorkerInfo>,
    /// Worker processes started but not yet registered.
    pub pending_worker_starts: usize,

    /// Recorded `fetch_objects` calls.
    pub fetches: Vec<Vec<ObjectId>>,
    /// Recorded `reconstruct_object` calls.
    pub reconstructions: Vec<ObjectId>,
    /// Recorded `task_table_add` calls.
    pub table_adds: Vec<TaskRecord>,
    /// Recorded `task_table_update` calls.
    pub table_updates: Vec<TaskRecord>,
    /// Recorded `assign_task` calls.
    pub assignments: Vec<(WorkerId, TaskEntry)>,
    /// Recorded `start_worker` calls.
    pub worker_starts: Vec<Option<ActorId>>,
}

impl InMemoryNode {
    /// Creates a node connected to the object store and the task table,
    /// with the given CPU capacity.
    #[must_use]
    pub fn with_cpus(cpus: f64) -> Self {
        use meridian_proto::ResourceKind;
        Self {
            connected: true,
            node_id: Some(NodeId::new()),
            static_resources: ResourceVector::ZERO.with(ResourceKind::Cpu, cpus),
            dynamic_resources: ResourceVector::ZERO.with(ResourceKind::Cpu, cpus),
            ..Self::default()
        }
    }

    /// Registers a plain worker, as the registration path of the embedding
    /// node would.
    pub fn add_worker(&mut self) -> WorkerId {
        let worker_id = WorkerId::new();
        self.workers.insert(worker_id, WorkerInfo::default());
        self.pending_worker_starts = self.pending_worker_starts.saturating_sub(1);
        worker_id
    }

    /// Registers a worker hosting the given actor.
    pub fn add_actor_worker(&mut self, actor_id: ActorId) -> WorkerId {
        let worker_id = WorkerId::new();
        self.workers.insert(
            worker_id,
            WorkerInfo {
                actor_id: Some(actor_id),
                task_in_progress: false,
            },
        );
        worker_id
    }

    /// Marks a worker's current task finished and releases the resources it
    /// held.
    pub fn finish_task(&mut self, worker_id: WorkerId) {
        if let Some(worker) = self.workers.get_mut(&worker_id) {
            worker.task_in_progress = false;
        }
        let released = self
            .assignments
            .iter()
            .rev()
            .find(|(assignee, _)| *assignee == worker_id)
            .map(|(_, entry)| *entry.spec.required_resources());
        if let Some(required) = released {
            self.dynamic_resources.release(&required);
        }
    }
}

impl LocalNode for InMemoryNode {
    fn object_store_connected(&self) -> bool {
        self.connected
    }

    fn fetch_objects(&mut self, object_ids: &[ObjectId]) {
        self.fetches.push(object_ids.to_vec());
    }

    fn reconstruct_object(&mut self, object_id: ObjectId) {
        self.reconstructions.push(object_id);
    }

    fn node_id(&self) -> Option<NodeId> {
        self.node_id
    }

    fn task_table_add(&mut self, record: TaskRecord) {
        self.table_adds.push(record);
    }

    fn task_table_update(&mut self, record: TaskRecord) {
        self.table_updates.push(record);
    }

    fn assign_task(&mut self, worker_id: WorkerId, entry: &TaskEntry) {
        self.dynamic_resources.acquire(entry.spec.required_resources());
        if let Some(worker) = self.workers.get_mut(&worker_id) {
            worker.task_in_progress = true;
        }
        self.assignments.push((worker_id, entry.clone()));
    }

    fn start_worker(&mut self, actor_id: Option<ActorId>) {
        self.pending_worker_starts += 1;
        self.worker_starts.push(actor_id);
    }

    fn static_resources(&self) -> ResourceVector {
        self.static_resources
    }

    fn dynamic_resources(&self) -> ResourceVector {
        self.dynamic_resources
    }

    fn global_scheduler_exists(&self) -> bool {
        self.global_scheduler
    }

    fn actor_owner(&self, actor_id: ActorId) -> Option<NodeId> {
        self.actor_mapping.get(&actor_id).copied()
    }

    fn pending_worker_starts(&self) -> usize {
        self.pending_worker_starts
    }

    fn worker(&self, worker_id: WorkerId) -> Option<WorkerInfo> {
        self.workers.get(&worker_id).copied()
    }
}
