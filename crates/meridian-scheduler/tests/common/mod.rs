//! Common test utilities for scheduler integration tests.

pub mod fixtures;

use meridian_proto::{ActorId, TaskId, WorkerId};
use meridian_scheduler::{InMemoryNode, SchedulerCore};

/// Scheduling core wired to a recording in-memory node.
pub struct TestNode {
    pub core: SchedulerCore,
    pub node: InMemoryNode,
}

impl TestNode {
    /// Creates a core and a node with the given CPU capacity. The node is
    /// connected to the object store and the task table; no global
    /// scheduler exists.
    pub fn with_cpus(cpus: f64) -> Self {
        Self {
            core: SchedulerCore::default(),
            node: InMemoryNode::with_cpus(cpus),
        }
    }

    /// Registers a plain worker and reports it available.
    pub fn register_worker(&mut self) -> WorkerId {
        let worker_id = self.node.add_worker();
        self.core.on_worker_available(&mut self.node, worker_id);
        worker_id
    }

    /// Maps an actor to this node, connects its hosting worker, and reports
    /// the worker idle.
    pub fn register_actor(&mut self, actor_id: ActorId) -> WorkerId {
        let node_id = self.node.node_id.expect("test node has an id");
        self.node.actor_mapping.insert(actor_id, node_id);
        let worker_id = self.node.add_actor_worker(actor_id);
        self.core
            .on_actor_worker_connect(&mut self.node, actor_id, worker_id);
        self.core.on_actor_worker_available(&mut self.node, worker_id);
        worker_id
    }

    /// Reports an actor worker idle again after it finished a task.
    pub fn actor_worker_done(&mut self, worker_id: WorkerId) {
        self.node.finish_task(worker_id);
        self.core.on_actor_worker_available(&mut self.node, worker_id);
    }

    /// Task ids assigned to workers so far, in assignment order.
    pub fn assigned_task_ids(&self) -> Vec<TaskId> {
        self.node
            .assignments
            .iter()
            .map(|(_, entry)| entry.spec.task_id())
            .collect()
    }
}

impl Default for TestNode {
    fn default() -> Self {
        Self::with_cpus(1.0)
    }
}
