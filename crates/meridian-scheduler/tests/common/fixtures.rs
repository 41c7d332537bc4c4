//! Test fixtures for scheduler integration tests.

use meridian_proto::{
    ActorId, DriverId, ObjectId, ResourceKind, ResourceVector, TaskArg, TaskSpec,
};
use meridian_scheduler::TaskEntry;

/// Builder for queued task entries.
pub struct TaskBuilder {
    driver_id: DriverId,
    actor: Option<(ActorId, u64)>,
    cpus: f64,
    args: Vec<TaskArg>,
}

impl TaskBuilder {
    /// Creates a builder for a fresh driver, demanding one CPU.
    pub fn new() -> Self {
        Self {
            driver_id: DriverId::new(),
            actor: None,
            cpus: 1.0,
            args: Vec::new(),
        }
    }

    /// Creates a builder for an existing driver.
    pub fn for_driver(driver_id: DriverId) -> Self {
        Self {
            driver_id,
            ..Self::new()
        }
    }

    /// Sets the task's CPU demand.
    pub fn with_cpus(mut self, cpus: f64) -> Self {
        self.cpus = cpus;
        self
    }

    /// Adds a by-reference argument.
    pub fn with_object_arg(mut self, object_id: ObjectId) -> Self {
        self.args.push(TaskArg::ObjectRef(object_id));
        self
    }

    /// Adds a by-value argument.
    pub fn with_value_arg(mut self, bytes: &[u8]) -> Self {
        self.args.push(TaskArg::Value(bytes.to_vec()));
        self
    }

    /// Makes this an actor task with the given submission counter.
    pub fn on_actor(mut self, actor_id: ActorId, counter: u64) -> Self {
        self.actor = Some((actor_id, counter));
        self
    }

    /// Builds the queue entry.
    pub fn build(self) -> TaskEntry {
        let resources = ResourceVector::ZERO.with(ResourceKind::Cpu, self.cpus);
        let spec = match self.actor {
            Some((actor_id, counter)) => TaskSpec::new_actor_task(
                self.driver_id,
                actor_id,
                counter,
                resources,
                self.args,
            ),
            None => TaskSpec::new(self.driver_id, resources, self.args),
        };
        TaskEntry::new(spec, 128)
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}
