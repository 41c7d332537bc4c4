//! Task specifications.

use serde::{Deserialize, Serialize};

use crate::resources::{ResourceKind, ResourceVector};
use crate::types::{ActorId, DriverId, ObjectId, TaskId};

/// A single task argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TaskArg {
    /// By-reference argument naming an object the task consumes. The task
    /// cannot run until the object is present in the local store.
    ObjectRef(ObjectId),
    /// By-value argument carried inline with the spec.
    Value(Vec<u8>),
}

/// The immutable specification of a unit of work.
///
/// A spec is created once by the submitting driver or worker and then copied
/// around the cluster unchanged; the scheduler only ever reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    task_id: TaskId,
    driver_id: DriverId,
    actor_id: Option<ActorId>,
    actor_counter: u64,
    required_resources: ResourceVector,
    args: Vec<TaskArg>,
}

impl TaskSpec {
    /// Creates a spec for a plain (non-actor) task.
    #[must_use]
    pub fn new(driver_id: DriverId, required_resources: ResourceVector, args: Vec<TaskArg>) -> Self {
        Self {
            task_id: TaskId::new(),
            driver_id,
            actor_id: None,
            actor_counter: 0,
            required_resources,
            args,
        }
    }

    /// Creates a spec for a task on an actor. The counter is assigned by
    /// the submitter and determines the execution order on the actor.
    #[must_use]
    pub fn new_actor_task(
        driver_id: DriverId,
        actor_id: ActorId,
        actor_counter: u64,
        required_resources: ResourceVector,
        args: Vec<TaskArg>,
    ) -> Self {
        Self {
            task_id: TaskId::new(),
            driver_id,
            actor_id: Some(actor_id),
            actor_counter,
            required_resources,
            args,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the driver this task originated from.
    #[must_use]
    pub const fn driver_id(&self) -> DriverId {
        self.driver_id
    }

    /// Returns the actor this task runs on, if it is an actor task.
    #[must_use]
    pub const fn actor_id(&self) -> Option<ActorId> {
        self.actor_id
    }

    /// True if this task runs on an actor.
    #[must_use]
    pub const fn is_actor_task(&self) -> bool {
        self.actor_id.is_some()
    }

    /// Returns the submission counter. Only meaningful for actor tasks.
    #[must_use]
    pub const fn actor_counter(&self) -> u64 {
        self.actor_counter
    }

    /// Returns the resource demand of this task.
    #[must_use]
    pub const fn required_resources(&self) -> &ResourceVector {
        &self.required_resources
    }

    /// Returns the demand for one resource kind.
    #[must_use]
    pub fn required_resource(&self, kind: ResourceKind) -> f64 {
        self.required_resources.get(kind)
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    /// True if argument `index` is passed by reference.
    #[must_use]
    pub fn arg_by_ref(&self, index: usize) -> bool {
        matches!(self.args[index], TaskArg::ObjectRef(_))
    }

    /// Returns the object named by argument `index`, if it is by reference.
    #[must_use]
    pub fn arg_id(&self, index: usize) -> Option<ObjectId> {
        match self.args[index] {
            TaskArg::ObjectRef(object_id) => Some(object_id),
            TaskArg::Value(_) => None,
        }
    }

    /// Iterates the objects this task consumes by reference.
    pub fn object_refs(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.args.iter().filter_map(|arg| match arg {
            TaskArg::ObjectRef(object_id) => Some(*object_id),
            TaskArg::Value(_) => None,
        })
    }

    /// True if the task consumes `object_id` by reference.
    #[must_use]
    pub fn is_dependent_on(&self, object_id: ObjectId) -> bool {
        self.object_refs().any(|arg_id| arg_id == object_id)
    }
}
