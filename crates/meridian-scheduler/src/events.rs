//! Inbound events handled by the scheduling core.

use meridian_proto::{ActorId, DriverId, ObjectId, WorkerId};

use crate::queues::TaskEntry;

/// An event delivered to the scheduling core by the node's event loop.
///
/// Events are handled to completion, in arrival order; the core never
/// reorders them.
#[derive(Clone, Debug)]
pub enum SchedulerEvent {
    /// A worker on this node submitted a task.
    TaskSubmitted(TaskEntry),
    /// The global scheduler assigned a task to this node.
    TaskScheduled(TaskEntry),
    /// A worker on this node submitted an actor task.
    ActorTaskSubmitted(TaskEntry),
    /// An actor task was assigned to this node through the task table.
    ActorTaskScheduled(TaskEntry),
    /// The cluster published a new actor-to-node mapping.
    ActorCreated(ActorId),
    /// A plain worker registered, or finished its task.
    WorkerAvailable(WorkerId),
    /// A worker disconnected.
    WorkerRemoved(WorkerId),
    /// The worker hosting an actor registered with this node.
    ActorWorkerConnected {
        /// The hosted actor.
        actor_id: ActorId,
        /// The registering worker.
        worker_id: WorkerId,
    },
    /// The worker hosting an actor disconnected.
    ActorWorkerDisconnected(ActorId),
    /// An actor worker finished a task.
    ActorWorkerAvailable(WorkerId),
    /// An executing worker suspended itself on a missing object.
    WorkerBlocked(WorkerId),
    /// A blocked worker resumed execution.
    WorkerUnblocked(WorkerId),
    /// An object became available in the local store.
    ObjectAvailable(ObjectId),
    /// An object was evicted from the local store.
    ObjectRemoved(ObjectId),
    /// A driver exited; all of its queued work is cancelled.
    DriverRemoved(DriverId),
    /// Periodic fetch retry tick.
    FetchTick,
}
