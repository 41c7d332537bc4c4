//! Per-actor execution state.
//!
//! Each actor hosted on this node gets a queue of tasks sorted by their
//! submission counter, a single worker slot, and the count of tasks already
//! executed. Tasks dispatch strictly in counter order, so the queue front
//! runs only when its counter equals the executed count.
//!
//! Actor tasks that arrive before the cluster has told us which node hosts
//! the actor are parked in a spillover list and resubmitted on every
//! actor-creation notification.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use meridian_proto::{ActorId, WorkerId};

use crate::queues::TaskEntry;

/// State for one actor hosted on this node.
pub struct LocalActor {
    /// Number of tasks already executed on this actor. The next task to run
    /// must carry exactly this counter.
    pub(crate) task_counter: u64,
    /// Queued tasks, ascending by counter.
    pub(crate) queue: VecDeque<TaskEntry>,
    /// The worker hosting the actor, once it has registered.
    pub(crate) worker: Option<WorkerId>,
    /// True while the worker is idle and can take the next task.
    pub(crate) worker_available: bool,
}

impl LocalActor {
    /// Number of tasks already executed on this actor.
    #[must_use]
    pub fn task_counter(&self) -> u64 {
        self.task_counter
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// The worker bound to this actor, if it has registered.
    #[must_use]
    pub fn worker(&self) -> Option<WorkerId> {
        self.worker
    }

    /// True while the bound worker is idle.
    #[must_use]
    pub fn worker_available(&self) -> bool {
        self.worker_available
    }
}

/// Registry of actors hosted on this node, plus the spillover list for
/// actor tasks whose placement is not yet known.
#[derive(Default)]
pub struct ActorRegistry {
    actors: HashMap<ActorId, LocalActor>,
    cached_tasks: Vec<TaskEntry>,
}

impl ActorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for an actor, creating it if needed. The entry is
    /// created either by the first task for the actor or by the hosting
    /// worker's registration, whichever comes first; a worker passed here
    /// is bound into the entry.
    pub fn ensure(&mut self, actor_id: ActorId, worker: Option<WorkerId>) -> &mut LocalActor {
        let actor = self.actors.entry(actor_id).or_insert_with(|| {
            debug!(actor_id = %actor_id, "Creating local actor");
            LocalActor {
                task_counter: 0,
                queue: VecDeque::new(),
                worker: None,
                worker_available: false,
            }
        });
        if worker.is_some() {
            actor.worker = worker;
        }
        actor
    }

    /// Removes an actor, dropping whatever tasks were still queued.
    pub fn remove(&mut self, actor_id: ActorId) {
        let actor = self
            .actors
            .remove(&actor_id)
            .expect("removed an actor that was never created");
        if !actor.queue.is_empty() {
            warn!(
                actor_id = %actor_id,
                abandoned = actor.queue.len(),
                "Removing actor with tasks still queued"
            );
        }
    }

    /// True if the actor has an entry.
    #[must_use]
    pub fn contains(&self, actor_id: ActorId) -> bool {
        self.actors.contains_key(&actor_id)
    }

    /// Returns the entry for an actor.
    #[must_use]
    pub fn actor(&self, actor_id: ActorId) -> Option<&LocalActor> {
        self.actors.get(&actor_id)
    }

    pub(crate) fn actor_mut(&mut self, actor_id: ActorId) -> Option<&mut LocalActor> {
        self.actors.get_mut(&actor_id)
    }

    /// Inserts a task into its actor's queue, keeping the queue sorted by
    /// counter. A counter below the number of tasks already executed means
    /// the submitter replayed a task, which in-order execution cannot
    /// tolerate.
    pub fn enqueue(&mut self, actor_id: ActorId, entry: TaskEntry) {
        let counter = entry.spec.actor_counter();
        let actor = self.ensure(actor_id, None);
        assert!(
            counter >= actor.task_counter,
            "actor task counter regressed below the executed count"
        );
        // Linear from the head; quadratic when many tasks queue on one
        // actor. TODO: replace with a binary search if deep actor queues
        // show up in practice.
        let position = actor
            .queue
            .iter()
            .position(|queued| counter <= queued.spec.actor_counter())
            .unwrap_or(actor.queue.len());
        actor.queue.insert(position, entry);
    }

    /// Parks a task whose actor placement is unknown.
    pub fn cache_task(&mut self, entry: TaskEntry) {
        self.cached_tasks.push(entry);
    }

    /// Takes the parked tasks for resubmission. Resubmitting may park a
    /// task again; only the entries present at the time of the call are
    /// returned, so a replay sweep always terminates.
    pub fn take_cached_batch(&mut self) -> Vec<TaskEntry> {
        std::mem::take(&mut self.cached_tasks)
    }

    /// Number of parked tasks.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cached_tasks.len()
    }

    /// Iterates the actors hosted on this node.
    pub fn actor_ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.actors.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_proto::{DriverId, ResourceVector, TaskSpec};

    fn actor_entry(actor_id: ActorId, counter: u64) -> TaskEntry {
        TaskEntry::new(
            TaskSpec::new_actor_task(
                DriverId::new(),
                actor_id,
                counter,
                ResourceVector::ZERO,
                Vec::new(),
            ),
            64,
        )
    }

    #[test]
    fn ensure_creates_once_and_binds_worker_later() {
        let mut registry = ActorRegistry::new();
        let actor_id = ActorId::new();

        registry.ensure(actor_id, None);
        assert!(registry.contains(actor_id));
        assert_eq!(registry.actor(actor_id).unwrap().worker(), None);

        let worker_id = WorkerId::new();
        registry.ensure(actor_id, Some(worker_id));
        assert_eq!(registry.actor(actor_id).unwrap().worker(), Some(worker_id));
        assert_eq!(registry.actor(actor_id).unwrap().task_counter(), 0);
    }

    #[test]
    fn enqueue_keeps_counter_order() {
        let mut registry = ActorRegistry::new();
        let actor_id = ActorId::new();
        registry.enqueue(actor_id, actor_entry(actor_id, 2));
        registry.enqueue(actor_id, actor_entry(actor_id, 0));
        registry.enqueue(actor_id, actor_entry(actor_id, 1));

        let actor = registry.actor(actor_id).unwrap();
        let counters: Vec<u64> = actor
            .queue
            .iter()
            .map(|entry| entry.spec.actor_counter())
            .collect();
        assert_eq!(counters, vec![0, 1, 2]);
    }

    #[test]
    #[should_panic(expected = "counter regressed")]
    fn enqueue_rejects_replayed_counters() {
        let mut registry = ActorRegistry::new();
        let actor_id = ActorId::new();
        registry.ensure(actor_id, None).task_counter = 3;

        registry.enqueue(actor_id, actor_entry(actor_id, 2));
    }

    #[test]
    fn cached_batch_excludes_entries_parked_during_replay() {
        let mut registry = ActorRegistry::new();
        let actor_id = ActorId::new();
        registry.cache_task(actor_entry(actor_id, 0));
        registry.cache_task(actor_entry(actor_id, 1));

        let batch = registry.take_cached_batch();
        assert_eq!(batch.len(), 2);

        // Entries re-parked after the snapshot stay for the next sweep.
        registry.cache_task(actor_entry(actor_id, 2));
        assert_eq!(registry.cached_len(), 1);
    }

    #[test]
    fn remove_drops_queued_tasks() {
        let mut registry = ActorRegistry::new();
        let actor_id = ActorId::new();
        registry.enqueue(actor_id, actor_entry(actor_id, 0));

        registry.remove(actor_id);

        assert!(!registry.contains(actor_id));
    }
}
