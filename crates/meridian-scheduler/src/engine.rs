//! The scheduling engine: event handlers gluing the queues, the object
//! tracker, the worker pool, and the actor registry together.

use std::time::Duration;

use tracing::{debug, info, warn};

use meridian_proto::{ActorId, DriverId, NodeId, ObjectId, TaskRecord, TaskStatus, WorkerId};

use crate::actors::ActorRegistry;
use crate::config::SchedulerConfig;
use crate::events::SchedulerEvent;
use crate::node::LocalNode;
use crate::objects::ObjectTracker;
use crate::pool::WorkerPool;
use crate::queues::{Lane, TaskEntry, TaskQueues};

/// Snapshot of core state, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerInfo {
    /// Tasks waiting on object dependencies.
    pub waiting_tasks: usize,
    /// Tasks awaiting a worker and resources.
    pub dispatch_tasks: usize,
    /// Idle workers.
    pub available_workers: usize,
    /// Workers executing a task.
    pub executing_workers: usize,
    /// Workers suspended on a missing object.
    pub blocked_workers: usize,
}

/// The local scheduling core.
///
/// One instance lives inside each node's event loop. Every handler runs to
/// completion; side effects go through the [`LocalNode`] seam and their
/// completions come back as further [`SchedulerEvent`]s.
pub struct SchedulerCore {
    config: SchedulerConfig,
    queues: TaskQueues,
    objects: ObjectTracker,
    pool: WorkerPool,
    actors: ActorRegistry,
}

impl Default for SchedulerCore {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl SchedulerCore {
    /// Creates a core with the given configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            queues: TaskQueues::new(),
            objects: ObjectTracker::new(),
            pool: WorkerPool::new(),
            actors: ActorRegistry::new(),
        }
    }

    /// Dispatches one event to its handler.
    pub fn handle(&mut self, node: &mut dyn LocalNode, event: SchedulerEvent) {
        match event {
            SchedulerEvent::TaskSubmitted(entry) => self.on_task_submitted(node, entry),
            SchedulerEvent::TaskScheduled(entry) => self.on_task_scheduled(node, entry),
            SchedulerEvent::ActorTaskSubmitted(entry) => self.on_actor_task_submitted(node, entry),
            SchedulerEvent::ActorTaskScheduled(entry) => self.on_actor_task_scheduled(node, entry),
            SchedulerEvent::ActorCreated(actor_id) => {
                self.on_actor_creation_notification(node, actor_id);
            }
            SchedulerEvent::WorkerAvailable(worker_id) => self.on_worker_available(node, worker_id),
            SchedulerEvent::WorkerRemoved(worker_id) => self.on_worker_removed(node, worker_id),
            SchedulerEvent::ActorWorkerConnected { actor_id, worker_id } => {
                self.on_actor_worker_connect(node, actor_id, worker_id);
            }
            SchedulerEvent::ActorWorkerDisconnected(actor_id) => {
                self.on_actor_worker_disconnect(actor_id);
            }
            SchedulerEvent::ActorWorkerAvailable(worker_id) => {
                self.on_actor_worker_available(node, worker_id);
            }
            SchedulerEvent::WorkerBlocked(worker_id) => self.on_worker_blocked(node, worker_id),
            SchedulerEvent::WorkerUnblocked(worker_id) => self.on_worker_unblocked(worker_id),
            SchedulerEvent::ObjectAvailable(object_id) => {
                self.on_object_available(node, object_id);
            }
            SchedulerEvent::ObjectRemoved(object_id) => self.on_object_removed(node, object_id),
            SchedulerEvent::DriverRemoved(driver_id) => self.on_driver_removed(driver_id),
            SchedulerEvent::FetchTick => {
                self.on_fetch_tick(node);
            }
        }
    }

    /// A worker on this node submitted a task.
    pub fn on_task_submitted(&mut self, node: &mut dyn LocalNode, entry: TaskEntry) {
        // If the task's constraints are satisfied, its dependencies are
        // local, and a worker is free, admit it to the dispatch queue
        // directly. Otherwise let the global scheduler place it.
        if self.resource_constraints_satisfied(node, &entry)
            && self.pool.available_len() > 0
            && self.objects.can_run(&entry.spec)
        {
            self.queue_dispatch_task(node, entry, false);
        } else {
            self.give_task_to_global_scheduler(node, entry);
        }

        // The queue may have grown.
        self.dispatch_tasks(node);
    }

    /// The global scheduler assigned a task to this node.
    pub fn on_task_scheduled(&mut self, node: &mut dyn LocalNode, entry: TaskEntry) {
        debug_assert!(node.node_id().is_some());
        debug_assert!(node.global_scheduler_exists());
        self.queue_task_locally(node, entry, true);
        self.dispatch_tasks(node);
    }

    /// A worker on this node submitted an actor task.
    pub fn on_actor_task_submitted(&mut self, node: &mut dyn LocalNode, entry: TaskEntry) {
        let actor_id = entry
            .spec
            .actor_id()
            .expect("actor task submitted without an actor id");

        match node.actor_owner(actor_id) {
            None => {
                // We do not yet know which node hosts this actor. Park the
                // task; it is resubmitted on the next actor-creation
                // notification.
                self.actors.cache_task(entry);
            }
            Some(owner) if Some(owner) == node.node_id() => {
                self.add_task_to_actor_queue(node, entry, false);
                self.dispatch_actor_task(node, actor_id);
            }
            Some(owner) => {
                self.give_task_to_local_scheduler(node, entry, owner);
            }
        }
    }

    /// An actor task was assigned to this node through the task table.
    pub fn on_actor_task_scheduled(&mut self, node: &mut dyn LocalNode, entry: TaskEntry) {
        debug_assert!(node.node_id().is_some());
        debug_assert!(node.global_scheduler_exists());
        let actor_id = entry
            .spec
            .actor_id()
            .expect("actor task scheduled without an actor id");

        match node.actor_owner(actor_id) {
            Some(owner) => debug_assert!(
                Some(owner) == node.node_id(),
                "scheduled actor task for an actor hosted elsewhere"
            ),
            None => {
                // The task raced ahead of the actor-creation notification.
                info!(
                    actor_id = %actor_id,
                    "Actor task scheduled before the actor creation notification; this should be rare"
                );
            }
        }
        self.add_task_to_actor_queue(node, entry, true);
        // Without the mapping the dispatch precondition cannot be checked;
        // the queued task dispatches once the hosting worker reports in.
        if node.actor_owner(actor_id).is_some() {
            self.dispatch_actor_task(node, actor_id);
        }
    }

    /// The cluster published a new actor-to-node mapping. Resubmits the
    /// parked actor tasks; each either lands on its owner or parks again.
    pub fn on_actor_creation_notification(&mut self, node: &mut dyn LocalNode, actor_id: ActorId) {
        let batch = self.actors.take_cached_batch();
        debug!(actor_id = %actor_id, replayed = batch.len(), "Replaying cached actor tasks");
        for entry in batch {
            self.on_actor_task_submitted(node, entry);
        }
    }

    /// A plain worker registered, or finished its task.
    pub fn on_worker_available(&mut self, node: &mut dyn LocalNode, worker_id: WorkerId) {
        let worker = node
            .worker(worker_id)
            .expect("available worker is not registered with the node");
        assert!(
            !worker.task_in_progress,
            "available worker still has a task in progress"
        );
        self.pool.make_available(worker_id);
        self.pool.log_counts("Worker available");

        // There is a worker to assign tasks to now.
        self.dispatch_tasks(node);
    }

    /// A plain worker disconnected.
    pub fn on_worker_removed(&mut self, node: &mut dyn LocalNode, worker_id: WorkerId) {
        if let Some(worker) = node.worker(worker_id) {
            assert!(
                worker.actor_id.is_none(),
                "actor workers leave through the actor disconnect path"
            );
        }
        self.pool.remove(worker_id);
    }

    /// The worker hosting an actor registered with this node. The actor
    /// entry may already exist if a task for it arrived first.
    pub fn on_actor_worker_connect(
        &mut self,
        node: &mut dyn LocalNode,
        actor_id: ActorId,
        worker_id: WorkerId,
    ) {
        self.actors.ensure(actor_id, Some(worker_id));
        self.dispatch_actor_task(node, actor_id);
    }

    /// The worker hosting an actor disconnected.
    pub fn on_actor_worker_disconnect(&mut self, actor_id: ActorId) {
        self.actors.remove(actor_id);
    }

    /// An actor worker finished a task.
    pub fn on_actor_worker_available(&mut self, node: &mut dyn LocalNode, worker_id: WorkerId) {
        let worker = node
            .worker(worker_id)
            .expect("available actor worker is not registered with the node");
        let actor_id = worker
            .actor_id
            .expect("actor availability reported by a non-actor worker");
        let actor = self
            .actors
            .actor_mut(actor_id)
            .expect("available actor worker for an unknown actor");
        assert_eq!(
            actor.worker,
            Some(worker_id),
            "actor availability reported by a worker not bound to the actor"
        );
        assert!(!actor.worker_available, "actor worker was already available");
        actor.worker_available = true;

        self.dispatch_actor_task(node, actor_id);
    }

    /// An executing worker suspended itself on a missing object. Its
    /// dynamic resources have already been returned by the node, so other
    /// tasks may now fit.
    pub fn on_worker_blocked(&mut self, node: &mut dyn LocalNode, worker_id: WorkerId) {
        self.pool.mark_blocked(worker_id);
        self.pool.log_counts("Worker blocked");
        self.dispatch_tasks(node);
    }

    /// A blocked worker resumed execution.
    pub fn on_worker_unblocked(&mut self, worker_id: WorkerId) {
        self.pool.mark_unblocked(worker_id);
        self.pool.log_counts("Worker unblocked");
    }

    /// An object became available in the local store. Tasks that were
    /// waiting on it and have no other missing dependency move to the
    /// dispatch queue.
    pub fn on_object_available(&mut self, node: &mut dyn LocalNode, object_id: ObjectId) {
        let dependents = self.objects.make_local(object_id);
        if dependents.is_empty() {
            return;
        }

        let mut promoted = 0usize;
        for key in dependents {
            // A task naming the same object through several arguments shows
            // up once per argument; the first promotion moves it.
            if self.queues.lane(key) != Lane::Waiting {
                continue;
            }
            if self.objects.can_run(&self.queues.entry(key).spec) {
                self.queues.promote(key);
                promoted += 1;
            }
        }
        debug!(object_id = %object_id, promoted, "Object available locally");

        self.dispatch_tasks(node);
    }

    /// An object was evicted from the local store. Dispatch-queue tasks
    /// that depended on it fall back to the waiting queue, and the fetch is
    /// re-registered for every waiting task naming the object.
    pub fn on_object_removed(&mut self, node: &mut dyn LocalNode, object_id: ObjectId) {
        self.objects.evict(object_id);

        for key in self.queues.keys(Lane::Dispatch) {
            if self.queues.entry(key).spec.is_dependent_on(object_id) {
                debug!(
                    task_id = %self.queues.entry(key).spec.task_id(),
                    "Task moved from dispatch queue back to waiting queue"
                );
                self.queues.demote(key);
            }
        }

        // Re-register the dependency for every waiting task naming the
        // object, including the tasks demoted above.
        let waiting = self.queues.keys(Lane::Waiting);
        let Self { objects, queues, .. } = self;
        for key in waiting {
            let spec = &queues.entry(key).spec;
            for index in 0..spec.num_args() {
                if spec.arg_id(index) == Some(object_id) {
                    objects.register_dependency(node, key, object_id);
                }
            }
        }
    }

    /// A driver exited. Purges its tasks from the waiting and dispatch
    /// queues and its cursors from the object dependency lists. Tasks
    /// already assigned to workers run to completion.
    pub fn on_driver_removed(&mut self, driver_id: DriverId) {
        // Scrub the object back-references first: they hold cursors into
        // the queues that the purges below destroy.
        let Self { objects, queues, .. } = self;
        objects.retain_dependents(|key| queues.entry(key).spec.driver_id() != driver_id);

        let waiting = queues.remove_driver_tasks(Lane::Waiting, driver_id);
        let dispatch = queues.remove_driver_tasks(Lane::Dispatch, driver_id);
        debug!(driver_id = %driver_id, waiting, dispatch, "Removed driver tasks");

        // TODO: tasks for the removed driver may still sit in actor queues;
        // decide whether driver removal should purge those as well.
    }

    /// Periodic retry of outstanding fetches. Returns the delay before the
    /// next tick.
    pub fn on_fetch_tick(&mut self, node: &mut dyn LocalNode) -> Duration {
        self.objects.fetch_tick(node);
        self.config.fetch_timeout
    }

    /// Assigns as many dispatch-queue tasks as workers and resources allow.
    ///
    /// Tasks are considered in queue order, but a task whose demand cannot
    /// currently be met is skipped rather than blocking the head: a smaller
    /// task further back may still fit. The large task can be starved by a
    /// stream of small ones; that trade is accepted.
    pub fn dispatch_tasks(&mut self, node: &mut dyn LocalNode) {
        for key in self.queues.keys(Lane::Dispatch) {
            // A worker must be free before anything else matters. If the
            // pool is empty and no started worker is still registering,
            // replenish it.
            if self.pool.available_len() == 0 {
                if node.pending_worker_starts() == 0 {
                    node.start_worker(None);
                }
                return;
            }
            // Stop once every dynamic resource is exhausted.
            if node.dynamic_resources().is_exhausted() {
                return;
            }
            let required = *self.queues.entry(key).spec.required_resources();
            if !required.fits_within(&node.dynamic_resources()) {
                continue;
            }

            // Most-recently-available worker first.
            let worker_id = self
                .pool
                .take_available()
                .expect("available pool emptied during dispatch");
            let entry = self.queues.remove(key);
            debug!(
                task_id = %entry.spec.task_id(),
                worker_id = %worker_id,
                "Dispatching task"
            );
            node.assign_task(worker_id, &entry);
            self.pool.begin_executing(worker_id);
        }
    }

    /// Dispatches the next queued task on an actor if one is runnable.
    /// Returns true if a task was handed to the actor's worker.
    pub fn dispatch_actor_task(&mut self, node: &mut dyn LocalNode, actor_id: ActorId) -> bool {
        // The actor must be hosted by this node.
        let owner = node.actor_owner(actor_id);
        assert!(
            owner.is_some() && owner == node.node_id(),
            "dispatching for an actor this node does not host"
        );

        let actor = self
            .actors
            .actor_mut(actor_id)
            .expect("dispatching for an actor with no local entry");

        let Some(front) = actor.queue.front() else {
            return false;
        };
        let next_counter = front.spec.actor_counter();
        if next_counter != actor.task_counter {
            // Running this task now would break in-order execution; it
            // stays queued until the gap fills.
            assert!(
                next_counter > actor.task_counter,
                "actor queue front regressed below the executed count"
            );
            return false;
        }
        if !actor.worker_available {
            return false;
        }
        let worker_id = actor
            .worker
            .expect("actor worker available but never bound");

        actor.task_counter += 1;
        actor.worker_available = false;
        let entry = actor.queue.pop_front().expect("actor queue front vanished");
        node.assign_task(worker_id, &entry);
        true
    }

    /// Admits a task this node has decided to run: dispatch queue when its
    /// dependencies are all local, waiting queue otherwise.
    fn queue_task_locally(&mut self, node: &mut dyn LocalNode, entry: TaskEntry, from_global: bool) {
        if self.objects.can_run(&entry.spec) {
            self.queue_dispatch_task(node, entry, from_global);
        } else {
            self.queue_waiting_task(node, entry, from_global);
        }
    }

    /// Queues a task with missing dependencies and starts fetching them.
    fn queue_waiting_task(&mut self, node: &mut dyn LocalNode, entry: TaskEntry, from_global: bool) {
        debug!(task_id = %entry.spec.task_id(), "Queueing task in waiting queue");
        self.publish_queued(node, &entry, from_global);
        let key = self.queues.push(Lane::Waiting, entry);
        let Self { objects, queues, .. } = self;
        objects.register_task_dependencies(node, key, &queues.entry(key).spec);
    }

    /// Queues a task whose dependencies are all local.
    fn queue_dispatch_task(&mut self, node: &mut dyn LocalNode, entry: TaskEntry, from_global: bool) {
        debug!(task_id = %entry.spec.task_id(), "Queueing task in dispatch queue");
        self.publish_queued(node, &entry, from_global);
        self.queues.push(Lane::Dispatch, entry);
    }

    /// Inserts a task into its actor's queue and publishes the admission.
    fn add_task_to_actor_queue(
        &mut self,
        node: &mut dyn LocalNode,
        entry: TaskEntry,
        from_global: bool,
    ) {
        let actor_id = entry
            .spec
            .actor_id()
            .expect("actor queue insert for a non-actor task");
        self.publish_queued(node, &entry, from_global);
        self.actors.enqueue(actor_id, entry);
    }

    /// Records the local queue admission in the task table, so the rest of
    /// the cluster observes it. A task placed here by the global scheduler
    /// already has a table entry and only needs an update.
    fn publish_queued(&self, node: &mut dyn LocalNode, entry: &TaskEntry, from_global: bool) {
        let Some(node_id) = node.node_id() else {
            return;
        };
        let record = TaskRecord::new(&entry.spec, entry.spec_size, TaskStatus::Queued, Some(node_id));
        if from_global {
            node.task_table_update(record);
        } else {
            node.task_table_add(record);
        }
    }

    /// Hands a task to the global scheduler for placement, or queues it
    /// locally when no global scheduler is reachable.
    fn give_task_to_global_scheduler(&mut self, node: &mut dyn LocalNode, entry: TaskEntry) {
        if node.node_id().is_none() || !node.global_scheduler_exists() {
            self.queue_task_locally(node, entry, false);
            return;
        }
        let record = TaskRecord::new(&entry.spec, entry.spec_size, TaskStatus::Waiting, None);
        node.task_table_add(record);
    }

    /// Hands an actor task directly to the node hosting its actor.
    fn give_task_to_local_scheduler(
        &mut self,
        node: &mut dyn LocalNode,
        entry: TaskEntry,
        owner: NodeId,
    ) {
        if node.node_id() == Some(owner) {
            warn!("Local scheduler is trying to assign a task to itself");
        }
        assert!(
            node.node_id().is_some(),
            "cannot hand off a task without a task-table connection"
        );
        debug_assert!(node.global_scheduler_exists());
        let record = TaskRecord::new(
            &entry.spec,
            entry.spec_size,
            TaskStatus::Scheduled,
            Some(owner),
        );
        node.task_table_add(record);
    }

    /// True if the task's demand fits both the configured and the currently
    /// unclaimed resources of this node.
    fn resource_constraints_satisfied(&self, node: &dyn LocalNode, entry: &TaskEntry) -> bool {
        let required = entry.spec.required_resources();
        required.fits_within(&node.static_resources())
            && required.fits_within(&node.dynamic_resources())
    }

    /// Tasks currently waiting on object dependencies.
    #[must_use]
    pub fn num_waiting_tasks(&self) -> usize {
        self.queues.len(Lane::Waiting)
    }

    /// Tasks currently awaiting a worker and resources.
    #[must_use]
    pub fn num_dispatch_tasks(&self) -> usize {
        self.queues.len(Lane::Dispatch)
    }

    /// Snapshot of queue lengths and pool sizes.
    #[must_use]
    pub fn info(&self) -> SchedulerInfo {
        SchedulerInfo {
            waiting_tasks: self.queues.len(Lane::Waiting),
            dispatch_tasks: self.queues.len(Lane::Dispatch),
            available_workers: self.pool.available_len(),
            executing_workers: self.pool.executing_len(),
            blocked_workers: self.pool.blocked_len(),
        }
    }

    /// Read-only view of the queue store.
    #[must_use]
    pub fn queues(&self) -> &TaskQueues {
        &self.queues
    }

    /// Read-only view of the object tracker.
    #[must_use]
    pub fn objects(&self) -> &ObjectTracker {
        &self.objects
    }

    /// Read-only view of the worker pool.
    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Read-only view of the actor registry.
    #[must_use]
    pub fn actors(&self) -> &ActorRegistry {
        &self.actors
    }
}
