//! Object dependency tracking.
//!
//! Tracks which objects are present in the local object store and which are
//! being actively fetched from the rest of the cluster. Objects being
//! fetched carry the waiting-queue cursors of the tasks that depend on
//! them, so an arrival can promote exactly the affected tasks.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::info;

use meridian_proto::{ObjectId, TaskSpec};

use crate::node::LocalNode;
use crate::queues::TaskKey;

/// Local-store and in-flight-fetch object tables. An object is in at most
/// one of the two.
#[derive(Default)]
pub struct ObjectTracker {
    /// Objects present in the local store. May be slightly stale.
    local: HashSet<ObjectId>,
    /// Objects being fetched, each with the tasks waiting on it.
    remote: HashMap<ObjectId, Vec<TaskKey>>,
}

impl ObjectTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the object is present in the local store.
    #[must_use]
    pub fn is_local(&self, object_id: ObjectId) -> bool {
        self.local.contains(&object_id)
    }

    /// True if every by-reference argument of the task is local. By-value
    /// arguments never gate scheduling.
    #[must_use]
    pub fn can_run(&self, spec: &TaskSpec) -> bool {
        spec.object_refs().all(|object_id| self.local.contains(&object_id))
    }

    /// Records that the task behind `key` waits on `object_id`, starting a
    /// fetch if this is the first task to want it. The periodic fetch tick
    /// retries until the object arrives.
    pub fn register_dependency(
        &mut self,
        node: &mut dyn LocalNode,
        key: TaskKey,
        object_id: ObjectId,
    ) {
        if self.local.contains(&object_id) {
            return;
        }
        match self.remote.entry(object_id) {
            Entry::Vacant(slot) => {
                // First sight of this missing object: try the fetch once
                // immediately.
                if node.object_store_connected() {
                    node.fetch_objects(&[object_id]);
                }
                slot.insert(vec![key]);
            }
            Entry::Occupied(mut slot) => slot.get_mut().push(key),
        }
    }

    /// Registers every missing by-reference argument of a task entering the
    /// waiting queue. The task must have at least one missing dependency,
    /// or it belongs in the dispatch queue instead.
    pub fn register_task_dependencies(
        &mut self,
        node: &mut dyn LocalNode,
        key: TaskKey,
        spec: &TaskSpec,
    ) {
        let mut missing = 0usize;
        for object_id in spec.object_refs() {
            if !self.local.contains(&object_id) {
                self.register_dependency(node, key, object_id);
                missing += 1;
            }
        }
        assert!(missing > 0, "task queued as waiting with no missing dependencies");
    }

    /// Moves an object from the fetch table to the local table, returning
    /// the cursors of the tasks that were waiting on it. A repeated
    /// availability notification returns an empty list.
    pub fn make_local(&mut self, object_id: ObjectId) -> Vec<TaskKey> {
        let dependents = self.remote.remove(&object_id).unwrap_or_default();
        self.local.insert(object_id);
        dependents
    }

    /// Removes an evicted object from the local table.
    pub fn evict(&mut self, object_id: ObjectId) {
        assert!(
            self.local.remove(&object_id),
            "evicted object was not in the local table"
        );
    }

    /// Re-issues fetches for every in-flight object and asks for each to be
    /// reconstructed, in case the fetch can no longer be satisfied.
    pub fn fetch_tick(&self, node: &mut dyn LocalNode) {
        if !node.object_store_connected() {
            info!("Object store manager not connected; deferring fetches");
            return;
        }
        if self.remote.is_empty() {
            return;
        }
        let object_ids: Vec<ObjectId> = self.remote.keys().copied().collect();
        node.fetch_objects(&object_ids);
        for object_id in &object_ids {
            node.reconstruct_object(*object_id);
        }
    }

    /// Drops every dependent cursor the predicate rejects, erasing objects
    /// whose dependent list empties. Used when a driver is removed, before
    /// its queue entries (and therefore the cursors) are destroyed.
    pub fn retain_dependents(&mut self, mut keep: impl FnMut(TaskKey) -> bool) {
        self.remote.retain(|_, dependents| {
            dependents.retain(|key| keep(*key));
            !dependents.is_empty()
        });
    }

    /// The tasks currently waiting on an in-flight object.
    #[must_use]
    pub fn dependents(&self, object_id: ObjectId) -> Option<&[TaskKey]> {
        self.remote.get(&object_id).map(Vec::as_slice)
    }

    /// Iterates the objects currently being fetched.
    pub fn remote_objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.remote.keys().copied()
    }

    /// Iterates the objects present in the local store.
    pub fn local_objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.local.iter().copied()
    }

    /// Number of objects being fetched.
    #[must_use]
    pub fn remote_len(&self) -> usize {
        self.remote.len()
    }

    /// Number of objects known to be local.
    #[must_use]
    pub fn local_len(&self) -> usize {
        self.local.len()
    }
}
