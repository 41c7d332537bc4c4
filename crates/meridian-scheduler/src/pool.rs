//! The non-actor worker pool.
//!
//! Workers move through three disjoint sets:
//!
//! | event                     | from      | to        |
//! |---------------------------|-----------|-----------|
//! | registers with no task    | -         | available |
//! | dispatch assigns a task   | available | executing |
//! | reports its task done     | executing | available |
//! | blocks on a missing object| executing | blocked   |
//! | reports unblocked         | blocked   | executing |
//! | disconnects               | any       | -         |
//!
//! Actor workers are single-tenant and never enter the pool; their slot
//! lives on the actor registry entry instead.

use tracing::debug;

use meridian_proto::WorkerId;

fn remove_from(set: &mut Vec<WorkerId>, worker_id: WorkerId) -> bool {
    // Order within a set carries no meaning, so swap-remove keeps removal
    // O(1).
    match set.iter().position(|member| *member == worker_id) {
        Some(index) => {
            set.swap_remove(index);
            true
        }
        None => false,
    }
}

/// The three disjoint worker sets.
#[derive(Default)]
pub struct WorkerPool {
    available: Vec<WorkerId>,
    executing: Vec<WorkerId>,
    blocked: Vec<WorkerId>,
}

impl WorkerPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a worker into the available set. A worker that just finished a
    /// task leaves the executing set; one registering for the first time
    /// was in no set at all.
    pub fn make_available(&mut self, worker_id: WorkerId) {
        debug_assert!(!self.available.contains(&worker_id));
        debug_assert!(!self.blocked.contains(&worker_id));
        remove_from(&mut self.executing, worker_id);
        debug_assert!(!self.executing.contains(&worker_id));
        self.available.push(worker_id);
    }

    /// Takes the most recently available worker for dispatch.
    pub fn take_available(&mut self) -> Option<WorkerId> {
        self.available.pop()
    }

    /// Records that a worker started executing a task.
    pub fn begin_executing(&mut self, worker_id: WorkerId) {
        debug_assert!(!self.executing.contains(&worker_id));
        self.executing.push(worker_id);
    }

    /// Moves an executing worker into the blocked set. The worker has
    /// already returned its dynamic resources to the node.
    pub fn mark_blocked(&mut self, worker_id: WorkerId) {
        assert!(
            remove_from(&mut self.executing, worker_id),
            "blocked worker was not executing"
        );
        debug_assert!(!self.blocked.contains(&worker_id));
        self.blocked.push(worker_id);
    }

    /// Moves a blocked worker back into the executing set.
    pub fn mark_unblocked(&mut self, worker_id: WorkerId) {
        assert!(
            remove_from(&mut self.blocked, worker_id),
            "unblocked worker was not blocked"
        );
        debug_assert!(!self.executing.contains(&worker_id));
        self.executing.push(worker_id);
    }

    /// Removes a disconnected worker from whichever set holds it.
    pub fn remove(&mut self, worker_id: WorkerId) {
        let mut removals = 0;
        removals += usize::from(remove_from(&mut self.available, worker_id));
        debug_assert!(!self.available.contains(&worker_id));
        removals += usize::from(remove_from(&mut self.executing, worker_id));
        debug_assert!(!self.executing.contains(&worker_id));
        removals += usize::from(remove_from(&mut self.blocked, worker_id));
        debug_assert!(!self.blocked.contains(&worker_id));
        assert!(removals <= 1, "worker was in more than one pool set");
    }

    /// Number of available workers.
    #[must_use]
    pub fn available_len(&self) -> usize {
        self.available.len()
    }

    /// Number of executing workers.
    #[must_use]
    pub fn executing_len(&self) -> usize {
        self.executing.len()
    }

    /// Number of blocked workers.
    #[must_use]
    pub fn blocked_len(&self) -> usize {
        self.blocked.len()
    }

    /// True if the worker is in the available set.
    #[must_use]
    pub fn is_available(&self, worker_id: WorkerId) -> bool {
        self.available.contains(&worker_id)
    }

    /// True if the worker is in the executing set.
    #[must_use]
    pub fn is_executing(&self, worker_id: WorkerId) -> bool {
        self.executing.contains(&worker_id)
    }

    /// True if the worker is in the blocked set.
    #[must_use]
    pub fn is_blocked(&self, worker_id: WorkerId) -> bool {
        self.blocked.contains(&worker_id)
    }

    /// Logs the pool sizes at debug level.
    pub fn log_counts(&self, message: &str) {
        debug!(
            available = self.available.len(),
            executing = self.executing.len(),
            blocked = self.blocked.len(),
            "{message}"
        );
    }
}
