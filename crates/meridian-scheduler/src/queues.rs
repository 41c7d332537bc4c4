//! The waiting and dispatch task queues.
//!
//! Both lanes share one slab arena, so a [`TaskKey`] stays valid while other
//! entries are inserted or removed, and while its own entry moves between
//! lanes. The dependency tracker stores these keys as back-references from
//! missing objects to the tasks waiting on them.

use slab::Slab;

use meridian_proto::{DriverId, TaskSpec};

/// A queued task together with the serialised size it was received with.
#[derive(Clone, Debug)]
pub struct TaskEntry {
    /// The task specification. The queue owns this copy.
    pub spec: TaskSpec,
    /// Serialised size of the spec, in bytes.
    pub spec_size: u64,
}

impl TaskEntry {
    /// Creates a queue entry.
    #[must_use]
    pub const fn new(spec: TaskSpec, spec_size: u64) -> Self {
        Self { spec, spec_size }
    }
}

/// Stable cursor to an entry in the queue store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TaskKey(usize);

/// The two queue lanes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Lane {
    /// Tasks with at least one missing object dependency.
    Waiting,
    /// Tasks whose dependencies are all local, awaiting a worker and
    /// resources.
    Dispatch,
}

struct Slot {
    entry: TaskEntry,
    lane: Lane,
    prev: Option<TaskKey>,
    next: Option<TaskKey>,
}

#[derive(Default)]
struct LaneLinks {
    head: Option<TaskKey>,
    tail: Option<TaskKey>,
    len: usize,
}

/// Two-lane task queue store with stable cursors.
#[derive(Default)]
pub struct TaskQueues {
    slots: Slab<Slot>,
    waiting: LaneLinks,
    dispatch: LaneLinks,
}

impl TaskQueues {
    /// Creates an empty queue store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn links(&self, lane: Lane) -> &LaneLinks {
        match lane {
            Lane::Waiting => &self.waiting,
            Lane::Dispatch => &self.dispatch,
        }
    }

    fn links_mut(&mut self, lane: Lane) -> &mut LaneLinks {
        match lane {
            Lane::Waiting => &mut self.waiting,
            Lane::Dispatch => &mut self.dispatch,
        }
    }

    fn link_tail(&mut self, lane: Lane, key: TaskKey) {
        let tail = self.links(lane).tail;
        {
            let slot = &mut self.slots[key.0];
            slot.lane = lane;
            slot.prev = tail;
            slot.next = None;
        }
        match tail {
            Some(prev) => self.slots[prev.0].next = Some(key),
            None => self.links_mut(lane).head = Some(key),
        }
        let links = self.links_mut(lane);
        links.tail = Some(key);
        links.len += 1;
    }

    fn unlink(&mut self, key: TaskKey) {
        let (lane, prev, next) = {
            let slot = &self.slots[key.0];
            (slot.lane, slot.prev, slot.next)
        };
        match prev {
            Some(prev) => self.slots[prev.0].next = next,
            None => self.links_mut(lane).head = next,
        }
        match next {
            Some(next) => self.slots[next.0].prev = prev,
            None => self.links_mut(lane).tail = prev,
        }
        self.links_mut(lane).len -= 1;
        let slot = &mut self.slots[key.0];
        slot.prev = None;
        slot.next = None;
    }

    /// Appends an entry to the tail of a lane and returns its cursor.
    pub fn push(&mut self, lane: Lane, entry: TaskEntry) -> TaskKey {
        let key = TaskKey(self.slots.insert(Slot {
            entry,
            lane,
            prev: None,
            next: None,
        }));
        self.link_tail(lane, key);
        key
    }

    /// Moves an entry from the waiting lane to the dispatch tail.
    pub fn promote(&mut self, key: TaskKey) {
        debug_assert_eq!(self.lane(key), Lane::Waiting);
        self.unlink(key);
        self.link_tail(Lane::Dispatch, key);
    }

    /// Moves an entry from the dispatch lane back to the waiting tail.
    pub fn demote(&mut self, key: TaskKey) {
        debug_assert_eq!(self.lane(key), Lane::Dispatch);
        self.unlink(key);
        self.link_tail(Lane::Waiting, key);
    }

    /// Removes an entry, returning it.
    pub fn remove(&mut self, key: TaskKey) -> TaskEntry {
        self.unlink(key);
        self.slots.remove(key.0).entry
    }

    /// Returns the entry behind a cursor.
    #[must_use]
    pub fn entry(&self, key: TaskKey) -> &TaskEntry {
        &self.slots[key.0].entry
    }

    /// Returns the lane an entry currently sits in.
    #[must_use]
    pub fn lane(&self, key: TaskKey) -> Lane {
        self.slots[key.0].lane
    }

    /// True if the cursor still resolves to a live entry.
    #[must_use]
    pub fn contains(&self, key: TaskKey) -> bool {
        self.slots.contains(key.0)
    }

    /// Number of entries in a lane.
    #[must_use]
    pub fn len(&self, lane: Lane) -> usize {
        self.links(lane).len
    }

    /// True if a lane has no entries.
    #[must_use]
    pub fn is_empty(&self, lane: Lane) -> bool {
        self.links(lane).len == 0
    }

    /// Iterates a lane head to tail.
    pub fn iter(&self, lane: Lane) -> LaneIter<'_> {
        LaneIter {
            queues: self,
            next: self.links(lane).head,
        }
    }

    /// Collects the cursors of a lane, head to tail. Useful when entries
    /// will be moved or removed while walking.
    #[must_use]
    pub fn keys(&self, lane: Lane) -> Vec<TaskKey> {
        self.iter(lane).map(|(key, _)| key).collect()
    }

    /// Removes every entry in a lane belonging to the given driver.
    /// Returns how many were removed.
    pub fn remove_driver_tasks(&mut self, lane: Lane, driver_id: DriverId) -> usize {
        let doomed: Vec<TaskKey> = self
            .iter(lane)
            .filter(|(_, entry)| entry.spec.driver_id() == driver_id)
            .map(|(key, _)| key)
            .collect();
        let count = doomed.len();
        for key in doomed {
            self.remove(key);
        }
        count
    }
}

/// Iterator over one lane of the queue store.
pub struct LaneIter<'a> {
    queues: &'a TaskQueues,
    next: Option<TaskKey>,
}

impl<'a> Iterator for LaneIter<'a> {
    type Item = (TaskKey, &'a TaskEntry);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.next?;
        let queues = self.queues;
        self.next = queues.slots[key.0].next;
        Some((key, &queues.slots[key.0].entry))
    }
}
