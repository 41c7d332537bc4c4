//! Integration tests for actor scheduling.

mod common;

use common::fixtures::TaskBuilder;
use common::TestNode;
use meridian_proto::{ActorId, NodeId, TaskStatus};
use meridian_scheduler::SchedulerEvent;

#[test]
fn actor_tasks_run_in_counter_order() {
    let mut bench = TestNode::with_cpus(1.0);
    let actor_id = ActorId::new();
    let worker_id = bench.register_actor(actor_id);

    // Submit out of order: 2, then 0, then 1.
    for counter in [2, 0, 1] {
        let entry = TaskBuilder::new().on_actor(actor_id, counter).build();
        bench
            .core
            .handle(&mut bench.node, SchedulerEvent::ActorTaskSubmitted(entry));
    }

    // Only the counter-0 task may run first.
    assert_eq!(bench.node.assignments.len(), 1);
    assert_eq!(bench.node.assignments[0].1.spec.actor_counter(), 0);

    bench.actor_worker_done(worker_id);
    assert_eq!(bench.node.assignments.len(), 2);
    assert_eq!(bench.node.assignments[1].1.spec.actor_counter(), 1);

    bench.actor_worker_done(worker_id);
    assert_eq!(bench.node.assignments.len(), 3);
    assert_eq!(bench.node.assignments[2].1.spec.actor_counter(), 2);

    let actor = bench.core.actors().actor(actor_id).unwrap();
    assert_eq!(actor.task_counter(), 3);
    assert_eq!(actor.queued_len(), 0);
    assert!(!actor.worker_available());
}

#[test]
#[should_panic(expected = "counter regressed")]
fn replaying_an_executed_counter_is_fatal() {
    let mut bench = TestNode::with_cpus(1.0);
    let actor_id = ActorId::new();
    bench.register_actor(actor_id);

    let first = TaskBuilder::new().on_actor(actor_id, 0).build();
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorTaskSubmitted(first));
    assert_eq!(bench.node.assignments.len(), 1);

    // Counter 0 already executed; submitting it again is a replay.
    let replay = TaskBuilder::new().on_actor(actor_id, 0).build();
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorTaskSubmitted(replay));
}

#[test]
fn unmapped_actor_tasks_park_until_the_mapping_arrives() {
    let mut bench = TestNode::with_cpus(1.0);
    bench.node.global_scheduler = true;
    let actor_id = ActorId::new();

    let entry = TaskBuilder::new().on_actor(actor_id, 0).build();
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorTaskSubmitted(entry));
    assert_eq!(bench.core.actors().cached_len(), 1);
    assert!(bench.node.table_adds.is_empty());

    // A notification with the mapping still unknown parks the task again.
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorCreated(actor_id));
    assert_eq!(bench.core.actors().cached_len(), 1);

    // Once the mapping points at another node, replay hands the task over.
    let other = NodeId::new();
    bench.node.actor_mapping.insert(actor_id, other);
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorCreated(actor_id));

    assert_eq!(bench.core.actors().cached_len(), 0);
    assert_eq!(bench.node.table_adds.len(), 1);
    let record = &bench.node.table_adds[0];
    assert_eq!(record.status, TaskStatus::Scheduled);
    assert_eq!(record.assignee, Some(other));

    // With the spillover drained, another notification is a no-op.
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorCreated(actor_id));
    assert_eq!(bench.node.table_adds.len(), 1);
}

#[test]
fn replayed_tasks_land_on_the_local_actor_queue_once_mapped_here() {
    let mut bench = TestNode::with_cpus(1.0);
    let actor_id = ActorId::new();
    let entry = TaskBuilder::new().on_actor(actor_id, 0).build();
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorTaskSubmitted(entry));
    assert_eq!(bench.core.actors().cached_len(), 1);

    let node_id = bench.node.node_id.unwrap();
    bench.node.actor_mapping.insert(actor_id, node_id);
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorCreated(actor_id));

    assert_eq!(bench.core.actors().cached_len(), 0);
    let actor = bench.core.actors().actor(actor_id).unwrap();
    assert_eq!(actor.queued_len(), 1);
    assert_eq!(actor.worker(), None);

    // The hosting worker connects; the task waits until the worker reports
    // idle, then dispatches.
    let worker_id = bench.node.add_actor_worker(actor_id);
    bench.core.handle(
        &mut bench.node,
        SchedulerEvent::ActorWorkerConnected { actor_id, worker_id },
    );
    assert!(bench.node.assignments.is_empty());

    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorWorkerAvailable(worker_id));
    assert_eq!(bench.node.assignments.len(), 1);
    assert_eq!(bench.node.assignments[0].0, worker_id);
}

#[test]
fn actor_tasks_for_remote_actors_are_handed_to_the_owner() {
    let mut bench = TestNode::with_cpus(1.0);
    bench.node.global_scheduler = true;
    let actor_id = ActorId::new();
    let other = NodeId::new();
    bench.node.actor_mapping.insert(actor_id, other);

    let entry = TaskBuilder::new().on_actor(actor_id, 0).build();
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorTaskSubmitted(entry));

    assert_eq!(bench.core.actors().cached_len(), 0);
    assert!(!bench.core.actors().contains(actor_id));
    assert_eq!(bench.node.table_adds.len(), 1);
    let record = &bench.node.table_adds[0];
    assert_eq!(record.status, TaskStatus::Scheduled);
    assert_eq!(record.assignee, Some(other));
}

#[test]
fn actor_task_scheduled_before_the_mapping_is_tolerated() {
    let mut bench = TestNode::with_cpus(1.0);
    bench.node.global_scheduler = true;
    let actor_id = ActorId::new();

    let entry = TaskBuilder::new().on_actor(actor_id, 0).build();
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorTaskScheduled(entry));

    // The task is queued locally despite the missing mapping; the table
    // entry placed by the global scheduler is updated.
    let actor = bench.core.actors().actor(actor_id).unwrap();
    assert_eq!(actor.queued_len(), 1);
    assert_eq!(bench.node.table_updates.len(), 1);
    assert!(bench.node.assignments.is_empty());

    // Dispatch proceeds once the mapping and the hosting worker arrive.
    let node_id = bench.node.node_id.unwrap();
    bench.node.actor_mapping.insert(actor_id, node_id);
    let worker_id = bench.node.add_actor_worker(actor_id);
    bench.core.handle(
        &mut bench.node,
        SchedulerEvent::ActorWorkerConnected { actor_id, worker_id },
    );
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::ActorWorkerAvailable(worker_id));
    assert_eq!(bench.node.assignments.len(), 1);
}

#[test]
fn actor_worker_disconnect_drops_the_actor_state() {
    let mut bench = TestNode::with_cpus(1.0);
    let actor_id = ActorId::new();
    bench.register_actor(actor_id);
    assert!(bench.core.actors().contains(actor_id));

    bench.core.handle(
        &mut bench.node,
        SchedulerEvent::ActorWorkerDisconnected(actor_id),
    );

    assert!(!bench.core.actors().contains(actor_id));
}
