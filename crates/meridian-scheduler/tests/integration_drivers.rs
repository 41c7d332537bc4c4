//! Integration tests for driver-scoped cancellation.

mod common;

use common::fixtures::TaskBuilder;
use common::TestNode;
use meridian_proto::{ActorId, DriverId, ObjectId};
use meridian_scheduler::{Lane, SchedulerEvent};

#[test]
fn driver_removal_scrubs_queues_and_dependency_lists() {
    let mut bench = TestNode::with_cpus(1.0);
    let driver_id = DriverId::new();
    let object_id = ObjectId::new();

    // One task of the doomed driver waits on a remote object, another sits
    // ready in the dispatch queue.
    bench.core.handle(
        &mut bench.node,
        SchedulerEvent::TaskSubmitted(
            TaskBuilder::for_driver(driver_id)
                .with_object_arg(object_id)
                .build(),
        ),
    );
    bench.core.handle(
        &mut bench.node,
        SchedulerEvent::TaskSubmitted(TaskBuilder::for_driver(driver_id).build()),
    );
    // A survivor from another driver waits on the same object.
    let survivor = TaskBuilder::new().with_object_arg(object_id).build();
    let survivor_id = survivor.spec.task_id();
    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::TaskSubmitted(survivor));

    assert_eq!(bench.core.num_waiting_tasks(), 2);
    assert_eq!(bench.core.num_dispatch_tasks(), 1);
    assert_eq!(bench.core.objects().dependents(object_id).unwrap().len(), 2);

    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::DriverRemoved(driver_id));

    assert_eq!(bench.core.num_waiting_tasks(), 1);
    assert_eq!(bench.core.num_dispatch_tasks(), 0);

    // The surviving cursor still resolves to a live waiting entry.
    let dependents = bench.core.objects().dependents(object_id).unwrap();
    assert_eq!(dependents.len(), 1);
    let key = dependents[0];
    assert!(bench.core.queues().contains(key));
    assert_eq!(bench.core.queues().lane(key), Lane::Waiting);
    assert_eq!(bench.core.queues().entry(key).spec.task_id(), survivor_id);
}

#[test]
fn driver_removal_erases_objects_with_no_remaining_dependents() {
    let mut bench = TestNode::with_cpus(1.0);
    let driver_id = DriverId::new();
    let object_id = ObjectId::new();
    bench.core.handle(
        &mut bench.node,
        SchedulerEvent::TaskSubmitted(
            TaskBuilder::for_driver(driver_id)
                .with_object_arg(object_id)
                .build(),
        ),
    );
    assert_eq!(bench.core.objects().remote_len(), 1);
    bench.node.fetches.clear();

    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::DriverRemoved(driver_id));

    // No task wants the object any more, so no fetch is kept alive.
    assert_eq!(bench.core.objects().remote_len(), 0);
    bench.core.on_fetch_tick(&mut bench.node);
    assert!(bench.node.fetches.is_empty());
}

#[test]
fn driver_removal_is_a_noop_for_unknown_drivers() {
    let mut bench = TestNode::with_cpus(1.0);
    let object_id = ObjectId::new();
    bench.core.handle(
        &mut bench.node,
        SchedulerEvent::TaskSubmitted(TaskBuilder::new().with_object_arg(object_id).build()),
    );

    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::DriverRemoved(DriverId::new()));

    assert_eq!(bench.core.num_waiting_tasks(), 1);
    assert_eq!(bench.core.objects().remote_len(), 1);
}

#[test]
fn driver_removal_leaves_actor_queues_untouched() {
    let mut bench = TestNode::with_cpus(1.0);
    let driver_id = DriverId::new();
    let actor_id = ActorId::new();
    let node_id = bench.node.node_id.unwrap();
    bench.node.actor_mapping.insert(actor_id, node_id);

    // No hosting worker yet, so the task stays queued on the actor.
    bench.core.handle(
        &mut bench.node,
        SchedulerEvent::ActorTaskSubmitted(
            TaskBuilder::for_driver(driver_id).on_actor(actor_id, 0).build(),
        ),
    );
    assert_eq!(bench.core.actors().actor(actor_id).unwrap().queued_len(), 1);

    bench
        .core
        .handle(&mut bench.node, SchedulerEvent::DriverRemoved(driver_id));

    // Actor state is deliberately not cleaned up on driver removal.
    assert_eq!(bench.core.actors().actor(actor_id).unwrap().queued_len(), 1);
}
