use crossloop_core::{chain, chain_forward, Promise, SchedulerThread};

#[test]
fn completion_flows_forward() {
    let source = Promise::new();
    let destination = Promise::new();
    chain(source.clone(), None, destination.clone(), None);

    source.set_value(7);

    assert!(destination.is_done());
    assert_eq!(futures::executor::block_on(destination).unwrap(), 7);
}

#[test]
fn failure_flows_forward() {
    let source: Promise<u32> = Promise::new();
    let destination = Promise::new();
    chain(source.clone(), None, destination.clone(), None);

    source.set_failed(Box::new("exploded"));

    let err = futures::executor::block_on(destination).unwrap_err();
    let payload = err.into_failure().unwrap();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"exploded"));
}

#[test]
fn source_cancellation_cancels_the_destination() {
    let source: Promise<()> = Promise::new();
    let destination = Promise::new();
    chain(source.clone(), None, destination.clone(), None);

    source.cancel();

    assert!(destination.is_cancelled());
}

#[test]
fn destination_cancellation_reaches_back() {
    let source: Promise<()> = Promise::new();
    let destination = Promise::new();
    chain(source.clone(), None, destination.clone(), None);

    destination.cancel();

    assert!(source.is_cancelled());
}

#[test]
fn settled_destination_ignores_late_completion() {
    let source = Promise::new();
    let destination = Promise::new();
    chain(source.clone(), None, destination.clone(), None);

    destination.set_value(1);
    source.set_value(2);

    assert_eq!(futures::executor::block_on(destination).unwrap(), 1);
    // The source kept its own outcome; nothing tried to resettle it.
    assert!(source.is_done());
    assert!(!source.is_cancelled());
}

#[test]
fn chaining_an_already_settled_source_propagates_immediately() {
    let source = Promise::new();
    source.set_value(9);

    let destination = Promise::new();
    chain(source.clone(), None, destination.clone(), None);

    assert!(destination.is_done());
    assert_eq!(futures::executor::block_on(destination).unwrap(), 9);
}

#[test]
fn forward_only_chains_shield_the_source() {
    let source: Promise<u32> = Promise::new();
    let destination = Promise::new();
    chain_forward(source.clone(), destination.clone(), None);

    destination.cancel();
    assert!(!source.is_done());
    assert!(!source.is_cancelled());

    // The producer still finishes on its own terms and keeps its outcome.
    source.set_value(3);
    assert_eq!(futures::executor::block_on(source).unwrap(), 3);
}

#[tokio::test]
async fn affine_mutations_run_on_the_owning_loop() {
    let scheduler = SchedulerThread::builder().spawn().unwrap();
    let target = scheduler.handle().unwrap();

    let source: Promise<()> = Promise::new();
    let destination: Promise<()> = Promise::new();
    chain(
        source.clone(),
        None,
        destination.clone(),
        Some(target.clone()),
    );

    let (tx, rx) = tokio::sync::oneshot::channel();
    destination.on_done(Box::new(move || {
        let _ = tx.send(std::thread::current().id());
    }));

    // Settled from this thread, but the destination mutation must land on
    // the thread that owns it.
    source.set_value(());
    let settled_on = rx.await.unwrap();
    assert_ne!(settled_on, std::thread::current().id());

    scheduler.shutdown(true);
}
