use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crossloop_core::{Error, SchedulerThread};

#[test]
fn start_is_idempotent_while_running() {
    let scheduler = SchedulerThread::new();
    scheduler.start().unwrap();
    scheduler.start().unwrap();

    let first = scheduler.handle().unwrap();
    let second = scheduler.handle().unwrap();
    assert_eq!(first, second);

    scheduler.shutdown(true);
}

#[test]
fn restarting_a_stopped_scheduler_fails() {
    let scheduler = SchedulerThread::new();
    scheduler.start().unwrap();
    scheduler.shutdown(true);

    assert!(matches!(scheduler.start(), Err(Error::AlreadyStarted)));
}

#[test]
fn handle_requires_a_running_loop() {
    let scheduler = SchedulerThread::new();
    assert!(matches!(scheduler.handle(), Err(Error::NotRunning)));

    scheduler.start().unwrap();
    assert!(scheduler.handle().is_ok());

    scheduler.shutdown(true);
    assert!(matches!(scheduler.handle(), Err(Error::NotRunning)));
}

#[test]
fn shutdown_is_idempotent_and_safe_before_start() {
    let scheduler = SchedulerThread::new();
    scheduler.shutdown(true);

    // Not started yet, so the no-op shutdown above must not exhaust it.
    scheduler.start().unwrap();
    scheduler.shutdown(true);
    scheduler.shutdown(true);
    scheduler.shutdown(false);
}

#[test]
fn nonblocking_shutdown_can_be_reaped_later() {
    let scheduler = SchedulerThread::new();
    scheduler.start().unwrap();
    scheduler.shutdown(false);
    scheduler.shutdown(true);
    assert!(matches!(scheduler.handle(), Err(Error::NotRunning)));
}

#[test]
fn loop_construction_failure_reaches_the_starter() {
    let scheduler = SchedulerThread::builder()
        .runtime(|| Err(io::Error::new(io::ErrorKind::Other, "no runtime here")))
        .build();

    match scheduler.start() {
        Err(Error::LoopConstruction(err)) => assert_eq!(err.to_string(), "no runtime here"),
        other => panic!("expected a construction failure, got {other:?}"),
    }

    // The thread never entered its run phase and the instance is exhausted.
    assert!(matches!(scheduler.start(), Err(Error::AlreadyStarted)));
    assert!(matches!(scheduler.handle(), Err(Error::NotRunning)));
}

#[test]
fn submitting_before_start_fails_fast() {
    let scheduler = SchedulerThread::new();
    assert!(matches!(
        scheduler.submit(async { 1 }),
        Err(Error::NotRunning)
    ));
}

#[test]
fn dropping_a_running_scheduler_stops_it() {
    let scheduler = SchedulerThread::builder().spawn().unwrap();
    let handle = scheduler.handle().unwrap();

    drop(scheduler);

    assert!(handle.call_soon(|| {}).is_err());
}

#[test]
fn scheduler_stops_even_when_the_owning_scope_panics() {
    let mut escaped = None;
    let result = catch_unwind(AssertUnwindSafe(|| {
        let scheduler = SchedulerThread::builder().spawn().unwrap();
        escaped = Some(scheduler.handle().unwrap());
        panic!("scope failure");
    }));
    result.unwrap_err();

    let handle = escaped.unwrap();
    assert!(handle.call_soon(|| {}).is_err());
}

#[tokio::test]
async fn run_in_thread_runs_elsewhere_and_cleans_up() {
    let promise = crossloop_core::run_in_thread(async {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        std::thread::current().id()
    })
    .unwrap();

    let id = promise.await.unwrap();
    assert_ne!(id, std::thread::current().id());
}
