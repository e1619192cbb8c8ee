//! Hops a computation onto a background loop and prints both thread ids.

use std::thread;
use std::time::Duration;

use crossloop_core::{dispatch, SchedulerThread};

fn main() {
    let scheduler = SchedulerThread::builder()
        .name("hop-target")
        .spawn()
        .unwrap();
    let target = scheduler.handle().unwrap();

    let report = futures::executor::block_on(dispatch(
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            format!("computed on {:?}", thread::current().id())
        },
        &target,
        None,
    ))
    .unwrap();

    println!("main thread {:?}", thread::current().id());
    println!("{report}");

    scheduler.shutdown(true);
}
