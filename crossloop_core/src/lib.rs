//! Dedicated event-loop threads, and the glue to await their work from
//! somewhere else.
//!
//! [`SchedulerThread`] owns a background OS thread running a private loop
//! from [`start`](SchedulerThread::start) until
//! [`shutdown`](SchedulerThread::shutdown). Work submitted to it runs on
//! that loop, and the result comes back as a [`Promise`] the caller can
//! await from its own loop, or block on from a plain thread.
//!
//! Underneath sits [`chain`]: a linkage between any two one-shot result
//! slots ([`FutureLike`]) that carries completion forward and cancellation
//! backward, landing every mutation on the thread that owns the mutated
//! side. [`dispatch`] combines the two, collapsing to a plain inline call
//! when source and target are the same loop.
//!
//! ```
//! use crossloop_core::SchedulerThread;
//!
//! let scheduler = SchedulerThread::builder().name("background").spawn().unwrap();
//! let answer = scheduler.submit(async { 6 * 7 }).unwrap();
//! assert_eq!(futures::executor::block_on(answer).unwrap(), 42);
//! scheduler.shutdown(true);
//! ```

mod defer;

pub mod bridge;
pub mod dispatch;
pub mod error;
pub mod future_like;
pub mod handle;
pub mod promise;
pub mod scheduler;

pub use bridge::{chain, chain_forward, wrap};
pub use dispatch::{dispatch, dispatch_to, DispatchTo, LoopSelector};
pub use error::Error;
pub use future_like::{FailurePayload, FutureLike, Outcome};
pub use handle::LoopHandle;
pub use promise::Promise;
pub use scheduler::{run_in_thread, RuntimePolicy, SchedulerBuilder, SchedulerThread};
