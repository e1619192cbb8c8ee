use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::defer::defer;
use crate::error::Error;
use crate::promise::Promise;

/// Work item accepted by a loop's thread-safe entry point.
pub(crate) enum LoopMessage {
    /// Run a closure on the loop thread.
    Call(Box<dyn FnOnce() + Send>),
    /// Make the loop's run-forever return.
    Stop,
}

static NEXT_LOOP_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static CURRENT: RefCell<Option<LoopHandle>> = RefCell::new(None);
}

/// A cloneable reference to a live scheduler loop.
///
/// Equality and hashing follow the identity of the underlying loop, not the
/// wrapper: two handles compare equal exactly when they point at the same
/// loop instance. All mutation of loop-affine state goes through
/// [`LoopHandle::call_soon`]; nothing else may touch a loop from another
/// thread.
#[derive(Clone)]
pub struct LoopHandle {
    id: u64,
    tx: mpsc::UnboundedSender<LoopMessage>,
}

impl LoopHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<LoopMessage>) -> Self {
        LoopHandle {
            id: NEXT_LOOP_ID.fetch_add(1, Ordering::Relaxed),
            tx,
        }
    }

    /// Identifier of the underlying loop instance.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The loop owning the calling thread, if the caller runs on one.
    pub fn current() -> Option<LoopHandle> {
        CURRENT.with(|current| current.borrow().clone())
    }

    pub(crate) fn set_current(handle: Option<LoopHandle>) {
        CURRENT.with(|current| *current.borrow_mut() = handle);
    }

    /// Schedules a closure to run on the loop thread soon.
    ///
    /// Fails with [`Error::NotRunning`] once the loop has exited.
    pub fn call_soon(&self, f: impl FnOnce() + Send + 'static) -> Result<(), Error> {
        self.tx
            .send(LoopMessage::Call(Box::new(f)))
            .map_err(|_| Error::NotRunning)
    }

    /// Requests that the loop's run-forever return.
    ///
    /// Work still pending on the loop settles as cancelled while the loop
    /// winds down.
    pub fn request_stop(&self) -> Result<(), Error> {
        self.tx
            .send(LoopMessage::Stop)
            .map_err(|_| Error::NotRunning)
    }

    /// Submits a future for execution on this loop.
    ///
    /// The returned promise settles on the loop thread: with the future's
    /// value, with its panic payload if it panicked, or as cancelled if the
    /// promise is cancelled first or the loop shuts down before the work
    /// completes.
    pub fn spawn<F>(&self, work: F) -> Result<Promise<F::Output>, Error>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let promise = Promise::new();
        let settled = promise.clone();
        let token = promise.cancel_token();
        // Travels with the work from here on: if the queued closure or the
        // spawned task is dropped before settling, the promise reads
        // cancelled instead of stranding its awaiter.
        let guard = defer({
            let promise = promise.clone();
            move || {
                promise.cancel();
            }
        });
        self.call_soon(move || {
            tokio::task::spawn_local(async move {
                let _settle = guard;
                tokio::select! {
                    _ = token.cancelled() => {}
                    outcome = AssertUnwindSafe(work).catch_unwind() => match outcome {
                        Ok(value) => {
                            settled.set_value(value);
                        }
                        Err(payload) => {
                            settled.set_failed(payload);
                        }
                    },
                }
            });
        })?;
        Ok(promise)
    }
}

impl PartialEq for LoopHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LoopHandle {}

impl Hash for LoopHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopHandle").field("id", &self.id).finish()
    }
}
