use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::future_like::{FailurePayload, FutureLike, Outcome};

/// A cloneable one-shot result slot.
///
/// Every clone refers to the same underlying slot. The slot settles exactly
/// once, with a value, an opaque failure, or a cancellation; [`Promise`] is
/// also a [`Future`] yielding `Result<T, Error>`, so the consuming side can
/// simply await it from any executor.
///
/// Cancelling a pending promise settles it immediately and fires the token
/// returned by [`Promise::cancel_token`], which is how in-flight work learns
/// it should stop. The settled outcome goes to a single taker: the first
/// awaiter (or [`FutureLike::take_outcome`] caller) consumes it.
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    cancel: CancellationToken,
}

struct State<T> {
    outcome: Option<Outcome<T>>,
    // Stays set after the outcome is taken.
    done: bool,
    cancelled: bool,
    callbacks: Vec<Box<dyn FnOnce() + Send>>,
    wakers: Vec<Waker>,
}

impl<T> Promise<T> {
    /// Creates a pending promise.
    pub fn new() -> Self {
        Promise {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    outcome: None,
                    done: false,
                    cancelled: false,
                    callbacks: Vec::new(),
                    wakers: Vec::new(),
                }),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Token fired when this promise is cancelled.
    ///
    /// The producing side can race its work against the token to stop
    /// early once nobody wants the result anymore.
    pub fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Whether the slot has settled.
    pub fn is_done(&self) -> bool {
        self.inner.state.lock().unwrap().done
    }

    /// Whether the slot settled by cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.inner.state.lock().unwrap().cancelled
    }

    /// Settles the slot with a value. Returns `false` if it already settled.
    pub fn set_value(&self, value: T) -> bool {
        self.settle(Outcome::Value(value))
    }

    /// Settles the slot with an opaque failure. Returns `false` if it
    /// already settled.
    pub fn set_failed(&self, failure: FailurePayload) -> bool {
        self.settle(Outcome::Failed(failure))
    }

    /// Requests cancellation. Settles a pending slot as cancelled and fires
    /// the cancellation token; a settled slot is left untouched and `false`
    /// is returned.
    pub fn cancel(&self) -> bool {
        self.settle(Outcome::Cancelled)
    }

    /// Takes the settled outcome, if there is one left to take.
    pub fn take_outcome(&self) -> Option<Outcome<T>> {
        self.inner.state.lock().unwrap().outcome.take()
    }

    /// Registers a callback invoked once when the slot settles, immediately
    /// if it already has.
    pub fn on_done(&self, callback: Box<dyn FnOnce() + Send>) {
        let immediate = {
            let mut state = self.inner.state.lock().unwrap();
            if state.done {
                Some(callback)
            } else {
                state.callbacks.push(callback);
                None
            }
        };
        if let Some(callback) = immediate {
            callback();
        }
    }

    fn settle(&self, outcome: Outcome<T>) -> bool {
        let cancelled = matches!(outcome, Outcome::Cancelled);
        let (callbacks, wakers) = {
            let mut state = self.inner.state.lock().unwrap();
            if state.done {
                return false;
            }
            state.outcome = Some(outcome);
            state.done = true;
            state.cancelled = cancelled;
            (
                std::mem::take(&mut state.callbacks),
                std::mem::take(&mut state.wakers),
            )
        };
        // Callbacks and wakers run outside the lock; a callback is free to
        // settle other promises or re-inspect this one.
        if cancelled {
            self.inner.cancel.cancel();
        }
        for callback in callbacks {
            callback();
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Promise {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock().unwrap();
        let label = if !state.done {
            "pending"
        } else if state.cancelled {
            "cancelled"
        } else {
            "done"
        };
        f.debug_struct("Promise").field("state", &label).finish()
    }
}

impl<T> FutureLike<T> for Promise<T> {
    fn is_done(&self) -> bool {
        Promise::is_done(self)
    }

    fn is_cancelled(&self) -> bool {
        Promise::is_cancelled(self)
    }

    fn set_value(&self, value: T) -> bool {
        Promise::set_value(self, value)
    }

    fn set_failed(&self, failure: FailurePayload) -> bool {
        Promise::set_failed(self, failure)
    }

    fn cancel(&self) -> bool {
        Promise::cancel(self)
    }

    fn take_outcome(&self) -> Option<Outcome<T>> {
        Promise::take_outcome(self)
    }

    fn on_done(&self, callback: Box<dyn FnOnce() + Send>) {
        Promise::on_done(self, callback)
    }
}

impl<T> Future for Promise<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.inner.state.lock().unwrap();
        if state.done {
            match state.outcome.take() {
                Some(Outcome::Value(value)) => Poll::Ready(Ok(value)),
                Some(Outcome::Failed(failure)) => Poll::Ready(Err(Error::Failed(failure))),
                Some(Outcome::Cancelled) => Poll::Ready(Err(Error::Cancelled)),
                None => panic!("promise polled after its outcome was consumed"),
            }
        } else {
            if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                state.wakers.push(cx.waker().clone());
            }
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn settles_exactly_once() {
        let promise = Promise::new();
        assert!(promise.set_value(1));
        assert!(!promise.set_value(2));
        assert!(!promise.cancel());
        assert_eq!(futures::executor::block_on(promise).unwrap(), 1);
    }

    #[test]
    fn cancellation_settles_and_fires_the_token() {
        let promise: Promise<()> = Promise::new();
        let token = promise.cancel_token();
        assert!(!token.is_cancelled());
        assert!(promise.cancel());
        assert!(promise.is_cancelled());
        assert!(token.is_cancelled());
        assert!(matches!(
            futures::executor::block_on(promise),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn failures_are_carried_opaquely() {
        let promise: Promise<u32> = Promise::new();
        promise.set_failed(Box::new("kaput"));
        let err = futures::executor::block_on(promise).unwrap_err();
        let payload = err.into_failure().unwrap();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"kaput"));
    }

    #[test]
    fn done_callbacks_fire_once_each() {
        let promise = Promise::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let early = Arc::clone(&hits);
        promise.on_done(Box::new(move || {
            early.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        promise.set_value(());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let late = Arc::clone(&hits);
        promise.on_done(Box::new(move || {
            late.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
