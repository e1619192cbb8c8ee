use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crossloop_core::{Error, Promise};

/// Scoped ownership of a promise: awaitable, and cancelled when dropped
/// before completing.
///
/// This makes "await this unless we leave the scope first" the default. On
/// every exit path, including early returns and unwinding, the underlying
/// work gets a cancellation request; finishing normally costs nothing,
/// since cancelling a settled promise is a no-op.
pub struct CancelOnDrop<T> {
    promise: Option<Promise<T>>,
}

impl<T> CancelOnDrop<T> {
    /// Takes scoped ownership of `promise`.
    pub fn new(promise: Promise<T>) -> Self {
        CancelOnDrop {
            promise: Some(promise),
        }
    }

    /// Releases the promise without cancelling it.
    pub fn detach(mut self) -> Promise<T> {
        self.promise.take().unwrap()
    }

    /// The promise under guard.
    pub fn promise(&self) -> &Promise<T> {
        self.promise.as_ref().unwrap()
    }
}

impl<T> Drop for CancelOnDrop<T> {
    fn drop(&mut self) {
        if let Some(promise) = self.promise.take() {
            promise.cancel();
        }
    }
}

impl<T> Future for CancelOnDrop<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.promise.as_mut() {
            Some(promise) => Pin::new(promise).poll(cx),
            None => panic!("scoped promise polled after detach"),
        }
    }
}
