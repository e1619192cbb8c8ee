//! Completion and cancellation linkage between futures that may live under
//! different loop affinities.
//!
//! A future whose mutating operations belong to a particular loop is never
//! touched from a foreign thread; the mutation is redirected through that
//! loop's [`call_soon`](LoopHandle::call_soon) instead. Futures with no
//! recorded affinity synchronize internally and are mutated in place.

use crate::future_like::{FutureLike, Outcome};
use crate::handle::LoopHandle;
use crate::promise::Promise;

fn call_on_loop(affinity: Option<&LoopHandle>, body: impl FnOnce() + Send + 'static) {
    match affinity {
        Some(handle) => {
            if handle.call_soon(body).is_err() {
                // The owning loop is gone; its futures went down with it.
                log::trace!("dropping a future mutation aimed at a stopped loop");
            }
        }
        None => body(),
    }
}

/// Links `source` to `destination`: completion flows forward, cancellation
/// flows backward.
///
/// When `source` settles, its outcome is applied to `destination` on
/// `destination_loop`, unless `destination` already settled by other means,
/// in which case the propagation is dropped. When `destination` settles by
/// cancellation, the cancellation is forwarded to `source` on `source_loop`.
/// If both sides settle near-simultaneously, whichever lands first wins and
/// the late propagation is a no-op.
pub fn chain<T, S, D>(
    source: S,
    source_loop: Option<LoopHandle>,
    destination: D,
    destination_loop: Option<LoopHandle>,
) where
    T: Send + 'static,
    S: FutureLike<T> + Clone + Send + 'static,
    D: FutureLike<T> + Clone + Send + 'static,
{
    chain_forward(source.clone(), destination.clone(), destination_loop);

    let observed = destination.clone();
    destination.on_done(Box::new(move || {
        if observed.is_cancelled() {
            call_on_loop(source_loop.as_ref(), move || {
                source.cancel();
            });
        }
    }));
}

/// The forward half of [`chain`]: completion propagates from `source` to
/// `destination`, but cancelling `destination` leaves `source` untouched.
///
/// This is the primitive behind shielding a producer from consumer-side
/// cancellation. A `source` whose outcome is declined (because the
/// destination already settled) keeps it for another taker.
pub fn chain_forward<T, S, D>(source: S, destination: D, destination_loop: Option<LoopHandle>)
where
    T: Send + 'static,
    S: FutureLike<T> + Clone + Send + 'static,
    D: FutureLike<T> + Clone + Send + 'static,
{
    let settled = source.clone();
    source.on_done(Box::new(move || {
        if destination.is_cancelled() || destination.is_done() {
            return;
        }
        match settled.take_outcome() {
            Some(Outcome::Cancelled) => call_on_loop(destination_loop.as_ref(), move || {
                destination.cancel();
            }),
            Some(Outcome::Failed(failure)) => {
                call_on_loop(destination_loop.as_ref(), move || {
                    destination.set_failed(failure);
                })
            }
            Some(Outcome::Value(value)) => call_on_loop(destination_loop.as_ref(), move || {
                destination.set_value(value);
            }),
            // Someone else consumed the outcome already.
            None => {}
        }
    }));
}

/// Wraps a promise settled under `source_loop` into a fresh promise
/// observable under the calling context's own affinity.
pub fn wrap<T: Send + 'static>(source: &Promise<T>, source_loop: &LoopHandle) -> Promise<T> {
    let observed = Promise::new();
    chain(
        source.clone(),
        Some(source_loop.clone()),
        observed.clone(),
        LoopHandle::current(),
    );
    observed
}
