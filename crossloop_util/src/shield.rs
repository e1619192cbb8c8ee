use crossloop_core::{chain_forward, Promise};

/// Shields `inner` from cancellation through the returned view.
///
/// Completion still flows through: once `inner` settles, the returned
/// promise settles the same way. Cancelling the returned promise, however,
/// does not reach back; the producing side runs to its own conclusion and
/// keeps its outcome for another taker.
pub fn shield<T: Send + 'static>(inner: &Promise<T>) -> Promise<T> {
    let outer = Promise::new();
    chain_forward(inner.clone(), outer.clone(), None);
    outer
}
