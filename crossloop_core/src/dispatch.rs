use std::future::Future;
use std::sync::Arc;

use crate::bridge::chain;
use crate::defer::defer;
use crate::error::Error;
use crate::handle::LoopHandle;
use crate::promise::Promise;

/// Runs `work` on `target` and awaits its outcome from `caller`.
///
/// `caller` defaults to the calling thread's own loop, if any. When caller
/// and target point at the same loop (compared by loop identity, not by
/// wrapper), `work` runs inline with no cross-thread hop and no wrapping; a
/// panic there unwinds synchronously like any direct call.
///
/// Otherwise `work` is submitted to `target` and the result is bridged back
/// to a promise under the caller's affinity. Dropping the in-flight dispatch
/// (for example because the awaiting task was torn down) cancels that
/// promise, which flows backward into a cancellation request against the
/// work on `target`.
pub async fn dispatch<F>(
    work: F,
    target: &LoopHandle,
    caller: Option<LoopHandle>,
) -> Result<F::Output, Error>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let caller = caller.or_else(LoopHandle::current);
    if caller.as_ref() == Some(target) {
        return Ok(work.await);
    }

    let source = target.spawn(work)?;
    let observed = Promise::new();
    chain(source, Some(target.clone()), observed.clone(), caller);

    let _abandon = defer({
        let observed = observed.clone();
        move || {
            observed.cancel();
        }
    });
    observed.await
}

/// Picks the loop a dispatched call lands on.
///
/// A `Resolver` is invoked freshly on every call, so it can point at a
/// scheduler that does not exist yet when the wrapper is built.
#[derive(Clone)]
pub enum LoopSelector {
    /// Always the same loop.
    Fixed(LoopHandle),
    /// Resolved per call.
    Resolver(Arc<dyn Fn() -> LoopHandle + Send + Sync>),
}

impl LoopSelector {
    /// Selector bound to one loop.
    pub fn fixed(handle: LoopHandle) -> Self {
        LoopSelector::Fixed(handle)
    }

    /// Selector re-resolved on every call.
    pub fn resolver(f: impl Fn() -> LoopHandle + Send + Sync + 'static) -> Self {
        LoopSelector::Resolver(Arc::new(f))
    }

    fn resolve(&self) -> LoopHandle {
        match self {
            LoopSelector::Fixed(handle) => handle.clone(),
            LoopSelector::Resolver(resolver) => resolver(),
        }
    }
}

impl From<LoopHandle> for LoopSelector {
    fn from(handle: LoopHandle) -> Self {
        LoopSelector::Fixed(handle)
    }
}

/// Wraps an async function so every call runs on a selected loop.
///
/// The wrapped function builds its future on the calling side, before the
/// hop; a panic while binding arguments therefore surfaces synchronously to
/// the caller instead of through the cross-loop path.
pub struct DispatchTo<F> {
    selector: LoopSelector,
    func: F,
}

impl<F> DispatchTo<F> {
    /// Wraps `func` so calls dispatch to the loop picked by `selector`.
    pub fn new(selector: impl Into<LoopSelector>, func: F) -> Self {
        DispatchTo {
            selector: selector.into(),
            func,
        }
    }

    /// Calls the wrapped function with `input` on the selected loop.
    pub async fn call<I, Fut>(&self, input: I) -> Result<Fut::Output, Error>
    where
        F: Fn(I) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let target = self.selector.resolve();
        let caller = LoopHandle::current();
        let work = (self.func)(input);
        dispatch(work, &target, caller).await
    }
}

/// Builds a [`DispatchTo`] wrapper around `func`.
pub fn dispatch_to<F>(selector: impl Into<LoopSelector>, func: F) -> DispatchTo<F> {
    DispatchTo::new(selector, func)
}
