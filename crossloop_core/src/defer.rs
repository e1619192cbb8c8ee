//! Drop guard for cleanup that must run on every exit path.

/// Guard returned by [`defer`]; runs its closure when dropped.
#[must_use = "assign the guard to a binding, or it runs immediately"]
pub(crate) struct Defer<F: FnOnce()>(Option<F>);

/// Returns a guard that runs `f` when dropped.
pub(crate) fn defer<F: FnOnce()>(f: F) -> Defer<F> {
    Defer(Some(f))
}

impl<F: FnOnce()> Drop for Defer<F> {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}
