use std::any::Any;
use std::fmt;

/// Opaque failure object carried through a chain without inspection.
///
/// This is the payload type [`std::panic::catch_unwind`] produces, so panics
/// in dispatched work travel as-is; an external runtime bridging its own
/// futures may box any error object into it instead.
pub type FailurePayload = Box<dyn Any + Send + 'static>;

/// Terminal state of a settled future slot.
pub enum Outcome<T> {
    /// Completed with a value.
    Value(T),
    /// Completed with an opaque failure.
    Failed(FailurePayload),
    /// Cancelled before completing.
    Cancelled,
}

impl<T> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(_) => f.write_str("Outcome::Value(..)"),
            Outcome::Failed(_) => f.write_str("Outcome::Failed(..)"),
            Outcome::Cancelled => f.write_str("Outcome::Cancelled"),
        }
    }
}

/// The minimal capability set a pending-result object needs to take part in
/// bridging.
///
/// Implemented by [`Promise`](crate::Promise); a foreign runtime's future
/// type joins a [`chain`](crate::chain) by implementing it too. Settling is
/// one-shot: the first of `set_value`, `set_failed`, and `cancel` wins, and
/// later attempts return `false` without touching the slot.
pub trait FutureLike<T> {
    /// Whether the slot has settled (value, failure, or cancellation).
    fn is_done(&self) -> bool;

    /// Whether the slot settled by cancellation.
    fn is_cancelled(&self) -> bool;

    /// Settles the slot with a value.
    fn set_value(&self, value: T) -> bool;

    /// Settles the slot with an opaque failure.
    fn set_failed(&self, failure: FailurePayload) -> bool;

    /// Requests cancellation, settling the slot if it was still pending.
    ///
    /// Whether in-flight work producing this slot actually stops is up to
    /// that work; cancellation is a request, not a guarantee.
    fn cancel(&self) -> bool;

    /// Takes the settled outcome.
    ///
    /// Returns `None` while pending, and again once the outcome has been
    /// consumed; a slot hands its outcome to exactly one taker.
    fn take_outcome(&self) -> Option<Outcome<T>>;

    /// Registers a callback invoked exactly once when the slot settles,
    /// immediately if it already has.
    fn on_done(&self, callback: Box<dyn FnOnce() + Send>);
}
