use crossloop_core::Promise;

/// Wraps a value as an already-completed promise.
///
/// Useful where an API expects a unit of work but the result is already at
/// hand; the returned promise reports done immediately and yields the value
/// to its first awaiter.
pub fn just<T>(value: T) -> Promise<T> {
    let promise = Promise::new();
    promise.set_value(value);
    promise
}
