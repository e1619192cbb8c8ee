use std::fmt;
use std::future::Future;

use futures::future::{join_all, select_all};

/// Error returned by [`wait_any`] and [`wait_all`] when given nothing to
/// wait on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyInput;

impl fmt::Display for EmptyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("there is nothing to wait on")
    }
}

impl std::error::Error for EmptyInput {}

/// Waits for the first of `futures` to complete.
///
/// Returns the completed output, its index in the input, and the remaining
/// futures, untouched and still pending, ready to be awaited again.
pub async fn wait_any<F>(futures: Vec<F>) -> Result<(F::Output, usize, Vec<F>), EmptyInput>
where
    F: Future + Unpin,
{
    if futures.is_empty() {
        return Err(EmptyInput);
    }
    Ok(select_all(futures).await)
}

/// Waits for every future in `futures`, returning the outputs in input
/// order.
pub async fn wait_all<F>(futures: Vec<F>) -> Result<Vec<F::Output>, EmptyInput>
where
    F: Future,
{
    if futures.is_empty() {
        return Err(EmptyInput);
    }
    Ok(join_all(futures).await)
}
