use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::future_like::FailurePayload;

/// Error type for scheduler lifecycle misuse and settled-work failures.
///
/// Lifecycle errors (`NotRunning`, `AlreadyStarted`, `LoopConstruction`) are
/// raised synchronously at the call that violated the contract. `Cancelled`
/// and `Failed` only ever surface from an awaited [`Promise`](crate::Promise).
pub enum Error {
    /// The scheduler thread has not completed startup, or its loop already
    /// exited.
    NotRunning,
    /// The scheduler thread was started once and has since stopped; the
    /// underlying OS thread cannot be reused.
    AlreadyStarted,
    /// The background thread failed to construct its runtime.
    LoopConstruction(io::Error),
    /// The awaited work was cancelled before producing a value.
    Cancelled,
    /// The awaited work failed; the original payload is carried unmodified.
    Failed(FailurePayload),
}

impl Error {
    /// Returns the transported failure payload, if this error carries one.
    ///
    /// Callers that want panic semantics back can hand the payload to
    /// [`std::panic::resume_unwind`].
    pub fn into_failure(self) -> Option<FailurePayload> {
        match self {
            Error::Failed(payload) => Some(payload),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotRunning => f.write_str("scheduler loop is not running"),
            Error::AlreadyStarted => {
                f.write_str("scheduler threads can only be started once")
            }
            Error::LoopConstruction(err) => {
                write!(f, "failed to construct the scheduler loop: {err}")
            }
            Error::Cancelled => f.write_str("work was cancelled before completing"),
            Error::Failed(_) => f.write_str("work failed; the payload is opaque"),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotRunning => f.write_str("NotRunning"),
            Error::AlreadyStarted => f.write_str("AlreadyStarted"),
            Error::LoopConstruction(err) => {
                f.debug_tuple("LoopConstruction").field(err).finish()
            }
            Error::Cancelled => f.write_str("Cancelled"),
            Error::Failed(_) => f.write_str("Failed(..)"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::LoopConstruction(err) => Some(err),
            _ => None,
        }
    }
}
