//! Error types for queue and countdown operations.

use core::fmt;

use snafu::Snafu;

/// Error returned when [`BlockingQueue::add`](crate::BlockingQueue::add)
/// is called after the queue has been closed.
///
/// The item is returned so the caller can decide what to do with it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum AddError<T> {
    /// The queue no longer accepts items.
    Closed(T),
}

impl<T> AddError<T> {
    /// Extract the item that was rejected.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            AddError::Closed(item) => item,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AddError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddError::Closed(item) => f.debug_tuple("Closed").field(item).finish(),
        }
    }
}

impl<T> fmt::Display for AddError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddError::Closed(_) => f.write_str("queue is closed to new items"),
        }
    }
}

impl<T: fmt::Debug> core::error::Error for AddError<T> {}

/// Error returned by the blocking retrieval operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TakeError {
    /// The queue is closed and nothing is left to hand out.
    #[snafu(display("queue is closed and empty"))]
    ClosedEmpty,

    /// No item arrived before the deadline.
    #[snafu(display("timed out waiting for an item"))]
    TimedOut,
}

/// Error returned by [`Countdown::signal`](crate::Countdown::signal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SignalError {
    /// The countdown was already at zero.
    #[snafu(display("countdown signalled more times than its initial count"))]
    Overdrawn,
}

/// Error returned by [`Countdown::wait`](crate::Countdown::wait) and
/// [`Countdown::wait_timeout`](crate::Countdown::wait_timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum WaitError {
    /// The countdown was aborted before reaching zero.
    #[snafu(display("countdown aborted with {remaining} signals outstanding"))]
    Aborted {
        /// Signals still outstanding at the time of the abort.
        remaining: usize,
    },

    /// The timeout elapsed before the countdown reached zero.
    #[snafu(display("countdown still had {remaining} signals outstanding at the deadline"))]
    Elapsed {
        /// Signals still outstanding at the deadline.
        remaining: usize,
    },
}

impl WaitError {
    /// Signals that were still outstanding when the wait gave up.
    #[must_use]
    pub fn remaining(&self) -> usize {
        match *self {
            WaitError::Aborted { remaining } | WaitError::Elapsed { remaining } => remaining,
        }
    }
}
