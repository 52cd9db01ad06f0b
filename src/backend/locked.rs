//! The baseline [`BlockingQueue`] as a backend, consumed two ways.

use handoff_core::{AddError, BlockingQueue, TakeError};

use super::{Backend, Retrieval, Retrieved};

impl<T: Send> Backend<T> for BlockingQueue<T> {
    fn name(&self) -> &'static str {
        "locked"
    }

    fn retrieval(&self) -> Retrieval {
        Retrieval::Blocking
    }

    #[inline]
    fn push(&self, item: T) -> Result<(), AddError<T>> {
        self.add(item)
    }

    #[inline]
    fn retrieve(&self) -> Retrieved<T> {
        match self.take() {
            Ok(item) => Retrieved::Item(item),
            Err(TakeError::ClosedEmpty) => Retrieved::Finished,
            Err(TakeError::TimedOut) => Retrieved::Empty,
        }
    }

    fn complete(&self) {
        self.close();
    }
}

/// A [`BlockingQueue`] whose consumers poll instead of parking.
///
/// Isolates the cost of the lock from the cost of the condvar handoff.
#[derive(Debug)]
pub struct Polled<T> {
    queue: BlockingQueue<T>,
}

impl<T> Polled<T> {
    /// Wrap a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: BlockingQueue::new(),
        }
    }

    /// The underlying queue.
    #[must_use]
    pub fn queue(&self) -> &BlockingQueue<T> {
        &self.queue
    }
}

impl<T> Default for Polled<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Backend<T> for Polled<T> {
    fn name(&self) -> &'static str {
        "locked-poll"
    }

    fn retrieval(&self) -> Retrieval {
        Retrieval::Polling
    }

    #[inline]
    fn push(&self, item: T) -> Result<(), AddError<T>> {
        self.queue.add(item)
    }

    #[inline]
    fn retrieve(&self) -> Retrieved<T> {
        match self.queue.poll() {
            Ok(Some(item)) => Retrieved::Item(item),
            Ok(None) => Retrieved::Empty,
            Err(_) => Retrieved::Finished,
        }
    }

    fn complete(&self) {
        self.queue.close();
    }
}
