//! Lock-free backend built on crossbeam's segmented queue.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam::queue::SegQueue;
use handoff_core::AddError;

use super::{Backend, Retrieval, Retrieved};

/// Unbounded lock-free queue with a completion flag.
///
/// `SegQueue` has no notion of closing, so pushes register themselves in an
/// in-flight counter before checking the flag. A consumer only reports
/// [`Retrieved::Finished`] once the flag is set and no push is in flight,
/// which means no accepted item can still be on its way into the queue.
#[derive(Debug)]
pub struct Segmented<T> {
    queue: SegQueue<T>,
    closed: AtomicBool,
    in_flight: AtomicUsize,
}

impl<T> Segmented<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
            closed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for Segmented<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Backend<T> for Segmented<T> {
    fn name(&self) -> &'static str {
        "segqueue"
    }

    fn retrieval(&self) -> Retrieval {
        Retrieval::Polling
    }

    fn push(&self, item: T) -> Result<(), AddError<T>> {
        // SeqCst pairs the counter with the flag: a consumer that sees
        // `closed` and then a zero counter also sees every accepted push.
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(AddError::Closed(item));
        }
        self.queue.push(item);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn retrieve(&self) -> Retrieved<T> {
        if let Some(item) = self.queue.pop() {
            return Retrieved::Item(item);
        }
        if !self.closed.load(Ordering::SeqCst) || self.in_flight.load(Ordering::SeqCst) != 0 {
            return Retrieved::Empty;
        }
        match self.queue.pop() {
            Some(item) => Retrieved::Item(item),
            None => Retrieved::Finished,
        }
    }

    fn complete(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
