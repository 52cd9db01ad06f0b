//! Backends built on crossbeam channels.

use std::time::Duration;

use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender};
use handoff_core::AddError;
use parking_lot::RwLock;

use super::{Backend, Retrieval, Retrieved};

/// How long a producer blocked on a full channel waits before re-checking
/// whether the channel was completed.
const SEND_RECHECK: Duration = Duration::from_millis(5);

/// A crossbeam channel whose completion drops the only sender.
///
/// The sender sits behind a lock: pushes share it, [`complete`] takes it
/// exclusively and drops it, so no push can succeed after `complete`
/// returns. Consumers see the disconnect once the channel is drained.
///
/// [`complete`]: Backend::complete
#[derive(Debug)]
pub struct Channel<T> {
    sender: RwLock<Option<Sender<T>>>,
    receiver: Receiver<T>,
    retrieval: Retrieval,
}

impl<T> Channel<T> {
    /// Unbounded channel consumed as a stream.
    #[must_use]
    pub fn unbounded() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self::from_parts(sender, receiver, Retrieval::Stream)
    }

    /// Channel holding at most `capacity` items; producers block when it is
    /// full.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = channel::bounded(capacity);
        Self::from_parts(sender, receiver, Retrieval::Blocking)
    }

    fn from_parts(sender: Sender<T>, receiver: Receiver<T>, retrieval: Retrieval) -> Self {
        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            retrieval,
        }
    }

    /// Channel capacity, `None` if unbounded.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.receiver.capacity()
    }

    /// Items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether the channel is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T: Send> Backend<T> for Channel<T> {
    fn name(&self) -> &'static str {
        match self.capacity() {
            Some(_) => "bounded",
            None => "unbounded",
        }
    }

    fn retrieval(&self) -> Retrieval {
        self.retrieval
    }

    fn push(&self, mut item: T) -> Result<(), AddError<T>> {
        loop {
            // Released between attempts so `complete` is never starved by a
            // producer parked on a full channel.
            let guard = self.sender.read();
            let Some(sender) = guard.as_ref() else {
                return Err(AddError::Closed(item));
            };
            match sender.send_timeout(item, SEND_RECHECK) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(back)) => item = back,
                Err(SendTimeoutError::Disconnected(back)) => return Err(AddError::Closed(back)),
            }
        }
    }

    fn retrieve(&self) -> Retrieved<T> {
        match self.receiver.recv() {
            Ok(item) => Retrieved::Item(item),
            Err(_) => Retrieved::Finished,
        }
    }

    fn complete(&self) {
        drop(self.sender.write().take());
    }
}
