//! Unbounded FIFO queue guarded by a single mutex and condition variable.
//!
//! Every operation takes the same lock, so the queue is linearizable but
//! fully serialized under contention. Producers never block. Consumers
//! blocked in [`BlockingQueue::take`] or [`BlockingQueue::first`] are woken
//! by broadcast on every [`add`](BlockingQueue::add) and on
//! [`close`](BlockingQueue::close), and re-check the queue state on each
//! wake.
//!
//! # Example
//!
//! ```
//! use handoff_core::{BlockingQueue, TakeError};
//! use std::thread;
//!
//! let queue = BlockingQueue::new();
//!
//! thread::scope(|s| {
//!     s.spawn(|| {
//!         for i in 0..100 {
//!             queue.add(i).unwrap();
//!         }
//!         queue.close();
//!     });
//!
//!     let mut received = Vec::new();
//!     loop {
//!         match queue.take() {
//!             Ok(item) => received.push(item),
//!             Err(TakeError::ClosedEmpty) => break,
//!             Err(e) => panic!("{e}"),
//!         }
//!     }
//!     assert_eq!(received, (0..100).collect::<Vec<_>>());
//! });
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use snafu::ensure;

use crate::error::{AddError, ClosedEmptySnafu, TakeError, TimedOutSnafu};
use crate::iter::ConsumingIter;

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Mutex + condvar blocking queue with a one-way close switch.
pub struct BlockingQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> BlockingQueue<T> {
    /// Create an empty, open queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Create an empty queue with room for `capacity` items before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append an item to the tail and wake every blocked consumer.
    ///
    /// The closed flag is checked under the lock that [`close`](Self::close)
    /// takes, so once `close` has returned every later `add` is rejected.
    pub fn add(&self, item: T) -> Result<(), AddError<T>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(AddError::Closed(item));
        }
        state.items.push_back(item);
        drop(state);

        self.available.notify_all();
        Ok(())
    }

    /// Remove the head if there is one. Never blocks, ignores the closed flag.
    #[must_use]
    pub fn try_take(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    /// Remove the head if there is one, without blocking.
    ///
    /// Unlike [`try_take`](Self::try_take), an empty closed queue is reported
    /// as [`TakeError::ClosedEmpty`]. Emptiness and the closed flag are read
    /// under one lock acquisition.
    pub fn poll(&self) -> Result<Option<T>, TakeError> {
        let mut state = self.state.lock();
        match state.items.pop_front() {
            Some(item) => Ok(Some(item)),
            None if state.closed => ClosedEmptySnafu.fail(),
            None => Ok(None),
        }
    }

    /// Remove the head, blocking until an item arrives.
    ///
    /// Fails with [`TakeError::ClosedEmpty`] once the queue is closed and
    /// drained.
    pub fn take(&self) -> Result<T, TakeError> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Ok(item);
            }
            ensure!(!state.closed, ClosedEmptySnafu);
            self.available.wait(&mut state);
        }
    }

    /// Like [`take`](Self::take), but gives up with [`TakeError::TimedOut`]
    /// after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        let mut timed_out = false;
        loop {
            if let Some(item) = state.items.pop_front() {
                return Ok(item);
            }
            ensure!(!state.closed, ClosedEmptySnafu);
            ensure!(!timed_out, TimedOutSnafu);
            timed_out = self.available.wait_until(&mut state, deadline).timed_out();
        }
    }

    /// Mark the queue closed and wake every blocked consumer. Idempotent.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Close the queue and release its storage.
    ///
    /// Returns the number of items that were still queued. They are dropped
    /// after the lock is released. Safe to call more than once.
    pub fn dispose(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        let items = core::mem::take(&mut state.items);
        drop(state);

        self.available.notify_all();
        items.len()
    }

    /// Whether [`close`](Self::close) or [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of queued items at the time of the call.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether the queue was empty at the time of the call.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Iterate by repeated [`take`](Self::take) until the queue is closed and
    /// drained.
    pub fn consuming_iter(&self) -> ConsumingIter<'_, T> {
        ConsumingIter::new(self)
    }
}

impl<T: Clone> BlockingQueue<T> {
    /// Clone the head without removing it, blocking until an item arrives.
    ///
    /// Same failure contract as [`take`](Self::take).
    pub fn first(&self) -> Result<T, TakeError> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.front() {
                return Ok(item.clone());
            }
            ensure!(!state.closed, ClosedEmptySnafu);
            self.available.wait(&mut state);
        }
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlockingQueue")
            .field("len", &state.items.len())
            .field("closed", &state.closed)
            .finish()
    }
}
