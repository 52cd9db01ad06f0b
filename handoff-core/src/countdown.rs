//! One-shot countdown latch.
//!
//! The remaining count lives in an atomic so consumers can decrement and poll
//! it without touching the mutex. The mutex and condvar exist only for the
//! waiter: the signal that reaches zero (or an abort) notifies while holding
//! the lock, and the waiter re-checks under the same lock, so the wakeup
//! cannot be lost.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{AbortedSnafu, ElapsedSnafu, OverdrawnSnafu, SignalError, WaitError};

/// Counts outstanding work down to zero and releases whoever waits on it.
pub struct Countdown {
    initial: usize,
    remaining: AtomicUsize,
    aborted: AtomicBool,
    lock: Mutex<()>,
    zero: Condvar,
}

impl Countdown {
    /// Create a countdown expecting `count` signals.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            initial: count,
            remaining: AtomicUsize::new(count),
            aborted: AtomicBool::new(false),
            lock: Mutex::new(()),
            zero: Condvar::new(),
        }
    }

    /// The count this countdown was created with.
    #[inline]
    #[must_use]
    pub fn initial(&self) -> usize {
        self.initial
    }

    /// Signals still outstanding.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Whether the count has reached zero.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.remaining() == 0
    }

    /// Whether [`abort`](Self::abort) has been called.
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Decrement by one and return the new remaining count.
    ///
    /// Fails with [`SignalError::Overdrawn`] if the count is already zero;
    /// the count is left untouched in that case.
    pub fn signal(&self) -> Result<usize, SignalError> {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map_err(|_| OverdrawnSnafu.build())?;

        if previous == 1 {
            let _guard = self.lock.lock();
            self.zero.notify_all();
        }
        Ok(previous - 1)
    }

    /// Release the waiter without reaching zero. Idempotent.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
        let _guard = self.lock.lock();
        self.zero.notify_all();
    }

    /// Block until the count reaches zero.
    ///
    /// Returns [`WaitError::Aborted`] if the countdown is aborted first. A
    /// countdown that reached zero reports success even if it was aborted
    /// afterwards.
    pub fn wait(&self) -> Result<(), WaitError> {
        let mut guard = self.lock.lock();
        loop {
            if let Some(outcome) = self.settle(false) {
                return outcome;
            }
            self.zero.wait(&mut guard);
        }
    }

    /// Like [`wait`](Self::wait), but gives up with [`WaitError::Elapsed`]
    /// after `timeout`.
    ///
    /// An abort seen together with the deadline is still reported as
    /// [`WaitError::Aborted`].
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), WaitError> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        let mut timed_out = false;
        loop {
            if let Some(outcome) = self.settle(timed_out) {
                return outcome;
            }
            timed_out = self.zero.wait_until(&mut guard, deadline).timed_out();
        }
    }

    /// Decide a wait from the current state: zero beats abort beats deadline.
    /// `None` means keep waiting.
    pub(crate) fn settle(&self, timed_out: bool) -> Option<Result<(), WaitError>> {
        if self.is_set() {
            return Some(Ok(()));
        }
        let remaining = self.remaining();
        if self.is_aborted() {
            return Some(AbortedSnafu { remaining }.fail());
        }
        if timed_out {
            return Some(ElapsedSnafu { remaining }.fail());
        }
        None
    }
}

impl fmt::Debug for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Countdown")
            .field("initial", &self.initial)
            .field("remaining", &self.remaining())
            .field("aborted", &self.is_aborted())
            .finish()
    }
}
