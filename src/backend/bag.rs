//! Unordered bag: several LIFO slots, consumers take from whichever has items.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use handoff_core::AddError;
use parking_lot::Mutex;

use super::{Backend, Retrieval, Retrieved};

/// Items spread round-robin over `slots` stacks.
///
/// There is no ordering guarantee at all: each slot hands out its newest
/// item first, and consumers start their scan at rotating slots.
///
/// `complete` raises `closed`, then passes through every slot lock once
/// before raising `sealed`. A push checks `closed` while holding its slot
/// lock, so once `sealed` is visible every accepted item is in a slot.
#[derive(Debug)]
pub struct Bag<T> {
    slots: Box<[Mutex<Vec<T>>]>,
    push_cursor: AtomicUsize,
    take_cursor: AtomicUsize,
    closed: AtomicBool,
    sealed: AtomicBool,
}

impl<T> Bag<T> {
    /// Bag with `slots` stacks (at least one).
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            slots: (0..slots.max(1)).map(|_| Mutex::new(Vec::new())).collect(),
            push_cursor: AtomicUsize::new(0),
            take_cursor: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            sealed: AtomicBool::new(false),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn slots(&self) -> usize {
        self.slots.len()
    }

    /// Items held across all slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().map(|slot| slot.lock().len()).sum()
    }

    /// Whether every slot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.lock().is_empty())
    }

    fn take_any(&self) -> Option<T> {
        let start = self.take_cursor.fetch_add(1, Ordering::Relaxed);
        let n = self.slots.len();
        (0..n).find_map(|offset| self.slots[(start + offset) % n].lock().pop())
    }
}

impl<T: Send> Backend<T> for Bag<T> {
    fn name(&self) -> &'static str {
        "bag"
    }

    fn retrieval(&self) -> Retrieval {
        Retrieval::Polling
    }

    fn push(&self, item: T) -> Result<(), AddError<T>> {
        let slot = self.push_cursor.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let mut slot = self.slots[slot].lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(AddError::Closed(item));
        }
        slot.push(item);
        Ok(())
    }

    fn retrieve(&self) -> Retrieved<T> {
        if let Some(item) = self.take_any() {
            return Retrieved::Item(item);
        }
        if !self.sealed.load(Ordering::Acquire) {
            return Retrieved::Empty;
        }
        self.take_any().map_or(Retrieved::Finished, Retrieved::Item)
    }

    fn complete(&self) {
        self.closed.store(true, Ordering::Release);
        for slot in self.slots.iter() {
            drop(slot.lock());
        }
        self.sealed.store(true, Ordering::Release);
    }
}
