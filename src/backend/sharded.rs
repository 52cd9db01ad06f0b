//! Round-robin over several channels, consumers take from whichever is ready.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Select, Sender};
use handoff_core::AddError;
use parking_lot::RwLock;

use super::{Backend, Retrieval, Retrieved};

/// How long a consumer waits on all shards before reporting empty.
pub const DEFAULT_TAKE_TIMEOUT: Duration = Duration::from_millis(50);

/// Several unbounded channels fed round-robin.
///
/// Items are FIFO per shard only; there is no ordering across shards.
#[derive(Debug)]
pub struct Sharded<T> {
    senders: RwLock<Option<Vec<Sender<T>>>>,
    receivers: Vec<Receiver<T>>,
    cursor: AtomicUsize,
    timeout: Duration,
}

impl<T> Sharded<T> {
    /// `shards` channels (at least one) with the default take timeout.
    #[must_use]
    pub fn new(shards: usize) -> Self {
        Self::with_timeout(shards, DEFAULT_TAKE_TIMEOUT)
    }

    /// `shards` channels (at least one); consumers wait at most `timeout`
    /// per retrieval.
    #[must_use]
    pub fn with_timeout(shards: usize, timeout: Duration) -> Self {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..shards.max(1)).map(|_| channel::unbounded()).unzip();
        Self {
            senders: RwLock::new(Some(senders)),
            receivers,
            cursor: AtomicUsize::new(0),
            timeout,
        }
    }

    /// Number of shards.
    #[must_use]
    pub fn shards(&self) -> usize {
        self.receivers.len()
    }

    /// Items queued across all shards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receivers.iter().map(Receiver::len).sum()
    }

    /// Whether every shard is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receivers.iter().all(Receiver::is_empty)
    }

    /// Take from the first non-empty shard once the senders are gone.
    fn drain_any(&self) -> Retrieved<T> {
        self.receivers
            .iter()
            .find_map(|receiver| receiver.try_recv().ok())
            .map_or(Retrieved::Finished, Retrieved::Item)
    }
}

impl<T: Send> Backend<T> for Sharded<T> {
    fn name(&self) -> &'static str {
        "sharded"
    }

    fn retrieval(&self) -> Retrieval {
        Retrieval::Polling
    }

    fn push(&self, item: T) -> Result<(), AddError<T>> {
        let guard = self.senders.read();
        let Some(senders) = guard.as_ref() else {
            return Err(AddError::Closed(item));
        };
        let shard = self.cursor.fetch_add(1, Ordering::Relaxed) % senders.len();
        senders[shard]
            .send(item)
            .map_err(|err| AddError::Closed(err.into_inner()))
    }

    fn retrieve(&self) -> Retrieved<T> {
        let mut select = Select::new();
        for receiver in &self.receivers {
            select.recv(receiver);
        }
        let Ok(operation) = select.select_timeout(self.timeout) else {
            return Retrieved::Empty;
        };
        let index = operation.index();
        match operation.recv(&self.receivers[index]) {
            Ok(item) => Retrieved::Item(item),
            Err(_) => self.drain_any(),
        }
    }

    fn complete(&self) {
        drop(self.senders.write().take());
    }
}
