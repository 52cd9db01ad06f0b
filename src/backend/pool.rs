//! Fixed worker pool fed through one shared channel.

use std::io;
use std::thread::{self, Scope, ScopedJoinHandle};

use handoff_core::AddError;

use super::{Backend, Channel, Handler, Retrieval, Retrieved};

/// A work queue with its own workers.
///
/// Producers push into a shared unbounded channel. The harness does not
/// consume; instead [`dispatch`](Backend::dispatch) starts one `pool-N`
/// thread per worker, each handing items to the harness's handler until the
/// channel is completed and drained.
///
/// Outside a dispatch run the channel can still be read with
/// [`retrieve`](Backend::retrieve).
#[derive(Debug)]
pub struct Pool<T> {
    queue: Channel<T>,
}

impl<T> Pool<T> {
    /// Empty pool queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Channel::unbounded(),
        }
    }

    /// Items waiting for a worker.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no item is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Pool<T> {
    fn work(&self, worker: usize, handler: &Handler<'_, T>) -> usize {
        let mut handled = 0;
        while let Retrieved::Item(item) = self.queue.retrieve() {
            if handler(worker, item).is_break() {
                break;
            }
            handled += 1;
        }
        handled
    }
}

impl<T: Send> Backend<T> for Pool<T> {
    fn name(&self) -> &'static str {
        "pool"
    }

    fn retrieval(&self) -> Retrieval {
        Retrieval::Dispatch
    }

    #[inline]
    fn push(&self, item: T) -> Result<(), AddError<T>> {
        self.queue.push(item)
    }

    fn retrieve(&self) -> Retrieved<T> {
        self.queue.retrieve()
    }

    fn complete(&self) {
        self.queue.complete();
    }

    fn dispatch<'scope>(
        &'scope self,
        scope: &'scope Scope<'scope, '_>,
        workers: usize,
        handler: &'scope Handler<'scope, T>,
    ) -> Vec<io::Result<ScopedJoinHandle<'scope, usize>>> {
        (0..workers)
            .map(|worker| {
                thread::Builder::new()
                    .name(format!("pool-{worker}"))
                    .spawn_scoped(scope, move || self.work(worker, handler))
            })
            .collect()
    }
}
