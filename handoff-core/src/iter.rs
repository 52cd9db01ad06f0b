//! Consuming iterator over a [`BlockingQueue`].

use core::iter::FusedIterator;

use crate::queue::BlockingQueue;

/// Yields items by blocking [`take`](BlockingQueue::take) until the queue is
/// closed and drained.
///
/// Several iterators may drain the same queue from different threads; each
/// item is yielded by exactly one of them.
pub struct ConsumingIter<'a, T> {
    queue: &'a BlockingQueue<T>,
    done: bool,
}

impl<'a, T> ConsumingIter<'a, T> {
    pub(crate) fn new(queue: &'a BlockingQueue<T>) -> Self {
        Self { queue, done: false }
    }
}

impl<T> Iterator for ConsumingIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.done {
            return None;
        }
        match self.queue.take() {
            Ok(item) => Some(item),
            Err(_) => {
                self.done = true;
                None
            }
        }
    }
}

impl<T> FusedIterator for ConsumingIter<'_, T> {}
