//! Core primitives for handoff: a lock-and-condvar blocking queue, a
//! countdown latch, and a deterministic work simulator.
//!
//! These are the pieces shared by every producer/consumer experiment. The
//! experiment harness and the pluggable backends live in the `handoff` crate.

#![warn(missing_docs)]

mod countdown;
mod error;
mod iter;
mod queue;
mod work;


pub use countdown::Countdown;
pub use error::{AddError, SignalError, TakeError, WaitError};
pub use iter::ConsumingIter;
pub use queue::BlockingQueue;
pub use work::WorkSimulator;
