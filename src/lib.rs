//! Producer/consumer load harness for comparing blocking-queue backends.
//!
//! A run starts `producers` threads that each push `repeats` [`Ticket`]s into
//! a [`Backend`], and `consumers` threads that retrieve them and burn a fixed
//! amount of simulated work per item. The run ends once every ticket has been
//! processed exactly once.
//!
//! ```
//! use handoff::{BackendKind, HarnessConfig, LoadHarness};
//!
//! let config = HarnessConfig::new(3, 2, 100).with_workload(10);
//! let harness = LoadHarness::new(config)?;
//!
//! for kind in BackendKind::ALL {
//!     let summary = harness.run_variant(kind)?;
//!     assert_eq!(summary.total_processed(), 300);
//! }
//! # Ok::<(), handoff::HarnessError>(())
//! ```
//!
//! The queue primitives live in [`handoff_core`] and are re-exported here.

#![warn(missing_docs)]

pub mod backend;
mod config;
mod error;
mod harness;

#[cfg(test)]
mod tests;

pub use backend::{Backend, BackendKind, ParseBackendError, Retrieval, Retrieved};
pub use config::{ConfigError, HarnessConfig};
pub use error::{HarnessError, Role};
pub use harness::{LoadHarness, RunSummary, Ticket};

pub use handoff_core::{
    AddError, BlockingQueue, ConsumingIter, Countdown, SignalError, TakeError, WaitError,
    WorkSimulator,
};
