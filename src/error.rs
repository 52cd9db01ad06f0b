//! Error types for harness runs.

use core::fmt;
use std::time::Duration;

use handoff_core::SignalError;
use snafu::Snafu;

use crate::config::ConfigError;

/// Which side of the experiment a worker thread belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Pushes tickets into the backend.
    Producer,
    /// Retrieves tickets and runs the work simulator.
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => f.write_str("producer"),
            Role::Consumer => f.write_str("consumer"),
        }
    }
}

/// Error returned when a harness run cannot complete.
///
/// Any of these aborts the run: the backend is still completed exactly once
/// and every worker is joined before the first recorded failure is returned.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HarnessError {
    /// The configuration was rejected before anything started.
    #[snafu(display("invalid harness configuration"))]
    Config {
        /// What was wrong with it.
        source: ConfigError,
    },

    /// The OS refused to start a worker thread.
    #[snafu(display("failed to spawn {role} thread {index}"))]
    Spawn {
        /// Role of the thread that failed to start.
        role: Role,
        /// Index of the thread within its role.
        index: usize,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The backend refused an item because it had already been completed.
    #[snafu(display(
        "backend rejected item {seq} from producer {producer}: completed before producers finished"
    ))]
    PushRejected {
        /// Producer that was refused.
        producer: usize,
        /// Sequence number of the refused item.
        seq: usize,
    },

    /// A consumer processed more items than the run expected.
    #[snafu(display("consumer {consumer} signalled the countdown past zero"))]
    Overdrawn {
        /// Consumer that overdrew the countdown.
        consumer: usize,
        /// Countdown error.
        source: SignalError,
    },

    /// A worker thread panicked.
    #[snafu(display("{role} thread {index} panicked"))]
    WorkerPanicked {
        /// Role of the panicking thread.
        role: Role,
        /// Index of the thread within its role.
        index: usize,
    },

    /// The countdown did not reach zero within the configured stall timeout.
    #[snafu(display("run stalled with {remaining} items outstanding after {timeout:?}"))]
    Stalled {
        /// Items never processed.
        remaining: usize,
        /// The stall timeout that elapsed.
        timeout: Duration,
    },
}
