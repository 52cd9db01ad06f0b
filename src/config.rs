//! Experiment parameters.

use core::fmt;
use std::time::Duration;

use snafu::{OptionExt, Snafu, ensure};

/// Parameters for one harness run. Read-only once the run starts.
///
/// With the `serde` feature every field falls back to its default, so a
/// partial document is enough:
///
/// ```ignore
/// let config: HarnessConfig = serde_json::from_str(r#"{ "producers": 4 }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct HarnessConfig {
    /// Items pushed by each producer.
    pub repeats: usize,
    /// Number of producer threads.
    pub producers: usize,
    /// Number of consumer threads.
    pub consumers: usize,
    /// Simulated work iterations per consumed item.
    pub workload: u32,
    /// Give up if the run has not drained after this long.
    pub stall_timeout: Option<Duration>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            repeats: 10_000,
            producers: 1,
            consumers: 1,
            workload: 0,
            stall_timeout: None,
        }
    }
}

impl HarnessConfig {
    /// Config with the given thread counts and per-producer item count.
    #[must_use]
    pub fn new(producers: usize, consumers: usize, repeats: usize) -> Self {
        Self {
            repeats,
            producers,
            consumers,
            ..Self::default()
        }
    }

    /// Set the simulated work per item.
    #[must_use]
    pub fn with_workload(mut self, workload: u32) -> Self {
        self.workload = workload;
        self
    }

    /// Set the stall timeout.
    #[must_use]
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = Some(timeout);
        self
    }

    /// Total items the run expects to process (`producers * repeats`).
    pub fn total_items(&self) -> Result<usize, ConfigError> {
        self.validate()?;
        self.producers
            .checked_mul(self.repeats)
            .context(TooManyItemsSnafu {
                producers: self.producers,
                repeats: self.repeats,
            })
    }

    /// Check the thread counts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(self.producers > 0, NoProducersSnafu);
        ensure!(self.consumers > 0, NoConsumersSnafu);
        Ok(())
    }
}

impl fmt::Display for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "producers={} consumers={} repeats={} workload={}",
            self.producers, self.consumers, self.repeats, self.workload
        )
    }
}

/// Error returned for a configuration the harness cannot run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
pub enum ConfigError {
    /// At least one producer is required.
    #[snafu(display("at least one producer is required"))]
    NoProducers,

    /// At least one consumer is required, or the run could never drain.
    #[snafu(display("at least one consumer is required"))]
    NoConsumers,

    /// `producers * repeats` does not fit in the countdown.
    #[snafu(display("{producers} producers x {repeats} repeats overflows the item count"))]
    TooManyItems {
        /// Configured producers.
        producers: usize,
        /// Configured repeats.
        repeats: usize,
    },
}
