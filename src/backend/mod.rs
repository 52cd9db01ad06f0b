//! Pluggable queue-like backends the harness can drive.
//!
//! A backend only has to support pushing an item, retrieving one, and a
//! terminal completion. How retrieval behaves when nothing is queued is
//! described by [`Retrieval`], and the harness adapts its consumer loop to it.
//!
//! | kind          | type                           | retrieval  |
//! |---------------|--------------------------------|------------|
//! | `locked`      | [`BlockingQueue`]              | `Blocking` |
//! | `locked-poll` | [`Polled`]                     | `Polling`  |
//! | `segqueue`    | [`Segmented`]                  | `Polling`  |
//! | `unbounded`   | [`Channel::unbounded`]         | `Stream`   |
//! | `bounded:N`   | [`Channel::bounded`]           | `Blocking` |
//! | `sharded:N`   | [`Sharded`]                    | `Polling`  |
//! | `bag:N`       | [`Bag`]                        | `Polling`  |
//! | `pool`        | [`Pool`]                       | `Dispatch` |

mod bag;
mod channel;
mod locked;
mod pool;
mod segmented;
mod sharded;

use core::fmt;
use core::num::ParseIntError;
use core::ops::ControlFlow;
use core::str::FromStr;
use std::io;
use std::thread::{Scope, ScopedJoinHandle};

use handoff_core::{AddError, BlockingQueue};
use snafu::{ResultExt, Snafu, ensure};

pub use bag::Bag;
pub use channel::Channel;
pub use locked::Polled;
pub use pool::Pool;
pub use segmented::Segmented;
pub use sharded::{DEFAULT_TAKE_TIMEOUT, Sharded};

/// How a backend's `retrieve` behaves when nothing is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Retrieval {
    /// `retrieve` parks the thread until an item arrives or the backend is
    /// completed and drained. Consumers re-check the countdown between items.
    Blocking,
    /// `retrieve` returns [`Retrieved::Empty`] instead of waiting. Consumers
    /// back off and retry.
    Polling,
    /// Like `Blocking`, but consumers run until the backend reports
    /// [`Retrieved::Finished`] without consulting the countdown.
    Stream,
    /// The backend runs its own workers through [`Backend::dispatch`]; the
    /// harness starts no consumer threads of its own.
    Dispatch,
}

/// Per-item callback a dispatching backend runs on its workers.
///
/// Called as `handler(worker, item)`. A worker stops taking items once the
/// handler returns [`ControlFlow::Break`].
pub type Handler<'a, T> = dyn Fn(usize, T) -> ControlFlow<()> + Sync + 'a;

/// Outcome of one [`Backend::retrieve`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retrieved<T> {
    /// An item handed to this caller only.
    Item(T),
    /// Nothing available right now.
    Empty,
    /// The backend was completed and nothing is left.
    Finished,
}

/// A concurrent collection the harness can run an experiment against.
///
/// All methods take `&self` and are called from many threads at once.
pub trait Backend<T: Send>: Sync {
    /// Short name used in logs and benchmark ids.
    fn name(&self) -> &'static str;

    /// How [`retrieve`](Self::retrieve) behaves on an empty backend.
    fn retrieval(&self) -> Retrieval;

    /// Hand an item to the backend.
    ///
    /// Fails with [`AddError::Closed`] once [`complete`](Self::complete) has
    /// run. May block if the backend applies backpressure.
    fn push(&self, item: T) -> Result<(), AddError<T>>;

    /// Take one item out of the backend.
    fn retrieve(&self) -> Retrieved<T>;

    /// Stop accepting items. Consumers drain what is left and then see
    /// [`Retrieved::Finished`].
    fn complete(&self);

    /// Start `workers` threads in `scope` that feed every item to `handler`
    /// until the backend is completed and drained. Each handle yields the
    /// number of items its worker handled.
    ///
    /// Only called for backends whose [`retrieval`](Self::retrieval) is
    /// [`Retrieval::Dispatch`]; the default starts nothing.
    fn dispatch<'scope>(
        &'scope self,
        scope: &'scope Scope<'scope, '_>,
        workers: usize,
        handler: &'scope Handler<'scope, T>,
    ) -> Vec<io::Result<ScopedJoinHandle<'scope, usize>>> {
        let _ = (scope, workers, handler);
        Vec::new()
    }
}

/// Selects a backend variant at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// [`BlockingQueue`] consumed with blocking `take`.
    Locked,
    /// [`BlockingQueue`] consumed by polling.
    LockedPolling,
    /// Lock-free segmented queue.
    SegQueue,
    /// Unbounded channel consumed as a stream.
    Unbounded,
    /// Bounded channel; producers block when it is full.
    Bounded {
        /// Channel capacity.
        capacity: usize,
    },
    /// Round-robin over several channels, consumers take from any.
    Sharded {
        /// Number of channels.
        shards: usize,
    },
    /// Unordered bag of LIFO slots, consumers take from any.
    Bag {
        /// Number of slots.
        slots: usize,
    },
    /// Shared channel drained by the backend's own worker threads.
    Pool,
}

impl BackendKind {
    /// One of each variant, with the parameters used by the benches.
    pub const ALL: [BackendKind; 8] = [
        BackendKind::Locked,
        BackendKind::LockedPolling,
        BackendKind::SegQueue,
        BackendKind::Unbounded,
        BackendKind::Bounded { capacity: 1024 },
        BackendKind::Sharded { shards: 2 },
        BackendKind::Bag { slots: 4 },
        BackendKind::Pool,
    ];

    /// Construct an empty backend of this kind.
    #[must_use]
    pub fn build<T: Send + 'static>(&self) -> Box<dyn Backend<T>> {
        match *self {
            BackendKind::Locked => Box::new(BlockingQueue::<T>::new()),
            BackendKind::LockedPolling => Box::new(Polled::<T>::new()),
            BackendKind::SegQueue => Box::new(Segmented::<T>::new()),
            BackendKind::Unbounded => Box::new(Channel::<T>::unbounded()),
            BackendKind::Bounded { capacity } => Box::new(Channel::<T>::bounded(capacity)),
            BackendKind::Sharded { shards } => Box::new(Sharded::<T>::new(shards)),
            BackendKind::Bag { slots } => Box::new(Bag::<T>::new(slots)),
            BackendKind::Pool => Box::new(Pool::<T>::new()),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Locked => f.write_str("locked"),
            BackendKind::LockedPolling => f.write_str("locked-poll"),
            BackendKind::SegQueue => f.write_str("segqueue"),
            BackendKind::Unbounded => f.write_str("unbounded"),
            BackendKind::Bounded { capacity } => write!(f, "bounded:{capacity}"),
            BackendKind::Sharded { shards } => write!(f, "sharded:{shards}"),
            BackendKind::Bag { slots } => write!(f, "bag:{slots}"),
            BackendKind::Pool => f.write_str("pool"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, param) = match s.split_once(':') {
            Some((name, param)) => (name, Some(param)),
            None => (s, None),
        };

        let kind = match (name, param) {
            ("locked", None) => BackendKind::Locked,
            ("locked-poll", None) => BackendKind::LockedPolling,
            ("segqueue", None) => BackendKind::SegQueue,
            ("unbounded", None) => BackendKind::Unbounded,
            ("bounded", Some(param)) => BackendKind::Bounded {
                capacity: parse_param(name, param)?,
            },
            ("sharded", Some(param)) => BackendKind::Sharded {
                shards: parse_param(name, param)?,
            },
            ("bag", Some(param)) => BackendKind::Bag {
                slots: parse_param(name, param)?,
            },
            ("pool", None) => BackendKind::Pool,
            _ => return UnknownSnafu { input: s }.fail(),
        };
        Ok(kind)
    }
}

fn parse_param(name: &str, param: &str) -> Result<usize, ParseBackendError> {
    let value: usize = param.parse().context(ParameterSnafu { name, param })?;
    ensure!(value > 0, ZeroSnafu { name });
    Ok(value)
}

/// Error returned when parsing a [`BackendKind`] fails.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ParseBackendError {
    /// Not a known backend name, or a parameter was missing or unexpected.
    #[snafu(display(
        "unknown backend `{input}` (expected locked, locked-poll, segqueue, unbounded, bounded:N, sharded:N, bag:N or pool)"
    ))]
    Unknown {
        /// The rejected input.
        input: String,
    },

    /// The numeric parameter did not parse.
    #[snafu(display("invalid {name} parameter `{param}`"))]
    Parameter {
        /// Backend name.
        name: String,
        /// The rejected parameter.
        param: String,
        /// Parse failure.
        source: ParseIntError,
    },

    /// The numeric parameter was zero.
    #[snafu(display("{name} parameter must be at least 1"))]
    Zero {
        /// Backend name.
        name: String,
    },
}
