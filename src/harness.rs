//! Producer/consumer load harness.
//!
//! One run walks through four phases:
//!
//! ```text
//! Configured ──► Running ──► Draining ──► Closed
//!                  │            │            │
//!          spawn consumers   wait on the   complete the backend,
//!          and producers     countdown     join every worker
//! ```
//!
//! Consumers and producers are scoped threads borrowing the backend, the
//! countdown and the observer. A [`Retrieval::Dispatch`] backend brings its
//! own consumer threads and is handed a per-item handler instead.
//!
//! Any worker failure aborts the countdown so the harness thread never waits
//! forever; the backend is still completed exactly once and all workers are
//! joined before the first failure is returned.

use core::fmt;
use core::ops::ControlFlow;
use std::io;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Duration;

use crossbeam::utils::Backoff;
use handoff_core::{Countdown, WaitError, WorkSimulator};
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use snafu::ResultExt;

use crate::backend::{Backend, BackendKind, Retrieval, Retrieved};
use crate::config::HarnessConfig;
use crate::error::{
    ConfigSnafu, HarnessError, OverdrawnSnafu, PushRejectedSnafu, Role, SpawnSnafu, StalledSnafu,
    WorkerPanickedSnafu,
};

/// The item producers push: who made it and in which order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket {
    /// Index of the producing thread.
    pub producer: usize,
    /// Position in that producer's output, starting at zero.
    pub seq: usize,
}

/// What a successful run did. Timing is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Items accepted by the backend across all producers.
    pub pushed: usize,
    /// Items processed, indexed by consumer.
    pub processed: Vec<usize>,
}

impl RunSummary {
    /// Items processed across all consumers.
    #[must_use]
    pub fn total_processed(&self) -> usize {
        self.processed.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Configured,
    Running,
    Draining,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Configured => f.write_str("configured"),
            Phase::Running => f.write_str("running"),
            Phase::Draining => f.write_str("draining"),
            Phase::Closed => f.write_str("closed"),
        }
    }
}

/// Drives producers and consumers against a [`Backend`].
///
/// ```
/// use handoff::{BackendKind, HarnessConfig, LoadHarness};
///
/// let harness = LoadHarness::new(HarnessConfig::new(3, 2, 100))?;
/// let summary = harness.run_variant(BackendKind::Locked)?;
/// assert_eq!(summary.total_processed(), 300);
/// # Ok::<(), handoff::HarnessError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LoadHarness {
    config: HarnessConfig,
    total: usize,
}

impl LoadHarness {
    /// Validate `config` and prepare a harness for it.
    pub fn new(config: HarnessConfig) -> Result<Self, HarnessError> {
        let total = config.total_items().context(ConfigSnafu)?;
        Ok(Self { config, total })
    }

    /// The configuration every run uses.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Items each run expects to process.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.total
    }

    /// Build a fresh backend of `kind` and run against it.
    pub fn run_variant(&self, kind: BackendKind) -> Result<RunSummary, HarnessError> {
        let backend = kind.build::<Ticket>();
        self.run(backend.as_ref())
    }

    /// Run against an empty `backend`. The backend is completed on return.
    pub fn run<B>(&self, backend: &B) -> Result<RunSummary, HarnessError>
    where
        B: Backend<Ticket> + ?Sized,
    {
        self.run_observed(backend, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `observer(consumer, ticket)` for each
    /// processed ticket, after the simulated work and before the countdown is
    /// signalled.
    pub fn run_observed<B, F>(&self, backend: &B, observer: F) -> Result<RunSummary, HarnessError>
    where
        B: Backend<Ticket> + ?Sized,
        F: Fn(usize, Ticket) + Sync,
    {
        let run = Run {
            backend,
            observer: &observer,
            countdown: Countdown::new(self.total),
            simulator: WorkSimulator::new(self.config.workload),
            repeats: self.config.repeats,
            failure: Mutex::new(None),
        };

        let handler = |consumer: usize, ticket: Ticket| run.handle(consumer, ticket);

        info!("run starting: backend={} {}", backend.name(), self.config);
        enter(Phase::Configured);

        let summary = thread::scope(|s| {
            enter(Phase::Running);
            let consumers: Vec<_> = if backend.retrieval() == Retrieval::Dispatch {
                backend
                    .dispatch(s, self.config.consumers, &handler)
                    .into_iter()
                    .enumerate()
                    .map(|(index, spawned)| run.admit(Role::Consumer, index, spawned))
                    .collect()
            } else {
                (0..self.config.consumers)
                    .map(|index| run.spawn(s, Role::Consumer, index, move |run| run.consume(index)))
                    .collect()
            };
            let producers: Vec<_> = (0..self.config.producers)
                .map(|index| run.spawn(s, Role::Producer, index, move |run| run.produce(index)))
                .collect();

            enter(Phase::Draining);
            run.drain(self.config.stall_timeout);

            backend.complete();
            enter(Phase::Closed);

            let processed = run.join(Role::Consumer, consumers);
            let pushed = run.join(Role::Producer, producers).into_iter().sum();
            RunSummary { pushed, processed }
        });

        match run.failure.into_inner() {
            Some(err) => Err(err),
            None => {
                info!(
                    "run finished: backend={} pushed={} processed={}",
                    backend.name(),
                    summary.pushed,
                    summary.total_processed()
                );
                Ok(summary)
            }
        }
    }
}

fn enter(phase: Phase) {
    debug!("run phase: {phase}");
}

/// State shared by every worker of one run.
struct Run<'a, B: ?Sized, F> {
    backend: &'a B,
    observer: &'a F,
    countdown: Countdown,
    simulator: WorkSimulator,
    repeats: usize,
    failure: Mutex<Option<HarnessError>>,
}

impl<B, F> Run<'_, B, F>
where
    B: Backend<Ticket> + ?Sized,
    F: Fn(usize, Ticket) + Sync,
{
    /// Keep the first failure, then release the harness thread.
    fn fail(&self, err: HarnessError) {
        warn!("run failed: {err}");
        let mut slot = self.failure.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
        drop(slot);
        self.countdown.abort();
    }

    fn spawn<'scope, W>(
        &'scope self,
        scope: &'scope Scope<'scope, '_>,
        role: Role,
        index: usize,
        work: W,
    ) -> Option<ScopedJoinHandle<'scope, usize>>
    where
        W: FnOnce(&Self) -> Result<usize, HarnessError> + Send + 'scope,
    {
        let spawned = thread::Builder::new()
            .name(format!("{role}-{index}"))
            .spawn_scoped(scope, move || {
                let _guard = PanicGuard {
                    run: self,
                    role,
                    index,
                };
                work(self).unwrap_or_else(|err| {
                    self.fail(err);
                    0
                })
            });
        self.admit(role, index, spawned)
    }

    /// Record a failed spawn, keep the handle otherwise.
    fn admit<'scope>(
        &self,
        role: Role,
        index: usize,
        spawned: io::Result<ScopedJoinHandle<'scope, usize>>,
    ) -> Option<ScopedJoinHandle<'scope, usize>> {
        match spawned.context(SpawnSnafu { role, index }) {
            Ok(handle) => Some(handle),
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    fn produce(&self, producer: usize) -> Result<usize, HarnessError> {
        for seq in 0..self.repeats {
            if self.countdown.is_aborted() {
                return Ok(seq);
            }
            self.backend
                .push(Ticket { producer, seq })
                .map_err(|_| PushRejectedSnafu { producer, seq }.build())?;
        }
        trace!("producer {producer} pushed {}", self.repeats);
        Ok(self.repeats)
    }

    fn consume(&self, consumer: usize) -> Result<usize, HarnessError> {
        let watch_countdown = self.backend.retrieval() != Retrieval::Stream;
        let backoff = Backoff::new();
        let mut processed = 0;

        loop {
            if self.countdown.is_aborted() || (watch_countdown && self.countdown.is_set()) {
                break;
            }
            match self.backend.retrieve() {
                Retrieved::Item(ticket) => {
                    backoff.reset();
                    self.process(consumer, ticket)?;
                    processed += 1;
                }
                Retrieved::Empty => backoff.snooze(),
                Retrieved::Finished => break,
            }
        }

        trace!("consumer {consumer} processed {processed}");
        Ok(processed)
    }

    fn process(&self, consumer: usize, ticket: Ticket) -> Result<(), HarnessError> {
        self.simulator.simulate();
        (self.observer)(consumer, ticket);
        self.countdown
            .signal()
            .context(OverdrawnSnafu { consumer })?;
        Ok(())
    }

    /// One item on a backend-owned worker. Breaks once the run is aborted.
    fn handle(&self, consumer: usize, ticket: Ticket) -> ControlFlow<()> {
        if self.countdown.is_aborted() {
            return ControlFlow::Break(());
        }
        let _guard = PanicGuard {
            run: self,
            role: Role::Consumer,
            index: consumer,
        };
        match self.process(consumer, ticket) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => {
                self.fail(err);
                ControlFlow::Break(())
            }
        }
    }

    fn drain(&self, stall_timeout: Option<Duration>) {
        let Some(timeout) = stall_timeout else {
            // Aborts are already recorded by whoever aborted.
            let _ = self.countdown.wait();
            return;
        };
        if let Err(WaitError::Elapsed { remaining }) = self.countdown.wait_timeout(timeout) {
            self.fail(StalledSnafu { remaining, timeout }.build());
        }
    }

    fn join(&self, role: Role, handles: Vec<Option<ScopedJoinHandle<'_, usize>>>) -> Vec<usize> {
        handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| match handle.map(ScopedJoinHandle::join) {
                Some(Ok(count)) => count,
                Some(Err(_)) => {
                    self.fail(WorkerPanickedSnafu { role, index }.build());
                    0
                }
                None => 0,
            })
            .collect()
    }
}

/// Records a worker panic while the worker unwinds, so the harness thread is
/// released before anything else can fail in the panic's wake.
struct PanicGuard<'r, 'a, B, F>
where
    B: Backend<Ticket> + ?Sized,
    F: Fn(usize, Ticket) + Sync,
{
    run: &'r Run<'a, B, F>,
    role: Role,
    index: usize,
}

impl<B, F> Drop for PanicGuard<'_, '_, B, F>
where
    B: Backend<Ticket> + ?Sized,
    F: Fn(usize, Ticket) + Sync,
{
    fn drop(&mut self) {
        if thread::panicking() {
            self.run.fail(
                WorkerPanickedSnafu {
                    role: self.role,
                    index: self.index,
                }
                .build(),
            );
        }
    }
}
