//! Pluggable execution strategies for deferred work.
//!
//! A [`Strategy`] accepts a boxed thunk and arranges for it to run, now or
//! later, possibly on another thread. Callers pick the variant per use case:
//! [`Sequential`] for inline execution, [`FixedPool`]/[`GrowablePool`] for
//! background work on daemon threads, [`Executor`] to bridge an external
//! scheduling primitive.

mod daemon;
mod pool;

pub use daemon::{DaemonThreadFactory, ErrorClass, UncaughtPolicy};
pub use pool::{FixedPool, GrowablePool};

use anyhow::Result;

/// A deferred, zero-argument unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A policy for executing deferred computations.
///
/// `execute` never reports errors synchronously: a task that panics on a pool
/// worker is handled by the factory's [`UncaughtPolicy`]; on [`Sequential`]
/// the panic propagates to the caller since execution is inline.
pub trait Strategy: Send + Sync {
    /// Accept a task for execution. Pool-backed strategies enqueue without
    /// blocking; `Sequential` returns only after the task has run.
    fn execute(&self, task: Task);
}

/// Convenience for submitting unboxed closures to any [`Strategy`].
pub trait StrategyExt: Strategy {
    fn submit<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.execute(Box::new(f));
    }
}

impl<S: Strategy + ?Sized> StrategyExt for S {}

/// Runs every task inline on the calling thread.
///
/// Trivially totally orders all submissions by call order; panics propagate
/// to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Strategy for Sequential {
    fn execute(&self, task: Task) {
        task();
    }
}

/// Adapts an external "run this task" primitive into a [`Strategy`].
///
/// Any host-provided scheduler exposing `Fn(Task)` can be wrapped; `execute`
/// forwards verbatim.
pub struct Executor<E> {
    run: E,
}

impl<E> Executor<E>
where
    E: Fn(Task) + Send + Sync,
{
    pub fn new(run: E) -> Self {
        Self { run }
    }
}

impl<E> Strategy for Executor<E>
where
    E: Fn(Task) + Send + Sync,
{
    fn execute(&self, task: Task) {
        (self.run)(task)
    }
}

/// Default number of pool workers: one per available core.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Process-default strategy: a fixed pool sized to the available parallelism,
/// with fatal-error escalation enabled.
pub fn default_strategy() -> Result<FixedPool> {
    let factory = DaemonThreadFactory::new("rivulet-worker", UncaughtPolicy::new());
    FixedPool::new(default_pool_size(), factory)
}
