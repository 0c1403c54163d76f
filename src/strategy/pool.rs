//! Pool-backed strategies: a fixed set of workers, or a pool that grows on
//! demand and reclaims idle workers after a timeout.
//!
//! Both feed tasks through an unbounded channel so `execute` never blocks the
//! caller. Panics escaping a task are routed through the factory's
//! [`UncaughtPolicy`](super::UncaughtPolicy); a recoverable failure leaves the
//! pool fully usable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};

use super::daemon::{run_guarded, DaemonThreadFactory, UncaughtPolicy};
use super::{Strategy, Task};

/// Bounded set of workers created up front; tasks queue for whichever worker
/// frees up first. No ordering is promised between concurrently queued tasks.
///
/// Dropping the pool closes the queue; workers finish what they hold and
/// retire.
pub struct FixedPool {
    tx: Sender<Task>,
}

impl FixedPool {
    /// Create `workers` (at least 1) detached worker threads from `factory`.
    pub fn new(workers: usize, factory: DaemonThreadFactory) -> Result<Self> {
        let workers = workers.max(1);
        let (tx, rx) = crossbeam_channel::unbounded::<Task>();
        let policy = factory.policy();
        for _ in 0..workers {
            let rx = rx.clone();
            let policy = Arc::clone(&policy);
            factory.spawn(move || fixed_worker_loop(rx, policy))?;
        }
        tracing::debug!(workers, "fixed pool started");
        Ok(Self { tx })
    }
}

impl Strategy for FixedPool {
    fn execute(&self, task: Task) {
        // Send only fails once every worker has retired, i.e. the pool is
        // already shut down; the task is dropped unrun in that case.
        let _ = self.tx.send(task);
    }
}

fn fixed_worker_loop(rx: Receiver<Task>, policy: Arc<UncaughtPolicy>) {
    while let Ok(task) = rx.recv() {
        run_guarded(&policy, task);
    }
}

/// Pool that spawns a worker whenever a task arrives and no worker is idle;
/// workers retire after sitting idle for `keep_alive`. Suited to bursty,
/// short-lived work.
pub struct GrowablePool {
    inner: Arc<GrowInner>,
}

struct GrowInner {
    tx: Sender<Task>,
    rx: Receiver<Task>,
    idle: AtomicUsize,
    keep_alive: Duration,
    factory: DaemonThreadFactory,
}

impl GrowablePool {
    pub fn new(factory: DaemonThreadFactory, keep_alive: Duration) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<Task>();
        Self {
            inner: Arc::new(GrowInner {
                tx,
                rx,
                idle: AtomicUsize::new(0),
                keep_alive,
                factory,
            }),
        }
    }

    fn spawn_worker(inner: &Arc<GrowInner>) {
        let worker = Arc::clone(inner);
        if let Err(e) = inner.factory.spawn(move || grow_worker_loop(worker)) {
            // The task stays queued; a busy worker will reach it, or the
            // next execute retries the spawn.
            tracing::error!("failed to spawn pool worker: {e:#}");
        }
    }
}

impl Strategy for GrowablePool {
    fn execute(&self, task: Task) {
        let _ = self.inner.tx.send(task);
        // Check idleness after the send: a worker whose keep-alive expired
        // between the send and this load has already decremented the count,
        // so either it drains the queue on its way out or we spawn here.
        // A worker counted idle may still grab another task first; the next
        // execute grows the pool in that case.
        if self.inner.idle.load(Ordering::Acquire) == 0 {
            Self::spawn_worker(&self.inner);
        }
    }
}

fn grow_worker_loop(inner: Arc<GrowInner>) {
    let policy = inner.factory.policy();
    loop {
        inner.idle.fetch_add(1, Ordering::AcqRel);
        let task = inner.rx.recv_timeout(inner.keep_alive);
        inner.idle.fetch_sub(1, Ordering::AcqRel);
        match task {
            Ok(task) => run_guarded(&policy, task),
            Err(_) => {
                // Keep-alive expired, but a task may have been queued against
                // this worker's idle slot just as the timeout fired. Drain it
                // before retiring so nothing is left with no worker to run it.
                match inner.rx.try_recv() {
                    Ok(task) => run_guarded(&policy, task),
                    Err(_) => break,
                }
            }
        }
    }
}
