//! Daemon thread creation and the uncaught-error policy for pool workers.
//!
//! The factory names threads `{prefix}-{n}` from a factory-local counter and
//! spawns them detached, so a live pool never prevents process exit. Any panic
//! that escapes a worker is reported on stderr and classified; unless
//! escalation is disabled, a fatal classification terminates the process.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};

/// Classification of a panic that escaped a worker's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Ordinary failure: log it and let the worker carry on (or retire).
    Recoverable,
    /// Unclassified condition: continuing risks silent corruption, so the
    /// whole process is taken down.
    Fatal,
}

type Classifier = dyn Fn(&(dyn Any + Send)) -> ErrorClass + Send + Sync;
type FatalHook = dyn Fn() + Send + Sync;

/// Decides what happens when a panic escapes a worker thread's task.
///
/// The classifier and the fatal hook are both injectable so embedders (and
/// tests) can swap the exit behavior without killing their own process.
pub struct UncaughtPolicy {
    classify: Arc<Classifier>,
    on_fatal: Option<Arc<FatalHook>>,
}

impl UncaughtPolicy {
    /// Default policy: string panic payloads (ordinary `panic!` failures) are
    /// recoverable, anything else is fatal and exits the process.
    pub fn new() -> Self {
        Self {
            classify: Arc::new(default_classifier),
            on_fatal: Some(Arc::new(|| process::exit(1))),
        }
    }

    /// Policy that never terminates the process. Diagnostics are still
    /// written; for supervised environments with their own restart story.
    pub fn disarmed() -> Self {
        Self {
            classify: Arc::new(default_classifier),
            on_fatal: None,
        }
    }

    /// Replace the recoverable/fatal classifier.
    pub fn with_classifier<C>(mut self, classify: C) -> Self
    where
        C: Fn(&(dyn Any + Send)) -> ErrorClass + Send + Sync + 'static,
    {
        self.classify = Arc::new(classify);
        self
    }

    /// Replace the action taken on a fatal classification.
    pub fn with_fatal_hook<H>(mut self, hook: H) -> Self
    where
        H: Fn() + Send + Sync + 'static,
    {
        self.on_fatal = Some(Arc::new(hook));
        self
    }

    /// Report and classify a panic from the named worker thread.
    pub fn handle(&self, thread_name: &str, payload: Box<dyn Any + Send>) {
        let detail = panic_detail(payload.as_ref());
        eprintln!("uncaught error in worker thread {thread_name}:");
        eprintln!("  {detail}");
        match (self.classify)(payload.as_ref()) {
            ErrorClass::Recoverable => {
                tracing::error!(thread = thread_name, "worker task panicked: {detail}");
            }
            ErrorClass::Fatal => {
                tracing::error!(
                    thread = thread_name,
                    "fatal worker error, terminating process: {detail}"
                );
                if let Some(hook) = &self.on_fatal {
                    hook();
                }
            }
        }
    }
}

impl Default for UncaughtPolicy {
    fn default() -> Self {
        Self::new()
    }
}

fn default_classifier(payload: &(dyn Any + Send)) -> ErrorClass {
    if payload.is::<&str>() || payload.is::<String>() {
        ErrorClass::Recoverable
    } else {
        ErrorClass::Fatal
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Spawns detached, uniquely named worker threads.
///
/// Names follow `{prefix}-{n}` with `n` starting at 1 and strictly increasing
/// per factory instance, so names are unique within a strategy. Handles are
/// dropped after spawn: the threads never block process shutdown.
pub struct DaemonThreadFactory {
    prefix: String,
    counter: AtomicU64,
    policy: Arc<UncaughtPolicy>,
}

impl DaemonThreadFactory {
    pub fn new(prefix: impl Into<String>, policy: UncaughtPolicy) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(1),
            policy: Arc::new(policy),
        }
    }

    /// The policy shared with every thread this factory creates.
    pub fn policy(&self) -> Arc<UncaughtPolicy> {
        Arc::clone(&self.policy)
    }

    fn next_name(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }

    /// Spawn a detached worker running `f`. A panic escaping `f` is routed
    /// through the factory's [`UncaughtPolicy`].
    pub fn spawn<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = self.next_name();
        let policy = self.policy();
        let thread_name = name.clone();
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
                    policy.handle(&thread_name, payload);
                }
            })
            .with_context(|| format!("spawn worker thread {}", name))?;
        Ok(())
    }
}

/// Run one task, routing an escaped panic through `policy`. Used by pool
/// worker loops so a recoverable failure never costs the pool its worker.
pub(crate) fn run_guarded(policy: &UncaughtPolicy, task: super::Task) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
        let current = thread::current();
        policy.handle(current.name().unwrap_or("worker"), payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn thread_names_are_unique_and_sequential() {
        let factory = DaemonThreadFactory::new("probe", UncaughtPolicy::disarmed());
        let (tx, rx) = mpsc::channel();
        for _ in 0..5 {
            let tx = tx.clone();
            factory
                .spawn(move || {
                    let name = thread::current().name().unwrap().to_string();
                    tx.send(name).unwrap();
                })
                .unwrap();
        }
        let mut names: Vec<String> = (0..5)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["probe-1", "probe-2", "probe-3", "probe-4", "probe-5"]);
    }

    #[test]
    fn spawn_survives_a_panicking_body_and_keeps_counting() {
        let factory = DaemonThreadFactory::new("guarded", UncaughtPolicy::disarmed());
        factory.spawn(|| panic!("expected worker failure")).unwrap();
        // The factory must still hand out the next name after the failure.
        let (tx, rx) = mpsc::channel();
        factory
            .spawn(move || {
                let name = thread::current().name().unwrap().to_string();
                tx.send(name).unwrap();
            })
            .unwrap();
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name, "guarded-2");
    }

    #[test]
    fn default_classifier_splits_on_payload_type() {
        assert_eq!(
            default_classifier(&"boom" as &(dyn Any + Send)),
            ErrorClass::Recoverable
        );
        assert_eq!(
            default_classifier(&String::from("boom") as &(dyn Any + Send)),
            ErrorClass::Recoverable
        );
        assert_eq!(
            default_classifier(&42usize as &(dyn Any + Send)),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn fatal_hook_fires_only_for_fatal_payloads() {
        let fired = Arc::new(AtomicBool::new(false));
        let f = Arc::clone(&fired);
        let policy = UncaughtPolicy::new().with_fatal_hook(move || {
            f.store(true, Ordering::SeqCst);
        });

        policy.handle("t", Box::new("ordinary failure"));
        assert!(!fired.load(Ordering::SeqCst));

        policy.handle("t", Box::new(42usize));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn disarmed_policy_never_escalates() {
        let policy = UncaughtPolicy::disarmed();
        // Fatal payload, but no hook installed: must return normally.
        policy.handle("t", Box::new(42usize));
    }
}
