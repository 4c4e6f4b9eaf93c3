//! Best-effort work that runs after the primary write has committed
//!
//! Notifications, activity-log appends and fan-out publishes must never
//! fail the action that caused them. They run on a shared [`JoinSet`];
//! failures go to an error channel whose drain task logs them.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{warn, Instrument, Span};

/// A side effect that returned an error
#[derive(Debug, Clone)]
pub struct SideEffectFailure {
    pub effect: &'static str,
    pub error: String,
}

/// Cheap to clone; clones share the task set and error channel
#[derive(Clone)]
pub struct SideEffects {
    tasks: Arc<Mutex<JoinSet<()>>>,
    errors: mpsc::UnboundedSender<SideEffectFailure>,
    failures: Arc<AtomicU64>,
}

impl SideEffects {
    /// Create the runner and spawn its error-drain task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start() -> Self {
        let (errors, mut rx) = mpsc::unbounded_channel::<SideEffectFailure>();
        tokio::spawn(async move {
            while let Some(failure) = rx.recv().await {
                warn!(
                    effect = failure.effect,
                    error = %failure.error,
                    "Side effect failed"
                );
            }
        });

        Self {
            tasks: Arc::new(Mutex::new(JoinSet::new())),
            errors,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run `effect` in the background under the caller's span
    pub fn spawn<F, E>(&self, effect: &'static str, fut: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let reporter = self.clone();
        let task = async move {
            if let Err(err) = fut.await {
                reporter.report(effect, &err);
            }
        }
        .instrument(Span::current());

        let mut tasks = self.tasks.lock();
        // reap finished effects so the set does not grow without bound
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Record a failure of work that ran inline
    pub fn report(&self, effect: &'static str, err: &dyn fmt::Display) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        // the drain task only stops when every sender is gone
        let _ = self.errors.send(SideEffectFailure {
            effect,
            error: err.to_string(),
        });
    }

    /// Number of failures reported since start
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Wait for every pending effect, including effects spawned while draining
    pub async fn drain(&self) {
        loop {
            let mut batch = std::mem::take(&mut *self.tasks.lock());
            if batch.is_empty() {
                return;
            }
            while let Some(joined) = batch.join_next().await {
                if let Err(err) = joined {
                    if err.is_panic() {
                        self.report("panicked", &err);
                    }
                }
            }
        }
    }
}

impl fmt::Debug for SideEffects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideEffects")
            .field("pending", &self.tasks.lock().len())
            .field("failures", &self.failure_count())
            .finish()
    }
}
