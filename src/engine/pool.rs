//! The scheduler: a FIFO of pending units and a count of running ones.
//!
//! Every submission and every completion runs the same scheduling step:
//! while a slot is free and the queue is non-empty, pop the head and spawn
//! it. The queue and the counter live behind one mutex and are only touched
//! inside that step, so concurrent submits and completions cannot interleave.

use crate::engine::handle::TaskHandle;
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, trace};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Configuration for the task engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum units running at once. Must be > 0.
    pub concurrency_limit: usize,
    /// Maximum units waiting for a slot. `None` = unbounded, otherwise > 0.
    pub queue_capacity: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 2,
            queue_capacity: None,
        }
    }
}

struct State {
    in_flight: usize,
    queue: VecDeque<Job>,
}

struct Inner {
    config: EngineConfig,
    runtime: Handle,
    state: Mutex<State>,
}

/// Runs submitted units of work with at most `concurrency_limit` in flight.
///
/// Cloning is cheap; clones share the same queue and slots.
#[derive(Clone)]
pub struct TaskEngine {
    inner: Arc<Inner>,
}

impl TaskEngine {
    /// Engine with the given concurrency limit and an unbounded queue.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the limit is zero or no tokio runtime is running.
    pub fn new(concurrency_limit: usize) -> Result<Self> {
        Self::with_config(EngineConfig {
            concurrency_limit,
            queue_capacity: None,
        })
    }

    /// # Errors
    /// Returns [`Error::Config`] for a zero limit, a zero queue capacity, or
    /// when no tokio runtime is running.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        if config.concurrency_limit == 0 {
            return Err(Error::Config(
                "concurrency limit must be greater than zero".to_string(),
            ));
        }
        if config.queue_capacity == Some(0) {
            return Err(Error::Config(
                "queue capacity must be greater than zero".to_string(),
            ));
        }
        let runtime = Handle::try_current()
            .map_err(|e| Error::Config(format!("task engine needs a tokio runtime: {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                runtime,
                state: Mutex::new(State {
                    in_flight: 0,
                    queue: VecDeque::new(),
                }),
            }),
        })
    }

    /// Enqueue a unit of work and return its handle immediately.
    ///
    /// `unit` is not called until a slot is granted. Failures are delivered
    /// through the handle as-is; the engine never retries.
    ///
    /// # Errors
    /// Returns [`Error::QueueFull`] if the queue is at capacity.
    pub fn submit<F, Fut, T>(&self, unit: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            // Receiver may be gone (detached handle); the unit still ran.
            let _ = tx.send(unit().await);
        });

        {
            let mut state = self.inner.lock();
            if let Some(capacity) = self.inner.config.queue_capacity {
                if state.queue.len() >= capacity {
                    return Err(Error::QueueFull { capacity });
                }
            }
            state.queue.push_back(job);
            trace!(queued = state.queue.len(), "unit submitted");
        }

        self.inner.schedule();
        Ok(TaskHandle::new(rx))
    }

    /// Units currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight
    }

    /// Units waiting for a slot.
    pub fn queued(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn concurrency_limit(&self) -> usize {
        self.inner.config.concurrency_limit
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        // No user code runs under this lock, so a poisoned guard is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start queued units until the slots are full or the queue is empty.
    fn schedule(self: &Arc<Self>) {
        let mut ready = Vec::new();
        {
            let mut state = self.lock();
            while state.in_flight < self.config.concurrency_limit {
                let Some(job) = state.queue.pop_front() else {
                    break;
                };
                state.in_flight += 1;
                ready.push(job);
            }
            if !ready.is_empty() {
                debug!(
                    started = ready.len(),
                    in_flight = state.in_flight,
                    queued = state.queue.len(),
                    "units started"
                );
            }
        }

        // Spawned outside the lock: a runtime that is shutting down drops the
        // future inside `spawn`, and the slot's drop needs the lock.
        for job in ready {
            let slot = Slot {
                inner: Arc::clone(self),
            };
            self.runtime.spawn(async move {
                let _slot = slot;
                job.await;
            });
        }
    }
}

/// Held by a running unit. Frees the slot and reschedules on drop, which
/// also covers units that panic.
struct Slot {
    inner: Arc<Inner>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        {
            let mut state = self.inner.lock();
            state.in_flight -= 1;
        }
        self.inner.schedule();
    }
}
