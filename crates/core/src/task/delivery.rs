//! Single-worker ordered delivery queue
//!
//! Engine completions arrive on engine-owned threads. Client callbacks must
//! never run there, so completions are redispatched onto a dedicated worker
//! that executes jobs one at a time in enqueue order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Strict FIFO executor with exactly one worker thread
pub struct DeliveryQueue {
    name: String,
    jobs: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    active: AtomicBool,
}

impl DeliveryQueue {
    /// Create the queue and start its worker thread
    ///
    /// # Errors
    ///
    /// * `Error::ResourceCreation` - the worker thread failed to spawn
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (tx, rx) = channel::unbounded::<Job>();

        let worker_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || Self::worker_loop(worker_name, rx))
            .map_err(|e| {
                Error::ResourceCreation(format!("Failed to create delivery queue {}: {}", name, e))
            })?;

        tracing::debug!("Delivery queue {} started", name);

        Ok(Self {
            name,
            jobs: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
            active: AtomicBool::new(true),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a job behind every previously dispatched one
    ///
    /// Never blocks. Returns false if the queue has been shut down.
    pub fn dispatch<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let jobs = self.jobs.lock();
        match jobs.as_ref() {
            Some(tx) => tx.send(Box::new(job)).is_ok(),
            None => {
                tracing::trace!("Delivery queue {} is shut down, dropping job", self.name);
                false
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop accepting jobs, run the ones already queued, then stop the worker
    ///
    /// Idempotent. When called from the worker itself (a job dropping the
    /// last owner of the queue) the worker is left to finish on its own.
    pub fn shutdown(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }

        self.jobs.lock().take();

        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            if handle.thread().id() == thread::current().id() {
                tracing::debug!("Delivery queue {} shut down from its own worker", self.name);
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("Delivery queue {} worker panicked", self.name);
            }
        }

        tracing::debug!("Delivery queue {} stopped", self.name);
    }

    fn worker_loop(name: String, jobs: Receiver<Job>) {
        for job in jobs.iter() {
            // A panicking job must not take the worker down with it.
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(job)) {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!("Delivery queue {} job panicked: {}", name, message);
            }
        }
        tracing::trace!("Delivery queue {} drained", name);
    }
}

impl Drop for DeliveryQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
