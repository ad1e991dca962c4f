//! Bounded work queues behind the stage intakes.
//!
//! Each HTTP handler enqueues a trigger and returns immediately; a small
//! pool of worker tasks drains the queue and runs the stage out-of-band.
//! A full queue drops the trigger — the attempt is abandoned, matching the
//! pipeline's no-retry error model.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Work queue sizing
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Queue capacity before triggers are dropped
    pub capacity: usize,
    /// Number of worker tasks draining the queue
    pub workers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            workers: 4,
        }
    }
}

/// Handle for submitting triggers to one stage's worker pool
#[derive(Clone)]
pub struct WorkQueue<T> {
    name: String,
    tx: mpsc::Sender<T>,
}

impl<T: Send + 'static> WorkQueue<T> {
    /// Create the queue and spawn its workers
    pub fn spawn<F, Fut>(name: impl Into<String>, config: DispatchConfig, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<T>(config.capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        for worker in 0..config.workers.max(1) {
            let rx = rx.clone();
            let handler = handler.clone();
            let name = name.clone();

            tokio::spawn(async move {
                loop {
                    let job = rx.lock().await.recv().await;
                    match job {
                        Some(job) => handler(job).await,
                        None => break,
                    }
                }
                debug!("{} worker {} stopped", name, worker);
            });
        }

        Self { name, tx }
    }

    /// Enqueue a trigger without waiting. Full or closed queues drop it
    /// with a warning.
    pub fn try_submit(&self, job: T) {
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("{} queue full, dropping trigger", self.name);
            }
            Err(TrySendError::Closed(_)) => {
                warn!("{} queue closed, dropping trigger", self.name);
            }
        }
    }
}
