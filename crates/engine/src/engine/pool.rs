// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker pool with a caller-runs overflow policy.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::PoolConfig;

/// How a submission was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A worker slot was free; the task runs on its own tokio task.
    Spawned,
    /// All workers busy; the task waits in the bounded queue.
    Queued,
    /// Workers and queue both saturated; the task ran on the caller.
    Inline,
}

/// Bounded pool of loop tasks.
///
/// Tokio tasks are cheap, so "workers" are admission permits rather than
/// threads; `core_size`/`keepalive` from the config are sizing hints with no
/// direct equivalent here. Overload does not drop work: beyond
/// `max_size + queue_capacity` submissions execute on the submitter.
pub struct WorkerPool {
    workers: Arc<Semaphore>,
    queue: Arc<Semaphore>,
    max_size: usize,
}

impl WorkerPool {
    pub fn new(config: &PoolConfig) -> Arc<Self> {
        let max_size = config.max_size.max(1);
        Arc::new(Self {
            workers: Arc::new(Semaphore::new(max_size)),
            queue: Arc::new(Semaphore::new(config.queue_capacity)),
            max_size,
        })
    }

    /// Worker slots currently held.
    pub fn workers_in_use(&self) -> usize {
        self.max_size - self.workers.available_permits()
    }

    /// Submit a task. Only saturated submissions block the caller.
    pub async fn submit<F>(&self, label: &str, task: F) -> SubmitOutcome
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(permit) = Arc::clone(&self.workers).try_acquire_owned() {
            tokio::spawn(async move {
                task.await;
                drop(permit);
            });
            return SubmitOutcome::Spawned;
        }

        if let Ok(queue_permit) = Arc::clone(&self.queue).try_acquire_owned() {
            tracing::debug!(label, "worker pool busy, task queued");
            let workers = Arc::clone(&self.workers);
            tokio::spawn(async move {
                let Ok(permit) = workers.acquire_owned().await else {
                    // Semaphore closed: pool torn down before the task ran.
                    return;
                };
                drop(queue_permit);
                task.await;
                drop(permit);
            });
            return SubmitOutcome::Queued;
        }

        tracing::warn!(label, "worker pool saturated, running task on submitter");
        task.await;
        SubmitOutcome::Inline
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
