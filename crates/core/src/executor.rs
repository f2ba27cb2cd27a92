//! Named, bounded worker pools.
//!
//! Components that queue background work ask the [`ExecutorRegistry`] for a
//! pool by name; every component using the same name shares one pool.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

/// Runs futures on the Tokio runtime, at most `size` at a time.
#[derive(Debug)]
pub struct WorkerPool {
    name: String,
    size: usize,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        let size = size.max(1);
        Self {
            name: name.into(),
            size,
            permits: Arc::new(Semaphore::new(size)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers not busy right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Queue `task`; it starts once a worker is free.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = permits.acquire_owned().await.ok();
            task.await
        })
    }
}

/// Registry of shared worker pools, keyed by name.
#[derive(Debug, Default)]
pub struct ExecutorRegistry {
    pools: Mutex<HashMap<String, Arc<WorkerPool>>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pool called `name`, created with `size` workers on first use.
    /// Later calls get the existing pool whatever size they ask for.
    pub fn create_or_get(&self, name: &str, size: usize) -> Arc<WorkerPool> {
        let mut pools = self.pools.lock().unwrap_or_else(PoisonError::into_inner);
        let pool = pools.entry(name.to_string()).or_insert_with(|| {
            debug!("Creating worker pool '{name}' with {size} workers");
            Arc::new(WorkerPool::new(name, size))
        });
        Arc::clone(pool)
    }

    pub fn len(&self) -> usize {
        self.pools
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
