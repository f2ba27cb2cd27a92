//! In-memory interpreter process for tests and demos.

use super::{RemoteCallError, RemoteInterpreterProcess};
use async_trait::async_trait;
use nb_protocol::remote_models::{ApplicationResult, RemoteCall};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Failure {
    /// The interpreter answers with an unsuccessful result.
    Result(String),
    /// The call itself fails.
    Error(RemoteCallError),
}

/// Records every call and answers successfully unless told otherwise.
#[derive(Debug, Default)]
pub struct MockInterpreterProcess {
    unavailable: AtomicBool,
    delay: Duration,
    calls: Mutex<Vec<RemoteCall>>,
    failures: Mutex<HashMap<String, Failure>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockInterpreterProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call takes `delay` to answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn unavailable() -> Self {
        let process = Self::new();
        process.set_available(false);
        process
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Answer calls named `name` (e.g. `"runApplication"`) with an
    /// unsuccessful result carrying `msg`.
    pub fn fail_call(&self, name: &str, msg: impl Into<String>) {
        lock(&self.failures).insert(name.to_string(), Failure::Result(msg.into()));
    }

    /// Fail calls named `name` with `error`.
    pub fn error_call(&self, name: &str, error: RemoteCallError) {
        lock(&self.failures).insert(name.to_string(), Failure::Error(error));
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        lock(&self.calls).clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        lock(&self.calls).iter().map(RemoteCall::name).collect()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteInterpreterProcess for MockInterpreterProcess {
    async fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    async fn call_remote_function(
        &self,
        call: RemoteCall,
    ) -> Result<ApplicationResult, RemoteCallError> {
        let failure = lock(&self.failures).get(call.name()).cloned();
        lock(&self.calls).push(call);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match failure {
            None => Ok(ApplicationResult::success()),
            Some(Failure::Result(msg)) => Ok(ApplicationResult::failure(msg)),
            Some(Failure::Error(error)) => Err(error),
        }
    }
}
