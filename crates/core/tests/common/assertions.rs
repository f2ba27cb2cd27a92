//! Custom assertion and polling helpers for integration tests.

use nb_core::application::ApplicationState;
use nb_core::postmortem::CurrentError;
use nb_protocol::application_models::ApplicationStatus;
use std::future::Future;
use std::time::Duration;

/// Poll `check` until it holds or `timeout` elapses. Returns the last result.
#[allow(dead_code)]
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = tokio::time::Instant::now();
    loop {
        if check() {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Async variant of [`eventually`].
#[allow(dead_code)]
pub async fn eventually_async<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    loop {
        if check().await {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait until `app` reaches `status`, panicking after five seconds.
#[allow(dead_code)]
pub async fn wait_for_status(app: &ApplicationState, status: ApplicationStatus) {
    let reached = eventually(Duration::from_secs(5), || app.status() == status).await;
    assert!(
        reached,
        "Application {} never reached {status}, still {}",
        app.id(),
        app.status()
    );
}

/// Assert that a failure record carries the expected exit codes.
#[allow(dead_code)]
pub fn assert_exit_codes(record: &CurrentError, original: i32, interpreted: i32) {
    assert_eq!(
        record.original_exit_code(),
        Some(original),
        "original exit code of {:?}",
        record.snapshot()
    );
    assert_eq!(
        record.interpreted_exit_code(),
        Some(interpreted),
        "interpreted exit code of {:?}",
        record.snapshot()
    );
}

/// Assert that a string contains a substring (case-insensitive).
#[allow(dead_code)]
pub fn assert_contains_ci(haystack: &str, needle: &str) {
    let haystack_lower = haystack.to_lowercase();
    let needle_lower = needle.to_lowercase();
    assert!(
        haystack_lower.contains(&needle_lower),
        "Expected '{haystack}' to contain '{needle}' (case-insensitive)"
    );
}
