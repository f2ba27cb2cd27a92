//! Integration tests for application load/run/unload coordination.
//!
//! These tests drive the coordinator against an in-memory interpreter
//! process and verify:
//! - The full status sequence of a load, run and unload
//! - Illegal-state and remote failures
//! - Parallelism across applications and serialization within one
//! - The paragraph remove and finish hooks

mod common;

use common::assertions::*;
use common::fixtures::*;
use nb_core::application::{ApplicationCoordinator, ApplicationError, ApplicationEventListener};
use nb_core::config::load_config;
use nb_core::executor::ExecutorRegistry;
use nb_core::notebook::Notebook;
use nb_core::remote::{MockInterpreterProcess, RemoteCallError};
use nb_protocol::application_models::{ApplicationStatus, OutputType};
use nb_protocol::note_models::JobStatus;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_load_run_unload_visits_every_status() {
    let nb = TestNotebook::with_default_pool(MockInterpreterProcess::new());
    let paragraph = nb.add_paragraph("note-1", "p1").await;

    let app_id = nb
        .coordinator
        .load_and_run(clock_package(), &paragraph)
        .await;
    assert!(app_id.starts_with("app_"));

    let ran = eventually(WAIT, || nb.process.call_names().len() == 2).await;
    assert!(ran, "calls: {:?}", nb.process.call_names());
    let app = nb.coordinator.get(&paragraph, &app_id).expect("app state");
    assert_eq!(app.status(), ApplicationStatus::Loaded);

    nb.coordinator
        .unload(&paragraph, &app_id)
        .await
        .expect("unload task");

    assert_eq!(app.status(), ApplicationStatus::Unloaded);
    assert_eq!(
        nb.listener.statuses(&app_id),
        vec![
            ApplicationStatus::Loading,
            ApplicationStatus::Loaded,
            ApplicationStatus::Unloading,
            ApplicationStatus::Unloaded,
        ]
    );
    assert_eq!(nb.listener.loads(&app_id), 1);
    assert_eq!(
        nb.process.call_names(),
        vec!["loadApplication", "runApplication", "unloadApplication"]
    );
}

#[tokio::test]
async fn test_run_while_unloaded_is_illegal_and_changes_nothing() {
    let nb = TestNotebook::with_default_pool(MockInterpreterProcess::new());
    let paragraph = nb.add_paragraph("note-1", "p1").await;
    let app = paragraph.create_or_get_application_state(clock_package());

    let error = nb
        .coordinator
        .run_loaded(&paragraph, &app)
        .await
        .expect_err("run must fail");

    assert!(matches!(
        error,
        ApplicationError::IllegalState {
            action: "run",
            status: ApplicationStatus::Unloaded
        }
    ));
    assert_eq!(error.to_string(), "Can't run application status UNLOADED");
    assert_eq!(app.status(), ApplicationStatus::Unloaded);
    assert!(nb.process.calls().is_empty());
    assert!(nb.listener.statuses(app.id()).is_empty());
}

#[tokio::test]
async fn test_queued_run_of_unloaded_app_ends_in_error() {
    let nb = TestNotebook::with_default_pool(MockInterpreterProcess::new());
    let paragraph = nb.add_paragraph("note-1", "p1").await;
    let app = paragraph.create_or_get_application_state(clock_package());

    nb.coordinator
        .run(&paragraph, app.id())
        .await
        .expect("run task");

    assert_eq!(app.status(), ApplicationStatus::Error);
    assert_contains_ci(&app.output(), "can't run");
    assert!(nb.process.calls().is_empty());
}

#[tokio::test]
async fn test_unload_of_unloaded_app_is_noop() {
    let nb = TestNotebook::with_default_pool(MockInterpreterProcess::new());
    let paragraph = nb.add_paragraph("note-1", "p1").await;
    let app = paragraph.create_or_get_application_state(clock_package());

    nb.coordinator
        .unload(&paragraph, app.id())
        .await
        .expect("unload task");

    assert_eq!(app.status(), ApplicationStatus::Unloaded);
    assert!(nb.process.calls().is_empty());
}

#[tokio::test]
async fn test_load_failure_sets_error_with_message() {
    let process = MockInterpreterProcess::new();
    process.fail_call("loadApplication", "artifact clock-app@1.0.0 not found");
    let nb = TestNotebook::with_default_pool(process);
    let paragraph = nb.add_paragraph("note-1", "p1").await;

    let app_id = nb
        .coordinator
        .load_and_run(clock_package(), &paragraph)
        .await;
    let app = nb.coordinator.get(&paragraph, &app_id).expect("app state");

    wait_for_status(&app, ApplicationStatus::Error).await;
    assert_eq!(app.output(), "artifact clock-app@1.0.0 not found");
    assert_eq!(
        nb.listener.statuses(&app_id),
        vec![ApplicationStatus::Loading, ApplicationStatus::Error]
    );
    assert_eq!(nb.process.call_names(), vec!["loadApplication"]);
}

#[tokio::test]
async fn test_transport_error_sets_error() {
    let process = MockInterpreterProcess::new();
    process.error_call(
        "runApplication",
        RemoteCallError::Transport("connection reset".to_string()),
    );
    let nb = TestNotebook::with_default_pool(process);
    let paragraph = nb.add_paragraph("note-1", "p1").await;

    let app_id = nb
        .coordinator
        .load_and_run(clock_package(), &paragraph)
        .await;
    let app = nb.coordinator.get(&paragraph, &app_id).expect("app state");

    wait_for_status(&app, ApplicationStatus::Error).await;
    assert_contains_ci(&app.output(), "connection reset");
}

#[tokio::test]
async fn test_client_pool_error_sets_error() {
    let process = MockInterpreterProcess::new();
    process.error_call(
        "loadApplication",
        RemoteCallError::Pool("no free client".to_string()),
    );
    let nb = TestNotebook::with_default_pool(process);
    let paragraph = nb.add_paragraph("note-1", "p1").await;

    let app_id = nb
        .coordinator
        .load_and_run(clock_package(), &paragraph)
        .await;
    let app = nb.coordinator.get(&paragraph, &app_id).expect("app state");

    wait_for_status(&app, ApplicationStatus::Error).await;
    assert_contains_ci(&app.output(), "no free client");
    assert_eq!(nb.process.call_names(), vec!["loadApplication"]);
}

#[tokio::test]
async fn test_unavailable_interpreter_is_not_running() {
    let nb = TestNotebook::with_default_pool(MockInterpreterProcess::unavailable());
    let paragraph = nb.add_paragraph("note-1", "p1").await;

    let app_id = nb
        .coordinator
        .load_and_run(clock_package(), &paragraph)
        .await;
    let app = nb.coordinator.get(&paragraph, &app_id).expect("app state");

    wait_for_status(&app, ApplicationStatus::Error).await;
    assert_eq!(app.output(), "Target interpreter process is not running");
    assert!(nb.process.calls().is_empty());
}

#[tokio::test]
async fn test_apps_in_different_paragraphs_run_in_parallel() {
    let process = MockInterpreterProcess::new().with_delay(Duration::from_millis(300));
    let nb = TestNotebook::with_default_pool(process);
    let first = nb.add_paragraph("note-1", "p1").await;
    let second = nb.add_paragraph("note-2", "p2").await;

    let first_id = nb.coordinator.load_and_run(clock_package(), &first).await;
    let second_id = nb.coordinator.load_and_run(chart_package(), &second).await;

    let done = eventually(WAIT, || nb.process.calls().len() == 4).await;
    assert!(done, "calls: {:?}", nb.process.call_names());
    assert!(nb.process.max_concurrent_calls() >= 2);

    for (paragraph, app_id) in [(&first, &first_id), (&second, &second_id)] {
        let app = nb.coordinator.get(paragraph, app_id).expect("app state");
        assert_eq!(app.status(), ApplicationStatus::Loaded);
    }
}

#[tokio::test]
async fn test_operations_on_one_app_are_serialized() {
    let process = MockInterpreterProcess::new().with_delay(Duration::from_millis(200));
    let nb = TestNotebook::with_default_pool(process);
    let paragraph = nb.add_paragraph("note-1", "p1").await;
    let app = paragraph.create_or_get_application_state(clock_package());

    let (first, second) = tokio::join!(
        nb.coordinator.load(&paragraph, &app),
        nb.coordinator.load(&paragraph, &app)
    );
    first.expect("first load");
    second.expect("second load");

    assert_eq!(app.status(), ApplicationStatus::Loaded);
    assert_eq!(nb.process.call_names(), vec!["loadApplication"]);
    assert_eq!(nb.process.max_concurrent_calls(), 1);
}

#[tokio::test]
async fn test_pool_size_bounds_concurrency() {
    let process = MockInterpreterProcess::new().with_delay(Duration::from_millis(100));
    let nb = TestNotebook::new(process, 1);
    let first = nb.add_paragraph("note-1", "p1").await;
    let second = nb.add_paragraph("note-1", "p2").await;

    nb.coordinator.load_and_run(clock_package(), &first).await;
    nb.coordinator.load_and_run(clock_package(), &second).await;

    let done = eventually(WAIT, || nb.process.calls().len() == 4).await;
    assert!(done, "calls: {:?}", nb.process.call_names());
    assert_eq!(nb.process.max_concurrent_calls(), 1);
}

#[tokio::test]
async fn test_coordinators_share_one_pool() {
    let registry = ExecutorRegistry::new();
    let first = TestNotebook::with_registry(MockInterpreterProcess::new(), &registry, 3);
    let second = TestNotebook::with_registry(MockInterpreterProcess::new(), &registry, 7);

    assert!(Arc::ptr_eq(first.coordinator.pool(), second.coordinator.pool()));
    assert_eq!(second.coordinator.pool().size(), 3);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_pool_size_comes_from_project_config() {
    let project = create_test_project().expect("test project");
    let config = load_config(project.path()).await.expect("config loads");

    let registry = ExecutorRegistry::new();
    let coordinator =
        ApplicationCoordinator::from_config(Arc::new(Notebook::new()), &registry, &config.server);

    assert_eq!(config.server.application_pool_size, 2);
    assert_eq!(coordinator.pool().size(), 2);
}

#[tokio::test]
async fn test_paragraph_remove_unloads_apps_before_returning() {
    let nb = TestNotebook::with_default_pool(MockInterpreterProcess::new());
    let paragraph = nb.add_paragraph("note-1", "p1").await;

    let app_id = nb
        .coordinator
        .load_and_run(clock_package(), &paragraph)
        .await;
    let ran = eventually(WAIT, || nb.process.call_names().len() == 2).await;
    assert!(ran);

    let removed = nb
        .notebook
        .remove_paragraph("note-1", "p1")
        .await
        .expect("paragraph removed");

    let app = removed.application_state(&app_id).expect("app state kept");
    assert_eq!(app.status(), ApplicationStatus::Unloaded);
    assert_eq!(nb.process.call_names().last(), Some(&"unloadApplication"));
    assert!(nb.notebook.paragraph("note-1", "p1").is_none());
}

#[tokio::test]
async fn test_paragraph_finish_reruns_loaded_apps() {
    let nb = TestNotebook::with_default_pool(MockInterpreterProcess::new());
    let paragraph = nb.add_paragraph("note-1", "p1").await;

    let app_id = nb
        .coordinator
        .load_and_run(clock_package(), &paragraph)
        .await;
    let ran = eventually(WAIT, || nb.process.call_names().len() == 2).await;
    assert!(ran);

    assert!(
        nb.notebook
            .set_paragraph_status("note-1", "p1", JobStatus::Running)
            .await
    );
    assert!(
        nb.notebook
            .set_paragraph_status("note-1", "p1", JobStatus::Finished)
            .await
    );

    let rerun = eventually(WAIT, || nb.process.call_names().len() == 3).await;
    assert!(rerun, "calls: {:?}", nb.process.call_names());
    assert_eq!(
        nb.process.call_names(),
        vec!["loadApplication", "runApplication", "runApplication"]
    );
    assert_eq!(nb.listener.loads(&app_id), 2);
    assert_eq!(paragraph.all_application_states().len(), 1);
}

#[tokio::test]
async fn test_interpreter_output_events_update_app() {
    let nb = TestNotebook::with_default_pool(MockInterpreterProcess::new());
    let paragraph = nb.add_paragraph("note-1", "p1").await;
    let app = paragraph.create_or_get_application_state(clock_package());

    nb.coordinator
        .on_output_append("note-1", "p1", 0, app.id(), "12:00")
        .await;
    nb.coordinator
        .on_output_append("note-1", "p1", 0, app.id(), ":01")
        .await;
    assert_eq!(app.output(), "12:00:01");

    nb.coordinator
        .on_output_updated("note-1", "p1", 0, app.id(), OutputType::Html, "<b>12:02</b>")
        .await;
    assert_eq!(app.output(), "<b>12:02</b>");

    nb.coordinator
        .on_status_change("note-1", "p1", app.id(), ApplicationStatus::Error)
        .await;
    assert_eq!(app.status(), ApplicationStatus::Error);

    assert_eq!(nb.listener.events().len(), 4);
}
