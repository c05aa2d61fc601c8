use restart_workflow::cli::args::RetryOverrides;
use restart_workflow::cli::exit_code;
use restart_workflow::cli::{run, Command, Request};
use restart_workflow::model::{Batch, Event, EventLog};
use restart_workflow::restart::Operation;
use restart_workflow::storage::duckdb::DuckDbEventStore;
use restart_workflow::storage::EventStore;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes a config pointing at a DuckDB file inside `dir`.
fn write_config(dir: &Path) -> (PathBuf, PathBuf) {
    let db_path = dir.join("events.duckdb");
    let config_path = dir.join("config.yml");
    fs::write(
        &config_path,
        format!(
            "agent: test-operator\nstore:\n  kind: duckdb\n  path: {}\nretry:\n  max_attempts: 2\n  delay: 1ms\n",
            db_path.display()
        ),
    )
    .unwrap();
    (config_path, db_path)
}

async fn seed(db_path: &Path, batch: &Batch, events: Vec<Event>) {
    let store = DuckDbEventStore::open(db_path);
    store.create(batch).await.unwrap();
    store.write_log(batch, &EventLog::from_events(events)).await.unwrap();
}

async fn read_back(db_path: &Path, batch: &Batch) -> EventLog {
    DuckDbEventStore::open(db_path).fetch(batch).await.unwrap()
}

fn apply(batch: &Batch, operation: Operation) -> Request {
    Request {
        batch: batch.clone(),
        command: Command::Apply(operation),
        dry_run: false,
    }
}

#[tokio::test]
async fn test_restart_through_config_file() {
    let dir = TempDir::new().unwrap();
    let (config_path, db_path) = write_config(dir.path());
    let batch = Batch::new("400022028241", 1);
    let t = |m| Utc::now() - chrono::Duration::minutes(m);
    seed(
        &db_path,
        &batch,
        vec![
            Event::new("Data_Received", t(30), "ingest", "", true),
            Event::new("Metadata_Archived", t(20), "archiver", "timeout", false),
            Event::new("Data_Archived", t(10), "archiver", "", true),
        ],
    )
    .await;

    let outcome = run(
        &config_path,
        &apply(&batch, Operation::Restart { from: None }),
        &RetryOverrides::default(),
    )
    .await
    .unwrap();
    assert_eq!(
        outcome.to_string(),
        "Removed 2 events from B400022028241-RT1. Workflow will be re-triggered."
    );

    let log = read_back(&db_path, &batch).await;
    assert_eq!(log.len(), 1);
    assert_eq!(log.events()[0].id, "Data_Received");
}

#[tokio::test]
async fn test_added_events_carry_configured_agent() {
    let dir = TempDir::new().unwrap();
    let (config_path, db_path) = write_config(dir.path());
    let batch = Batch::new("400022028241", 2);
    seed(&db_path, &batch, vec![]).await;

    run(
        &config_path,
        &apply(&batch, Operation::Add { event: "Manually_stopped".to_string() }),
        &RetryOverrides::default(),
    )
    .await
    .unwrap();

    let log = read_back(&db_path, &batch).await;
    assert_eq!(log.len(), 1);
    assert_eq!(log.events()[0].agent, "test-operator");
    assert!(log.events()[0].success);
}

#[tokio::test]
async fn test_unknown_batch_exit_code() {
    let dir = TempDir::new().unwrap();
    let (config_path, _) = write_config(dir.path());

    let err = run(
        &config_path,
        &Request {
            batch: Batch::new("nope", 1),
            command: Command::Show,
            dry_run: false,
        },
        &RetryOverrides::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_config_exit_code() {
    let dir = TempDir::new().unwrap();
    let err = run(
        &dir.path().join("absent.yml"),
        &apply(&Batch::new("b", 1), Operation::Restart { from: None }),
        &RetryOverrides::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.exit_code(), exit_code::CONFIG);
}

#[tokio::test]
async fn test_unparsable_config_exit_code() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.yml");
    fs::write(&config_path, "store: [not, a, map\n").unwrap();

    let err = run(
        &config_path,
        &apply(&Batch::new("b", 1), Operation::Restart { from: None }),
        &RetryOverrides::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.exit_code(), exit_code::CONFIG);
}

#[tokio::test]
async fn test_invalid_priority_exit_code() {
    let dir = TempDir::new().unwrap();
    let (config_path, db_path) = write_config(dir.path());
    let batch = Batch::new("400022028241", 3);
    seed(&db_path, &batch, vec![]).await;

    let err = run(
        &config_path,
        &apply(&batch, Operation::Prioritize { level: 0 }),
        &RetryOverrides::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.exit_code(), exit_code::INVALID_OPERATION);
    assert!(read_back(&db_path, &batch).await.is_empty());
}

#[tokio::test]
async fn test_unopenable_database_fails_in_store_operation() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.yml");
    fs::write(
        &config_path,
        format!(
            "store:\n  kind: duckdb\n  path: {}\nretry:\n  max_attempts: 2\n  delay: 1ms\n",
            dir.path().join("missing/events.duckdb").display()
        ),
    )
    .unwrap();

    let err = run(
        &config_path,
        &apply(&Batch::new("b", 1), Operation::Restart { from: None }),
        &RetryOverrides::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, restart_workflow::cli::RunError::Storage(_)));
    assert_eq!(err.exit_code(), exit_code::STORE_UNAVAILABLE);
}
