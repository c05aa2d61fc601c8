use super::traits::{EventStore, StoreError};
use crate::model::{Batch, Event, EventLog};
use async_trait::async_trait;
use chrono::DateTime;
use duckdb::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Local event store in a DuckDB file. Useful for staging and for exercising the tool
/// without a repository.
///
/// A file-backed store opens its connection on first use, inside the operation, so a
/// file locked by another process surfaces as a transient failure of that operation.
pub struct DuckDbEventStore {
    path: Option<PathBuf>,
    conn: Arc<Mutex<Option<Connection>>>,
}

fn classify(error: duckdb::Error) -> StoreError {
    classify_message(error.to_string())
}

fn classify_message(message: String) -> StoreError {
    // Another process holds the database file
    if message.contains("Could not set lock") {
        StoreError::Transient(message)
    } else {
        StoreError::Rejected(message)
    }
}

fn join_error(error: tokio::task::JoinError) -> StoreError {
    StoreError::Rejected(format!("Task join error: {}", error))
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Rejected("database connection lock poisoned".to_string())
}

impl DuckDbEventStore {
    /// Store backed by a database file. Nothing is opened until the first operation.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Create an in-memory DuckDB store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(classify)?;
        init_schema(&conn)?;
        Ok(Self {
            path: None,
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS batches (
            full_id VARCHAR PRIMARY KEY,
            batch_id VARCHAR NOT NULL,
            round_trip UBIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        );
        CREATE TABLE IF NOT EXISTS events (
            full_id VARCHAR NOT NULL,
            seq BIGINT NOT NULL,
            event_id VARCHAR NOT NULL,
            timestamp_ns BIGINT NOT NULL,
            agent VARCHAR NOT NULL,
            details VARCHAR NOT NULL,
            success BOOLEAN NOT NULL,
            PRIMARY KEY (full_id, seq)
        );",
    )
    .map_err(classify)
}

/// Returns the open connection, opening the database file first if needed.
fn connect<'a>(
    slot: &'a mut Option<Connection>,
    path: Option<&Path>,
) -> Result<&'a mut Connection, StoreError> {
    if slot.is_none() {
        let path = path.ok_or_else(|| {
            StoreError::Rejected("in-memory database has no connection".to_string())
        })?;
        tracing::debug!(path = %path.display(), "Opening DuckDB event store");
        let conn = Connection::open(path).map_err(classify)?;
        init_schema(&conn)?;
        *slot = Some(conn);
    }
    slot.as_mut()
        .ok_or_else(|| StoreError::Rejected("database connection unavailable".to_string()))
}

fn batch_exists(conn: &Connection, full_id: &str) -> Result<bool, duckdb::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM batches WHERE full_id = ?",
        duckdb::params![full_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[async_trait]
impl EventStore for DuckDbEventStore {
    async fn fetch(&self, batch: &Batch) -> Result<EventLog, StoreError> {
        let conn = self.conn.clone();
        let path = self.path.clone();
        let full_id = batch.full_id();

        tokio::task::spawn_blocking(move || {
            let mut slot = conn.lock().map_err(poisoned)?;
            let conn = connect(&mut slot, path.as_deref())?;
            if !batch_exists(conn, &full_id).map_err(classify)? {
                return Err(StoreError::NotFound(full_id));
            }

            let mut stmt = conn
                .prepare(
                    "SELECT event_id, timestamp_ns, agent, details, success
                     FROM events WHERE full_id = ?
                     ORDER BY seq",
                )
                .map_err(classify)?;

            let rows = stmt
                .query_map(duckdb::params![full_id], |row| {
                    Ok(Event {
                        id: row.get(0)?,
                        timestamp: DateTime::from_timestamp_nanos(row.get::<_, i64>(1)?),
                        agent: row.get(2)?,
                        details: row.get(3)?,
                        success: row.get(4)?,
                    })
                })
                .map_err(classify)?;

            let mut events = Vec::new();
            for row in rows {
                events.push(row.map_err(classify)?);
            }
            Ok(EventLog::from_events(events))
        })
        .await
        .map_err(join_error)?
    }

    async fn create(&self, batch: &Batch) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let path = self.path.clone();
        let batch = batch.clone();

        tokio::task::spawn_blocking(move || {
            let mut slot = conn.lock().map_err(poisoned)?;
            let conn = connect(&mut slot, path.as_deref())?;
            conn.execute(
                "INSERT INTO batches (full_id, batch_id, round_trip, created_at)
                 VALUES (?, ?, ?, current_timestamp)
                 ON CONFLICT DO NOTHING",
                duckdb::params![batch.full_id(), batch.batch_id(), batch.round_trip()],
            )
            .map_err(classify)?;
            Ok(())
        })
        .await
        .map_err(join_error)?
    }

    async fn write_log(&self, batch: &Batch, log: &EventLog) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let path = self.path.clone();
        let full_id = batch.full_id();
        let events = log.events().to_vec();

        tokio::task::spawn_blocking(move || {
            let mut slot = conn.lock().map_err(poisoned)?;
            let conn = connect(&mut slot, path.as_deref())?;
            if !batch_exists(conn, &full_id).map_err(classify)? {
                return Err(StoreError::NotFound(full_id));
            }

            let tx = conn.transaction().map_err(classify)?;
            tx.execute("DELETE FROM events WHERE full_id = ?", duckdb::params![full_id])
                .map_err(classify)?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO events (full_id, seq, event_id, timestamp_ns, agent, details, success)
                         VALUES (?, ?, ?, ?, ?, ?, ?)",
                    )
                    .map_err(classify)?;

                for (seq, event) in events.iter().enumerate() {
                    let timestamp_ns = event.timestamp.timestamp_nanos_opt().ok_or_else(|| {
                        StoreError::Rejected(format!(
                            "timestamp of '{}' is outside the storable range",
                            event.id
                        ))
                    })?;
                    stmt.execute(duckdb::params![
                        full_id,
                        seq as i64,
                        event.id,
                        timestamp_ns,
                        event.agent,
                        event.details,
                        event.success,
                    ])
                    .map_err(classify)?;
                }
            }
            tx.commit().map_err(classify)?;

            tracing::debug!(full_id = %full_id, events = events.len(), "Replaced event log");
            Ok(())
        })
        .await
        .map_err(join_error)?
    }
}
