use super::args::RetryOverrides;
use super::exit_code;
use crate::config::{expand_tilde, load_config, ConfigError};
use crate::model::{Batch, EventLog};
use crate::restart::{self, Change, CoordinatorError, Operation};
use crate::storage::{open_store, EventStore, RetryingStore, StorageError, StoreError};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("error connecting to store: {0}")]
    Connect(#[from] StoreError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Coordinator(#[from] CoordinatorError),
}

impl RunError {
    /// Process exit status reported for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Config(_) => exit_code::CONFIG,
            RunError::Connect(_) => exit_code::STORE_CONNECTION,
            RunError::Storage(StorageError::ItemNotFound(_)) => exit_code::NOT_FOUND,
            RunError::Storage(_) => exit_code::STORE_UNAVAILABLE,
            RunError::Coordinator(_) => exit_code::INVALID_OPERATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Apply(Operation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub batch: Batch,
    pub command: Command,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Listed {
        batch: Batch,
        log: EventLog,
    },
    Applied {
        batch: Batch,
        operation: Operation,
        change: Change,
        log: EventLog,
        written: bool,
    },
}

impl Outcome {
    /// True when the command changed, or would have changed, the log.
    pub fn has_effect(&self) -> bool {
        match self {
            Outcome::Listed { .. } => false,
            Outcome::Applied { change, .. } => change.has_effect(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Listed { batch, log } => {
                writeln!(f, "{} has {} events", batch, log.len())?;
                for event in log {
                    writeln!(
                        f,
                        "  {}  {:<6}  {}  [{}]  {}",
                        event.timestamp.to_rfc3339(),
                        if event.success { "ok" } else { "FAILED" },
                        event.id,
                        event.agent,
                        event.details
                    )?;
                }
                Ok(())
            }
            Outcome::Applied {
                batch,
                change,
                written,
                ..
            } => {
                match change {
                    Change::Removed(0) => write!(
                        f,
                        "Did not remove any events from {}. This operation had no effect.",
                        batch
                    )?,
                    Change::Removed(n) => write!(
                        f,
                        "Removed {} events from {}. Workflow will be re-triggered.",
                        n, batch
                    )?,
                    Change::Appended { event } => {
                        write!(f, "Added event '{}' to {}.", event, batch)?
                    }
                    Change::Prioritized { level, replaced } => write!(
                        f,
                        "Prioritized {} at level {} (replaced {} existing markers).",
                        batch, level, replaced
                    )?,
                }
                if !written && change.has_effect() {
                    write!(f, " Dry run: nothing was written.")?;
                }
                Ok(())
            }
        }
    }
}

/// Loads `config_path`, opens the configured store and executes `request`.
pub async fn run(
    config_path: &Path,
    request: &Request,
    overrides: &RetryOverrides,
) -> Result<Outcome, RunError> {
    let config_path = expand_tilde(config_path);
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(&config_path)?;

    let store = open_store(&config.store)?;
    let store = RetryingStore::new(store, overrides.apply(config.retry));

    execute(&store, request, &config.agent(), Utc::now()).await
}

/// Fetches the batch's log, plans the change and writes it back.
///
/// Nothing is written when the plan has no effect or the request is a dry run.
pub async fn execute<S: EventStore>(
    store: &RetryingStore<S>,
    request: &Request,
    agent: &str,
    now: DateTime<Utc>,
) -> Result<Outcome, RunError> {
    let batch = &request.batch;
    let log = store.fetch(batch).await?;
    info!(batch = %batch, events = log.len(), "Fetched event log");

    let operation = match &request.command {
        Command::Show => {
            return Ok(Outcome::Listed {
                batch: batch.clone(),
                log,
            })
        }
        Command::Apply(operation) => operation,
    };

    let plan = restart::plan(&log, operation, agent, now)?;
    info!(
        batch = %batch,
        operation = operation.keyword(),
        change = %plan.change,
        "Planned change"
    );

    let written = if !plan.change.has_effect() {
        false
    } else if request.dry_run {
        warn!(batch = %batch, "Dry run, skipping write");
        false
    } else {
        store.write_log(batch, &plan.log).await?;
        info!(batch = %batch, events = plan.log.len(), "Wrote event log");
        true
    };

    Ok(Outcome::Applied {
        batch: batch.clone(),
        operation: operation.clone(),
        change: plan.change,
        log: plan.log,
        written,
    })
}
