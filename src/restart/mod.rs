//! Event log surgery that makes the scheduler pick a batch up again.
//!
//! Everything here works on an in-memory snapshot of a log and never touches the store.
//! The caller fetches, asks for a [`Plan`], and writes the plan's log back.

pub mod priority;

use crate::model::{Event, EventLog};
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

pub use priority::{is_priority_marker, priority_marker, PRIORITY_EVENT};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("invalid priority {0}: must be between 1 and 9")]
    InvalidPriority(u8),

    /// Some real event is older than the synthetic marker, e.g. a re-imported archival batch.
    #[error("priority marker would land at position {position}, behind event '{blocking_event}'")]
    MarkerNotFirst {
        position: usize,
        blocking_event: String,
    },
}

/// Result of a removal: the remaining log and how many events were dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub log: EventLog,
    pub removed: usize,
}

impl Truncation {
    fn unchanged(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            removed: 0,
        }
    }
}

/// Drops the first failed event and everything logged after it.
///
/// Events before the cut are kept whatever their own outcome.
pub fn restart_from_first_failure(log: &EventLog) -> Truncation {
    match log.first_failure() {
        Some(index) => truncate_at(log, index),
        None => Truncation::unchanged(log),
    }
}

/// Drops the first event named `name` and everything after it. When no event carries that
/// name nothing is removed; that is a no-op, not an error.
pub fn restart_from_named_event(log: &EventLog, name: &str) -> Truncation {
    match log.position_of(name) {
        Some(index) => truncate_at(log, index),
        None => Truncation::unchanged(log),
    }
}

fn truncate_at(log: &EventLog, index: usize) -> Truncation {
    let mut log = log.clone();
    let removed = log.truncate_from(index).len();
    Truncation { log, removed }
}

/// Removes every event named `name`, wherever it sits.
pub fn remove_named(log: &EventLog, name: &str) -> Truncation {
    let mut log = log.clone();
    let removed = log.remove_where(|e| e.id == name);
    Truncation { log, removed }
}

/// Records `name` as successfully completed at `now`.
pub fn append_success(log: &EventLog, name: &str, agent: &str, now: DateTime<Utc>) -> EventLog {
    let mut log = log.clone();
    log.insert(Event::new(name, now, agent, "", true));
    log
}

/// Adds a priority marker for `level`. Existing markers are left alone.
pub fn insert_priority_marker(
    log: &EventLog,
    level: u8,
    agent: &str,
    now: DateTime<Utc>,
) -> Result<EventLog, CoordinatorError> {
    if !priority::is_valid_priority(level) {
        return Err(CoordinatorError::InvalidPriority(level));
    }

    let mut log = log.clone();
    let position = log.insert(priority_marker(level, agent, now));

    // Only other markers may sit ahead of the new one.
    if let Some(blocking) = log.events()[..position]
        .iter()
        .find(|e| !is_priority_marker(e))
    {
        return Err(CoordinatorError::MarkerNotFirst {
            position,
            blocking_event: blocking.id.clone(),
        });
    }
    debug_assert!(is_priority_marker(&log.events()[0]));

    Ok(log)
}

/// A single operator request against one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Add { event: String },
    Remove { event: String },
    Restart { from: Option<String> },
    Prioritize { level: u8 },
}

impl Operation {
    pub fn keyword(&self) -> &'static str {
        match self {
            Operation::Add { .. } => "add",
            Operation::Remove { .. } => "remove",
            Operation::Restart { .. } => "restart",
            Operation::Prioritize { .. } => "prioritize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Removed(usize),
    Appended { event: String },
    Prioritized { level: u8, replaced: usize },
}

impl Change {
    /// Whether writing the plan back would change anything.
    pub fn has_effect(&self) -> bool {
        !matches!(self, Change::Removed(0))
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Removed(0) => write!(f, "no events removed"),
            Change::Removed(n) => write!(f, "{} events removed", n),
            Change::Appended { event } => write!(f, "'{}' appended", event),
            Change::Prioritized { level, replaced } => {
                write!(f, "prioritized at level {} ({} old markers replaced)", level, replaced)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub log: EventLog,
    pub change: Change,
}

/// Computes the new log for `operation`.
///
/// `Prioritize` clears existing markers before adding the new one, so repeated requests
/// replace rather than stack.
pub fn plan(
    log: &EventLog,
    operation: &Operation,
    agent: &str,
    now: DateTime<Utc>,
) -> Result<Plan, CoordinatorError> {
    let plan = match operation {
        Operation::Add { event } => Plan {
            log: append_success(log, event, agent, now),
            change: Change::Appended {
                event: event.clone(),
            },
        },
        Operation::Remove { event } => {
            let Truncation { log, removed } = remove_named(log, event);
            Plan {
                log,
                change: Change::Removed(removed),
            }
        }
        Operation::Restart { from } => {
            let Truncation { log, removed } = match from {
                Some(name) => restart_from_named_event(log, name),
                None => restart_from_first_failure(log),
            };
            Plan {
                log,
                change: Change::Removed(removed),
            }
        }
        Operation::Prioritize { level } => {
            if !priority::is_valid_priority(*level) {
                return Err(CoordinatorError::InvalidPriority(*level));
            }
            let cleared = remove_named(log, PRIORITY_EVENT);
            Plan {
                log: insert_priority_marker(&cleared.log, *level, agent, now)?,
                change: Change::Prioritized {
                    level: *level,
                    replaced: cleared.removed,
                },
            }
        }
    };
    Ok(plan)
}
