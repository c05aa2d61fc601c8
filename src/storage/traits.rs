use crate::model::{Batch, EventLog};
use async_trait::async_trait;

/// Repository holding one event log per batch round trip.
///
/// The fetch-then-write sequence used by callers is not atomic. Implementations backed by
/// a shared repository must give per-item atomic writes; no conflict detection happens here.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Current log of `batch`, in timestamp order.
    async fn fetch(&self, batch: &Batch) -> Result<EventLog, StoreError>;

    /// Creates an empty log for `batch`. Creating an existing batch is not an error.
    async fn create(&self, batch: &Batch) -> Result<(), StoreError>;

    /// Replaces the log of an existing `batch`.
    async fn write_log(&self, batch: &Batch, log: &EventLog) -> Result<(), StoreError>;
}

/// Failures reported by an [`EventStore`], classified for the retry layer.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("batch {0} not found")]
    NotFound(String),

    /// Worth another attempt: connection refused, timeouts, lock contention, 5xx.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Retrying will not help: bad credentials, malformed request or response.
    #[error("store rejected request: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for Box<T> {
    async fn fetch(&self, batch: &Batch) -> Result<EventLog, StoreError> {
        (**self).fetch(batch).await
    }

    async fn create(&self, batch: &Batch) -> Result<(), StoreError> {
        (**self).create(batch).await
    }

    async fn write_log(&self, batch: &Batch, log: &EventLog) -> Result<(), StoreError> {
        (**self).write_log(batch, log).await
    }
}
