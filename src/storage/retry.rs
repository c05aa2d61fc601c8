use super::traits::{EventStore, StoreError};
use crate::model::{Batch, EventLog};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    #[serde(default = "default_delay", with = "humantime_serde")]
    pub delay: Duration,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_delay() -> Duration {
    Duration::from_millis(100)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_delay(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("no such batch/roundtrip: {0}")]
    ItemNotFound(String),

    #[error("store unavailable after {attempts} attempts: {last}")]
    Unavailable { attempts: u32, last: String },

    #[error("store rejected request: {0}")]
    Rejected(String),
}

/// Wraps an [`EventStore`] so transient failures are retried with a fixed delay.
///
/// Not-found and rejected requests are passed through after the first attempt.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: EventStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn fetch(&self, batch: &Batch) -> Result<EventLog, StorageError> {
        self.with_retry("fetch", batch, || self.inner.fetch(batch)).await
    }

    pub async fn create(&self, batch: &Batch) -> Result<(), StorageError> {
        self.with_retry("create", batch, || self.inner.create(batch)).await
    }

    pub async fn write_log(&self, batch: &Batch, log: &EventLog) -> Result<(), StorageError> {
        self.with_retry("write_log", batch, || self.inner.write_log(batch, log))
            .await
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        batch: &Batch,
        mut call: F,
    ) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(
                            batch = %batch,
                            operation,
                            attempts = attempt,
                            "Store call succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(StoreError::NotFound(id)) => return Err(StorageError::ItemNotFound(id)),
                Err(StoreError::Rejected(reason)) => {
                    tracing::error!(batch = %batch, operation, reason = %reason, "Store rejected request");
                    return Err(StorageError::Rejected(reason));
                }
                Err(StoreError::Transient(reason)) => {
                    if attempt >= max_attempts {
                        tracing::error!(
                            batch = %batch,
                            operation,
                            attempts = attempt,
                            error = %reason,
                            "Max attempts exceeded"
                        );
                        return Err(StorageError::Unavailable {
                            attempts: attempt,
                            last: reason,
                        });
                    }

                    tracing::warn!(
                        batch = %batch,
                        operation,
                        attempt,
                        delay_ms = self.policy.delay.as_millis() as u64,
                        error = %reason,
                        "Store call failed, retrying"
                    );
                    if !self.policy.delay.is_zero() {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::{Fault, InMemoryEventStore};
    use crate::model::Event;
    use chrono::Utc;

    fn policy(max_attempts: u32, delay_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(delay_ms),
        }
    }

    fn seeded_store(batch: &Batch) -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        store.insert(
            batch,
            EventLog::from_events(vec![Event::new("Data_Received", Utc::now(), "me", "", true)]),
        );
        store
    }

    #[tokio::test]
    async fn test_succeeds_without_retry() {
        let batch = Batch::new("1", 1);
        let store = RetryingStore::new(seeded_store(&batch), policy(3, 0));
        let log = store.fetch(&batch).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(store.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_recovers_from_transient_failures() {
        let batch = Batch::new("1", 1);
        let inner = seeded_store(&batch);
        inner.fail_next(2, Fault::Transient);
        let store = RetryingStore::new(inner, policy(3, 0));

        let log = store.fetch(&batch).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(store.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let batch = Batch::new("1", 1);
        let inner = seeded_store(&batch);
        inner.fail_next(5, Fault::Transient);
        let store = RetryingStore::new(inner, policy(3, 0));

        let result = store.write_log(&batch, &EventLog::new()).await;
        assert!(matches!(result, Err(StorageError::Unavailable { attempts: 3, .. })));
        assert_eq!(store.inner().calls(), 3);
        // the log was never replaced
        assert_eq!(store.inner().get(&batch).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let store = RetryingStore::new(InMemoryEventStore::new(), policy(5, 0));
        let result = store.fetch(&Batch::new("missing", 2)).await;
        assert_eq!(result, Err(StorageError::ItemNotFound("Bmissing-RT2".to_string())));
        assert_eq!(store.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_is_not_retried() {
        let batch = Batch::new("1", 1);
        let inner = seeded_store(&batch);
        inner.fail_next(1, Fault::Rejected);
        let store = RetryingStore::new(inner, policy(5, 0));

        let result = store.fetch(&batch).await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));
        assert_eq!(store.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let batch = Batch::new("1", 1);
        let store = RetryingStore::new(seeded_store(&batch), policy(0, 0));
        assert!(store.fetch(&batch).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_attempts() {
        let batch = Batch::new("1", 1);
        let inner = seeded_store(&batch);
        inner.fail_next(2, Fault::Transient);
        let store = RetryingStore::new(inner, policy(3, 500));

        let started = tokio::time::Instant::now();
        store.fetch(&batch).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }

    #[test]
    fn test_policy_from_yaml() {
        let policy: RetryPolicy = serde_yaml::from_str("max_attempts: 4\ndelay: 250ms\n").unwrap();
        assert_eq!(policy, RetryPolicy { max_attempts: 4, delay: Duration::from_millis(250) });

        let defaults: RetryPolicy = serde_yaml::from_str("{}").unwrap();
        assert_eq!(defaults, RetryPolicy::default());
    }
}
