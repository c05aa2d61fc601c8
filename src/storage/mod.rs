pub mod duckdb;
pub mod http;
pub mod memory;
pub mod retry;
pub mod traits;

pub use retry::{RetryPolicy, RetryingStore, StorageError};
pub use traits::{EventStore, StoreError};

use crate::config::types::StoreConfig;

/// Builds the store selected by `config`.
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn EventStore>, StoreError> {
    match config {
        StoreConfig::Http(http) => {
            tracing::info!(url = %http.url, "Using repository event store");
            Ok(Box::new(http::HttpEventStore::new(http)?))
        }
        StoreConfig::Duckdb(local) => {
            tracing::info!(path = %local.path.display(), "Using local DuckDB event store");
            Ok(Box::new(duckdb::DuckDbEventStore::open(&local.path)))
        }
    }
}
