use super::traits::{EventStore, StoreError};
use crate::config::types::HttpStoreConfig;
use crate::model::{Batch, EventLog};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

/// Event store reached over the repository's JSON API.
///
/// - `GET  {url}/batches/{fullId}/events` returns the log
/// - `PUT  {url}/batches/{fullId}/events` replaces it
/// - `POST {url}/batches` creates a batch round trip
#[derive(Debug)]
pub struct HttpEventStore {
    base_url: Url,
    client: reqwest::Client,
    username: Option<String>,
    password: Option<String>,
    pid_generator_url: Option<Url>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CreateBatchRequest {
    full_id: String,
    batch_id: String,
    round_trip: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<String>,
}

impl HttpEventStore {
    pub fn new(config: &HttpStoreConfig) -> Result<Self, StoreError> {
        let base_url = parse_url(&config.url)?;
        let pid_generator_url = config
            .pid_generator_url
            .as_deref()
            .map(parse_url)
            .transpose()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Rejected(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            client,
            username: config.username.clone(),
            password: config.password.clone(),
            pid_generator_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Rejected(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_ref()),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        full_id: &str,
    ) -> Result<reqwest::Response, StoreError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, full_id, &body))
    }

    async fn allocate_pid(&self, url: &Url, full_id: &str) -> Result<String, StoreError> {
        let response = self.send(self.client.post(url.clone()), full_id).await?;
        let pid = response.text().await.map_err(classify_transport)?;
        let pid = pid.trim();
        if pid.is_empty() {
            return Err(StoreError::Rejected("PID generator returned an empty identifier".to_string()));
        }
        tracing::debug!(full_id, pid, "Allocated object identifier");
        Ok(pid.to_string())
    }
}

fn parse_url(raw: &str) -> Result<Url, StoreError> {
    Url::parse(raw).map_err(|e| StoreError::Rejected(format!("invalid URL '{}': {}", raw, e)))
}

fn classify_status(status: StatusCode, full_id: &str, body: &str) -> StoreError {
    let detail = if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), body.trim())
    };

    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(full_id.to_string()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => StoreError::Transient(detail),
        s if s.is_server_error() => StoreError::Transient(detail),
        _ => StoreError::Rejected(detail),
    }
}

fn classify_transport(error: reqwest::Error) -> StoreError {
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        StoreError::Transient(error.to_string())
    } else {
        StoreError::Rejected(error.to_string())
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    async fn fetch(&self, batch: &Batch) -> Result<EventLog, StoreError> {
        let full_id = batch.full_id();
        let url = self.endpoint(&["batches", &full_id, "events"])?;
        let response = self.send(self.client.get(url), &full_id).await?;
        // EventLog deserializes through from_events, which restores timestamp order
        response
            .json::<EventLog>()
            .await
            .map_err(|e| StoreError::Rejected(format!("unreadable event log for {}: {}", full_id, e)))
    }

    async fn create(&self, batch: &Batch) -> Result<(), StoreError> {
        let full_id = batch.full_id();
        let pid = match &self.pid_generator_url {
            Some(url) => Some(self.allocate_pid(url, &full_id).await?),
            None => None,
        };
        let body = CreateBatchRequest {
            full_id: full_id.clone(),
            batch_id: batch.batch_id().to_string(),
            round_trip: batch.round_trip(),
            pid,
        };
        let url = self.endpoint(&["batches"])?;

        let response = self
            .authorize(self.client.post(url).json(&body))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            tracing::debug!(full_id = %full_id, "Batch already exists");
            return Ok(());
        }
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &full_id, &body))
    }

    async fn write_log(&self, batch: &Batch, log: &EventLog) -> Result<(), StoreError> {
        let full_id = batch.full_id();
        let url = self.endpoint(&["batches", &full_id, "events"])?;
        self.send(self.client.put(url).json(log), &full_id).await?;
        Ok(())
    }
}
