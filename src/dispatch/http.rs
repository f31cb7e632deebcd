use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::dispatch::{GenerationRequest, StatusQuery, TaskBackend, TaskId, TaskRecord};
use crate::error::GenerationError;
use crate::response::ApiEnvelope;

/// Max response body size for submit and status responses.
pub const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

pub const SUBMIT_PATH: &str = "/api/generation/submit";
pub const QUERY_PATH: &str = "/api/generation/query";

#[derive(Debug, Deserialize)]
struct SubmitData {
    task_ids: Vec<TaskId>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    tasks: Vec<TaskRecord>,
}

/// `TaskBackend` over the generation HTTP API.
pub struct HttpTaskBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl std::fmt::Debug for HttpTaskBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTaskBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl HttpTaskBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            api_key,
            request_timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.request_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GenerationError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let mut req = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GenerationError::AuthFailed {
                message: format!("HTTP {status}"),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited {
                message: format!("HTTP {status}"),
            });
        }

        if let Some(len) = response.content_length()
            && len as usize > MAX_RESPONSE_BYTES
        {
            return Err(GenerationError::Upstream {
                message: format!("response too large: {len} bytes (max {MAX_RESPONSE_BYTES})"),
                status: Some(status.as_u16()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| GenerationError::Upstream {
            message: format!("failed to read response body: {e}"),
            status: None,
        })?;

        if !status.is_success() {
            let truncated = &bytes[..bytes.len().min(512)];
            return Err(GenerationError::Upstream {
                message: format!("{status}: {}", String::from_utf8_lossy(truncated)),
                status: Some(status.as_u16()),
            });
        }

        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(GenerationError::Upstream {
                message: format!(
                    "response too large: {} bytes (max {MAX_RESPONSE_BYTES})",
                    bytes.len()
                ),
                status: None,
            });
        }

        parse_envelope(&bytes)
    }
}

/// Decode an envelope body and unwrap its payload.
pub fn parse_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T, GenerationError> {
    let envelope: ApiEnvelope<T> = serde_json::from_slice(body)
        .map_err(|e| GenerationError::SchemaParse(format!("failed to parse envelope: {e}")))?;
    envelope.into_result()
}

/// Extract task ids from a submit response body.
pub fn parse_submit_response(body: &[u8]) -> Result<Vec<TaskId>, GenerationError> {
    parse_envelope::<SubmitData>(body).map(|d| d.task_ids)
}

/// Extract task rows from a status response body.
pub fn parse_query_response(body: &[u8]) -> Result<Vec<TaskRecord>, GenerationError> {
    parse_envelope::<QueryData>(body).map(|d| d.tasks)
}

#[async_trait]
impl TaskBackend for HttpTaskBackend {
    async fn submit_task(&self, req: &GenerationRequest) -> Result<Vec<TaskId>, GenerationError> {
        let data: SubmitData = self.post(SUBMIT_PATH, req).await?;
        tracing::debug!(model = req.model, tasks = data.task_ids.len(), "submit accepted");
        Ok(data.task_ids)
    }

    async fn query_tasks(&self, query: &StatusQuery) -> Result<Vec<TaskRecord>, GenerationError> {
        // Any failure here is a broken status channel, not a per-task failure.
        let data: QueryData = self
            .post(QUERY_PATH, query)
            .await
            .map_err(|e| match e {
                GenerationError::Rejected { message, .. }
                | GenerationError::TaskNotFound { message } => {
                    GenerationError::QueryFailed { message }
                }
                other => other,
            })?;
        Ok(data.tasks)
    }
}
