//! Downstream query forwarding.
//!
//! Read operations are answered by an external query service. The gateway
//! issues exactly one GET per operation and relays the reply unprocessed;
//! failures are surfaced to the caller rather than masked.

use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;

// ---------------------------------------------------------------------------
// QueryConfig
// ---------------------------------------------------------------------------

/// Location of the downstream query service.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Base URL every query path is appended to.
    pub base_url: String,
    /// Upper bound on a single downstream call, connect included.
    pub request_timeout: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7779".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// QueryError
// ---------------------------------------------------------------------------

/// Failure talking to the downstream query service.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("query service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("query service responded with {status}: {body}")]
    Status { status: u16, body: String },
}

// ---------------------------------------------------------------------------
// DownstreamQuery
// ---------------------------------------------------------------------------

/// One outbound GET: a path relative to the base URL plus query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamQuery {
    pub path: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl DownstreamQuery {
    #[must_use]
    pub fn new(path: &'static str) -> Self {
        Self {
            path,
            params: Vec::new(),
        }
    }

    /// Append a query pair.
    #[must_use]
    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.push((key, value.to_string()));
        self
    }

    /// Append a query pair only when `value` is present.
    #[must_use]
    pub fn param_opt(self, key: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }
}

// ---------------------------------------------------------------------------
// QueryForwarder
// ---------------------------------------------------------------------------

/// Issues downstream queries over a shared, pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct QueryForwarder {
    client: reqwest::Client,
    base_url: String,
}

impl QueryForwarder {
    /// Build a forwarder with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &QueryConfig) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, &config.base_url))
    }

    /// Build a forwarder around an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The base URL queries are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward `query` and relay the reply.
    ///
    /// JSON replies are returned as-is; any other body is relayed as a JSON
    /// string, and an empty body as `null`.
    ///
    /// # Errors
    ///
    /// `QueryError::Transport` when the service cannot be reached,
    /// `QueryError::Status` when it answers with a non-success status.
    pub async fn forward(&self, query: &DownstreamQuery) -> Result<Value, QueryError> {
        let body = self.fetch(query).await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned())))
    }

    /// Forward `query` and return the reply body untouched, for documents the
    /// gateway relays verbatim.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`QueryForwarder::forward`].
    pub async fn fetch(&self, query: &DownstreamQuery) -> Result<Bytes, QueryError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, query.path))
            .query(&query.params)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body)
    }

    /// Reachability check: `GET /` must answer with a success status.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`QueryForwarder::forward`].
    pub async fn ping(&self) -> Result<(), QueryError> {
        let response = self.client.get(format!("{}/", self.base_url)).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(QueryError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
