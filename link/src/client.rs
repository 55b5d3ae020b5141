//! HTTP implementation of [`QueryEngine`] with builder-based configuration.

use crate::{
    auth::AuthProvider,
    engine::QueryEngine,
    error::{LinkError, Result},
    models::{CancelAck, ErrorBody, JobHandle, JobMetadata, Page, SubmitRequest},
    timeouts::EngineTimeouts,
};
use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

/// HTTP client for a remote query engine.
///
/// Use [`EngineClient::builder`] to construct instances.
///
/// # Examples
///
/// ```rust,no_run
/// use querydeck_link::{EngineClient, QueryEngine};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = EngineClient::builder()
///     .base_url("http://localhost:9050")
///     .build()?;
///
/// let job = client.submit("SELECT 1", false).await?;
/// let page = client.fetch_page(&job, 0, 50, None).await?;
/// println!("{} rows", page.rows.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EngineClient {
    base_url: String,
    http_client: reqwest::Client,
    auth: AuthProvider,
    timeouts: EngineTimeouts,
    max_retries: u32,
    location: Option<String>,
    maximum_bytes_billed: Option<i64>,
    use_legacy_sql: Option<bool>,
}

impl EngineClient {
    /// Create a new builder for configuring the client
    pub fn builder() -> EngineClientBuilder {
        EngineClientBuilder::new()
    }

    /// Get the configured timeouts
    pub fn timeouts(&self) -> &EngineTimeouts {
        &self.timeouts
    }

    /// Send a request, retrying transient transport failures, bounded by
    /// `timeout` overall. Server-side failures are never retried.
    async fn send_with_retry<T: DeserializeOwned>(
        &self,
        op: &str,
        timeout: Duration,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<T> {
        let attempt_loop = async {
            let mut retries = 0;
            loop {
                let req = self.auth.apply_to_request(build())?;
                let attempt_start = Instant::now();
                debug!(
                    "[ENGINE_HTTP] {} attempt {}/{}",
                    op,
                    retries + 1,
                    self.max_retries + 1
                );

                match req.send().await {
                    Ok(response) => {
                        let status = response.status();
                        let duration_ms = attempt_start.elapsed().as_millis();
                        debug!(
                            "[ENGINE_HTTP] {} response: status={} duration_ms={}",
                            op, status, duration_ms
                        );

                        if status.is_success() {
                            return Ok(response.json::<T>().await?);
                        }

                        let text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        let message = serde_json::from_str::<ErrorBody>(&text)
                            .map(|body| body.message)
                            .unwrap_or(text);
                        warn!(
                            "[ENGINE_HTTP] {} server error: status={} message=\"{}\"",
                            op, status, message
                        );
                        return Err(LinkError::Server {
                            status_code: status.as_u16(),
                            message,
                        });
                    }
                    Err(e) if retries < self.max_retries && is_retriable(&e) => {
                        warn!(
                            "[ENGINE_HTTP] {} retriable error (attempt {}/{}): {}",
                            op,
                            retries + 1,
                            self.max_retries + 1,
                            e
                        );
                        retries += 1;
                        tokio::time::sleep(Duration::from_millis(100 * retries as u64)).await;
                    }
                    Err(e) => {
                        warn!("[ENGINE_HTTP] {} fatal error: {}", op, e);
                        return Err(e.into());
                    }
                }
            }
        };

        match tokio::time::timeout(timeout, attempt_loop).await {
            Ok(result) => result,
            Err(_) => {
                warn!("[ENGINE_HTTP] {} timed out after {:?}", op, timeout);
                Err(LinkError::Timeout(timeout))
            }
        }
    }
}

#[async_trait]
impl QueryEngine for EngineClient {
    async fn submit(&self, query: &str, dry_run: bool) -> Result<JobHandle> {
        let preview = if query.len() > 80 {
            format!("{}...", &query[..80])
        } else {
            query.to_string()
        };
        debug!(
            "[ENGINE_SUBMIT] Submitting query: \"{}\" (len={} dry_run={})",
            preview.replace('\n', " "),
            query.len(),
            dry_run
        );

        let request = SubmitRequest {
            query: query.to_string(),
            dry_run,
            location: self.location.clone(),
            maximum_bytes_billed: self.maximum_bytes_billed,
            use_legacy_sql: self.use_legacy_sql,
        };
        let url = format!("{}/v1/jobs", self.base_url);
        let metadata: JobMetadata = self
            .send_with_retry("submit", self.timeouts.submit_timeout, || {
                self.http_client.post(&url).json(&request)
            })
            .await
            .map_err(wrap_non_timeout(LinkError::Submit))?;

        debug!("[ENGINE_SUBMIT] Created job id={}", metadata.id);
        Ok(metadata.handle())
    }

    async fn fetch_page(
        &self,
        job: &JobHandle,
        start_index: u64,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<Page> {
        debug!(
            "[ENGINE_FETCH] job={} start_index={} page_size={} token={}",
            job.id,
            start_index,
            page_size,
            page_token.is_some()
        );

        let url = format!("{}/v1/jobs/{}/rows", self.base_url, job.id);
        self.send_with_retry("fetch_page", self.timeouts.fetch_timeout, || {
            let mut req = self.http_client.get(&url).query(&[
                ("startIndex", start_index.to_string()),
                ("maxResults", page_size.to_string()),
            ]);
            if let Some(token) = page_token {
                req = req.query(&[("pageToken", token)]);
            }
            if let Some(location) = &job.location {
                req = req.query(&[("location", location.as_str())]);
            }
            req
        })
        .await
        .map_err(wrap_non_timeout(LinkError::Fetch))
    }

    async fn fetch_metadata(&self, job: &JobHandle) -> Result<JobMetadata> {
        let url = format!("{}/v1/jobs/{}", self.base_url, job.id);
        self.send_with_retry("fetch_metadata", self.timeouts.metadata_timeout, || {
            let mut req = self.http_client.get(&url);
            if let Some(location) = &job.location {
                req = req.query(&[("location", location.as_str())]);
            }
            req
        })
        .await
        .map_err(wrap_non_timeout(LinkError::Fetch))
    }

    async fn cancel(&self, job: &JobHandle) -> Result<CancelAck> {
        debug!("[ENGINE_CANCEL] job={}", job.id);
        let url = format!("{}/v1/jobs/{}/cancel", self.base_url, job.id);
        self.send_with_retry("cancel", self.timeouts.cancel_timeout, || {
            self.http_client.post(&url)
        })
        .await
        .map_err(wrap_non_timeout(LinkError::Cancel))
    }
}

/// Wrap an error into the per-operation variant, letting timeouts through
/// unchanged so callers can tell them apart.
fn wrap_non_timeout(variant: fn(String) -> LinkError) -> impl Fn(LinkError) -> LinkError {
    move |err| match err {
        timeout @ LinkError::Timeout(_) => timeout,
        other => variant(other.to_string()),
    }
}

fn is_retriable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Builder for configuring [`EngineClient`] instances.
pub struct EngineClientBuilder {
    base_url: Option<String>,
    auth: AuthProvider,
    timeouts: EngineTimeouts,
    max_retries: u32,
    location: Option<String>,
    maximum_bytes_billed: Option<i64>,
    use_legacy_sql: Option<bool>,
}

impl EngineClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            auth: AuthProvider::none(),
            timeouts: EngineTimeouts::default(),
            max_retries: 3,
            location: None,
            maximum_bytes_billed: None,
            use_legacy_sql: None,
        }
    }

    /// Set the base URL of the engine's HTTP API
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set bearer token authentication
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthProvider::bearer_token(token.into());
        self
    }

    /// Set authentication provider directly
    pub fn auth(mut self, auth: AuthProvider) -> Self {
        self.auth = auth;
        self
    }

    /// Set per-operation timeouts
    pub fn timeouts(mut self, timeouts: EngineTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set maximum number of retries for transient transport failures
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the default job location attached to submissions
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Cap the bytes a submitted job may bill
    pub fn maximum_bytes_billed(mut self, max: i64) -> Self {
        self.maximum_bytes_billed = Some(max);
        self
    }

    /// Submit jobs with the engine's legacy SQL dialect
    pub fn use_legacy_sql(mut self, legacy: bool) -> Self {
        self.use_legacy_sql = Some(legacy);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<EngineClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| LinkError::Configuration("base_url is required".into()))?;

        // Keep-alive pooling; idle connections outlive the typical gap
        // between page fetches while a user reads a result page.
        let http_client = reqwest::Client::builder()
            .connect_timeout(self.timeouts.connection_timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| LinkError::Configuration(e.to_string()))?;

        Ok(EngineClient {
            base_url,
            http_client,
            auth: self.auth,
            timeouts: self.timeouts,
            max_retries: self.max_retries,
            location: self.location,
            maximum_bytes_billed: self.maximum_bytes_billed,
            use_legacy_sql: self.use_legacy_sql,
        })
    }
}
