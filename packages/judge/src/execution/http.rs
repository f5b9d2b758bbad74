use std::time::Duration;

use async_trait::async_trait;
use common::execution::{ExecutionRequest, ExecutionResult};
use common::retry::RetryPolicy;
use tracing::{debug, warn};

use super::ExecutionBackend;
use crate::config::HttpBackendConfig;
use crate::error::ExecutionError;

/// Remote sandbox reached over HTTP.
///
/// `POST {base_url}/execute` with an [`ExecutionRequest`] body, answered by an
/// [`ExecutionResult`] body.
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl HttpBackend {
    pub fn new(config: &HttpBackendConfig) -> Result<Self, ExecutionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ExecutionError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/execute", config.base_url.trim_end_matches('/')),
            retry: config.retry,
        })
    }

    async fn send_once(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ExecutionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ExecutionError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutionError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ExecutionResult>()
            .await
            .map_err(|e| ExecutionError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ExecutionBackend for HttpBackend {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ExecutionError> {
        let mut attempt: u8 = 0;
        loop {
            match self.send_once(request).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && self.retry.allows(attempt + 1) => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    warn!(
                        endpoint = %self.endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Execution request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    debug!(endpoint = %self.endpoint, attempt, error = %e, "Execution request failed");
                    return Err(e);
                }
            }
        }
    }
}
