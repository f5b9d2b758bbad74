pub mod http;
pub mod process;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::execution::{ExecutionRequest, ExecutionResult};
use tokio::time::Instant;
use tracing::warn;

use crate::config::{BackendKind, JudgeConfig};
use crate::error::ExecutionError;

pub use http::HttpBackend;
pub use process::ProcessBackend;

/// The external capability that actually runs code.
///
/// Implementations are treated as unreliable: any `Err` is an infrastructure
/// failure and is never confused with a failure of the judged program.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Get `code` ready to run, e.g. compile it. Called once per judging run,
    /// outside the per-case deadline.
    async fn prepare(&self, _language: &str, _code: &str) -> Result<(), ExecutionError> {
        Ok(())
    }

    /// Run `request.code` once with `request.stdin`.
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ExecutionError>;
}

/// Deadline-enforcing front of an [`ExecutionBackend`].
///
/// Every call resolves within `time_limit + grace`; when the deadline fires the
/// backend future is dropped and the call reports `timed_out`.
#[derive(Clone)]
pub struct ExecutionClient {
    backend: Arc<dyn ExecutionBackend>,
    grace: Duration,
}

impl ExecutionClient {
    pub fn new(backend: Arc<dyn ExecutionBackend>, grace: Duration) -> Self {
        Self { backend, grace }
    }

    /// Build the backend selected by `config`.
    pub fn from_config(config: &JudgeConfig) -> Result<Self, ExecutionError> {
        let backend: Arc<dyn ExecutionBackend> = match config.backend {
            BackendKind::Process => Arc::new(ProcessBackend::new(config.process.clone())),
            BackendKind::Http => Arc::new(HttpBackend::new(&config.http)?),
        };
        Ok(Self::new(
            backend,
            Duration::from_millis(config.grace_period_ms),
        ))
    }

    pub async fn prepare(&self, language: &str, code: &str) -> Result<(), ExecutionError> {
        self.backend.prepare(language, code).await
    }

    pub async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ExecutionError> {
        let deadline = Duration::from_secs(u64::from(request.time_limit_seconds)) + self.grace;
        let started = Instant::now();

        match tokio::time::timeout(deadline, self.backend.execute(request)).await {
            Ok(Ok(mut result)) => {
                if result.time_ms.is_none() {
                    result.time_ms = Some(started.elapsed().as_millis() as u64);
                }
                Ok(result)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(
                    language = %request.language,
                    deadline_ms = deadline.as_millis() as u64,
                    elapsed_ms,
                    "Execution deadline expired, reclaiming call"
                );
                Ok(ExecutionResult::deadline_expired(elapsed_ms))
            }
        }
    }
}
