use common::retry::RetryPolicy;
use serde::Deserialize;

/// Which execution capability the engine talks to.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Local compilers and interpreters, no sandbox. For development.
    Process,
    /// Remote sandbox service over HTTP.
    Http,
}

/// Remote sandbox settings.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpBackendConfig {
    /// Base URL of the sandbox service. Default: "http://localhost:2000".
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Transport-level timeout for one HTTP request. Default: 30000ms.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_base_url() -> String {
    "http://localhost:2000".into()
}
fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Local process backend settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ProcessBackendConfig {
    /// Time allowed for one compilation. Default: 30000ms.
    #[serde(default = "default_compile_timeout_ms")]
    pub compile_timeout_ms: u64,
    /// Number of compiled programs kept around. Default: 64.
    #[serde(default = "default_artifact_cache_size")]
    pub artifact_cache_size: usize,
    /// Captured bytes per output stream. Default: 8 MiB.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_compile_timeout_ms() -> u64 {
    30_000
}
fn default_artifact_cache_size() -> usize {
    64
}
fn default_max_output_bytes() -> usize {
    8 * 1024 * 1024
}

impl Default for ProcessBackendConfig {
    fn default() -> Self {
        Self {
            compile_timeout_ms: default_compile_timeout_ms(),
            artifact_cache_size: default_artifact_cache_size(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

/// Verdict engine configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct JudgeConfig {
    /// Upper bound of concurrently executing test cases per submission. Default: 4.
    #[serde(default = "default_max_concurrent_cases")]
    pub max_concurrent_cases: usize,
    /// Added to the time limit to form the hard deadline of one execution. Default: 2000ms.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    /// Cap for the error message stored with a submission. Default: 4096 bytes.
    #[serde(default = "default_max_error_message_bytes")]
    pub max_error_message_bytes: usize,
    /// Absolute/relative tolerance for numeric tokens. Exact comparison when unset.
    #[serde(default)]
    pub float_tolerance: Option<f64>,
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default)]
    pub http: HttpBackendConfig,
    #[serde(default)]
    pub process: ProcessBackendConfig,
}

fn default_max_concurrent_cases() -> usize {
    4
}
fn default_grace_period_ms() -> u64 {
    2_000
}
fn default_max_error_message_bytes() -> usize {
    4096
}
fn default_backend() -> BackendKind {
    BackendKind::Process
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_cases: default_max_concurrent_cases(),
            grace_period_ms: default_grace_period_ms(),
            max_error_message_bytes: default_max_error_message_bytes(),
            float_tolerance: None,
            backend: default_backend(),
            http: HttpBackendConfig::default(),
            process: ProcessBackendConfig::default(),
        }
    }
}
