use serde::{Deserialize, Serialize};

/// A single program execution requested from the execution capability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Programming language (e.g., "cpp", "python")
    pub language: String,
    /// Source code content
    pub code: String,
    /// Data fed to the program's stdin
    pub stdin: String,
    /// CPU time limit in seconds
    pub time_limit_seconds: u32,
    /// Memory limit in megabytes
    pub memory_limit_mb: u32,
}

/// Raw result of one execution, as reported by the execution capability.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// Exit code, `None` when the process was killed by a signal or never exited.
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub memory_exceeded: bool,
    /// Execution time reported by the backend in milliseconds, if it measures one.
    #[serde(default)]
    pub time_ms: Option<u64>,
}

impl ExecutionResult {
    /// Result produced when the hard deadline fires before the backend answers.
    pub fn deadline_expired(elapsed_ms: u64) -> Self {
        Self {
            timed_out: true,
            time_ms: Some(elapsed_ms),
            ..Default::default()
        }
    }

    pub fn exited_cleanly(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out && !self.memory_exceeded
    }
}
