use thiserror::Error;

/// Failure of the execution capability itself, as opposed to a failure of the judged code.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("execution service unavailable: {0}")]
    Unavailable(String),

    #[error("execution service returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("invalid response from execution service: {0}")]
    InvalidResponse(String),

    #[error("failed to launch program: {0}")]
    Spawn(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("backend configuration error: {0}")]
    Configuration(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecutionError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::BadStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
