pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod normalize;

pub use config::{BackendKind, JudgeConfig};
pub use engine::VerdictEngine;
pub use error::ExecutionError;
pub use execution::{ExecutionBackend, ExecutionClient};
