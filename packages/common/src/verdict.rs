#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Overall outcome of judging a submission.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every test case passed.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "accepted"))]
    Accepted,
    /// Output did not match expected output.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "wrong_answer"))]
    WrongAnswer,
    /// Program crashed, exited with non-zero code, or could not be executed.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "runtime_error"))]
    RuntimeError,
    /// Exceeded time limit.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "time_limit_exceeded"))]
    TimeLimitExceeded,
    /// Exceeded memory limit.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "memory_limit_exceeded"))]
    MemoryLimitExceeded,
    /// Failed to compile (or to parse, for interpreted languages).
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "compile_error"))]
    CompileError,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// All possible verdict values.
    pub const ALL: &'static [Verdict] = &[
        Self::Accepted,
        Self::WrongAnswer,
        Self::RuntimeError,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::CompileError,
    ];

    /// Returns the string representation (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::WrongAnswer => "wrong_answer",
            Self::RuntimeError => "runtime_error",
            Self::TimeLimitExceeded => "time_limit_exceeded",
            Self::MemoryLimitExceeded => "memory_limit_exceeded",
            Self::CompileError => "compile_error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid verdict string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVerdictError {
    invalid: String,
}

impl fmt::Display for ParseVerdictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid verdict '{}'. Valid values: {}",
            self.invalid,
            Verdict::ALL
                .iter()
                .map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseVerdictError {}

impl FromStr for Verdict {
    type Err = ParseVerdictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verdict::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseVerdictError {
                invalid: s.to_string(),
            })
    }
}

/// Classification of a single test case execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaseVerdict {
    Passed,
    WrongAnswer,
    RuntimeError,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    CompileError,
    /// Not executed because an earlier case already failed.
    Skipped,
}

impl CaseVerdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// True for outcomes that decide a non-accepted verdict.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Passed | Self::Skipped)
    }

    /// The submission-level verdict this case reports when it is the first failure.
    pub fn as_verdict(&self) -> Option<Verdict> {
        match self {
            Self::Passed | Self::Skipped => None,
            Self::WrongAnswer => Some(Verdict::WrongAnswer),
            Self::RuntimeError => Some(Verdict::RuntimeError),
            Self::TimeLimitExceeded => Some(Verdict::TimeLimitExceeded),
            Self::MemoryLimitExceeded => Some(Verdict::MemoryLimitExceeded),
            Self::CompileError => Some(Verdict::CompileError),
        }
    }
}
