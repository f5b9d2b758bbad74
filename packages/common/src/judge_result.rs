use crate::{CaseVerdict, Verdict};
use serde::{Deserialize, Serialize};

/// Result for a single test case execution.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TestCaseOutcome {
    /// Test case that was executed.
    pub test_case_id: i32,
    /// 1-based position in the question's test-case order.
    pub ordinal: usize,
    pub verdict: CaseVerdict,
    /// Points earned for this case.
    pub score: i32,
    /// Wall time in milliseconds (0 when skipped).
    pub time_ms: u64,
    /// Program stdout.
    pub stdout: String,
    /// Program stderr, or the internal error text for infrastructure failures.
    pub stderr: String,
    /// True when the execution capability itself failed for this case.
    pub infrastructure_error: bool,
}

impl TestCaseOutcome {
    pub fn skipped(test_case_id: i32, ordinal: usize) -> Self {
        Self {
            test_case_id,
            ordinal,
            verdict: CaseVerdict::Skipped,
            score: 0,
            time_ms: 0,
            stdout: String::new(),
            stderr: String::new(),
            infrastructure_error: false,
        }
    }
}

/// Aggregated result of judging one submission.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct JudgeOutcome {
    pub judge_id: String,
    pub verdict: Verdict,
    /// Total score, never above the question's points.
    pub score: i32,
    pub passed_count: usize,
    pub total_count: usize,
    /// Maximum time across executed cases (milliseconds).
    pub execution_time_ms: u64,
    /// Truncated stderr of the first failing case; `None` when accepted.
    pub error_message: Option<String>,
    /// Ordinal of the first failing case in definition order.
    pub failed_ordinal: Option<usize>,
    /// Per-case results in definition order.
    pub cases: Vec<TestCaseOutcome>,
}

impl JudgeOutcome {
    pub fn is_accepted(&self) -> bool {
        self.verdict.is_accepted()
    }
}
