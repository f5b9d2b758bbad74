use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which test cases a judging request runs and what it produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JudgeMode {
    /// Practice run over sample cases only. Every requested case executes.
    Run,
    /// Graded submission over the full case set. Stops scheduling after the first failure.
    Submit,
}

/// Test case data needed for judging.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCaseData {
    /// Test case ID
    pub id: i32,
    /// Points awarded when this case passes
    pub weight: i32,
    /// Input data to feed to the program
    pub input: String,
    /// Expected output for comparison
    pub expected_output: String,
    pub is_sample: bool,
    pub is_hidden: bool,
}

/// Everything the verdict engine needs to judge one piece of code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeRequest {
    /// Identifier used to correlate log lines of one judging run.
    pub judge_id: String,
    pub mode: JudgeMode,
    pub language: String,
    pub code: String,
    /// Time limit in seconds, per test case
    pub time_limit_seconds: u32,
    /// Memory limit in megabytes
    pub memory_limit_mb: u32,
    /// Full points of the question
    pub points: i32,
    /// Test cases in the question's defined order.
    pub test_cases: Vec<TestCaseData>,
}

impl JudgeRequest {
    /// Create a new judge request with a generated UUID.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mode: JudgeMode,
        language: String,
        code: String,
        time_limit_seconds: u32,
        memory_limit_mb: u32,
        points: i32,
        test_cases: Vec<TestCaseData>,
    ) -> Self {
        Self {
            judge_id: Uuid::now_v7().to_string(),
            mode,
            language,
            code,
            time_limit_seconds,
            memory_limit_mb,
            points,
            test_cases,
        }
    }

    /// Sum of the weights of all cases in this request, saturating at `i32::MAX`.
    pub fn total_weight(&self) -> i32 {
        self.test_cases
            .iter()
            .fold(0i32, |total, tc| total.saturating_add(tc.weight))
    }
}
