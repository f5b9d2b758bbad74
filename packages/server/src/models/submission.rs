use chrono::{DateTime, Utc};
use common::{CaseVerdict, Verdict};
use serde::{Deserialize, Serialize};

use crate::entity::submission;

use super::shared::Pagination;

/// Request body for a practice run against sample test cases.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunTestsRequest {
    #[schema(example = 1)]
    pub question_id: i32,
    #[schema(example = "print(sum(map(int, input().split())))")]
    pub code: String,
    #[schema(example = "python")]
    pub language: String,
    /// Sample test cases to run, in the order results should be reported.
    /// Empty runs every sample case of the question.
    #[serde(default)]
    pub test_case_ids: Vec<i32>,
}

/// Outcome of one sample test case.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunCaseResult {
    #[schema(example = 3)]
    pub test_case_id: i32,
    pub passed: bool,
    pub verdict: CaseVerdict,
    /// Program output (truncated).
    #[schema(example = "3")]
    pub actual: String,
    #[schema(example = "3")]
    pub expected: String,
    /// Program stderr or the execution failure, when any.
    pub error: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RunTestsResponse {
    pub results: Vec<RunCaseResult>,
}

/// Request body for a graded submission.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitRequest {
    #[schema(example = "print(sum(map(int, input().split())))")]
    pub code: String,
    #[schema(example = "python")]
    pub language: String,
}

/// Judged outcome of a submission or rejudge.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[schema(example = 12)]
    pub submission_id: i32,
    pub verdict: Verdict,
    #[schema(example = 60)]
    pub score: i32,
    #[schema(example = 2)]
    pub passed_test_cases: i32,
    #[schema(example = 3)]
    pub total_test_cases: i32,
    #[schema(example = 48)]
    pub execution_time_ms: i64,
    /// 1-based position of the first failing test case.
    #[schema(example = 3)]
    pub failed_test_case: Option<usize>,
    #[schema(example = "Test case #3 failed (wrong_answer)")]
    pub error_message: Option<String>,
}

/// Query parameters for listing the submissions of a contest.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubmissionListQuery {
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Filter by question ID.
    #[param(example = 1)]
    pub question_id: Option<i32>,
    /// Filter by user ID. Requires `submission:view_all` for other users.
    #[param(example = 1)]
    pub user_id: Option<i32>,
}

/// Submission summary used in lists.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionListItem {
    #[schema(example = 12)]
    pub id: i32,
    pub contest_id: i32,
    pub question_id: i32,
    pub user_id: i32,
    #[schema(example = "python")]
    pub language: String,
    pub verdict: Verdict,
    pub score: i32,
    pub passed_test_cases: i32,
    pub total_test_cases: i32,
    pub execution_time_ms: i64,
    /// Record this one re-judges.
    pub rejudge_of: Option<i32>,
    /// A later rejudge replaced this record on the leaderboard.
    pub superseded: bool,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionListItem {
    pub fn from_model(model: submission::Model, superseded: bool) -> Self {
        Self {
            id: model.id,
            contest_id: model.contest_id,
            question_id: model.question_id,
            user_id: model.user_id,
            language: model.language,
            verdict: model.verdict,
            score: model.score,
            passed_test_cases: model.passed_count,
            total_test_cases: model.total_count,
            execution_time_ms: model.execution_time_ms,
            rejudge_of: model.rejudge_of,
            superseded,
            submitted_at: model.submitted_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionListResponse {
    pub data: Vec<SubmissionListItem>,
    pub pagination: Pagination,
}

/// Full submission details.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    #[serde(flatten)]
    pub summary: SubmissionListItem,
    pub code: String,
    pub error_message: Option<String>,
    /// When the record was written; differs from `submittedAt` for rejudges.
    pub created_at: DateTime<Utc>,
}

impl SubmissionResponse {
    pub fn from_model(mut model: submission::Model, superseded: bool) -> Self {
        let code = std::mem::take(&mut model.code);
        let error_message = model.error_message.take();
        let created_at = model.created_at;
        Self {
            summary: SubmissionListItem::from_model(model, superseded),
            code,
            error_message,
            created_at,
        }
    }
}
