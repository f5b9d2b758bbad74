//! Judging control flow: admission, verdict, storage, standings.

use std::cmp;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::judge_request::{JudgeMode, JudgeRequest, TestCaseData};
use common::judge_result::JudgeOutcome;
use common::text::truncate_utf8;
use judge::VerdictEngine;
use sea_orm::*;
use thiserror::Error;
use tracing::{Instrument, error, info, instrument};

use crate::config::SubmissionConfig;
use crate::entity::{contest, question, submission, test_case};
use crate::error::AppError;
use crate::gate::{ContestGate, GateError};
use crate::leaderboard::LeaderboardHub;
use crate::models::submission::{RunCaseResult, RunTestsRequest, SubmitRequest, SubmitResponse};
use crate::store::{NewSubmission, ScoredSubmission, SubmissionStore};

/// Most sample cases a single run may request.
pub const MAX_RUN_CASES: usize = 50;

#[derive(Error, Debug)]
pub enum JudgeServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("rate limit exceeded, retry in {retry_after}s")]
    RateLimited { retry_after: u64 },
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("judging task failed: {0}")]
    Aborted(String),
}

impl From<JudgeServiceError> for AppError {
    fn from(err: JudgeServiceError) -> Self {
        match err {
            JudgeServiceError::Invalid(msg) => AppError::Validation(msg),
            JudgeServiceError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            JudgeServiceError::RateLimited { retry_after } => AppError::RateLimited { retry_after },
            JudgeServiceError::Gate(e) => e.into(),
            JudgeServiceError::Database(e) => e.into(),
            JudgeServiceError::Aborted(detail) => AppError::Internal(detail),
        }
    }
}

/// Check a source payload before anything is loaded or executed.
pub fn validate_source(
    config: &SubmissionConfig,
    code: &str,
    language: &str,
) -> Result<(), JudgeServiceError> {
    if code.trim().is_empty() {
        return Err(JudgeServiceError::Invalid("Code must not be empty".into()));
    }
    if code.len() > config.max_size {
        return Err(JudgeServiceError::Invalid(format!(
            "Code exceeds maximum size of {} bytes",
            config.max_size
        )));
    }
    if !config.languages.iter().any(|l| l == language) {
        return Err(JudgeServiceError::Invalid(format!(
            "Unsupported language '{}'. Supported: {}",
            language,
            config.languages.join(", ")
        )));
    }
    Ok(())
}

/// Requested sample ids must be unique and bounded.
fn validate_case_ids(ids: &[i32]) -> Result<(), JudgeServiceError> {
    if ids.len() > MAX_RUN_CASES {
        return Err(JudgeServiceError::Invalid(format!(
            "Too many test cases: max {MAX_RUN_CASES}"
        )));
    }
    let mut seen = HashSet::new();
    for &id in ids {
        if !seen.insert(id) {
            return Err(JudgeServiceError::Invalid(format!(
                "Duplicate test case ID: {id}"
            )));
        }
    }
    Ok(())
}

fn limit(value: i32) -> u32 {
    Ord::max(value, 1) as u32
}

fn judge_request(
    mode: JudgeMode,
    question: &question::Model,
    language: String,
    code: String,
    cases: Vec<test_case::Model>,
) -> JudgeRequest {
    let test_cases = cases
        .into_iter()
        .map(|tc| TestCaseData {
            id: tc.id,
            weight: tc.weight,
            input: tc.input,
            expected_output: tc.expected_output,
            is_sample: tc.is_sample,
            is_hidden: tc.is_hidden,
        })
        .collect();

    JudgeRequest::new(
        mode,
        language,
        code,
        limit(question.time_limit_seconds),
        limit(question.memory_limit_mb),
        question.points,
        test_cases,
    )
}

/// A submission that has been admitted but not judged yet.
struct Pending {
    contest_id: i32,
    question_id: i32,
    user_id: i32,
    code: String,
    language: String,
    rejudge_of: Option<i32>,
    submitted_at: DateTime<Utc>,
}

impl Pending {
    fn judged(self, outcome: &JudgeOutcome) -> NewSubmission {
        NewSubmission {
            contest_id: self.contest_id,
            question_id: self.question_id,
            user_id: self.user_id,
            code: self.code,
            language: self.language,
            verdict: outcome.verdict,
            score: outcome.score,
            passed_count: outcome.passed_count as i32,
            total_count: outcome.total_count as i32,
            execution_time_ms: outcome.execution_time_ms as i64,
            error_message: outcome.error_message.clone(),
            rejudge_of: self.rejudge_of,
            submitted_at: self.submitted_at,
        }
    }
}

async fn publish(leaderboard: &LeaderboardHub, model: &submission::Model, full_points: i32) {
    let scored = ScoredSubmission::from_model(model, full_points);
    // The row is stored; standings catch up when the actor is rebuilt.
    if let Err(e) = leaderboard.record(model.contest_id, scored).await {
        error!(
            submission_id = model.id,
            contest_id = model.contest_id,
            error = %e,
            "Failed to update leaderboard"
        );
    }
}

fn submit_response(model: &submission::Model, outcome: &JudgeOutcome) -> SubmitResponse {
    SubmitResponse {
        submission_id: model.id,
        verdict: model.verdict,
        score: model.score,
        passed_test_cases: model.passed_count,
        total_test_cases: model.total_count,
        execution_time_ms: model.execution_time_ms,
        failed_test_case: outcome.failed_ordinal,
        error_message: model.error_message.clone(),
    }
}

/// Runs and judges code for contest questions.
pub struct JudgeService {
    db: DatabaseConnection,
    engine: Arc<VerdictEngine>,
    gate: ContestGate,
    store: Arc<dyn SubmissionStore>,
    leaderboard: LeaderboardHub,
    config: SubmissionConfig,
    max_output_bytes: usize,
}

impl JudgeService {
    pub fn new(
        db: DatabaseConnection,
        engine: Arc<VerdictEngine>,
        gate: ContestGate,
        store: Arc<dyn SubmissionStore>,
        leaderboard: LeaderboardHub,
        config: SubmissionConfig,
        max_output_bytes: usize,
    ) -> Self {
        Self {
            db,
            engine,
            gate,
            store,
            leaderboard,
            config,
            max_output_bytes,
        }
    }

    /// Run code against sample cases of a question. Nothing is stored.
    #[instrument(skip(self, request), fields(question_id = request.question_id))]
    pub async fn run_tests(
        &self,
        user_id: i32,
        request: RunTestsRequest,
    ) -> Result<Vec<RunCaseResult>, JudgeServiceError> {
        validate_source(&self.config, &request.code, &request.language)?;
        validate_case_ids(&request.test_case_ids)?;

        let question = self.find_question(request.question_id).await?;
        let contest = self.find_contest(question.contest_id).await?;
        self.gate.admit(&self.db, &contest, user_id).await?;

        let samples = test_case::Entity::find()
            .filter(test_case::Column::QuestionId.eq(question.id))
            .filter(test_case::Column::IsSample.eq(true))
            .filter(test_case::Column::IsHidden.eq(false))
            .order_by_asc(test_case::Column::Position)
            .order_by_asc(test_case::Column::Id)
            .all(&self.db)
            .await?;

        let cases = if request.test_case_ids.is_empty() {
            samples
        } else {
            let mut by_id: HashMap<i32, test_case::Model> =
                samples.into_iter().map(|tc| (tc.id, tc)).collect();
            request
                .test_case_ids
                .iter()
                .map(|id| {
                    by_id.remove(id).ok_or_else(|| {
                        JudgeServiceError::Invalid(format!(
                            "Test case {id} is not a sample case of this question"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        if cases.is_empty() {
            return Err(JudgeServiceError::Invalid(
                "Question has no sample test cases".into(),
            ));
        }

        let job = judge_request(
            JudgeMode::Run,
            &question,
            request.language,
            request.code,
            cases,
        );
        let outcome = self.engine.judge(&job).await;

        Ok(outcome
            .cases
            .iter()
            .zip(&job.test_cases)
            .map(|(case, tc)| {
                let error = if case.infrastructure_error {
                    Some(case.stderr.clone())
                } else {
                    let stderr = case.stderr.trim();
                    (!stderr.is_empty()).then(|| truncate_utf8(stderr, self.max_output_bytes))
                };
                RunCaseResult {
                    test_case_id: tc.id,
                    passed: case.verdict.is_passed(),
                    verdict: case.verdict,
                    actual: truncate_utf8(&case.stdout, self.max_output_bytes),
                    expected: tc.expected_output.clone(),
                    error,
                }
            })
            .collect())
    }

    /// Judge a submission against every test case and store the result.
    #[instrument(skip(self, request))]
    pub async fn submit(
        &self,
        user_id: i32,
        contest_id: i32,
        question_id: i32,
        request: SubmitRequest,
    ) -> Result<SubmitResponse, JudgeServiceError> {
        validate_source(&self.config, &request.code, &request.language)?;

        let contest = self.find_contest(contest_id).await?;
        let question = self.find_question(question_id).await?;
        if question.contest_id != contest.id {
            return Err(JudgeServiceError::NotFound("Question"));
        }

        let submitted_at = self.gate.admit(&self.db, &contest, user_id).await?;
        self.check_rate_limit(user_id).await?;

        let cases = self.all_cases(question.id).await?;
        let job = judge_request(
            JudgeMode::Submit,
            &question,
            request.language.clone(),
            request.code.clone(),
            cases,
        );
        let pending = Pending {
            contest_id,
            question_id,
            user_id,
            code: request.code,
            language: request.language,
            rejudge_of: None,
            submitted_at,
        };

        self.settle(job, pending, question.points).await
    }

    /// Judge a stored submission again and append the result as a new record
    /// that supersedes it. Not bound to the contest window.
    #[instrument(skip(self))]
    pub async fn rejudge(&self, submission_id: i32) -> Result<SubmitResponse, JudgeServiceError> {
        let original = submission::Entity::find_by_id(submission_id)
            .one(&self.db)
            .await?
            .ok_or(JudgeServiceError::NotFound("Submission"))?;

        let replaced_by = submission::Entity::find()
            .filter(submission::Column::RejudgeOf.eq(submission_id))
            .one(&self.db)
            .await?;
        if let Some(newer) = replaced_by {
            return Err(JudgeServiceError::Invalid(format!(
                "Submission {submission_id} was already rejudged as {}",
                newer.id
            )));
        }

        let question = self.find_question(original.question_id).await?;
        let cases = self.all_cases(question.id).await?;
        let job = judge_request(
            JudgeMode::Submit,
            &question,
            original.language.clone(),
            original.code.clone(),
            cases,
        );
        info!(previous = %original.verdict, "Rejudging submission");
        let pending = Pending {
            contest_id: original.contest_id,
            question_id: original.question_id,
            user_id: original.user_id,
            code: original.code,
            language: original.language,
            rejudge_of: Some(original.id),
            submitted_at: original.submitted_at,
        };

        self.settle(job, pending, question.points).await
    }

    /// Judge, store and publish on a task of its own. Once admitted, a
    /// submission completes even if the caller stops waiting for it.
    async fn settle(
        &self,
        job: JudgeRequest,
        pending: Pending,
        full_points: i32,
    ) -> Result<SubmitResponse, JudgeServiceError> {
        let engine = Arc::clone(&self.engine);
        let store = Arc::clone(&self.store);
        let leaderboard = self.leaderboard.clone();

        let task = tokio::spawn(
            async move {
                let outcome = engine.judge(&job).await;
                let model = store.insert(pending.judged(&outcome)).await?;
                info!(
                    submission_id = model.id,
                    rejudge_of = ?model.rejudge_of,
                    verdict = %model.verdict,
                    score = model.score,
                    "Submission stored"
                );
                publish(&leaderboard, &model, full_points).await;
                Ok::<_, JudgeServiceError>(submit_response(&model, &outcome))
            }
            .in_current_span(),
        );

        task.await
            .map_err(|e| JudgeServiceError::Aborted(e.to_string()))?
    }

    /// Count the user's own submissions of the last minute. Optimistic: two
    /// concurrent requests may both pass before either row is written.
    async fn check_rate_limit(&self, user_id: i32) -> Result<(), JudgeServiceError> {
        let limit = self.config.rate_limit_per_minute;
        if limit == 0 {
            return Ok(());
        }

        let now = self.gate.now();
        let window_start = now - Duration::minutes(1);
        let recent = || {
            submission::Entity::find()
                .filter(submission::Column::UserId.eq(user_id))
                .filter(submission::Column::RejudgeOf.is_null())
                .filter(submission::Column::CreatedAt.gt(window_start))
        };

        if recent().count(&self.db).await? < limit as u64 {
            return Ok(());
        }

        let oldest = recent()
            .order_by_asc(submission::Column::CreatedAt)
            .one(&self.db)
            .await?;
        let retry_after = oldest
            .map(|s| {
                let expires = s.created_at + Duration::minutes(1);
                cmp::max((expires - now).num_seconds(), 1) as u64
            })
            .unwrap_or(60);

        Err(JudgeServiceError::RateLimited { retry_after })
    }

    async fn all_cases(&self, question_id: i32) -> Result<Vec<test_case::Model>, JudgeServiceError> {
        let cases = test_case::Entity::find()
            .filter(test_case::Column::QuestionId.eq(question_id))
            .order_by_asc(test_case::Column::Position)
            .order_by_asc(test_case::Column::Id)
            .all(&self.db)
            .await?;
        if cases.is_empty() {
            return Err(JudgeServiceError::Invalid(
                "Question has no test cases".into(),
            ));
        }
        Ok(cases)
    }

    async fn find_contest(&self, id: i32) -> Result<contest::Model, JudgeServiceError> {
        contest::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(JudgeServiceError::NotFound("Contest"))
    }

    async fn find_question(&self, id: i32) -> Result<question::Model, JudgeServiceError> {
        question::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(JudgeServiceError::NotFound("Question"))
    }
}
