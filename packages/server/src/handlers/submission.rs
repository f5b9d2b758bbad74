use std::collections::HashSet;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use sea_orm::*;
use tracing::instrument;

use crate::entity::submission;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::{Pagination, resolve_page};
use crate::models::submission::*;
use crate::state::AppState;
use crate::utils::contest::{check_contest_access, find_contest};

/// Ids among `ids` that a later rejudge has replaced.
async fn superseded_ids<C: ConnectionTrait>(
    db: &C,
    ids: Vec<i32>,
) -> Result<HashSet<i32>, AppError> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }
    let replaced: Vec<Option<i32>> = submission::Entity::find()
        .filter(submission::Column::RejudgeOf.is_in(ids))
        .select_only()
        .column(submission::Column::RejudgeOf)
        .into_tuple()
        .all(db)
        .await?;
    Ok(replaced.into_iter().flatten().collect())
}

#[utoipa::path(
    post,
    path = "/run",
    tag = "Submissions",
    operation_id = "runTests",
    summary = "Run code against sample test cases",
    description = "Executes the code against the requested sample test cases of a question and reports each result in request order. Nothing is stored and the leaderboard is unaffected. Subject to the contest time window. Requires `submission:submit` permission.",
    request_body = RunTestsRequest,
    responses(
        (status = 200, description = "Per-case results", body = RunTestsResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CONTEST_NOT_STARTED, CONTEST_ENDED, CONTEST_FULL)", body = ErrorBody),
        (status = 404, description = "Question or contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn run_tests(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RunTestsRequest>,
) -> Result<Json<RunTestsResponse>, AppError> {
    auth_user.require_permission("submission:submit")?;

    let results = state.judge.run_tests(auth_user.user_id, payload).await?;
    Ok(Json(RunTestsResponse { results }))
}

#[utoipa::path(
    post,
    path = "/contests/{contest_id}/questions/{question_id}/submit",
    tag = "Submissions",
    operation_id = "submitSolution",
    summary = "Submit a solution to a contest question",
    description = "Judges the code against every test case of the question, stores the submission and updates the contest leaderboard. Rejected without storing anything outside the contest window. Requires `submission:submit` permission.",
    params(
        ("contest_id" = i32, Path, description = "Contest ID"),
        ("question_id" = i32, Path, description = "Question ID")
    ),
    request_body = SubmitRequest,
    responses(
        (status = 201, description = "Submission judged", body = SubmitResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CONTEST_NOT_STARTED, CONTEST_ENDED, CONTEST_FULL)", body = ErrorBody),
        (status = 404, description = "Contest or question not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, username = %auth_user.username, contest_id = %contest_id, question_id = %question_id))]
pub async fn submit_solution(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, question_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    auth_user.require_permission("submission:submit")?;

    let response = state
        .judge
        .submit(auth_user.user_id, contest_id, question_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/contests/{contest_id}/submissions",
    tag = "Submissions",
    operation_id = "listContestSubmissions",
    summary = "List submissions of a contest",
    description = "Returns a paginated list of submissions, newest first. Users see their own submissions; users with `submission:view_all` permission see all submissions and may filter by user.",
    params(
        ("contest_id" = i32, Path, description = "Contest ID"),
        SubmissionListQuery
    ),
    responses(
        (status = 200, description = "List of submissions", body = SubmissionListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(contest_id = %contest_id))]
pub async fn list_contest_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    let (page, per_page) = resolve_page(query.page, query.per_page)?;

    let contest = find_contest(&state.db, contest_id).await?;
    check_contest_access(&state.db, &auth_user, &contest).await?;

    let can_view_all = auth_user.has_permission("submission:view_all");
    let user_filter = match query.user_id {
        Some(uid) if uid != auth_user.user_id && !can_view_all => {
            return Err(AppError::PermissionDenied);
        }
        Some(uid) => Some(uid),
        None if can_view_all => None,
        None => Some(auth_user.user_id),
    };

    let mut select =
        submission::Entity::find().filter(submission::Column::ContestId.eq(contest_id));
    if let Some(question_id) = query.question_id {
        select = select.filter(submission::Column::QuestionId.eq(question_id));
    }
    if let Some(user_id) = user_filter {
        select = select.filter(submission::Column::UserId.eq(user_id));
    }

    let paginator = select
        .order_by_desc(submission::Column::Id)
        .paginate(&state.db, per_page);
    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(page - 1).await?;

    let superseded = superseded_ids(&state.db, rows.iter().map(|s| s.id).collect()).await?;
    let data = rows
        .into_iter()
        .map(|s| {
            let replaced = superseded.contains(&s.id);
            SubmissionListItem::from_model(s, replaced)
        })
        .collect();

    Ok(Json(SubmissionListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/submissions/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get submission details",
    description = "Returns full details of a submission including its code. Users can view their own submissions; users with `submission:view_all` permission can view any submission.",
    params(
        ("id" = i32, Path, description = "Submission ID")
    ),
    responses(
        (status = 200, description = "Submission details", body = SubmissionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(submission_id = %id))]
pub async fn get_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let sub = submission::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

    if sub.user_id != auth_user.user_id && !auth_user.has_permission("submission:view_all") {
        return Err(AppError::PermissionDenied);
    }

    let superseded = superseded_ids(&state.db, vec![sub.id]).await?.contains(&sub.id);
    Ok(Json(SubmissionResponse::from_model(sub, superseded)))
}

#[utoipa::path(
    post,
    path = "/submissions/{id}/rejudge",
    tag = "Submissions",
    operation_id = "rejudgeSubmission",
    summary = "Rejudge a submission",
    description = "Judges the stored code again and appends the result as a new submission that keeps the original submission time and replaces the original on the leaderboard. Only the latest record of a chain can be rejudged. Requires `submission:rejudge` permission.",
    params(
        ("id" = i32, Path, description = "Submission ID")
    ),
    responses(
        (status = 201, description = "Submission rejudged", body = SubmitResponse),
        (status = 400, description = "Already rejudged (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(submission_id = %id))]
pub async fn rejudge_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    auth_user.require_permission("submission:rejudge")?;

    let response = state.judge.rejudge(id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
