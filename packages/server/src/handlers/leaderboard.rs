use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::leaderboard::LeaderboardResponse;
use crate::state::AppState;
use crate::utils::contest::{check_contest_access, find_contest};

#[utoipa::path(
    get,
    path = "/contests/{contest_id}/leaderboard",
    tag = "Leaderboard",
    operation_id = "getLeaderboard",
    summary = "Get contest standings",
    description = "Returns every contestant ordered by total score, problems solved and the time the total was first reached. Equal score and solved count share a rank (1, 1, 3).",
    params(
        ("contest_id" = i32, Path, description = "Contest ID")
    ),
    responses(
        (status = 200, description = "Ranked rows", body = LeaderboardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id = %contest_id))]
pub async fn get_leaderboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let contest = find_contest(&state.db, contest_id).await?;
    check_contest_access(&state.db, &auth_user, &contest).await?;

    let rows = state
        .leaderboard
        .snapshot(contest_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(LeaderboardResponse {
        contest_id,
        rows: rows.as_ref().clone(),
    }))
}
