use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::{leaderboard, submission};
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1_routes())
}

fn v1_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(submission::run_tests))
        .routes(routes!(submission::submit_solution))
        .routes(routes!(submission::list_contest_submissions))
        .routes(routes!(submission::get_submission))
        .routes(routes!(submission::rejudge_submission))
        .routes(routes!(leaderboard::get_leaderboard))
}
