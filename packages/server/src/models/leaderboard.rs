use serde::Serialize;

use crate::leaderboard::LeaderboardRow;

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    #[schema(example = 1)]
    pub contest_id: i32,
    /// Rows in rank order.
    pub rows: Vec<LeaderboardRow>,
}
