use std::sync::Arc;

use judge::VerdictEngine;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::gate::{Clock, ContestGate};
use crate::leaderboard::LeaderboardHub;
use crate::service::JudgeService;
use crate::store::SeaSubmissionStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub judge: Arc<JudgeService>,
    pub leaderboard: LeaderboardHub,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        config: AppConfig,
        engine: Arc<VerdictEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(SeaSubmissionStore::new(db.clone()));
        let leaderboard = LeaderboardHub::new(store.clone());
        let judge = JudgeService::new(
            db.clone(),
            engine,
            ContestGate::new(clock),
            store,
            leaderboard.clone(),
            config.submission.clone(),
            config.judge.max_error_message_bytes,
        );

        Self {
            db,
            config: Arc::new(config),
            judge: Arc::new(judge),
            leaderboard,
        }
    }
}
