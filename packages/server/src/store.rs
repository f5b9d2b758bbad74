use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::Verdict;
use sea_orm::*;

use crate::entity::{question, submission};

/// The parts of a submission the leaderboard ranks on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoredSubmission {
    pub submission_id: i32,
    pub user_id: i32,
    pub question_id: i32,
    pub score: i32,
    /// Points of the question at the time of ranking.
    pub full_points: i32,
    pub accepted: bool,
    pub submitted_at: DateTime<Utc>,
    /// Submission this one replaces after a rejudge.
    pub supersedes: Option<i32>,
}

impl ScoredSubmission {
    pub fn from_model(model: &submission::Model, full_points: i32) -> Self {
        Self {
            submission_id: model.id,
            user_id: model.user_id,
            question_id: model.question_id,
            score: model.score,
            full_points,
            accepted: model.verdict.is_accepted(),
            submitted_at: model.submitted_at,
            supersedes: model.rejudge_of,
        }
    }
}

/// A judged submission ready to be appended.
#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub contest_id: i32,
    pub question_id: i32,
    pub user_id: i32,
    pub code: String,
    pub language: String,
    pub verdict: Verdict,
    pub score: i32,
    pub passed_count: i32,
    pub total_count: i32,
    pub execution_time_ms: i64,
    pub error_message: Option<String>,
    pub rejudge_of: Option<i32>,
    pub submitted_at: DateTime<Utc>,
}

/// Append-only storage of judged submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Every stored submission of a contest in insertion order.
    async fn scored_submissions(&self, contest_id: i32) -> Result<Vec<ScoredSubmission>, DbErr>;

    async fn insert(&self, submission: NewSubmission) -> Result<submission::Model, DbErr>;
}

pub struct SeaSubmissionStore {
    db: DatabaseConnection,
}

impl SeaSubmissionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubmissionStore for SeaSubmissionStore {
    async fn scored_submissions(&self, contest_id: i32) -> Result<Vec<ScoredSubmission>, DbErr> {
        let points: HashMap<i32, i32> = question::Entity::find()
            .filter(question::Column::ContestId.eq(contest_id))
            .select_only()
            .column(question::Column::Id)
            .column(question::Column::Points)
            .into_tuple::<(i32, i32)>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();

        let rows = submission::Entity::find()
            .filter(submission::Column::ContestId.eq(contest_id))
            .order_by_asc(submission::Column::Id)
            .all(&self.db)
            .await?;

        // Submissions of deleted questions no longer count.
        Ok(rows
            .iter()
            .filter_map(|s| {
                points
                    .get(&s.question_id)
                    .map(|&p| ScoredSubmission::from_model(s, p))
            })
            .collect())
    }

    async fn insert(&self, new: NewSubmission) -> Result<submission::Model, DbErr> {
        let model = submission::ActiveModel {
            contest_id: Set(new.contest_id),
            question_id: Set(new.question_id),
            user_id: Set(new.user_id),
            code: Set(new.code),
            language: Set(new.language),
            verdict: Set(new.verdict),
            score: Set(new.score),
            passed_count: Set(new.passed_count),
            total_count: Set(new.total_count),
            execution_time_ms: Set(new.execution_time_ms),
            error_message: Set(new.error_message),
            rejudge_of: Set(new.rejudge_of),
            submitted_at: Set(new.submitted_at),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        model.insert(&self.db).await
    }
}
