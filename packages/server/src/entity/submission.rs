use common::Verdict;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A judged submission. Rows are never updated; a rejudge appends a new row
/// pointing at the one it supersedes.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub contest_id: i32,
    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: HasOne<super::contest::Entity>,

    pub question_id: i32,
    #[sea_orm(belongs_to, from = "question_id", to = "id")]
    pub question: HasOne<super::question::Entity>,

    pub user_id: i32,

    #[sea_orm(column_type = "Text")]
    pub code: String,
    pub language: String,

    pub verdict: Verdict,
    pub score: i32,
    pub passed_count: i32,
    pub total_count: i32,
    pub execution_time_ms: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    /// Submission this row re-judges, if any.
    pub rejudge_of: Option<i32>,

    /// When the user submitted. Carried over unchanged by rejudges.
    pub submitted_at: DateTimeUtc,
    /// When this row was written.
    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
