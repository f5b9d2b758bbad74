use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub contest_id: i32,
    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: HasOne<super::contest::Entity>,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String, // in Markdown
    pub points: i32,
    pub time_limit_seconds: i32,
    pub memory_limit_mb: i32,
    /// Display order inside the contest.
    pub position: i32,

    #[sea_orm(has_many)]
    pub test_cases: HasMany<super::test_case::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
