use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contest")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,

    /// Public contests enroll any authenticated user on first run/submit.
    pub is_public: bool,
    /// NULL for no cap.
    pub max_participants: Option<i32>,

    #[sea_orm(has_many)]
    pub questions: HasMany<super::question::Entity>,

    #[sea_orm(has_many)]
    pub participants: HasMany<super::contest_participant::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
