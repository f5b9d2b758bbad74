use std::time::Duration;

use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::entity::submission;

pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.to_owned());

    opt.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

fn build(db: &DatabaseConnection, stmt: &IndexCreateStatement) -> String {
    match db.get_database_backend() {
        DatabaseBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        _ => stmt.to_string(PostgresQueryBuilder),
    }
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't create composite non-unique indexes,
/// so they are created on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let indexes: [(&str, &[submission::Column]); 3] = [
        // Rate limiting: recent submissions of one user.
        (
            "idx_submission_user_created",
            &[submission::Column::UserId, submission::Column::CreatedAt],
        ),
        // Contest listings and leaderboard hydration.
        (
            "idx_submission_contest_question_user",
            &[
                submission::Column::ContestId,
                submission::Column::QuestionId,
                submission::Column::UserId,
            ],
        ),
        // Superseded lookups.
        ("idx_submission_rejudge_of", &[submission::Column::RejudgeOf]),
    ];

    for (name, columns) in indexes {
        let mut stmt = Index::create();
        stmt.if_not_exists().name(name).table(submission::Entity);
        for &col in columns {
            stmt.col(col);
        }

        match db.execute_unprepared(&build(db, &stmt)).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}
