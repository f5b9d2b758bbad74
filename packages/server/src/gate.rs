//! Admission control for run and submit requests.
//!
//! Every decision uses the server clock. Nothing a client reports about time
//! is consulted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::entity::{contest, contest_participant};
use crate::error::AppError;

/// Source of the authoritative current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock of the server.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Error, Debug)]
pub enum GateError {
    /// Unknown contest, or a private contest the user does not participate in.
    #[error("contest not found")]
    NotFound,
    #[error("contest has not started")]
    NotStarted,
    #[error("contest has ended")]
    Ended,
    #[error("contest is full")]
    Full,
    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Clone)]
pub struct ContestGate {
    clock: Arc<dyn Clock>,
}

impl ContestGate {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Reject unless the current time lies inside the contest window (both
    /// ends inclusive). Returns the instant the check was made at.
    pub fn check_window(&self, contest: &contest::Model) -> Result<DateTime<Utc>, GateError> {
        let now = self.clock.now();
        if now < contest.start_time {
            return Err(GateError::NotStarted);
        }
        if now > contest.end_time {
            return Err(GateError::Ended);
        }
        Ok(now)
    }

    /// Admit `user_id` to run or submit code in `contest`.
    ///
    /// Registered participants pass the window check. Other users are enrolled
    /// on the spot when the contest is public and below its participant cap;
    /// private contests are reported as not found to them.
    ///
    /// Returns the admission time, which lies inside the contest window.
    pub async fn admit<C: ConnectionTrait>(
        &self,
        db: &C,
        contest: &contest::Model,
        user_id: i32,
    ) -> Result<DateTime<Utc>, GateError> {
        let registered = contest_participant::Entity::find_by_id((contest.id, user_id))
            .one(db)
            .await?
            .is_some();

        if !registered && !contest.is_public {
            return Err(GateError::NotFound);
        }

        let admitted_at = self.check_window(contest)?;

        if registered {
            return Ok(admitted_at);
        }

        // Optimistic: concurrent first requests may overshoot the cap slightly.
        if let Some(cap) = contest.max_participants {
            let count = contest_participant::Entity::find()
                .filter(contest_participant::Column::ContestId.eq(contest.id))
                .count(db)
                .await?;
            if is_full(count, cap) {
                debug!(contest_id = contest.id, user_id, cap, "Contest full");
                return Err(GateError::Full);
            }
        }

        let model = contest_participant::ActiveModel {
            contest_id: Set(contest.id),
            user_id: Set(user_id),
            registered_at: Set(admitted_at),
        };
        let result = contest_participant::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    contest_participant::Column::ContestId,
                    contest_participant::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => {
                info!(contest_id = contest.id, user_id, "Enrolled participant");
                Ok(admitted_at)
            }
            Err(DbErr::RecordNotInserted) => Ok(admitted_at),
            Err(e) => Err(e.into()),
        }
    }
}

/// A cap of zero or below admits nobody new.
fn is_full(participants: u64, cap: i32) -> bool {
    participants >= Ord::max(cap, 0) as u64
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::NotFound => AppError::NotFound("Contest not found".into()),
            GateError::NotStarted => AppError::ContestNotStarted,
            GateError::Ended => AppError::ContestEnded,
            GateError::Full => AppError::ContestFull,
            GateError::Database(e) => e.into(),
        }
    }
}
