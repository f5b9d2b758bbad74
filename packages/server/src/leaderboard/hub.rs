use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sea_orm::DbErr;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::ranker::{LeaderboardRow, Standings};
use crate::store::{ScoredSubmission, SubmissionStore};

const MAILBOX_CAPACITY: usize = 256;

#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("leaderboard of contest {0} stopped")]
    Stopped(i32),
}

enum Command {
    Record(ScoredSubmission, oneshot::Sender<()>),
    Snapshot(oneshot::Sender<Arc<Vec<LeaderboardRow>>>),
}

struct HubInner {
    store: Arc<dyn SubmissionStore>,
    contests: DashMap<i32, mpsc::Sender<Command>>,
}

/// Owns one standings actor per contest.
///
/// All updates of a contest go through its actor's mailbox, so concurrent
/// submissions are applied one at a time. An actor is started on first use
/// and rebuilt from stored submissions before it accepts commands.
#[derive(Clone)]
pub struct LeaderboardHub {
    inner: Arc<HubInner>,
}

impl LeaderboardHub {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                store,
                contests: DashMap::new(),
            }),
        }
    }

    /// Apply a stored submission and wait until the standings reflect it.
    pub async fn record(
        &self,
        contest_id: i32,
        submission: ScoredSubmission,
    ) -> Result<(), LeaderboardError> {
        let (tx, rx) = oneshot::channel();
        self.send(contest_id, Command::Record(submission, tx)).await?;
        rx.await.map_err(|_| LeaderboardError::Stopped(contest_id))
    }

    /// Current ranked rows of a contest.
    pub async fn snapshot(
        &self,
        contest_id: i32,
    ) -> Result<Arc<Vec<LeaderboardRow>>, LeaderboardError> {
        let (tx, rx) = oneshot::channel();
        self.send(contest_id, Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| LeaderboardError::Stopped(contest_id))
    }

    async fn send(&self, contest_id: i32, command: Command) -> Result<(), LeaderboardError> {
        let mailbox = self.mailbox(contest_id).await?;
        if mailbox.send(command).await.is_err() {
            // Drop the dead actor so the next caller rebuilds it.
            self.inner
                .contests
                .remove_if(&contest_id, |_, tx| tx.same_channel(&mailbox));
            return Err(LeaderboardError::Stopped(contest_id));
        }
        Ok(())
    }

    async fn mailbox(&self, contest_id: i32) -> Result<mpsc::Sender<Command>, LeaderboardError> {
        if let Some(tx) = self.inner.contests.get(&contest_id) {
            return Ok(tx.clone());
        }

        let history = self.inner.store.scored_submissions(contest_id).await?;
        let count = history.len();
        let standings = Standings::from_history(history);

        match self.inner.contests.entry(contest_id) {
            // Another caller finished hydrating first; ours is discarded.
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(e) => {
                let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
                tokio::spawn(run_standings(contest_id, standings, rx));
                e.insert(tx.clone());
                info!(contest_id, submissions = count, "Leaderboard hydrated");
                Ok(tx)
            }
        }
    }
}

async fn run_standings(
    contest_id: i32,
    mut standings: Standings,
    mut rx: mpsc::Receiver<Command>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Record(submission, done) => {
                let submission_id = submission.submission_id;
                if standings.record(submission) {
                    debug!(contest_id, submission_id, "Standings updated");
                }
                let _ = done.send(());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(standings.ranked());
            }
        }
    }
    warn!(contest_id, "Leaderboard actor stopped");
}
