use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::ScoredSubmission;

/// One ranked contestant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    /// Competition rank: equal (total score, problems solved) share a rank.
    #[schema(example = 1)]
    pub rank: u32,
    #[schema(example = 42)]
    pub user_id: i32,
    #[schema(example = 250)]
    pub total_score: i32,
    #[schema(example = 2)]
    pub problems_solved: u32,
    /// When the current total was first reached; breaks ties in listing order.
    pub last_improved_at: Option<DateTime<Utc>>,
    /// Best score per question id.
    pub question_scores: BTreeMap<i32, i32>,
}

#[derive(Clone, Debug)]
struct Attempt {
    submission_id: i32,
    score: i32,
    full_points: i32,
    accepted: bool,
    submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
struct Standing {
    total_score: i32,
    problems_solved: u32,
    last_improved_at: Option<DateTime<Utc>>,
    question_scores: BTreeMap<i32, i32>,
}

/// Standings of one contest, derived from every submission seen so far.
#[derive(Default)]
pub struct Standings {
    attempts: HashMap<i32, HashMap<i32, Vec<Attempt>>>,
    superseded: HashSet<i32>,
    seen: HashSet<i32>,
    rows: HashMap<i32, Standing>,
    ranked: Option<Arc<Vec<LeaderboardRow>>>,
}

impl Standings {
    pub fn from_history(history: impl IntoIterator<Item = ScoredSubmission>) -> Self {
        let mut standings = Self::default();
        for submission in history {
            standings.record(submission);
        }
        standings
    }

    /// Apply one submission. Returns false if it was already recorded.
    pub fn record(&mut self, submission: ScoredSubmission) -> bool {
        if !self.seen.insert(submission.submission_id) {
            return false;
        }
        if let Some(old) = submission.supersedes {
            self.superseded.insert(old);
        }

        self.attempts
            .entry(submission.user_id)
            .or_default()
            .entry(submission.question_id)
            .or_default()
            .push(Attempt {
                submission_id: submission.submission_id,
                score: submission.score,
                full_points: submission.full_points,
                accepted: submission.accepted,
                submitted_at: submission.submitted_at,
            });

        self.recompute(submission.user_id);
        self.ranked = None;
        true
    }

    fn recompute(&mut self, user_id: i32) {
        let Some(questions) = self.attempts.get(&user_id) else {
            return;
        };

        let mut standing = Standing::default();
        for (&question_id, attempts) in questions {
            let mut best: Option<(i32, DateTime<Utc>)> = None;
            let mut solved = false;

            for a in attempts
                .iter()
                .filter(|a| !self.superseded.contains(&a.submission_id))
            {
                solved |= a.accepted || (a.full_points > 0 && a.score >= a.full_points);
                let keep = best.is_some_and(|(score, at)| {
                    score > a.score || (score == a.score && at <= a.submitted_at)
                });
                if !keep {
                    best = Some((a.score, a.submitted_at));
                }
            }

            let Some((score, achieved_at)) = best else {
                continue;
            };
            standing.question_scores.insert(question_id, score);
            standing.total_score += score;
            if solved {
                standing.problems_solved += 1;
            }
            if score > 0 {
                standing.last_improved_at = standing.last_improved_at.max(Some(achieved_at));
            }
        }

        self.rows.insert(user_id, standing);
    }

    /// Rows sorted by total score, problems solved, then when the total was reached.
    pub fn ranked(&mut self) -> Arc<Vec<LeaderboardRow>> {
        if let Some(rows) = &self.ranked {
            return rows.clone();
        }

        let mut order: Vec<(&i32, &Standing)> = self.rows.iter().collect();
        order.sort_by(|(a_id, a), (b_id, b)| {
            b.total_score
                .cmp(&a.total_score)
                .then(b.problems_solved.cmp(&a.problems_solved))
                .then(earliest_first(a.last_improved_at, b.last_improved_at))
                .then(a_id.cmp(b_id))
        });

        let mut rows = Vec::with_capacity(order.len());
        let mut rank = 0u32;
        let mut previous: Option<(i32, u32)> = None;
        for (position, (&user_id, s)) in order.into_iter().enumerate() {
            let key = (s.total_score, s.problems_solved);
            if previous != Some(key) {
                rank = position as u32 + 1;
                previous = Some(key);
            }
            rows.push(LeaderboardRow {
                rank,
                user_id,
                total_score: s.total_score,
                problems_solved: s.problems_solved,
                last_improved_at: s.last_improved_at,
                question_scores: s.question_scores.clone(),
            });
        }

        let rows = Arc::new(rows);
        self.ranked = Some(rows.clone());
        rows
    }
}

/// Earlier timestamps first; rows that never scored go last.
fn earliest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
