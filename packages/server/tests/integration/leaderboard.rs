use crate::common::{TestApp, routes};
use chrono::{Duration, Utc};
use common::Verdict;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{Value, json};
use server::entity::submission;

async fn submit(app: &TestApp, contest_id: i32, question_id: i32, user_id: i32, code: &str) {
    let res = app
        .post_with_token(
            &routes::submit(contest_id, question_id),
            &json!({ "code": code, "language": "python" }),
            &app.contestant(user_id),
        )
        .await;
    assert_eq!(res.status, 201, "submission failed: {}", res.body);
}

async fn rows(app: &TestApp, contest_id: i32) -> Vec<Value> {
    let res = app
        .get_with_token(&routes::leaderboard(contest_id), &app.contestant(1))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["contestId"], contest_id);
    res.body["rows"].as_array().unwrap().clone()
}

#[tokio::test]
async fn equal_totals_share_a_rank() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (question_id, _) = app.weighted_question(contest_id).await;

    submit(&app, contest_id, question_id, 1, "sum").await;
    submit(&app, contest_id, question_id, 2, "sum").await;
    submit(&app, contest_id, question_id, 3, "cap 10").await;

    let rows = rows(&app, contest_id).await;
    let summary: Vec<(i64, i64, i64)> = rows
        .iter()
        .map(|r| {
            (
                r["rank"].as_i64().unwrap(),
                r["userId"].as_i64().unwrap(),
                r["totalScore"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(summary, vec![(1, 1, 100), (1, 2, 100), (3, 3, 60)]);
    assert_eq!(rows[0]["problemsSolved"], 1);
    assert_eq!(rows[2]["problemsSolved"], 0);
}

#[tokio::test]
async fn worse_resubmission_keeps_best_score() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (question_id, _) = app.weighted_question(contest_id).await;

    submit(&app, contest_id, question_id, 1, "sum").await;
    let before = rows(&app, contest_id).await;

    submit(&app, contest_id, question_id, 1, "crash").await;
    let after = rows(&app, contest_id).await;

    assert_eq!(after.len(), 1);
    assert_eq!(after[0]["totalScore"], 100);
    assert_eq!(after[0]["problemsSolved"], 1);
    assert_eq!(after[0]["lastImprovedAt"], before[0]["lastImprovedAt"]);
    assert_eq!(after[0]["questionScores"][question_id.to_string()], 100);
}

#[tokio::test]
async fn totals_add_up_across_questions() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (first, _) = app.weighted_question(contest_id).await;
    let (second, _) = app.weighted_question(contest_id).await;

    submit(&app, contest_id, first, 1, "cap 10").await;
    submit(&app, contest_id, second, 1, "sum").await;
    submit(&app, contest_id, first, 2, "sum").await;

    let rows = rows(&app, contest_id).await;
    assert_eq!(rows[0]["userId"], 1);
    assert_eq!(rows[0]["totalScore"], 160);
    assert_eq!(rows[0]["problemsSolved"], 1);
    assert_eq!(rows[1]["userId"], 2);
    assert_eq!(rows[1]["rank"], 2);
}

#[tokio::test]
async fn concurrent_submissions_are_all_ranked() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (question_id, _) = app.weighted_question(contest_id).await;

    futures::future::join_all((1..=6).map(|uid| submit(&app, contest_id, question_id, uid, "sum")))
        .await;

    let rows = rows(&app, contest_id).await;
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r["rank"] == 1 && r["totalScore"] == 100));
    assert_eq!(app.submission_count().await, 6);
}

#[tokio::test]
async fn standings_are_rebuilt_from_stored_submissions() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (question_id, _) = app.weighted_question(contest_id).await;
    let early = Utc::now() - Duration::minutes(30);

    for (user_id, verdict, score, submitted_at) in [
        (4, Verdict::WrongAnswer, 30, early),
        (5, Verdict::Accepted, 100, early + Duration::minutes(5)),
        (4, Verdict::Accepted, 100, early + Duration::minutes(10)),
    ] {
        submission::ActiveModel {
            contest_id: Set(contest_id),
            question_id: Set(question_id),
            user_id: Set(user_id),
            code: Set("sum".into()),
            language: Set("python".into()),
            verdict: Set(verdict),
            score: Set(score),
            passed_count: Set(3),
            total_count: Set(3),
            execution_time_ms: Set(5),
            error_message: Set(None),
            rejudge_of: Set(None),
            submitted_at: Set(submitted_at),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&app.db)
        .await
        .unwrap();
    }

    let rows = rows(&app, contest_id).await;
    assert_eq!(rows.len(), 2);
    // Same total; user 5 reached it first.
    assert_eq!(rows[0]["userId"], 5);
    assert_eq!(rows[1]["userId"], 4);
    assert_eq!(rows[1]["rank"], 1);
}

#[tokio::test]
async fn private_standings_need_access() {
    let app = TestApp::spawn().await;
    let now = Utc::now();
    let contest_id = app
        .create_contest_at(now - Duration::hours(1), now + Duration::hours(1), false, None)
        .await;

    let res = app
        .get_with_token(&routes::leaderboard(contest_id), &app.contestant(1))
        .await;
    assert_eq!(res.status, 404);

    let res = app
        .get_with_token(&routes::leaderboard(contest_id), &app.admin())
        .await;
    assert_eq!(res.status, 200);

    let res = app
        .get_with_token(&routes::leaderboard(contest_id + 1), &app.admin())
        .await;
    assert_eq!(res.status, 404);
}
