use crate::common::{TestApp, routes};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use serde_json::json;
use server::entity::contest_participant;

fn body() -> serde_json::Value {
    json!({ "code": "sum", "language": "python" })
}

#[tokio::test]
async fn submission_after_end_stores_nothing() {
    let app = TestApp::spawn().await;
    let now = Utc::now();
    let contest_id = app
        .create_contest_at(now - Duration::hours(2), now - Duration::seconds(1), true, None)
        .await;
    let (question_id, _) = app.weighted_question(contest_id).await;

    let res = app
        .post_with_token(
            &routes::submit(contest_id, question_id),
            &body(),
            &app.contestant(1),
        )
        .await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "CONTEST_ENDED");
    assert_eq!(app.submission_count().await, 0);
    assert_eq!(app.sandbox.calls(), 0);

    let board = app
        .get_with_token(&routes::leaderboard(contest_id), &app.contestant(1))
        .await;
    assert!(board.body["rows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_late_submissions_are_all_rejected() {
    let app = TestApp::spawn().await;
    let now = Utc::now();
    let contest_id = app
        .create_contest_at(now - Duration::hours(1), now - Duration::milliseconds(1), true, None)
        .await;
    let (question_id, _) = app.weighted_question(contest_id).await;
    let path = routes::submit(contest_id, question_id);

    let payload = body();
    let tokens: Vec<String> = (1..=8).map(|uid| app.contestant(uid)).collect();
    let responses = futures::future::join_all(
        tokens
            .iter()
            .map(|token| app.post_with_token(&path, &payload, token)),
    )
    .await;

    assert!(responses.iter().all(|r| r.status == 403));
    assert_eq!(app.submission_count().await, 0);
    assert_eq!(app.sandbox.calls(), 0);
}

#[tokio::test]
async fn submission_before_start_is_rejected() {
    let app = TestApp::spawn().await;
    let now = Utc::now();
    let contest_id = app
        .create_contest_at(now + Duration::hours(1), now + Duration::hours(2), true, None)
        .await;
    let (question_id, _) = app.weighted_question(contest_id).await;

    let res = app
        .post_with_token(
            &routes::submit(contest_id, question_id),
            &body(),
            &app.contestant(1),
        )
        .await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "CONTEST_NOT_STARTED");
    assert_eq!(app.submission_count().await, 0);
}

#[tokio::test]
async fn public_contest_enrolls_on_first_submission() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (question_id, _) = app.weighted_question(contest_id).await;

    for _ in 0..2 {
        let res = app
            .post_with_token(
                &routes::submit(contest_id, question_id),
                &body(),
                &app.contestant(7),
            )
            .await;
        assert_eq!(res.status, 201);
    }

    let enrolled = contest_participant::Entity::find_by_id((contest_id, 7))
        .one(&app.db)
        .await
        .unwrap();
    assert!(enrolled.is_some());
    assert_eq!(
        contest_participant::Entity::find().count(&app.db).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn private_contest_is_hidden_from_outsiders() {
    let app = TestApp::spawn().await;
    let now = Utc::now();
    let contest_id = app
        .create_contest_at(now - Duration::hours(1), now + Duration::hours(1), false, None)
        .await;
    let (question_id, _) = app.weighted_question(contest_id).await;

    let res = app
        .post_with_token(
            &routes::submit(contest_id, question_id),
            &body(),
            &app.contestant(1),
        )
        .await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");

    contest_participant::ActiveModel {
        contest_id: Set(contest_id),
        user_id: Set(1),
        registered_at: Set(now),
    }
    .insert(&app.db)
    .await
    .unwrap();

    let res = app
        .post_with_token(
            &routes::submit(contest_id, question_id),
            &body(),
            &app.contestant(1),
        )
        .await;
    assert_eq!(res.status, 201);
}

#[tokio::test]
async fn full_contest_turns_away_newcomers_only() {
    let app = TestApp::spawn().await;
    let now = Utc::now();
    let contest_id = app
        .create_contest_at(now - Duration::hours(1), now + Duration::hours(1), true, Some(1))
        .await;
    let (question_id, _) = app.weighted_question(contest_id).await;
    let path = routes::submit(contest_id, question_id);

    let res = app.post_with_token(&path, &body(), &app.contestant(1)).await;
    assert_eq!(res.status, 201);

    let res = app.post_with_token(&path, &body(), &app.contestant(2)).await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "CONTEST_FULL");

    let res = app.post_with_token(&path, &body(), &app.contestant(1)).await;
    assert_eq!(res.status, 201);
}
