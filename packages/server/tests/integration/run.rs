use crate::common::{TestApp, routes};
use chrono::{Duration, Utc};
use serde_json::json;

#[tokio::test]
async fn results_follow_requested_order() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (question_id, cases) = app.weighted_question(contest_id).await;

    let res = app
        .post_with_token(
            routes::RUN,
            &json!({
                "questionId": question_id,
                "code": "cap 5",
                "language": "python",
                "testCaseIds": [cases[1], cases[0]],
            }),
            &app.contestant(1),
        )
        .await;

    assert_eq!(res.status, 200);
    let results = res.body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0]["testCaseId"], cases[1]);
    assert_eq!(results[0]["passed"], false);
    assert_eq!(results[0]["verdict"], "wrong_answer");
    assert_eq!(results[0]["actual"], "5\n");
    assert_eq!(results[0]["expected"], "10");

    assert_eq!(results[1]["testCaseId"], cases[0]);
    assert_eq!(results[1]["passed"], true);
    assert_eq!(results[1]["verdict"], "passed");
    assert!(results[1]["error"].is_null());
}

#[tokio::test]
async fn empty_selection_runs_every_sample() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (question_id, cases) = app.weighted_question(contest_id).await;

    let res = app
        .post_with_token(
            routes::RUN,
            &json!({ "questionId": question_id, "code": "sum", "language": "python" }),
            &app.contestant(1),
        )
        .await;

    assert_eq!(res.status, 200);
    let ids: Vec<i64> = res.body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["testCaseId"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![cases[0] as i64, cases[1] as i64]);
    // Every sample ran, nothing else did.
    assert_eq!(app.sandbox.calls(), 2);
}

#[tokio::test]
async fn runs_are_repeatable_and_leave_no_trace() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (question_id, _) = app.weighted_question(contest_id).await;
    let payload = json!({ "questionId": question_id, "code": "cap 5", "language": "python" });

    let first = app
        .post_with_token(routes::RUN, &payload, &app.contestant(1))
        .await;
    let second = app
        .post_with_token(routes::RUN, &payload, &app.contestant(1))
        .await;

    assert_eq!(first.status, 200);
    assert_eq!(first.body, second.body);
    assert_eq!(app.submission_count().await, 0);

    let board = app
        .get_with_token(&routes::leaderboard(contest_id), &app.contestant(1))
        .await;
    assert_eq!(board.status, 200);
    assert!(board.body["rows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn hidden_case_cannot_be_run() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (question_id, cases) = app.weighted_question(contest_id).await;

    let res = app
        .post_with_token(
            routes::RUN,
            &json!({
                "questionId": question_id,
                "code": "sum",
                "language": "python",
                "testCaseIds": [cases[2]],
            }),
            &app.contestant(1),
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert_eq!(app.sandbox.calls(), 0);
}

#[tokio::test]
async fn duplicate_case_ids_are_rejected() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (question_id, cases) = app.weighted_question(contest_id).await;

    let res = app
        .post_with_token(
            routes::RUN,
            &json!({
                "questionId": question_id,
                "code": "sum",
                "language": "python",
                "testCaseIds": [cases[0], cases[0]],
            }),
            &app.contestant(1),
        )
        .await;

    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn crash_output_is_reported_per_case() {
    let app = TestApp::spawn().await;
    let contest_id = app.running_contest().await;
    let (question_id, cases) = app.weighted_question(contest_id).await;

    let res = app
        .post_with_token(
            routes::RUN,
            &json!({
                "questionId": question_id,
                "code": "crash",
                "language": "python",
                "testCaseIds": [cases[0]],
            }),
            &app.contestant(1),
        )
        .await;

    assert_eq!(res.status, 200);
    let result = &res.body["results"][0];
    assert_eq!(result["verdict"], "runtime_error");
    assert!(result["error"].as_str().unwrap().contains("ValueError: boom"));
}

#[tokio::test]
async fn run_is_closed_after_contest_end() {
    let app = TestApp::spawn().await;
    let now = Utc::now();
    let contest_id = app
        .create_contest_at(now - Duration::hours(2), now - Duration::hours(1), true, None)
        .await;
    let (question_id, _) = app.weighted_question(contest_id).await;

    let res = app
        .post_with_token(
            routes::RUN,
            &json!({ "questionId": question_id, "code": "sum", "language": "python" }),
            &app.contestant(1),
        )
        .await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "CONTEST_ENDED");
    assert_eq!(app.sandbox.calls(), 0);
}

#[tokio::test]
async fn unknown_question_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .post_with_token(
            routes::RUN,
            &json!({ "questionId": 4242, "code": "sum", "language": "python" }),
            &app.contestant(1),
        )
        .await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}
