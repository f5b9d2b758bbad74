use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::execution::{ExecutionRequest, ExecutionResult};
use judge::{ExecutionBackend, ExecutionClient, ExecutionError, JudgeConfig, VerdictEngine};
use reqwest::Client;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use serde_json::Value;
use tempfile::TempDir;

use server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig, SubmissionConfig,
};
use server::entity::{contest, question, submission, test_case};
use server::gate::SystemClock;
use server::state::AppState;
use server::utils::jwt;

pub const JWT_SECRET: &str = "test-secret-for-integration-tests";

pub mod routes {
    pub const RUN: &str = "/api/v1/run";

    pub fn submit(contest_id: i32, question_id: i32) -> String {
        format!("/api/v1/contests/{contest_id}/questions/{question_id}/submit")
    }

    pub fn leaderboard(contest_id: i32) -> String {
        format!("/api/v1/contests/{contest_id}/leaderboard")
    }

    pub fn contest_submissions(contest_id: i32) -> String {
        format!("/api/v1/contests/{contest_id}/submissions")
    }

    pub fn submission(id: i32) -> String {
        format!("/api/v1/submissions/{id}")
    }

    pub fn submission_rejudge(id: i32) -> String {
        format!("/api/v1/submissions/{id}/rejudge")
    }
}

/// Stand-in for the sandbox service. The submitted code is a one-line script:
///
/// * `sum` prints the sum of the integers on stdin
/// * `cap N` prints the sum, but at most `N`
/// * `hang-at N` never returns when the sum is `N`, prints the sum otherwise
/// * `crash` exits with status 1
/// * `offline` fails as an unreachable service
#[derive(Default)]
pub struct ScriptedSandbox {
    calls: AtomicUsize,
}

impl ScriptedSandbox {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn printed(stdout: String) -> ExecutionResult {
    ExecutionResult {
        stdout,
        exit_code: Some(0),
        time_ms: Some(5),
        ..Default::default()
    }
}

#[async_trait]
impl ExecutionBackend for ScriptedSandbox {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let sum: i64 = request
            .stdin
            .split_whitespace()
            .filter_map(|t| t.parse::<i64>().ok())
            .sum();
        let mut words = request.code.split_whitespace();
        let command = words.next().unwrap_or_default();
        let arg: Option<i64> = words.next().and_then(|w| w.parse().ok());

        match command {
            "sum" => Ok(printed(format!("{sum}\n"))),
            "cap" => Ok(printed(format!("{}\n", sum.min(arg.unwrap_or(i64::MAX))))),
            "hang-at" if Some(sum) == arg => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(printed(String::new()))
            }
            "hang-at" => Ok(printed(format!("{sum}\n"))),
            "crash" => Ok(ExecutionResult {
                stderr: "Traceback (most recent call last):\nValueError: boom\n".into(),
                exit_code: Some(1),
                time_ms: Some(3),
                ..Default::default()
            }),
            "offline" => Err(ExecutionError::Unavailable("connection refused".into())),
            other => Ok(ExecutionResult {
                stderr: format!("unknown script {other}"),
                exit_code: Some(2),
                ..Default::default()
            }),
        }
    }
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            body,
        }
    }
}

/// A running test server backed by a throwaway SQLite database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub sandbox: Arc<ScriptedSandbox>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("gavel.db").display());

        let mut config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: db_url,
                max_connections: 4,
            },
            auth: AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
            },
            judge: JudgeConfig {
                grace_period_ms: 200,
                ..Default::default()
            },
            submission: SubmissionConfig {
                rate_limit_per_minute: 0,
                ..Default::default()
            },
        };
        configure(&mut config);

        let db = server::database::init_db(&config.database)
            .await
            .expect("Failed to initialize database");
        server::database::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let sandbox = Arc::new(ScriptedSandbox::default());
        let client = ExecutionClient::new(
            sandbox.clone(),
            Duration::from_millis(config.judge.grace_period_ms),
        );
        let engine = Arc::new(VerdictEngine::new(client, &config.judge));

        let state = AppState::new(db.clone(), config, engine, Arc::new(SystemClock));
        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            sandbox,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn token(&self, user_id: i32, permissions: &[&str]) -> String {
        jwt::sign(
            JWT_SECRET,
            user_id,
            &format!("user{user_id}"),
            permissions,
            chrono::Duration::hours(1),
        )
        .expect("Failed to sign token")
    }

    /// Token of an ordinary contestant.
    pub fn contestant(&self, user_id: i32) -> String {
        self.token(user_id, &["submission:submit"])
    }

    pub fn admin(&self) -> String {
        self.token(
            9000,
            &[
                "submission:submit",
                "submission:view_all",
                "submission:rejudge",
                "contest:manage",
            ],
        )
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    /// POST that stops waiting after `patience`. `None` when the client gave
    /// up before a response arrived.
    pub async fn post_with_patience(
        &self,
        path: &str,
        body: &Value,
        token: &str,
        patience: Duration,
    ) -> Option<TestResponse> {
        let client = Client::builder()
            .timeout(patience)
            .build()
            .expect("Failed to build client");
        let res = client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .ok()?;

        Some(TestResponse::from_response(res).await)
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// Create a contest spanning `[start, end]`.
    pub async fn create_contest_at(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        is_public: bool,
        max_participants: Option<i32>,
    ) -> i32 {
        contest::ActiveModel {
            title: Set("Weekly Round".into()),
            description: Set(String::new()),
            start_time: Set(start),
            end_time: Set(end),
            is_public: Set(is_public),
            max_participants: Set(max_participants),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to insert contest")
        .id
    }

    /// Public contest that started an hour ago and ends in an hour.
    pub async fn running_contest(&self) -> i32 {
        let now = Utc::now();
        self.create_contest_at(
            now - chrono::Duration::hours(1),
            now + chrono::Duration::hours(1),
            true,
            None,
        )
        .await
    }

    pub async fn create_question(&self, contest_id: i32, points: i32) -> i32 {
        question::ActiveModel {
            contest_id: Set(contest_id),
            title: Set("A + B".into()),
            description: Set("Add two numbers.".into()),
            points: Set(points),
            time_limit_seconds: Set(1),
            memory_limit_mb: Set(256),
            position: Set(0),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to insert question")
        .id
    }

    pub async fn add_case(
        &self,
        question_id: i32,
        position: i32,
        input: &str,
        expected: &str,
        weight: i32,
        is_sample: bool,
    ) -> i32 {
        test_case::ActiveModel {
            question_id: Set(question_id),
            input: Set(input.into()),
            expected_output: Set(expected.into()),
            weight: Set(weight),
            is_sample: Set(is_sample),
            is_hidden: Set(!is_sample),
            position: Set(position),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to insert test case")
        .id
    }

    /// A 100-point question with cases weighted 30/30/40 whose sums are 3, 10
    /// and 15. The first two are samples.
    pub async fn weighted_question(&self, contest_id: i32) -> (i32, Vec<i32>) {
        let question_id = self.create_question(contest_id, 100).await;
        let cases = vec![
            self.add_case(question_id, 0, "1 2", "3", 30, true).await,
            self.add_case(question_id, 1, "4 6", "10", 30, true).await,
            self.add_case(question_id, 2, "7 8", "15", 40, false).await,
        ];
        (question_id, cases)
    }

    pub async fn submission_count(&self) -> u64 {
        submission::Entity::find()
            .count(&self.db)
            .await
            .expect("Failed to count submissions")
    }
}
