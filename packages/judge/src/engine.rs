use std::sync::atomic::{AtomicUsize, Ordering};

use common::execution::ExecutionRequest;
use common::judge_request::{JudgeMode, JudgeRequest, TestCaseData};
use common::judge_result::{JudgeOutcome, TestCaseOutcome};
use common::CaseVerdict;
use futures::StreamExt;
use futures::stream;
use tracing::{debug, error, info};

use crate::aggregate::aggregate;
use crate::classify::Classifier;
use crate::config::JudgeConfig;
use crate::error::ExecutionError;
use crate::execution::ExecutionClient;
use crate::normalize::OutputNormalizer;

/// Message shown to the user when the execution capability failed for a case.
pub const INFRASTRUCTURE_ERROR_MESSAGE: &str = "Internal error: execution service unavailable";

/// Runs the test cases of a [`JudgeRequest`] and produces its [`JudgeOutcome`].
///
/// Cases execute concurrently up to `max_concurrent_cases`. Judging always
/// completes: failures of the execution capability become runtime errors of
/// the affected cases.
pub struct VerdictEngine {
    client: ExecutionClient,
    classifier: Classifier,
    max_concurrent_cases: usize,
    max_error_message_bytes: usize,
}

impl VerdictEngine {
    pub fn new(client: ExecutionClient, config: &JudgeConfig) -> Self {
        Self {
            client,
            classifier: Classifier::new(OutputNormalizer::new(config.float_tolerance)),
            max_concurrent_cases: config.max_concurrent_cases.max(1),
            max_error_message_bytes: config.max_error_message_bytes,
        }
    }

    pub fn from_config(config: &JudgeConfig) -> Result<Self, ExecutionError> {
        Ok(Self::new(ExecutionClient::from_config(config)?, config))
    }

    pub async fn judge(&self, request: &JudgeRequest) -> JudgeOutcome {
        if let Err(e) = self.client.prepare(&request.language, &request.code).await {
            // Each case will hit the same failure and report it.
            error!(
                infrastructure = true,
                judge_id = %request.judge_id,
                language = %request.language,
                error = %e,
                "Failed to prepare code for execution"
            );
        }

        // Earliest failing ordinal seen so far; only tracked in submit mode.
        let first_failure = AtomicUsize::new(usize::MAX);
        let tracker = (request.mode == JudgeMode::Submit).then_some(&first_failure);

        let runs: Vec<_> = request
            .test_cases
            .iter()
            .enumerate()
            .map(|(idx, tc)| self.run_case(request, tc, idx + 1, tracker))
            .collect();
        let cases: Vec<TestCaseOutcome> = stream::iter(runs)
            .buffer_unordered(self.max_concurrent_cases)
            .collect()
            .await;

        let outcome = aggregate(request, cases, self.max_error_message_bytes);
        info!(
            judge_id = %request.judge_id,
            mode = ?request.mode,
            verdict = %outcome.verdict,
            score = outcome.score,
            passed = outcome.passed_count,
            total = outcome.total_count,
            time_ms = outcome.execution_time_ms,
            "Judging completed"
        );
        outcome
    }

    async fn run_case(
        &self,
        request: &JudgeRequest,
        tc: &TestCaseData,
        ordinal: usize,
        first_failure: Option<&AtomicUsize>,
    ) -> TestCaseOutcome {
        if first_failure.is_some_and(|f| f.load(Ordering::SeqCst) < ordinal) {
            return TestCaseOutcome::skipped(tc.id, ordinal);
        }

        let execution = ExecutionRequest {
            language: request.language.clone(),
            code: request.code.clone(),
            stdin: tc.input.clone(),
            time_limit_seconds: request.time_limit_seconds,
            memory_limit_mb: request.memory_limit_mb,
        };

        let outcome = match self.client.run(&execution).await {
            Ok(result) => {
                let verdict = self.classifier.classify(
                    &request.language,
                    &result,
                    &tc.expected_output,
                    ordinal,
                );
                if verdict.is_failure() {
                    debug!(
                        judge_id = %request.judge_id,
                        ordinal,
                        verdict = ?verdict,
                        exit_code = ?result.exit_code,
                        "Test case failed"
                    );
                }
                TestCaseOutcome {
                    test_case_id: tc.id,
                    ordinal,
                    verdict,
                    score: if verdict.is_passed() { tc.weight } else { 0 },
                    time_ms: result.time_ms.unwrap_or(0),
                    stdout: result.stdout,
                    stderr: result.stderr,
                    infrastructure_error: false,
                }
            }
            Err(e) => {
                error!(
                    infrastructure = true,
                    judge_id = %request.judge_id,
                    ordinal,
                    transient = e.is_transient(),
                    error = %e,
                    "Execution capability failed"
                );
                TestCaseOutcome {
                    test_case_id: tc.id,
                    ordinal,
                    verdict: CaseVerdict::RuntimeError,
                    score: 0,
                    time_ms: 0,
                    stdout: String::new(),
                    stderr: INFRASTRUCTURE_ERROR_MESSAGE.to_string(),
                    infrastructure_error: true,
                }
            }
        };

        if outcome.verdict.is_failure() {
            if let Some(f) = first_failure {
                f.fetch_min(ordinal, Ordering::SeqCst);
            }
        }
        outcome
    }
}
