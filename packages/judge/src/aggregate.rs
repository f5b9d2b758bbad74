//! Folding per-case outcomes into one submission outcome.

use common::judge_request::{JudgeMode, JudgeRequest};
use common::judge_result::{JudgeOutcome, TestCaseOutcome};
use common::text::truncate_utf8;
use common::{CaseVerdict, Verdict};
use tracing::warn;

/// Build the [`JudgeOutcome`] of `request` from its case outcomes.
///
/// `cases` may arrive in any order. In submit mode every case after the first
/// failing ordinal is reported as skipped regardless of whether it ran, so the
/// result does not depend on scheduling.
pub fn aggregate(
    request: &JudgeRequest,
    mut cases: Vec<TestCaseOutcome>,
    max_error_bytes: usize,
) -> JudgeOutcome {
    cases.sort_by_key(|c| c.ordinal);

    let first_failure = cases
        .iter()
        .find(|c| c.verdict.is_failure())
        .map(|c| (c.ordinal, c.verdict));

    if let (JudgeMode::Submit, Some((failed_ordinal, _))) = (request.mode, first_failure) {
        for case in cases.iter_mut().filter(|c| c.ordinal > failed_ordinal) {
            *case = TestCaseOutcome::skipped(case.test_case_id, case.ordinal);
        }
    }

    let passed_count = cases.iter().filter(|c| c.verdict.is_passed()).count();
    let raw_score: i32 = cases
        .iter()
        .filter(|c| c.verdict.is_passed())
        .fold(0i32, |total, c| total.saturating_add(c.score));
    let execution_time_ms = cases
        .iter()
        .filter(|c| c.verdict != CaseVerdict::Skipped)
        .map(|c| c.time_ms)
        .max()
        .unwrap_or(0);

    let verdict = first_failure
        .and_then(|(_, v)| v.as_verdict())
        .unwrap_or(Verdict::Accepted);

    if let Some(total_weight) = weight_mismatch(request) {
        warn!(
            judge_id = %request.judge_id,
            total_weight,
            points = request.points,
            "Test case weights do not add up to question points"
        );
    }

    let score = if verdict.is_accepted() {
        request.points.max(0)
    } else {
        raw_score.min(request.points.saturating_sub(1)).max(0)
    };

    let error_message = first_failure.and_then(|(ordinal, case_verdict)| {
        let case = cases.iter().find(|c| c.ordinal == ordinal)?;
        let verdict = case_verdict.as_verdict()?;
        let mut message = format!("Test case #{ordinal} failed ({verdict})");
        let detail = case.stderr.trim();
        if !detail.is_empty() {
            message.push_str(": ");
            message.push_str(detail);
        }
        Some(truncate_utf8(&message, max_error_bytes))
    });

    JudgeOutcome {
        judge_id: request.judge_id.clone(),
        verdict,
        score,
        passed_count,
        total_count: cases.len(),
        execution_time_ms,
        error_message,
        failed_ordinal: first_failure.map(|(ordinal, _)| ordinal),
        cases,
    }
}

/// Total case weight of a graded request whose weights disagree with the
/// question's points. Runs carry samples only and are never checked.
fn weight_mismatch(request: &JudgeRequest) -> Option<i32> {
    if request.mode != JudgeMode::Submit {
        return None;
    }
    let total_weight = request.total_weight();
    (total_weight != request.points).then_some(total_weight)
}
