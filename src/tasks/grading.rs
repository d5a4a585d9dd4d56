use std::time::Instant;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc as now_primitive, seconds_before};
use crate::db::models::{Assignment, GrowthReport, Rubric, RubricCriterion, Submission};
use crate::repositories;
use crate::services::quiz::{QuizPlan, QuizSubmissionBody};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GradingKind {
    Quiz,
    LongForm,
}

impl GradingKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::LongForm => "long_form",
        }
    }
}

pub(crate) fn default_criteria() -> Vec<RubricCriterion> {
    [("c1", "Clarity"), ("c2", "Depth"), ("c3", "Relevance")]
        .into_iter()
        .map(|(id, name)| RubricCriterion { id: id.to_string(), name: name.to_string(), description: None })
        .collect()
}

fn criteria_for(rubric: Option<Rubric>) -> Vec<RubricCriterion> {
    match rubric {
        Some(rubric) if !rubric.criteria.0.is_empty() => rubric.criteria.0,
        _ => default_criteria(),
    }
}

/// Tries to take a submission for grading on behalf of a request.
pub(crate) async fn claim(state: &AppState, submission_id: &str) -> Result<bool> {
    let now = now_primitive();
    let stale_before = seconds_before(now, state.settings().grading().stale_after_seconds);
    repositories::submissions::claim_for_grading(state.db(), submission_id, now, stale_before)
        .await
        .context("Failed to claim submission for grading")
}

pub(crate) async fn claim_next(state: &AppState) -> Result<Option<String>> {
    let now = now_primitive();
    let stale_before = seconds_before(now, state.settings().grading().stale_after_seconds);
    repositories::submissions::claim_next_for_grading(state.db(), now, stale_before)
        .await
        .context("Failed to claim next submission")
}

/// Grades a submission the caller has already claimed. On failure the submission is
/// marked `failed` with the error before the error is returned.
pub(crate) async fn run_claimed(state: &AppState, submission_id: &str) -> Result<GrowthReport> {
    let timer = Instant::now();
    let submission = repositories::submissions::find_by_id(state.db(), submission_id)
        .await
        .context("Failed to load submission")?
        .context("Submission not found")?;
    let kind = grading_kind(&submission);

    match grade_submission(state, &submission, kind).await {
        Ok(report) => {
            metrics::record_grading(kind.as_str(), "graded", timer.elapsed());
            tracing::info!(
                submission_id,
                kind = kind.as_str(),
                score = report.score,
                elapsed_ms = timer.elapsed().as_millis() as u64,
                "Submission graded"
            );
            Ok(report)
        }
        Err(err) => {
            metrics::record_grading(kind.as_str(), "failed", timer.elapsed());
            tracing::error!(submission_id, kind = kind.as_str(), error = %format!("{err:#}"), "Grading failed");
            if let Err(mark_err) = repositories::submissions::mark_failed(
                state.db(),
                submission_id,
                &format!("{err:#}"),
                now_primitive(),
            )
            .await
            {
                tracing::error!(submission_id, error = %mark_err, "Failed to mark submission as failed");
            }
            Err(err)
        }
    }
}

fn grading_kind(submission: &Submission) -> GradingKind {
    match submission.body_text.as_deref().and_then(QuizSubmissionBody::parse) {
        Some(_) => GradingKind::Quiz,
        None => GradingKind::LongForm,
    }
}

async fn grade_submission(
    state: &AppState,
    submission: &Submission,
    kind: GradingKind,
) -> Result<GrowthReport> {
    let assignment = repositories::assignments::find_by_id(state.db(), &submission.assignment_id)
        .await
        .context("Failed to load assignment")?
        .context("Assignment not found")?;

    let report = match kind {
        GradingKind::Quiz => grade_quiz(state, submission).await?,
        GradingKind::LongForm => grade_long_form(state, submission, &assignment).await?,
    };

    repositories::submissions::mark_graded(state.db(), &submission.id, now_primitive())
        .await
        .context("Failed to mark submission graded")?;

    Ok(report)
}

async fn grade_quiz(state: &AppState, submission: &Submission) -> Result<GrowthReport> {
    let body = submission
        .body_text
        .as_deref()
        .and_then(QuizSubmissionBody::parse)
        .context("Quiz body could not be parsed")?;

    let plan = QuizPlan::new(&body);
    let evaluations = if plan.short_answers_to_evaluate().is_empty() {
        Vec::new()
    } else {
        state
            .ai()
            .grade_short_answers(plan.short_answers_to_evaluate())
            .await
            .context("Short-answer evaluation failed")?
    };
    let grade = plan.finish(evaluations);

    let id = Uuid::new_v4().to_string();
    repositories::reports::insert_once(
        state.db(),
        repositories::reports::CreateReport {
            id: &id,
            submission_id: &submission.id,
            score: grade.score,
            competency_level: grade.competency_level,
            rubric_breakdown: &grade.rubric_breakdown,
            evaluation_details: Some(&grade.evaluation_details),
            now: now_primitive(),
        },
    )
    .await
    .context("Failed to store quiz report")
}

async fn grade_long_form(
    state: &AppState,
    submission: &Submission,
    assignment: &Assignment,
) -> Result<GrowthReport> {
    let rubric = repositories::rubrics::for_assignment(state.db(), assignment)
        .await
        .context("Failed to load rubric")?;
    let criteria = criteria_for(rubric);

    let prompt = assignment.prompt.as_deref().unwrap_or(&assignment.title);
    let body = submission.body_text.as_deref().or(submission.file_ref.as_deref()).unwrap_or_default();

    let outcome = state
        .ai()
        .grade_submission(prompt, body, &criteria)
        .await
        .context("AI grading failed")?;

    let id = Uuid::new_v4().to_string();
    repositories::reports::insert_once(
        state.db(),
        repositories::reports::CreateReport {
            id: &id,
            submission_id: &submission.id,
            score: outcome.score,
            competency_level: outcome.competency_level,
            rubric_breakdown: &outcome.rubric_breakdown,
            evaluation_details: None,
            now: now_primitive(),
        },
    )
    .await
    .context("Failed to store report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::types::Json;

    use crate::db::types::{AssignmentType, CompetencyLevel, GradingStatus};
    use crate::services::ai::AiError;
    use crate::test_support::{self, StubBackend};

    #[test]
    fn empty_rubric_uses_default_criteria() {
        let rubric = Rubric { id: "r".into(), name: "Empty".into(), criteria: Json(Vec::new()) };
        let names: Vec<_> = criteria_for(Some(rubric)).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Clarity", "Depth", "Relevance"]);
        assert_eq!(criteria_for(None).len(), 3);
    }

    #[tokio::test]
    #[ignore = "requires postgres and redis"]
    async fn quiz_submission_is_graded_without_ai() {
        let stub = StubBackend::with_responses(Vec::new());
        let ctx = test_support::setup_test_context_with_ai(stub.clone()).await;
        let user = test_support::insert_user(ctx.state.db(), "quiz@example.com").await;
        let assignment = test_support::insert_assignment(ctx.state.db(), &user.id, AssignmentType::InstantMcq).await;

        let body = json!({
            "type": "instant_mcq_quiz",
            "quiz_items": [
                {"id": "q1", "question": "2+2?", "options": ["3", "4"], "correct_index": 1},
                {"id": "q2", "question": "3+3?", "options": ["6", "7"], "correct_index": 0}
            ],
            "mcq_answers": [{"item_id": "q1", "selected_index": 1}, {"item_id": "q2", "selected_index": 1}]
        })
        .to_string();
        let submission = test_support::insert_submitted(ctx.state.db(), &assignment.id, &user.id, &body).await;

        assert!(claim(&ctx.state, &submission.id).await.expect("claim"));
        assert!(!claim(&ctx.state, &submission.id).await.expect("second claim"));

        let report = run_claimed(&ctx.state, &submission.id).await.expect("report");
        assert_eq!(report.score, 50.0);
        assert_eq!(report.competency_level, CompetencyLevel::Novice);
        assert_eq!(report.rubric_breakdown.0.len(), 1);
        assert_eq!(report.rubric_breakdown.0[0].criterion_id, "q1");
        assert_eq!(report.rubric_breakdown.0[0].criterion_name.as_deref(), Some("3+3?"));
        assert!(stub.requests().is_empty());

        let stored = repositories::submissions::find_by_id(ctx.state.db(), &submission.id)
            .await
            .expect("query")
            .expect("submission");
        assert_eq!(stored.grading_status, GradingStatus::Graded);
    }

    #[tokio::test]
    #[ignore = "requires postgres and redis"]
    async fn ai_failure_marks_submission_failed() {
        let stub = StubBackend::with_responses(vec![Err(AiError::Upstream {
            status: 500,
            body: "boom".into(),
        })]);
        let ctx = test_support::setup_test_context_with_ai(stub).await;
        let user = test_support::insert_user(ctx.state.db(), "essay@example.com").await;
        let assignment = test_support::insert_assignment(ctx.state.db(), &user.id, AssignmentType::LongForm).await;
        let submission =
            test_support::insert_submitted(ctx.state.db(), &assignment.id, &user.id, "My essay").await;

        assert!(claim(&ctx.state, &submission.id).await.expect("claim"));
        assert!(run_claimed(&ctx.state, &submission.id).await.is_err());

        let stored = repositories::submissions::find_by_id(ctx.state.db(), &submission.id)
            .await
            .expect("query")
            .expect("submission");
        assert_eq!(stored.grading_status, GradingStatus::Failed);
        assert!(stored.grading_error.unwrap_or_default().contains("AI grading failed"));
    }
}
