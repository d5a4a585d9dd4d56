use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::api::assignments::{create_for_topic, NewAssignment};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::types::{GradingStatus, SubmissionState};
use crate::repositories;
use crate::schemas::assignment::AssignmentResponse;
use crate::schemas::report::{GradingPendingResponse, ReportResponse};
use crate::services::follow_up;
use crate::tasks::grading;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:report_key", get(get_report))
        .route("/:report_key/follow-up", post(create_follow_up))
}

/// Returns the report for a submission, grading it on the spot when nobody else is.
async fn get_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(submission_id): Path<String>,
) -> Result<Response, ApiError> {
    let submission = repositories::submissions::find_owned(state.db(), &submission_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .filter(|submission| submission.state == SubmissionState::Submitted)
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    let existing = repositories::reports::find_by_submission(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch report"))?;
    if let Some(report) = existing {
        return Ok(Json(ReportResponse::from_db(report)).into_response());
    }

    if submission.grading_status == GradingStatus::Failed {
        return Err(ApiError::ServiceUnavailable(
            "Grading failed; resubmit to retry".to_string(),
        ));
    }

    let claimed = grading::claim(&state, &submission.id)
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to claim submission"))?;
    if !claimed {
        let pending =
            GradingPendingResponse { status: "grading", submission_id: submission.id.clone() };
        return Ok((StatusCode::ACCEPTED, Json(pending)).into_response());
    }

    match grading::run_claimed(&state, &submission.id).await {
        Ok(report) => Ok(Json(ReportResponse::from_db(report)).into_response()),
        Err(_) => Err(ApiError::ServiceUnavailable(
            "Grading failed. Please resubmit to try again.".to_string(),
        )),
    }
}

async fn create_follow_up(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(report_id): Path<String>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    let owned = repositories::reports::find_owned(state.db(), &report_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch report"))?
        .ok_or_else(|| ApiError::NotFound("Report not found".to_string()))?;

    let weak_areas = follow_up::weak_areas(&owned.report.rubric_breakdown.0);
    let topic = follow_up::follow_up_topic(&weak_areas);

    let source = repositories::assignments::find_owned(state.db(), &owned.assignment_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?;
    let resource_ids = source.map(|assignment| assignment.resource_ids).unwrap_or_default();

    let assignment = create_for_topic(
        &state,
        &user.id,
        NewAssignment { topic: &topic, resource_ids: &resource_ids, format: None },
    )
    .await?;

    tracing::info!(
        user_id = %user.id,
        report_id = %report_id,
        weak_areas = weak_areas.len(),
        "Follow-up assignment created"
    );
    Ok((StatusCode::CREATED, Json(AssignmentResponse::from_db(assignment))))
}
