use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::assignments::fetch_owned;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{JsonBody, OptionalJsonBody};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::AssignmentStatus;
use crate::repositories;
use crate::repositories::submissions::{CreateDraft, SubmissionContent};
use crate::schemas::submission::{
    SubmissionContentRequest, SubmissionListResponse, SubmissionResponse, SubmitResponse,
};

/// Routes nested below `/assignments`.
pub(crate) fn assignment_router() -> Router<AppState> {
    Router::new()
        .route("/:assignment_id/submissions", get(list_submissions).post(save_draft))
        .route("/:assignment_id/submissions/draft", get(get_draft))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:submission_id/submit", post(submit))
}

async fn list_submissions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assignment_id): Path<String>,
) -> Result<Json<SubmissionListResponse>, ApiError> {
    fetch_owned(&state, &assignment_id, &user.id).await?;

    let summaries =
        repositories::submissions::list_for_assignment(state.db(), &assignment_id, &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(SubmissionListResponse { items: summaries.into_iter().map(Into::into).collect() }))
}

async fn save_draft(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assignment_id): Path<String>,
    JsonBody(payload): JsonBody<SubmissionContentRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let assignment = fetch_owned(&state, &assignment_id, &user.id).await?;
    let now = primitive_now_utc();
    let content = SubmissionContent {
        body_text: payload.body_text.as_deref(),
        file_ref: payload.file_ref.as_deref(),
    };

    let existing = repositories::submissions::latest_draft(state.db(), &assignment.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch draft"))?;

    let updated = match existing {
        Some(draft) => repositories::submissions::update_draft(state.db(), &draft.id, content, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update draft"))?,
        None => None,
    };

    let (status, submission) = match updated {
        Some(submission) => (StatusCode::OK, submission),
        None => {
            let submission = repositories::submissions::create_draft(
                state.db(),
                CreateDraft {
                    id: &Uuid::new_v4().to_string(),
                    assignment_id: &assignment.id,
                    user_id: &user.id,
                    body_text: content.body_text,
                    file_ref: content.file_ref,
                    now,
                },
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to create draft"))?;
            (StatusCode::CREATED, submission)
        }
    };

    if assignment.status == AssignmentStatus::Draft {
        repositories::assignments::mark_in_progress(state.db(), &assignment.id, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update assignment status"))?;
    }

    Ok((status, Json(SubmissionResponse::from_db(submission))))
}

async fn get_draft(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assignment_id): Path<String>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    fetch_owned(&state, &assignment_id, &user.id).await?;

    let draft = repositories::submissions::latest_draft(state.db(), &assignment_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch draft"))?
        .ok_or_else(|| ApiError::NotFound("No draft found".to_string()))?;

    Ok(Json(SubmissionResponse::from_db(draft)))
}

async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(submission_id): Path<String>,
    OptionalJsonBody(payload): OptionalJsonBody<SubmissionContentRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let existing = repositories::submissions::find_owned(state.db(), &submission_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    let payload = payload.unwrap_or_default();
    let now = primitive_now_utc();

    let submission = repositories::submissions::submit(
        state.db(),
        &existing.id,
        &user.id,
        SubmissionContent {
            body_text: payload.body_text.as_deref(),
            file_ref: payload.file_ref.as_deref(),
        },
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to submit"))?
    .ok_or_else(|| {
        ApiError::BadRequest("Submission was already submitted and is not awaiting resubmission".to_string())
    })?;

    repositories::assignments::mark_submitted(state.db(), &submission.assignment_id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update assignment status"))?;

    tracing::info!(user_id = %user.id, submission_id = %submission.id, "Submission queued for grading");
    Ok(Json(SubmitResponse {
        id: submission.id,
        state: submission.state,
        grading_status: submission.grading_status,
        submitted_at: submission.submitted_at,
    }))
}
