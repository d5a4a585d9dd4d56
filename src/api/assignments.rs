use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::{Page, PaginatedResponse};
use crate::api::submissions;
use crate::api::validation::{prompt_input, require_text, JsonBody};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Assignment, Resource};
use crate::db::types::{AssignmentFormat, AssignmentStatus, AssignmentType};
use crate::repositories;
use crate::schemas::assignment::{
    AssignmentCreate, AssignmentListQuery, AssignmentResponse, EvaluateShortAnswersRequest,
    EvaluateShortAnswersResponse, QuizItemsResponse, RubricResponse,
};
use crate::services::ai::QuizMix;
use crate::services::quiz::ShortAnswerPrompt;
use crate::services::text::non_blank;

const QUIZ_INPUT_FALLBACK: &str = "General knowledge quiz";
const QUIZ_INPUT_CHARS: usize = 8_000;
const MAX_SHORT_ANSWERS: usize = 15;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assignments).post(create_assignment))
        .route("/:assignment_id", get(get_assignment))
        .route("/:assignment_id/quiz", post(generate_quiz))
        .route("/:assignment_id/rubric", get(get_rubric))
        .route("/:assignment_id/evaluate-short-answers", post(evaluate_short_answers))
        .merge(submissions::assignment_router())
}

/// Input for [`create_for_topic`], shared by the follow-up and architect flows.
pub(crate) struct NewAssignment<'a> {
    pub(crate) topic: &'a str,
    pub(crate) resource_ids: &'a [String],
    pub(crate) format: Option<AssignmentFormat>,
}

/// Asks the AI for an assignment on `topic`, grounded in the user's own resources.
pub(crate) async fn create_for_topic(
    state: &AppState,
    user_id: &str,
    params: NewAssignment<'_>,
) -> Result<Assignment, ApiError> {
    let resources =
        repositories::resources::find_owned_many(state.db(), user_id, params.resource_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load resources"))?;
    let context = resource_context(&resources);

    let draft = state
        .ai()
        .create_assignment(params.topic, Some(&context), params.format)
        .await
        .map_err(|e| ApiError::ai(e, "Assignment generation failed"))?;

    let resource_ids: Vec<String> = resources.into_iter().map(|resource| resource.id).collect();
    let assignment = repositories::assignments::create(
        state.db(),
        repositories::assignments::CreateAssignment {
            id: &Uuid::new_v4().to_string(),
            user_id,
            kind: draft.kind,
            title: &draft.title,
            prompt: &draft.prompt,
            topic: params.topic,
            format: params.format.map(AssignmentFormat::as_str),
            resource_ids: &resource_ids,
            rubric_id: draft.kind.default_rubric_id(),
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create assignment"))?;

    tracing::info!(user_id, assignment_id = %assignment.id, kind = ?assignment.kind, "Assignment created");
    Ok(assignment)
}

pub(crate) async fn fetch_owned(
    state: &AppState,
    assignment_id: &str,
    user_id: &str,
) -> Result<Assignment, ApiError> {
    repositories::assignments::find_owned(state.db(), assignment_id, user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))
}

fn resource_context(resources: &[Resource]) -> String {
    resources
        .iter()
        .map(|resource| {
            let title = resource.title.as_deref().unwrap_or("Untitled");
            if resource.extracted_topics.is_empty() {
                format!("- {title}")
            } else {
                format!("- {title} (topics: {})", resource.extracted_topics.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn quiz_input(assignment: &Assignment) -> String {
    let parts: Vec<&str> = [
        Some(assignment.title.as_str()),
        assignment.prompt.as_deref(),
        assignment.topic.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect();

    if parts.is_empty() {
        QUIZ_INPUT_FALLBACK.to_string()
    } else {
        parts.join(". ")
    }
}

async fn list_assignments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AssignmentListQuery>,
) -> Result<Json<PaginatedResponse<AssignmentResponse>>, ApiError> {
    let status = match non_blank(query.status.as_deref()) {
        Some(value) => Some(AssignmentStatus::parse(&value).ok_or_else(|| {
            ApiError::BadRequest(format!("Unknown assignment status '{value}'"))
        })?),
        None => None,
    };
    let page = Page::new(query.skip, query.limit);

    let assignments = repositories::assignments::list_for_user(
        state.db(),
        &user.id,
        status,
        page.skip,
        page.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;
    let total = repositories::assignments::count_for_user(state.db(), &user.id, status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count assignments"))?;

    let items = assignments.into_iter().map(AssignmentResponse::from_db).collect();
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

async fn create_assignment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<AssignmentCreate>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    let topic = require_text(Some(&payload.topic), "topic")?;
    let format = payload.format.as_deref().and_then(AssignmentFormat::parse);

    let assignment = create_for_topic(
        &state,
        &user.id,
        NewAssignment { topic: &topic, resource_ids: &payload.resource_ids, format },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(AssignmentResponse::from_db(assignment))))
}

async fn get_assignment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assignment_id): Path<String>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let assignment = fetch_owned(&state, &assignment_id, &user.id).await?;
    Ok(Json(AssignmentResponse::from_db(assignment)))
}

async fn generate_quiz(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assignment_id): Path<String>,
) -> Result<Json<QuizItemsResponse>, ApiError> {
    let assignment = fetch_owned(&state, &assignment_id, &user.id).await?;
    if assignment.kind != AssignmentType::InstantMcq {
        return Err(ApiError::BadRequest("Quizzes are only available for instant_mcq assignments".to_string()));
    }

    let input = prompt_input(&quiz_input(&assignment), QUIZ_INPUT_CHARS)?;
    let mix = QuizMix::for_format(assignment.format.as_deref().and_then(AssignmentFormat::parse));

    let items = state
        .ai()
        .generate_quiz_items(&input, mix)
        .await
        .map_err(|e| ApiError::ai(e, "Quiz generation failed"))?;

    Ok(Json(QuizItemsResponse { items }))
}

async fn get_rubric(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assignment_id): Path<String>,
) -> Result<Json<RubricResponse>, ApiError> {
    let assignment = fetch_owned(&state, &assignment_id, &user.id).await?;
    let rubric = repositories::rubrics::for_assignment(state.db(), &assignment)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch rubric"))?;

    Ok(Json(RubricResponse::from_db(rubric)))
}

async fn evaluate_short_answers(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assignment_id): Path<String>,
    JsonBody(payload): JsonBody<EvaluateShortAnswersRequest>,
) -> Result<Json<EvaluateShortAnswersResponse>, ApiError> {
    fetch_owned(&state, &assignment_id, &user.id).await?;

    let answers = valid_short_answers(payload.short_answers);
    if answers.is_empty() {
        return Err(ApiError::BadRequest("short_answers must contain at least one answer".to_string()));
    }

    let evaluations = state
        .ai()
        .grade_short_answers(&answers)
        .await
        .map_err(|e| ApiError::ai(e, "Short-answer evaluation failed"))?;

    Ok(Json(EvaluateShortAnswersResponse { evaluations }))
}

fn valid_short_answers(raw: Vec<serde_json::Value>) -> Vec<ShortAnswerPrompt> {
    raw.into_iter()
        .filter_map(|value| serde_json::from_value::<ShortAnswerPrompt>(value).ok())
        .filter(|answer| !answer.question.trim().is_empty() && !answer.user_answer.trim().is_empty())
        .take(MAX_SHORT_ANSWERS)
        .collect()
}
