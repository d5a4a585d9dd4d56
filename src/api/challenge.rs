use axum::{extract::State, routing::post, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::ClientAddress;
use crate::api::validation::{prompt_input, JsonBody};
use crate::core::redis::RateLimit;
use crate::core::state::AppState;
use crate::schemas::challenge::{
    ChallengeGenerateRequest, ChallengeItemsResponse, ChallengeSubmitRequest,
    ChallengeSubmitResponse,
};
use crate::services::quiz::score_challenge;

const CHALLENGE_INPUT_CHARS: usize = 8_000;
const GENERATE_LIMIT: RateLimit =
    RateLimit { scope: "challenge-generate", limit: 10, window_seconds: 60 };
const SUBMIT_LIMIT: RateLimit =
    RateLimit { scope: "challenge-submit", limit: 30, window_seconds: 60 };

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/generate", post(generate)).route("/submit", post(submit))
}

async fn generate(
    State(state): State<AppState>,
    ClientAddress(client): ClientAddress,
    JsonBody(payload): JsonBody<ChallengeGenerateRequest>,
) -> Result<Json<ChallengeItemsResponse>, ApiError> {
    if !state.redis().allow(GENERATE_LIMIT, &client).await {
        return Err(ApiError::TooManyRequests("Too many challenges, try again later"));
    }

    let input = prompt_input(&payload.input, CHALLENGE_INPUT_CHARS)?;
    let items = state
        .ai()
        .generate_mcqs(&input)
        .await
        .map_err(|e| ApiError::ai(e, "Challenge generation failed"))?;

    Ok(Json(ChallengeItemsResponse { items }))
}

async fn submit(
    State(state): State<AppState>,
    ClientAddress(client): ClientAddress,
    JsonBody(payload): JsonBody<ChallengeSubmitRequest>,
) -> Result<Json<ChallengeSubmitResponse>, ApiError> {
    if !state.redis().allow(SUBMIT_LIMIT, &client).await {
        return Err(ApiError::TooManyRequests("Too many submissions, try again later"));
    }

    let answers = payload.answers.map(|answers| answers.into_map()).unwrap_or_default();
    if answers.is_empty() {
        return Err(ApiError::BadRequest("answers must not be empty".to_string()));
    }

    let result = score_challenge(&answers, payload.items.as_deref());
    Ok(Json(ChallengeSubmitResponse {
        score: result.score,
        correct: result.correct,
        total: result.total,
    }))
}
