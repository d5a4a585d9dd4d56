use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

use crate::api::assignments::{create_for_topic, NewAssignment};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{require_text, JsonBody};
use crate::core::state::AppState;
use crate::db::models::Resource;
use crate::repositories;
use crate::schemas::architect::{ArchitectChatRequest, ArchitectChatResponse, ArchitectGenerateRequest};
use crate::schemas::assignment::AssignmentResponse;
use crate::services::ai::ConversationTurn;
use crate::services::text::non_blank;

const CONTEXT_RESOURCES: i64 = 10;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat)).route("/generate", post(generate))
}

async fn chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<ArchitectChatRequest>,
) -> Result<Json<ArchitectChatResponse>, ApiError> {
    let message = require_text(Some(&payload.message), "message")?;

    let summary = match non_blank(payload.user_context_summary.as_deref()) {
        Some(summary) => summary,
        None => {
            let recent =
                repositories::resources::recent_for_user(state.db(), &user.id, CONTEXT_RESOURCES)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to load resources"))?;
            context_summary(&recent)
        }
    };

    let response = state
        .ai()
        .architect_suggestion(&summary, &message)
        .await
        .map_err(|e| ApiError::ai(e, "Learning coach is unavailable"))?;

    Ok(Json(ArchitectChatResponse { response }))
}

async fn generate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<ArchitectGenerateRequest>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    let conversation = clean_conversation(payload.conversation);
    if !conversation.iter().any(|turn| turn.role == "user") {
        return Err(ApiError::BadRequest(
            "conversation must contain at least one user message".to_string(),
        ));
    }

    let topic = state
        .ai()
        .conversation_topic(&conversation)
        .await
        .map_err(|e| ApiError::ai(e, "Could not summarise the conversation"))?;

    let assignment = create_for_topic(
        &state,
        &user.id,
        NewAssignment { topic: &topic, resource_ids: &[], format: None },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(AssignmentResponse::from_db(assignment))))
}

/// Titles and topics of the learner's latest resources, one line each.
fn context_summary(resources: &[Resource]) -> String {
    resources
        .iter()
        .map(|resource| {
            let title = resource.title.as_deref().unwrap_or("Untitled");
            format!("{title}: {}", resource.extracted_topics.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn clean_conversation(turns: Vec<ConversationTurn>) -> Vec<ConversationTurn> {
    turns
        .into_iter()
        .filter_map(|turn| {
            let role = turn.role.trim().to_ascii_lowercase();
            let content = turn.content.trim().to_string();
            (matches!(role.as_str(), "user" | "assistant") && !content.is_empty())
                .then_some(ConversationTurn { role, content })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_is_normalised() {
        let turns = vec![
            ConversationTurn { role: " User ".into(), content: " hi ".into() },
            ConversationTurn { role: "system".into(), content: "ignored".into() },
            ConversationTurn { role: "assistant".into(), content: "   ".into() },
        ];
        let cleaned = clean_conversation(turns);
        assert_eq!(cleaned, vec![ConversationTurn { role: "user".into(), content: "hi".into() }]);
    }
}
