use serde::{Deserialize, Serialize};

use crate::services::ai::ConversationTurn;

#[derive(Debug, Deserialize)]
pub(crate) struct ArchitectChatRequest {
    #[serde(default)]
    pub(crate) message: String,
    #[serde(default, alias = "userContextSummary")]
    pub(crate) user_context_summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ArchitectChatResponse {
    pub(crate) response: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArchitectGenerateRequest {
    #[serde(default)]
    pub(crate) conversation: Vec<ConversationTurn>,
}
