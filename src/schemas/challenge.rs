use serde::{Deserialize, Serialize};

use crate::services::quiz::{ChallengeAnswers, QuizItem};

#[derive(Debug, Deserialize)]
pub(crate) struct ChallengeGenerateRequest {
    #[serde(default)]
    pub(crate) input: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChallengeItemsResponse {
    pub(crate) items: Vec<QuizItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChallengeSubmitRequest {
    #[serde(default)]
    pub(crate) answers: Option<ChallengeAnswers>,
    #[serde(default)]
    pub(crate) items: Option<Vec<QuizItem>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChallengeSubmitResponse {
    pub(crate) score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct: Option<usize>,
    pub(crate) total: usize,
}
