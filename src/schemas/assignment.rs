use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::PrimitiveDateTime;

use crate::core::time::rfc3339;
use crate::db::models::{Assignment, Rubric, RubricCriterion};
use crate::db::types::{AssignmentStatus, AssignmentType};
use crate::services::quiz::{QuizItem, ShortAnswerEvaluation};

#[derive(Debug, Deserialize)]
pub(crate) struct AssignmentCreate {
    #[serde(default)]
    pub(crate) topic: String,
    #[serde(default, alias = "resourceIds")]
    pub(crate) resource_ids: Vec<String>,
    #[serde(default)]
    pub(crate) format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignmentListQuery {
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default, alias = "offset")]
    pub(crate) skip: Option<i64>,
    #[serde(default)]
    pub(crate) limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResponse {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) kind: AssignmentType,
    pub(crate) title: String,
    pub(crate) prompt: Option<String>,
    pub(crate) topic: Option<String>,
    pub(crate) format: Option<String>,
    pub(crate) resource_ids: Vec<String>,
    pub(crate) rubric_id: Option<String>,
    pub(crate) status: AssignmentStatus,
    #[serde(serialize_with = "rfc3339::serialize")]
    pub(crate) created_at: PrimitiveDateTime,
    #[serde(serialize_with = "rfc3339::serialize")]
    pub(crate) updated_at: PrimitiveDateTime,
}

impl AssignmentResponse {
    pub(crate) fn from_db(assignment: Assignment) -> Self {
        Self {
            id: assignment.id,
            kind: assignment.kind,
            title: assignment.title,
            prompt: assignment.prompt,
            topic: assignment.topic,
            format: assignment.format,
            resource_ids: assignment.resource_ids,
            rubric_id: assignment.rubric_id,
            status: assignment.status,
            created_at: assignment.created_at,
            updated_at: assignment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizItemsResponse {
    pub(crate) items: Vec<QuizItem>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RubricView {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) criteria: Vec<RubricCriterion>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RubricResponse {
    pub(crate) rubric: Option<RubricView>,
}

impl RubricResponse {
    pub(crate) fn from_db(rubric: Option<Rubric>) -> Self {
        Self {
            rubric: rubric.map(|rubric| RubricView {
                id: rubric.id,
                name: rubric.name,
                criteria: rubric.criteria.0,
            }),
        }
    }
}

/// Items are kept loosely typed so malformed entries can be dropped one by one.
#[derive(Debug, Deserialize)]
pub(crate) struct EvaluateShortAnswersRequest {
    #[serde(default, alias = "shortAnswers")]
    pub(crate) short_answers: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EvaluateShortAnswersResponse {
    pub(crate) evaluations: Vec<ShortAnswerEvaluation>,
}
