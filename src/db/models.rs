use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    AssignmentStatus, AssignmentType, CompetencyLevel, GradingStatus, ResourceType,
    SubmissionState,
};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) name: Option<String>,
    pub(crate) hashed_password: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Resource {
    pub(crate) id: String,
    pub(crate) user_id: String,
    #[sqlx(rename = "type")]
    pub(crate) kind: ResourceType,
    pub(crate) title: Option<String>,
    pub(crate) content_ref: String,
    pub(crate) thumbnail_ref: Option<String>,
    pub(crate) extracted_topics: Vec<String>,
    pub(crate) notes: Option<String>,
    pub(crate) learning_category: Option<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RubricCriterion {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Rubric {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) criteria: Json<Vec<RubricCriterion>>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Assignment {
    pub(crate) id: String,
    pub(crate) user_id: String,
    #[sqlx(rename = "type")]
    pub(crate) kind: AssignmentType,
    pub(crate) title: String,
    pub(crate) prompt: Option<String>,
    pub(crate) topic: Option<String>,
    pub(crate) format: Option<String>,
    pub(crate) resource_ids: Vec<String>,
    pub(crate) rubric_id: Option<String>,
    pub(crate) status: AssignmentStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) user_id: String,
    pub(crate) state: SubmissionState,
    pub(crate) grading_status: GradingStatus,
    pub(crate) body_text: Option<String>,
    pub(crate) file_ref: Option<String>,
    pub(crate) grading_started_at: Option<PrimitiveDateTime>,
    pub(crate) grading_error: Option<String>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// One row of a growth report's rubric breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RubricBreakdownEntry {
    #[serde(alias = "criterionId")]
    pub(crate) criterion_id: String,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub(crate) criterion_name: Option<String>,
    #[serde(alias = "scoreOrFeedback")]
    pub(crate) score_or_feedback: String,
    #[serde(alias = "performanceNote")]
    pub(crate) performance_note: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct GrowthReport {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) score: f64,
    pub(crate) competency_level: CompetencyLevel,
    pub(crate) rubric_breakdown: Json<Vec<RubricBreakdownEntry>>,
    pub(crate) evaluation_details: Option<Json<serde_json::Value>>,
    pub(crate) created_at: PrimitiveDateTime,
}
