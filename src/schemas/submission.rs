use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::core::time::rfc3339;
use crate::db::models::Submission;
use crate::db::types::{GradingStatus, SubmissionState};
use crate::repositories::submissions::SubmissionSummary;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubmissionContentRequest {
    #[serde(default, alias = "bodyText")]
    pub(crate) body_text: Option<String>,
    #[serde(default, alias = "fileRef")]
    pub(crate) file_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) state: SubmissionState,
    pub(crate) grading_status: GradingStatus,
    pub(crate) body_text: Option<String>,
    pub(crate) file_ref: Option<String>,
    #[serde(serialize_with = "rfc3339::option::serialize")]
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    #[serde(serialize_with = "rfc3339::serialize")]
    pub(crate) created_at: PrimitiveDateTime,
    #[serde(serialize_with = "rfc3339::serialize")]
    pub(crate) updated_at: PrimitiveDateTime,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            assignment_id: submission.assignment_id,
            state: submission.state,
            grading_status: submission.grading_status,
            body_text: submission.body_text,
            file_ref: submission.file_ref,
            submitted_at: submission.submitted_at,
            created_at: submission.created_at,
            updated_at: submission.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionSummaryResponse {
    pub(crate) id: String,
    pub(crate) state: SubmissionState,
    pub(crate) grading_status: GradingStatus,
    #[serde(serialize_with = "rfc3339::option::serialize")]
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    #[serde(serialize_with = "rfc3339::serialize")]
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) has_report: bool,
}

impl From<SubmissionSummary> for SubmissionSummaryResponse {
    fn from(summary: SubmissionSummary) -> Self {
        Self {
            id: summary.id,
            state: summary.state,
            grading_status: summary.grading_status,
            submitted_at: summary.submitted_at,
            created_at: summary.created_at,
            has_report: summary.has_report,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionListResponse {
    pub(crate) items: Vec<SubmissionSummaryResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) id: String,
    pub(crate) state: SubmissionState,
    pub(crate) grading_status: GradingStatus,
    #[serde(serialize_with = "rfc3339::option::serialize")]
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
}
