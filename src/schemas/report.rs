use serde::Serialize;
use serde_json::Value;
use time::PrimitiveDateTime;

use crate::core::time::rfc3339;
use crate::db::models::{GrowthReport, RubricBreakdownEntry};
use crate::db::types::CompetencyLevel;

#[derive(Debug, Serialize)]
pub(crate) struct ReportResponse {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) score: f64,
    pub(crate) competency_level: CompetencyLevel,
    pub(crate) rubric_breakdown: Vec<RubricBreakdownEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) evaluation_details: Option<Value>,
    #[serde(serialize_with = "rfc3339::serialize")]
    pub(crate) created_at: PrimitiveDateTime,
}

impl ReportResponse {
    pub(crate) fn from_db(report: GrowthReport) -> Self {
        Self {
            id: report.id,
            submission_id: report.submission_id,
            score: report.score,
            competency_level: report.competency_level,
            rubric_breakdown: report.rubric_breakdown.0,
            evaluation_details: report.evaluation_details.map(|details| details.0),
            created_at: report.created_at,
        }
    }
}

/// Body of the 202 answer while another caller is grading.
#[derive(Debug, Serialize)]
pub(crate) struct GradingPendingResponse {
    pub(crate) status: &'static str,
    pub(crate) submission_id: String,
}
