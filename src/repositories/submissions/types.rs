use time::PrimitiveDateTime;

use crate::db::types::{GradingStatus, SubmissionState};

pub(crate) const COLUMNS: &str = "\
    id, assignment_id, user_id, state, grading_status, body_text, file_ref, \
    grading_started_at, grading_error, submitted_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SubmissionSummary {
    pub(crate) id: String,
    pub(crate) state: SubmissionState,
    pub(crate) grading_status: GradingStatus,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) has_report: bool,
}

pub(crate) struct CreateDraft<'a> {
    pub(crate) id: &'a str,
    pub(crate) assignment_id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) body_text: Option<&'a str>,
    pub(crate) file_ref: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

/// Content applied together with a state transition; `None` keeps the stored value.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SubmissionContent<'a> {
    pub(crate) body_text: Option<&'a str>,
    pub(crate) file_ref: Option<&'a str>,
}
