mod commands;
mod queries;
mod types;

pub(crate) use commands::{
    claim_for_grading, claim_next_for_grading, create_draft, mark_failed, mark_graded, submit,
    update_draft,
};
pub(crate) use queries::{find_by_id, find_owned, latest_draft, list_for_assignment};
pub(crate) use types::{CreateDraft, SubmissionContent, SubmissionSummary};
