use sqlx::PgPool;

use crate::db::models::Submission;
use crate::db::types::SubmissionState;

use super::types::{SubmissionSummary, COLUMNS};

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_owned(
    pool: &PgPool,
    id: &str,
    user_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn latest_draft(
    pool: &PgPool,
    assignment_id: &str,
    user_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE assignment_id = $1 AND user_id = $2 AND state = $3
         ORDER BY updated_at DESC
         LIMIT 1",
    ))
    .bind(assignment_id)
    .bind(user_id)
    .bind(SubmissionState::Draft)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_for_assignment(
    pool: &PgPool,
    assignment_id: &str,
    user_id: &str,
) -> Result<Vec<SubmissionSummary>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionSummary>(
        "SELECT s.id, s.state, s.grading_status, s.submitted_at, s.created_at,
                (r.id IS NOT NULL) AS has_report
         FROM submissions s
         LEFT JOIN growth_reports r ON r.submission_id = s.id
         WHERE s.assignment_id = $1 AND s.user_id = $2
         ORDER BY s.created_at DESC",
    )
    .bind(assignment_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}
