use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Submission;
use crate::db::types::{GradingStatus, SubmissionState};

use super::types::{CreateDraft, SubmissionContent, COLUMNS};

pub(crate) async fn create_draft(
    pool: &PgPool,
    params: CreateDraft<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, assignment_id, user_id, state, grading_status, body_text, file_ref,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.assignment_id)
    .bind(params.user_id)
    .bind(SubmissionState::Draft)
    .bind(GradingStatus::Pending)
    .bind(params.body_text)
    .bind(params.file_ref)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update_draft(
    pool: &PgPool,
    id: &str,
    content: SubmissionContent<'_>,
    now: PrimitiveDateTime,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions SET
            body_text = COALESCE($1, body_text),
            file_ref = COALESCE($2, file_ref),
            updated_at = $3
         WHERE id = $4 AND state = $5
         RETURNING {COLUMNS}",
    ))
    .bind(content.body_text)
    .bind(content.file_ref)
    .bind(now)
    .bind(id)
    .bind(SubmissionState::Draft)
    .fetch_optional(pool)
    .await
}

/// Moves a draft (or a submission whose grading failed) into the grading queue.
/// Returns `None` when the row is missing, foreign, or already submitted.
pub(crate) async fn submit(
    pool: &PgPool,
    id: &str,
    user_id: &str,
    content: SubmissionContent<'_>,
    now: PrimitiveDateTime,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions SET
            state = $1,
            grading_status = $2,
            body_text = COALESCE($3, body_text),
            file_ref = COALESCE($4, file_ref),
            grading_started_at = NULL,
            grading_error = NULL,
            submitted_at = $5,
            updated_at = $5
         WHERE id = $6 AND user_id = $7
           AND (state = $8 OR (state = $1 AND grading_status = $9))
         RETURNING {COLUMNS}",
    ))
    .bind(SubmissionState::Submitted)
    .bind(GradingStatus::Pending)
    .bind(content.body_text)
    .bind(content.file_ref)
    .bind(now)
    .bind(id)
    .bind(user_id)
    .bind(SubmissionState::Draft)
    .bind(GradingStatus::Failed)
    .fetch_optional(pool)
    .await
}

/// Atomically takes ownership of one submission for grading. A `grading` row whose
/// claim started before `stale_before` is considered abandoned and can be re-claimed.
pub(crate) async fn claim_for_grading(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
    stale_before: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let claimed = sqlx::query_scalar::<_, String>(
        "UPDATE submissions SET
            grading_status = $1,
            grading_started_at = $2,
            grading_error = NULL,
            updated_at = $2
         WHERE id = $3 AND state = $4
           AND (grading_status = $5
                OR (grading_status = $1
                    AND (grading_started_at IS NULL OR grading_started_at < $6)))
         RETURNING id",
    )
    .bind(GradingStatus::Grading)
    .bind(now)
    .bind(id)
    .bind(SubmissionState::Submitted)
    .bind(GradingStatus::Pending)
    .bind(stale_before)
    .fetch_optional(pool)
    .await?;

    Ok(claimed.is_some())
}

/// Claims the oldest queued submission for the background worker.
pub(crate) async fn claim_next_for_grading(
    pool: &PgPool,
    now: PrimitiveDateTime,
    stale_before: PrimitiveDateTime,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "WITH candidate AS (
            SELECT id
            FROM submissions
            WHERE state = $4
              AND (grading_status = $5
                   OR (grading_status = $1
                       AND (grading_started_at IS NULL OR grading_started_at < $3)))
            ORDER BY submitted_at NULLS LAST, created_at
            FOR UPDATE SKIP LOCKED
            LIMIT 1
        )
        UPDATE submissions
        SET grading_status = $1,
            grading_started_at = $2,
            grading_error = NULL,
            updated_at = $2
        FROM candidate
        WHERE submissions.id = candidate.id
        RETURNING submissions.id",
    )
    .bind(GradingStatus::Grading)
    .bind(now)
    .bind(stale_before)
    .bind(SubmissionState::Submitted)
    .bind(GradingStatus::Pending)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn mark_graded(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE submissions SET grading_status = $1, grading_error = NULL, updated_at = $2
         WHERE id = $3",
    )
    .bind(GradingStatus::Graded)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn mark_failed(
    pool: &PgPool,
    id: &str,
    error: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE submissions SET grading_status = $1, grading_error = $2, updated_at = $3
         WHERE id = $4 AND grading_status <> $5",
    )
    .bind(GradingStatus::Failed)
    .bind(error)
    .bind(now)
    .bind(id)
    .bind(GradingStatus::Graded)
    .execute(pool)
    .await?;
    Ok(())
}
