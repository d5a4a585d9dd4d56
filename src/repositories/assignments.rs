use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Assignment;
use crate::db::types::{AssignmentStatus, AssignmentType};

const COLUMNS: &str = "\
    id, user_id, type, title, prompt, topic, format, resource_ids, rubric_id, \
    status, created_at, updated_at";

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    status: Option<AssignmentStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {COLUMNS} FROM assignments
         WHERE user_id = $1 AND ($2::assignmentstatus IS NULL OR status = $2)
         ORDER BY created_at DESC, id
         OFFSET $3 LIMIT $4",
    ))
    .bind(user_id)
    .bind(status)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_for_user(
    pool: &PgPool,
    user_id: &str,
    status: Option<AssignmentStatus>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM assignments
         WHERE user_id = $1 AND ($2::assignmentstatus IS NULL OR status = $2)",
    )
    .bind(user_id)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_owned(
    pool: &PgPool,
    id: &str,
    user_id: &str,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {COLUMNS} FROM assignments WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!("SELECT {COLUMNS} FROM assignments WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateAssignment<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) kind: AssignmentType,
    pub(crate) title: &'a str,
    pub(crate) prompt: &'a str,
    pub(crate) topic: &'a str,
    pub(crate) format: Option<&'a str>,
    pub(crate) resource_ids: &'a [String],
    pub(crate) rubric_id: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAssignment<'_>,
) -> Result<Assignment, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "INSERT INTO assignments (
            id, user_id, type, title, prompt, topic, format, resource_ids, rubric_id,
            status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.kind)
    .bind(params.title)
    .bind(params.prompt)
    .bind(params.topic)
    .bind(params.format)
    .bind(params.resource_ids)
    .bind(params.rubric_id)
    .bind(AssignmentStatus::Draft)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

/// Moves a `draft` assignment to `in_progress`; other states are left alone.
pub(crate) async fn mark_in_progress(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE assignments SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4")
        .bind(AssignmentStatus::InProgress)
        .bind(now)
        .bind(id)
        .bind(AssignmentStatus::Draft)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn mark_submitted(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE assignments SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(AssignmentStatus::Submitted)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
