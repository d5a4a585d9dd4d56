use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Resource;
use crate::db::types::ResourceType;

const COLUMNS: &str = "\
    id, user_id, type, title, content_ref, thumbnail_ref, extracted_topics, \
    notes, learning_category, tags, created_at, updated_at";

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Resource>, sqlx::Error> {
    sqlx::query_as::<_, Resource>(&format!(
        "SELECT {COLUMNS} FROM resources
         WHERE user_id = $1
         ORDER BY created_at DESC, id
         OFFSET $2 LIMIT $3",
    ))
    .bind(user_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_for_user(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM resources WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn find_owned(
    pool: &PgPool,
    id: &str,
    user_id: &str,
) -> Result<Option<Resource>, sqlx::Error> {
    sqlx::query_as::<_, Resource>(&format!(
        "SELECT {COLUMNS} FROM resources WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Resolves the subset of `ids` owned by `user_id`, in creation order.
pub(crate) async fn find_owned_many(
    pool: &PgPool,
    user_id: &str,
    ids: &[String],
) -> Result<Vec<Resource>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Resource>(&format!(
        "SELECT {COLUMNS} FROM resources
         WHERE user_id = $1 AND id = ANY($2)
         ORDER BY created_at",
    ))
    .bind(user_id)
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn recent_for_user(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<Resource>, sqlx::Error> {
    list_for_user(pool, user_id, 0, limit).await
}

pub(crate) struct CreateResource<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) kind: ResourceType,
    pub(crate) title: Option<&'a str>,
    pub(crate) content_ref: &'a str,
    pub(crate) thumbnail_ref: Option<&'a str>,
    pub(crate) extracted_topics: &'a [String],
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateResource<'_>,
) -> Result<Resource, sqlx::Error> {
    sqlx::query_as::<_, Resource>(&format!(
        "INSERT INTO resources (
            id, user_id, type, title, content_ref, thumbnail_ref, extracted_topics,
            tags, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, '{{}}', $8, $8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.kind)
    .bind(params.title)
    .bind(params.content_ref)
    .bind(params.thumbnail_ref)
    .bind(params.extracted_topics)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

/// Field-level patch. The outer `Option` says whether the field is touched; for text
/// fields the inner `None` clears the column.
#[derive(Debug, Default)]
pub(crate) struct UpdateResource {
    pub(crate) title: Option<Option<String>>,
    pub(crate) notes: Option<Option<String>>,
    pub(crate) learning_category: Option<Option<String>>,
    pub(crate) tags: Option<Vec<String>>,
}

impl UpdateResource {
    pub(crate) fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.notes.is_none()
            && self.learning_category.is_none()
            && self.tags.is_none()
    }
}

pub(crate) async fn update_owned(
    pool: &PgPool,
    id: &str,
    user_id: &str,
    params: UpdateResource,
    now: PrimitiveDateTime,
) -> Result<Option<Resource>, sqlx::Error> {
    sqlx::query_as::<_, Resource>(&format!(
        "UPDATE resources SET
            title = CASE WHEN $1 THEN $2 ELSE title END,
            notes = CASE WHEN $3 THEN $4 ELSE notes END,
            learning_category = CASE WHEN $5 THEN $6 ELSE learning_category END,
            tags = CASE WHEN $7 THEN $8 ELSE tags END,
            updated_at = $9
         WHERE id = $10 AND user_id = $11
         RETURNING {COLUMNS}",
    ))
    .bind(params.title.is_some())
    .bind(params.title.flatten())
    .bind(params.notes.is_some())
    .bind(params.notes.flatten())
    .bind(params.learning_category.is_some())
    .bind(params.learning_category.flatten())
    .bind(params.tags.is_some())
    .bind(params.tags.unwrap_or_default())
    .bind(now)
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_owned(
    pool: &PgPool,
    id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM resources WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
