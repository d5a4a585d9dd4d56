use sqlx::PgPool;

use crate::db::models::{Assignment, Rubric};

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Rubric>, sqlx::Error> {
    sqlx::query_as::<_, Rubric>("SELECT id, name, criteria FROM rubrics WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// The assignment's stored rubric, else the seeded rubric for its type.
pub(crate) async fn for_assignment(
    pool: &PgPool,
    assignment: &Assignment,
) -> Result<Option<Rubric>, sqlx::Error> {
    let rubric_id = assignment.rubric_id.as_deref().or_else(|| assignment.kind.default_rubric_id());
    match rubric_id {
        Some(id) => find_by_id(pool, id).await,
        None => Ok(None),
    }
}
