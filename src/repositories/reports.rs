use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{GrowthReport, RubricBreakdownEntry};
use crate::db::types::CompetencyLevel;

const COLUMNS: &str = "\
    id, submission_id, score, competency_level, rubric_breakdown, evaluation_details, created_at";

pub(crate) async fn find_by_submission(
    pool: &PgPool,
    submission_id: &str,
) -> Result<Option<GrowthReport>, sqlx::Error> {
    sqlx::query_as::<_, GrowthReport>(&format!(
        "SELECT {COLUMNS} FROM growth_reports WHERE submission_id = $1"
    ))
    .bind(submission_id)
    .fetch_optional(pool)
    .await
}

/// Report plus the assignment it grades, scoped to the submission owner.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OwnedReport {
    #[sqlx(flatten)]
    pub(crate) report: GrowthReport,
    pub(crate) assignment_id: String,
}

pub(crate) async fn find_owned(
    pool: &PgPool,
    id: &str,
    user_id: &str,
) -> Result<Option<OwnedReport>, sqlx::Error> {
    sqlx::query_as::<_, OwnedReport>(
        "SELECT r.id, r.submission_id, r.score, r.competency_level, r.rubric_breakdown,
                r.evaluation_details, r.created_at, s.assignment_id
         FROM growth_reports r
         JOIN submissions s ON s.id = r.submission_id
         WHERE r.id = $1 AND s.user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateReport<'a> {
    pub(crate) id: &'a str,
    pub(crate) submission_id: &'a str,
    pub(crate) score: f64,
    pub(crate) competency_level: CompetencyLevel,
    pub(crate) rubric_breakdown: &'a [RubricBreakdownEntry],
    pub(crate) evaluation_details: Option<&'a serde_json::Value>,
    pub(crate) now: PrimitiveDateTime,
}

/// Inserts the report unless one already exists for the submission, then returns the
/// stored row either way.
pub(crate) async fn insert_once(
    pool: &PgPool,
    params: CreateReport<'_>,
) -> Result<GrowthReport, sqlx::Error> {
    sqlx::query(
        "INSERT INTO growth_reports (
            id, submission_id, score, competency_level, rubric_breakdown,
            evaluation_details, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (submission_id) DO NOTHING",
    )
    .bind(params.id)
    .bind(params.submission_id)
    .bind(params.score)
    .bind(params.competency_level)
    .bind(Json(params.rubric_breakdown))
    .bind(params.evaluation_details.map(Json))
    .bind(params.now)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, GrowthReport>(&format!(
        "SELECT {COLUMNS} FROM growth_reports WHERE submission_id = $1"
    ))
    .bind(params.submission_id)
    .fetch_one(pool)
    .await
}
