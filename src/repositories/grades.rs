use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use time::PrimitiveDateTime;

use crate::db::models::GradeRecord;
use crate::db::types::AssessmentKind;

fn columns(kind: AssessmentKind) -> String {
    format!("id, {} AS assessment_id, student_id, score, detail, created_at", kind.reference_column())
}

pub(crate) async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    kind: AssessmentKind,
    assessment_id: i64,
    student_id: i64,
    score: f64,
    detail: serde_json::Value,
    now: PrimitiveDateTime,
) -> Result<GradeRecord, sqlx::Error> {
    sqlx::query_as::<_, GradeRecord>(&format!(
        "INSERT INTO {table} ({reference}, student_id, score, detail, created_at)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {columns}",
        table = kind.scores_table(),
        reference = kind.reference_column(),
        columns = columns(kind),
    ))
    .bind(assessment_id)
    .bind(student_id)
    .bind(score)
    .bind(Json(detail))
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

/// The newest grade row wins.
pub(crate) async fn latest_for_student(
    pool: &PgPool,
    kind: AssessmentKind,
    assessment_id: i64,
    student_id: i64,
) -> Result<Option<GradeRecord>, sqlx::Error> {
    sqlx::query_as::<_, GradeRecord>(&format!(
        "SELECT {columns}
         FROM {table}
         WHERE {reference} = $1 AND student_id = $2
         ORDER BY id DESC
         LIMIT 1",
        columns = columns(kind),
        table = kind.scores_table(),
        reference = kind.reference_column(),
    ))
    .bind(assessment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    kind: AssessmentKind,
    student_id: i64,
) -> Result<Vec<GradeRecord>, sqlx::Error> {
    sqlx::query_as::<_, GradeRecord>(&format!(
        "SELECT {columns} FROM {table} WHERE student_id = $1 ORDER BY id DESC",
        columns = columns(kind),
        table = kind.scores_table(),
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
pub(crate) async fn count_for_assessment(
    pool: &PgPool,
    kind: AssessmentKind,
    assessment_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE {} = $1",
        kind.scores_table(),
        kind.reference_column()
    ))
    .bind(assessment_id)
    .fetch_one(pool)
    .await
}
