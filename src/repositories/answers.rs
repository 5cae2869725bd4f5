use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use time::PrimitiveDateTime;

use crate::db::models::AnswerSubmission;
use crate::db::types::{AssessmentKind, SubmissionStatus};

fn columns(kind: AssessmentKind) -> String {
    format!(
        "id, {} AS assessment_id, student_id, answers, status, created_at, updated_at",
        kind.reference_column()
    )
}

pub(crate) async fn create(
    pool: &PgPool,
    kind: AssessmentKind,
    assessment_id: i64,
    student_id: i64,
    answers: serde_json::Value,
    now: PrimitiveDateTime,
) -> Result<AnswerSubmission, sqlx::Error> {
    sqlx::query_as::<_, AnswerSubmission>(&format!(
        "INSERT INTO {table} ({reference}, student_id, answers, status, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         RETURNING {columns}",
        table = kind.answers_table(),
        reference = kind.reference_column(),
        columns = columns(kind),
    ))
    .bind(assessment_id)
    .bind(student_id)
    .bind(Json(answers))
    .bind(SubmissionStatus::Active)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_for_student(
    pool: &PgPool,
    kind: AssessmentKind,
    assessment_id: i64,
    student_id: i64,
) -> Result<Option<AnswerSubmission>, sqlx::Error> {
    sqlx::query_as::<_, AnswerSubmission>(&format!(
        "SELECT {columns} FROM {table} WHERE {reference} = $1 AND student_id = $2",
        columns = columns(kind),
        table = kind.answers_table(),
        reference = kind.reference_column(),
    ))
    .bind(assessment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

/// Replaces the answers. Status is left alone, and a graded exercise
/// submission is not updated (`None`, same as a missing row).
pub(crate) async fn update(
    pool: &PgPool,
    kind: AssessmentKind,
    assessment_id: i64,
    student_id: i64,
    answers: serde_json::Value,
    now: PrimitiveDateTime,
) -> Result<Option<AnswerSubmission>, sqlx::Error> {
    sqlx::query_as::<_, AnswerSubmission>(&format!(
        "UPDATE {table}
         SET answers = $1, updated_at = $2
         WHERE {reference} = $3 AND student_id = $4 AND (NOT $5 OR status = $6)
         RETURNING {columns}",
        table = kind.answers_table(),
        reference = kind.reference_column(),
        columns = columns(kind),
    ))
    .bind(Json(answers))
    .bind(now)
    .bind(assessment_id)
    .bind(student_id)
    .bind(kind.consumes_submission())
    .bind(SubmissionStatus::Active)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(
    pool: &PgPool,
    kind: AssessmentKind,
    assessment_id: i64,
    student_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE {} = $1 AND student_id = $2",
        kind.answers_table(),
        kind.reference_column()
    ))
    .bind(assessment_id)
    .bind(student_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// `Active -> Inactive` for one submission. Returns `false` if it was no longer active.
pub(crate) async fn deactivate(
    tx: &mut Transaction<'_, Postgres>,
    kind: AssessmentKind,
    submission_id: i64,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!(
        "UPDATE {} SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
        kind.answers_table()
    ))
    .bind(SubmissionStatus::Inactive)
    .bind(now)
    .bind(submission_id)
    .bind(SubmissionStatus::Active)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}
