use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{Assessment, ExamWindow, GradingSource};
use crate::db::types::{AssessmentKind, AssessmentStatus};

const EXAM_COLUMNS: &str = "\
    id, class_id AS owner_id, title, content, total_marks, teacher_id, \
    start_time, end_time, status, created_at, updated_at";

const EXERCISE_COLUMNS: &str = "\
    id, material_id AS owner_id, title, content, total_marks, teacher_id, \
    NULL::timestamp AS start_time, NULL::timestamp AS end_time, \
    NULL::assessmentstatus AS status, created_at, updated_at";

pub(crate) fn columns(kind: AssessmentKind) -> &'static str {
    match kind {
        AssessmentKind::Exam => EXAM_COLUMNS,
        AssessmentKind::Exercise => EXERCISE_COLUMNS,
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Schedule {
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) status: AssessmentStatus,
}

/// Where a new assessment hangs: exams belong to a class and carry a window,
/// exercises belong to a material.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Placement {
    Exam { class_id: i64, schedule: Schedule },
    Exercise { material_id: i64 },
}

pub(crate) struct NewAssessment<'a> {
    pub(crate) placement: Placement,
    pub(crate) title: &'a str,
    pub(crate) content: serde_json::Value,
    pub(crate) total_marks: i32,
    pub(crate) teacher_id: i64,
    pub(crate) now: PrimitiveDateTime,
}

#[derive(Default)]
pub(crate) struct AssessmentChanges {
    pub(crate) title: Option<String>,
    pub(crate) content: Option<serde_json::Value>,
    pub(crate) total_marks: Option<i32>,
    pub(crate) schedule: Option<Schedule>,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: NewAssessment<'_>,
) -> Result<Assessment, sqlx::Error> {
    match params.placement {
        Placement::Exam { class_id, schedule } => {
            sqlx::query_as::<_, Assessment>(&format!(
                "INSERT INTO exams (class_id, title, content, total_marks, teacher_id,
                                    start_time, end_time, status, created_at, updated_at)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
                 RETURNING {EXAM_COLUMNS}"
            ))
            .bind(class_id)
            .bind(params.title)
            .bind(Json(params.content))
            .bind(params.total_marks)
            .bind(params.teacher_id)
            .bind(schedule.start_time)
            .bind(schedule.end_time)
            .bind(schedule.status)
            .bind(params.now)
            .fetch_one(pool)
            .await
        }
        Placement::Exercise { material_id } => {
            sqlx::query_as::<_, Assessment>(&format!(
                "INSERT INTO exercises (material_id, title, content, total_marks, teacher_id,
                                        created_at, updated_at)
                 VALUES ($1,$2,$3,$4,$5,$6,$6)
                 RETURNING {EXERCISE_COLUMNS}"
            ))
            .bind(material_id)
            .bind(params.title)
            .bind(Json(params.content))
            .bind(params.total_marks)
            .bind(params.teacher_id)
            .bind(params.now)
            .fetch_one(pool)
            .await
        }
    }
}

pub(crate) async fn find(
    pool: &PgPool,
    kind: AssessmentKind,
    id: i64,
) -> Result<Option<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "SELECT {} FROM {} WHERE id = $1",
        columns(kind),
        kind.table()
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_owner(
    pool: &PgPool,
    kind: AssessmentKind,
    owner_id: Option<i64>,
) -> Result<Vec<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "SELECT {columns}
         FROM {table}
         WHERE ($1::bigint IS NULL OR {owner} = $1)
         ORDER BY id",
        columns = columns(kind),
        table = kind.table(),
        owner = kind.owner_column(),
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

/// Applies the present fields; a schedule is ignored for exercises.
pub(crate) async fn update(
    pool: &PgPool,
    kind: AssessmentKind,
    id: i64,
    changes: AssessmentChanges,
    now: PrimitiveDateTime,
) -> Result<Option<Assessment>, sqlx::Error> {
    let schedule_sql = if kind.has_time_window() {
        "start_time = COALESCE($5, start_time),
         end_time = COALESCE($6, end_time),
         status = COALESCE($7, status),"
    } else {
        ""
    };

    let sql = format!(
        "UPDATE {table}
         SET title = COALESCE($1, title),
             content = COALESCE($2, content),
             total_marks = COALESCE($3, total_marks),
             {schedule_sql}
             updated_at = $4
         WHERE id = ${id_param}
         RETURNING {columns}",
        table = kind.table(),
        id_param = if kind.has_time_window() { 8 } else { 5 },
        columns = columns(kind),
    );

    let mut query = sqlx::query_as::<_, Assessment>(&sql)
        .bind(changes.title)
        .bind(changes.content.map(Json))
        .bind(changes.total_marks)
        .bind(now);

    if kind.has_time_window() {
        query = query
            .bind(changes.schedule.map(|schedule| schedule.start_time))
            .bind(changes.schedule.map(|schedule| schedule.end_time))
            .bind(changes.schedule.map(|schedule| schedule.status));
    }

    query.bind(id).fetch_optional(pool).await
}

pub(crate) async fn delete(pool: &PgPool, kind: AssessmentKind, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_grading_source(
    pool: &PgPool,
    kind: AssessmentKind,
    id: i64,
) -> Result<Option<GradingSource>, sqlx::Error> {
    sqlx::query_as::<_, GradingSource>(&format!(
        "SELECT content, total_marks FROM {} WHERE id = $1",
        kind.table()
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_exam_windows(pool: &PgPool) -> Result<Vec<ExamWindow>, sqlx::Error> {
    sqlx::query_as::<_, ExamWindow>(
        "SELECT id, start_time, end_time, status FROM exams ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

/// Moves an exam from `expected` to `status`. Returns `false` when the row
/// changed underneath (deleted or already moved).
pub(crate) async fn set_exam_status(
    pool: &PgPool,
    id: i64,
    expected: AssessmentStatus,
    status: AssessmentStatus,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exams SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .bind(expected)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
