use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AssessmentStatus, SubmissionStatus};

/// Row of `exams` or `exercises`; the time window and status are exam-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assessment {
    pub(crate) id: i64,
    pub(crate) owner_id: i64,
    pub(crate) title: String,
    pub(crate) content: Json<serde_json::Value>,
    pub(crate) total_marks: i32,
    pub(crate) teacher_id: i64,
    pub(crate) start_time: Option<PrimitiveDateTime>,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) status: Option<AssessmentStatus>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AnswerSubmission {
    pub(crate) id: i64,
    pub(crate) assessment_id: i64,
    pub(crate) student_id: i64,
    pub(crate) answers: Json<serde_json::Value>,
    pub(crate) status: SubmissionStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct GradeRecord {
    pub(crate) id: i64,
    pub(crate) assessment_id: i64,
    pub(crate) student_id: i64,
    pub(crate) score: f64,
    pub(crate) detail: Json<serde_json::Value>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ExamWindow {
    pub(crate) id: i64,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) status: AssessmentStatus,
}

/// The two columns the grade calculator needs from an assessment.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct GradingSource {
    pub(crate) content: Json<serde_json::Value>,
    pub(crate) total_marks: i32,
}
