use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::GradeRecord;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeRequest {
    #[serde(alias = "studentId")]
    #[validate(range(min = 1, message = "student_id must be positive"))]
    pub(crate) student_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeResponse {
    pub(crate) id: i64,
    pub(crate) assessment_id: i64,
    pub(crate) student_id: i64,
    pub(crate) score: f64,
    pub(crate) detail: serde_json::Value,
    pub(crate) created_at: String,
}

impl From<GradeRecord> for GradeResponse {
    fn from(record: GradeRecord) -> Self {
        Self {
            id: record.id,
            assessment_id: record.assessment_id,
            student_id: record.student_id,
            score: record.score,
            detail: record.detail.0,
            created_at: format_primitive(record.created_at),
        }
    }
}
