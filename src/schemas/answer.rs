use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::AnswerSubmission;
use crate::db::types::SubmissionStatus;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerSubmit {
    #[serde(alias = "studentId")]
    #[validate(range(min = 1, message = "student_id must be positive"))]
    pub(crate) student_id: i64,
    #[serde(default)]
    pub(crate) answers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentQuery {
    pub(crate) student_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) id: i64,
    pub(crate) assessment_id: i64,
    pub(crate) student_id: i64,
    pub(crate) answers: serde_json::Value,
    pub(crate) status: SubmissionStatus,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<AnswerSubmission> for AnswerResponse {
    fn from(submission: AnswerSubmission) -> Self {
        Self {
            id: submission.id,
            assessment_id: submission.assessment_id,
            student_id: submission.student_id,
            answers: submission.answers.0,
            status: submission.status,
            created_at: format_primitive(submission.created_at),
            updated_at: format_primitive(submission.updated_at),
        }
    }
}
