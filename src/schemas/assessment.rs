use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Assessment;
use crate::db::types::{AssessmentKind, AssessmentStatus};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssessmentCreate {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) content: BTreeMap<String, String>,
    #[serde(alias = "totalMarks")]
    #[validate(range(min = 0, message = "total_marks must be non-negative"))]
    pub(crate) total_marks: i32,
    #[serde(default, alias = "classId")]
    pub(crate) class_id: Option<i64>,
    #[serde(default, alias = "materialId")]
    pub(crate) material_id: Option<i64>,
    #[serde(default, alias = "teacherId")]
    pub(crate) teacher_id: Option<i64>,
    #[serde(
        default,
        alias = "startTime",
        deserialize_with = "deserialize_option_datetime_flexible"
    )]
    pub(crate) start_time: Option<OffsetDateTime>,
    #[serde(default, alias = "endTime", deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) end_time: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssessmentUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<BTreeMap<String, String>>,
    #[serde(default, alias = "totalMarks")]
    #[validate(range(min = 0, message = "total_marks must be non-negative"))]
    pub(crate) total_marks: Option<i32>,
    #[serde(
        default,
        alias = "startTime",
        deserialize_with = "deserialize_option_datetime_flexible"
    )]
    pub(crate) start_time: Option<OffsetDateTime>,
    #[serde(default, alias = "endTime", deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) end_time: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssessmentListQuery {
    #[serde(default)]
    pub(crate) class_id: Option<i64>,
    #[serde(default)]
    pub(crate) material_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssessmentResponse {
    pub(crate) id: i64,
    pub(crate) kind: AssessmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) class_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) material_id: Option<i64>,
    pub(crate) title: String,
    pub(crate) content: serde_json::Value,
    pub(crate) total_marks: i32,
    pub(crate) teacher_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) status: Option<AssessmentStatus>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl AssessmentResponse {
    pub(crate) fn from_model(kind: AssessmentKind, assessment: Assessment) -> Self {
        let (class_id, material_id) = match kind {
            AssessmentKind::Exam => (Some(assessment.owner_id), None),
            AssessmentKind::Exercise => (None, Some(assessment.owner_id)),
        };

        Self {
            id: assessment.id,
            kind,
            class_id,
            material_id,
            title: assessment.title,
            content: assessment.content.0,
            total_marks: assessment.total_marks,
            teacher_id: assessment.teacher_id,
            start_time: assessment.start_time.map(format_primitive),
            end_time: assessment.end_time.map(format_primitive),
            status: assessment.status,
            created_at: format_primitive(assessment.created_at),
            updated_at: format_primitive(assessment.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentAssessmentQuery {
    #[serde(default)]
    pub(crate) class_id: Option<i64>,
    #[serde(default)]
    pub(crate) material_id: Option<i64>,
    pub(crate) number: String,
}

/// Assessment metadata for students, carrying one question's page instead of
/// the full content.
#[derive(Debug, Serialize)]
pub(crate) struct StudentAssessmentResponse {
    pub(crate) id: i64,
    pub(crate) kind: AssessmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) class_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) material_id: Option<i64>,
    pub(crate) title: String,
    pub(crate) total_marks: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) status: Option<AssessmentStatus>,
    pub(crate) number: String,
    pub(crate) content: BTreeMap<String, String>,
}

impl StudentAssessmentResponse {
    pub(crate) fn from_model(
        kind: AssessmentKind,
        assessment: Assessment,
        number: &str,
        content: BTreeMap<String, String>,
    ) -> Self {
        let full = AssessmentResponse::from_model(kind, assessment);
        Self {
            id: full.id,
            kind,
            class_id: full.class_id,
            material_id: full.material_id,
            title: full.title,
            total_marks: full.total_marks,
            start_time: full.start_time,
            end_time: full.end_time,
            status: full.status,
            number: number.to_string(),
            content,
        }
    }
}

/// Student-facing view of a single question.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionPageResponse {
    pub(crate) assessment_id: i64,
    pub(crate) number: String,
    pub(crate) content: BTreeMap<String, String>,
}

fn parse_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // Naive timestamps are taken as UTC.
    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_option_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}
