use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::Assessment;
use crate::db::types::AssessmentKind;
use crate::repositories;
use crate::repositories::assessments::{AssessmentChanges, NewAssessment, Placement, Schedule};
use crate::schemas::assessment::{
    AssessmentCreate, AssessmentListQuery, AssessmentResponse, AssessmentUpdate,
    QuestionPageResponse, StudentAssessmentQuery, StudentAssessmentResponse,
};
use crate::services::answer_key::AssessmentContent;
use crate::services::status_clock::assessment_status;

pub(super) async fn create_assessment(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    user: CurrentUser,
    Json(payload): Json<AssessmentCreate>,
) -> Result<(StatusCode, Json<AssessmentResponse>), ApiError> {
    user.require_staff()?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let placement = match kind {
        AssessmentKind::Exam => {
            let class_id = payload
                .class_id
                .ok_or_else(|| ApiError::BadRequest("class_id is required".to_string()))?;
            let (Some(start), Some(end)) = (payload.start_time, payload.end_time) else {
                return Err(ApiError::BadRequest(
                    "start_time and end_time are required".to_string(),
                ));
            };
            Placement::Exam {
                class_id,
                schedule: schedule(to_primitive_utc(start), to_primitive_utc(end), now)?,
            }
        }
        AssessmentKind::Exercise => {
            let material_id = payload
                .material_id
                .ok_or_else(|| ApiError::BadRequest("material_id is required".to_string()))?;
            Placement::Exercise { material_id }
        }
    };

    let content = content_json(AssessmentContent::from_document(payload.content))?;

    let assessment = repositories::assessments::create(
        state.db(),
        NewAssessment {
            placement,
            title: &payload.title,
            content,
            total_marks: payload.total_marks,
            teacher_id: payload.teacher_id.unwrap_or(user.user_id),
            now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create assessment"))?;

    tracing::info!(
        kind = kind.as_str(),
        assessment_id = assessment.id,
        teacher_id = assessment.teacher_id,
        "Assessment created"
    );

    Ok((StatusCode::CREATED, Json(AssessmentResponse::from_model(kind, assessment))))
}

pub(super) async fn list_assessments(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    user: CurrentUser,
    Query(query): Query<AssessmentListQuery>,
) -> Result<Json<Vec<AssessmentResponse>>, ApiError> {
    user.require_staff()?;

    let owner_id = match kind {
        AssessmentKind::Exam => query.class_id,
        AssessmentKind::Exercise => query.material_id,
    };

    let assessments = repositories::assessments::list_by_owner(state.db(), kind, owner_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assessments"))?;

    Ok(Json(
        assessments
            .into_iter()
            .map(|assessment| AssessmentResponse::from_model(kind, assessment))
            .collect(),
    ))
}

/// Listing for any role: metadata plus the page for `number`, never answer keys.
pub(super) async fn list_for_student(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    _user: CurrentUser,
    Query(query): Query<StudentAssessmentQuery>,
) -> Result<Json<Vec<StudentAssessmentResponse>>, ApiError> {
    let owner_id = match kind {
        AssessmentKind::Exam => query
            .class_id
            .ok_or_else(|| ApiError::BadRequest("class_id is required".to_string()))?,
        AssessmentKind::Exercise => query
            .material_id
            .ok_or_else(|| ApiError::BadRequest("material_id is required".to_string()))?,
    };
    let number = query.number.trim();
    if number.is_empty() {
        return Err(ApiError::BadRequest("number is required".to_string()));
    }

    let assessments = repositories::assessments::list_by_owner(state.db(), kind, Some(owner_id))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assessments"))?;

    let mut pages = Vec::with_capacity(assessments.len());
    for assessment in assessments {
        let page = AssessmentContent::from_json(&assessment.content.0)
            .map_err(|e| ApiError::internal(e, "Assessment content is malformed"))?
            .page(number);
        pages.push(StudentAssessmentResponse::from_model(kind, assessment, number, page));
    }

    Ok(Json(pages))
}

pub(super) async fn get_assessment(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    user: CurrentUser,
    Path(assessment_id): Path<i64>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    user.require_staff()?;
    let assessment = fetch_assessment(&state, kind, assessment_id).await?;
    Ok(Json(AssessmentResponse::from_model(kind, assessment)))
}

pub(super) async fn update_assessment(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    user: CurrentUser,
    Path(assessment_id): Path<i64>,
    Json(payload): Json<AssessmentUpdate>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    user.require_staff()?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = fetch_assessment(&state, kind, assessment_id).await?;
    let now = primitive_now_utc();

    let window_changed = payload.start_time.is_some() || payload.end_time.is_some();
    let schedule = match (kind, window_changed) {
        (_, false) => None,
        (AssessmentKind::Exercise, true) => {
            return Err(ApiError::BadRequest("exercises have no time window".to_string()));
        }
        (AssessmentKind::Exam, true) => {
            let start = payload.start_time.map(to_primitive_utc).or(existing.start_time);
            let end = payload.end_time.map(to_primitive_utc).or(existing.end_time);
            let (Some(start), Some(end)) = (start, end) else {
                return Err(ApiError::internal(
                    format!("exam {assessment_id} has no stored window"),
                    "Failed to update assessment",
                ));
            };
            Some(schedule(start, end, now)?)
        }
    };

    let content = payload
        .content
        .map(|document| content_json(AssessmentContent::from_document(document)))
        .transpose()?;

    let changes = AssessmentChanges {
        title: payload.title,
        content,
        total_marks: payload.total_marks,
        schedule,
    };

    let assessment =
        repositories::assessments::update(state.db(), kind, assessment_id, changes, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update assessment"))?
            .ok_or_else(|| not_found(kind))?;

    Ok(Json(AssessmentResponse::from_model(kind, assessment)))
}

pub(super) async fn delete_assessment(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    user: CurrentUser,
    Path(assessment_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    user.require_staff()?;

    let deleted = repositories::assessments::delete(state.db(), kind, assessment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete assessment"))?;

    if !deleted {
        return Err(not_found(kind));
    }

    tracing::info!(kind = kind.as_str(), assessment_id, "Assessment deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn get_question_page(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    _user: CurrentUser,
    Path((assessment_id, number)): Path<(i64, String)>,
) -> Result<Json<QuestionPageResponse>, ApiError> {
    let assessment = fetch_assessment(&state, kind, assessment_id).await?;
    let content = AssessmentContent::from_json(&assessment.content.0)
        .map_err(|e| ApiError::internal(e, "Assessment content is malformed"))?;

    Ok(Json(QuestionPageResponse { assessment_id, content: content.page(&number), number }))
}

pub(super) async fn fetch_assessment(
    state: &AppState,
    kind: AssessmentKind,
    assessment_id: i64,
) -> Result<Assessment, ApiError> {
    repositories::assessments::find(state.db(), kind, assessment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load assessment"))?
        .ok_or_else(|| not_found(kind))
}

fn not_found(kind: AssessmentKind) -> ApiError {
    match kind {
        AssessmentKind::Exam => ApiError::NotFound("Exam not found".to_string()),
        AssessmentKind::Exercise => ApiError::NotFound("Exercise not found".to_string()),
    }
}

fn schedule(
    start_time: PrimitiveDateTime,
    end_time: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<Schedule, ApiError> {
    if end_time < start_time {
        return Err(ApiError::BadRequest("end_time must not be before start_time".to_string()));
    }

    Ok(Schedule { start_time, end_time, status: assessment_status(now, start_time, end_time) })
}

fn content_json(content: AssessmentContent) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(content.to_document())
        .map_err(|e| ApiError::internal(e, "Failed to encode assessment content"))
}
