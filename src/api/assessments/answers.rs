use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use crate::api::assessments::handlers::fetch_assessment;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::AssessmentKind;
use crate::repositories;
use crate::schemas::answer::{AnswerResponse, AnswerSubmit, StudentQuery};

fn submission_not_found() -> ApiError {
    ApiError::NotFound("Answer submission not found".to_string())
}

fn answers_json(payload: &AnswerSubmit) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(&payload.answers).map_err(|e| ApiError::internal(e, "Failed to encode answers"))
}

pub(super) async fn submit_answers(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    _user: CurrentUser,
    Path(assessment_id): Path<i64>,
    Json(payload): Json<AnswerSubmit>,
) -> Result<(StatusCode, Json<AnswerResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    fetch_assessment(&state, kind, assessment_id).await?;

    let answers = answers_json(&payload)?;
    let submission = repositories::answers::create(
        state.db(),
        kind,
        assessment_id,
        payload.student_id,
        answers,
        primitive_now_utc(),
    )
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Conflict("Answers already submitted for this student".to_string())
        }
        other => ApiError::internal(other, "Failed to save answers"),
    })?;

    tracing::info!(
        kind = kind.as_str(),
        assessment_id,
        student_id = submission.student_id,
        "Answers submitted"
    );

    Ok((StatusCode::CREATED, Json(submission.into())))
}

pub(super) async fn get_answers(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    _user: CurrentUser,
    Path(assessment_id): Path<i64>,
    Query(query): Query<StudentQuery>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let submission = repositories::answers::find_for_student(
        state.db(),
        kind,
        assessment_id,
        query.student_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load answers"))?
    .ok_or_else(submission_not_found)?;

    Ok(Json(submission.into()))
}

pub(super) async fn update_answers(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    _user: CurrentUser,
    Path(assessment_id): Path<i64>,
    Json(payload): Json<AnswerSubmit>,
) -> Result<Json<AnswerResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let answers = answers_json(&payload)?;
    let submission = repositories::answers::update(
        state.db(),
        kind,
        assessment_id,
        payload.student_id,
        answers,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update answers"))?;

    if let Some(submission) = submission {
        return Ok(Json(submission.into()));
    }

    let existing = repositories::answers::find_for_student(
        state.db(),
        kind,
        assessment_id,
        payload.student_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;

    match existing {
        Some(_) => Err(ApiError::Conflict("Answers have already been graded".to_string())),
        None => Err(submission_not_found()),
    }
}

pub(super) async fn delete_answers(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    _user: CurrentUser,
    Path(assessment_id): Path<i64>,
    Query(query): Query<StudentQuery>,
) -> Result<StatusCode, ApiError> {
    let deleted =
        repositories::answers::delete(state.db(), kind, assessment_id, query.student_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to delete answers"))?;

    if !deleted {
        return Err(submission_not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}
