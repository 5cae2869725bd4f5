use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::types::AssessmentKind;
use crate::repositories;
use crate::schemas::answer::StudentQuery;
use crate::schemas::grade::{GradeRequest, GradeResponse};
use crate::services::grading;

pub(super) async fn calculate_grade(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    _user: CurrentUser,
    Path(assessment_id): Path<i64>,
    Json(payload): Json<GradeRequest>,
) -> Result<(StatusCode, Json<GradeResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let record =
        grading::calculate_grade_exclusive(&state, kind, assessment_id, payload.student_id).await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

pub(super) async fn latest_grade(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    _user: CurrentUser,
    Path(assessment_id): Path<i64>,
    Query(query): Query<StudentQuery>,
) -> Result<Json<GradeResponse>, ApiError> {
    let record = repositories::grades::latest_for_student(
        state.db(),
        kind,
        assessment_id,
        query.student_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load grade"))?
    .ok_or_else(|| ApiError::NotFound("Grade not found".to_string()))?;

    Ok(Json(record.into()))
}

pub(super) async fn list_grades(
    State(state): State<AppState>,
    Extension(kind): Extension<AssessmentKind>,
    _user: CurrentUser,
    Query(query): Query<StudentQuery>,
) -> Result<Json<Vec<GradeResponse>>, ApiError> {
    let records = repositories::grades::list_for_student(state.db(), kind, query.student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list grades"))?;

    Ok(Json(records.into_iter().map(GradeResponse::from).collect()))
}
