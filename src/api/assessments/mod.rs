mod answers;
mod grades;
mod handlers;

use axum::{
    routing::{get, post},
    Extension, Router,
};

use crate::core::state::AppState;
use crate::db::types::AssessmentKind;

/// Routes shared by `/exams` and `/exercises`; `kind` selects the tables.
pub(crate) fn router(kind: AssessmentKind) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_assessment).get(handlers::list_assessments))
        .route("/student", get(handlers::list_for_student))
        .route("/grades", get(grades::list_grades))
        .route(
            "/:assessment_id",
            get(handlers::get_assessment)
                .patch(handlers::update_assessment)
                .delete(handlers::delete_assessment),
        )
        .route("/:assessment_id/questions/:number", get(handlers::get_question_page))
        .route(
            "/:assessment_id/answers",
            post(answers::submit_answers)
                .get(answers::get_answers)
                .patch(answers::update_answers)
                .delete(answers::delete_answers),
        )
        .route("/:assessment_id/grade", post(grades::calculate_grade).get(grades::latest_grade))
        .layer(Extension(kind))
}

#[cfg(test)]
mod tests;
