use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::redis::RedisHandle;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::GradeRecord;
use crate::db::types::{AssessmentKind, SubmissionStatus};
use crate::repositories;
use crate::services::answer_key::{decode_document, AssessmentContent, ContentError};
use crate::services::essay_evaluation::{evaluate_essay, EssayScorer, EvaluationError};
use crate::services::objective_scoring::{
    detail_document, marks_per_question, score_objective, GradeDetail, NoQuestions,
    QuestionOutcome,
};

#[derive(Debug, Error)]
pub(crate) enum GradeError {
    #[error("no answer submission found for this student")]
    SubmissionNotFound,
    #[error("{} not found", .kind.as_str())]
    AssessmentNotFound { kind: AssessmentKind },
    #[error("submission has already been graded")]
    AlreadyGraded,
    #[error("submission is being graded by another request")]
    GradingInProgress,
    #[error(transparent)]
    Decode(#[from] ContentError),
    #[error(transparent)]
    NoQuestions(#[from] NoQuestions),
    #[error("essay evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("failed to {stage}")]
    Storage {
        stage: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl GradeError {
    pub(crate) fn reason(&self) -> &'static str {
        match self {
            Self::SubmissionNotFound => "submission_not_found",
            Self::AssessmentNotFound { .. } => "assessment_not_found",
            Self::AlreadyGraded => "already_graded",
            Self::GradingInProgress => "in_progress",
            Self::Decode(_) => "decode",
            Self::NoQuestions(_) => "no_questions",
            Self::Evaluation(_) => "evaluation",
            Self::Storage { .. } => "storage",
        }
    }
}

fn storage(stage: &'static str) -> impl FnOnce(sqlx::Error) -> GradeError {
    move |source| GradeError::Storage { stage, source }
}

/// Redis lease held for a whole grading run.
struct GradingLease<'a> {
    redis: &'a RedisHandle,
    key: String,
    token: String,
    ttl_seconds: u64,
}

impl GradingLease<'_> {
    /// Extends the lease before each essay call and before persisting. A lease
    /// another request has taken over aborts the run.
    async fn renew(&self) -> Result<(), GradeError> {
        match self.redis.renew_lease(&self.key, &self.token, self.ttl_seconds).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(GradeError::GradingInProgress),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    lease_key = %self.key,
                    "Failed to renew grading lease"
                );
                Ok(())
            }
        }
    }
}

/// Grades one submission under a Redis lease so concurrent requests for the
/// same student do not both call the essay scorer.
pub(crate) async fn calculate_grade_exclusive(
    state: &AppState,
    kind: AssessmentKind,
    assessment_id: i64,
    student_id: i64,
) -> Result<GradeRecord, GradeError> {
    let lease = GradingLease {
        redis: state.redis(),
        key: format!("grading-lease:{}:{assessment_id}:{student_id}", kind.as_str()),
        token: Uuid::new_v4().to_string(),
        ttl_seconds: state.settings().grading().lease_seconds,
    };

    let acquired =
        state.redis().try_acquire_lease(&lease.key, &lease.token, lease.ttl_seconds).await;
    let held = match acquired {
        Ok(true) => true,
        Ok(false) => {
            let err = GradeError::GradingInProgress;
            record_failure(kind, assessment_id, student_id, &err);
            return Err(err);
        }
        Err(err) => {
            tracing::warn!(
                error = %err,
                lease_key = %lease.key,
                "Failed to take grading lease; continuing without it"
            );
            false
        }
    };

    let result = run_grading(
        state.db(),
        state.essay_scorer(),
        kind,
        assessment_id,
        student_id,
        held.then_some(&lease),
    )
    .await;

    if held {
        if let Err(err) = state.redis().release_lease(&lease.key, &lease.token).await {
            tracing::warn!(error = %err, lease_key = %lease.key, "Failed to release grading lease");
        }
    }

    result
}

pub(crate) async fn calculate_grade(
    pool: &PgPool,
    scorer: &dyn EssayScorer,
    kind: AssessmentKind,
    assessment_id: i64,
    student_id: i64,
) -> Result<GradeRecord, GradeError> {
    run_grading(pool, scorer, kind, assessment_id, student_id, None).await
}

async fn run_grading(
    pool: &PgPool,
    scorer: &dyn EssayScorer,
    kind: AssessmentKind,
    assessment_id: i64,
    student_id: i64,
    lease: Option<&GradingLease<'_>>,
) -> Result<GradeRecord, GradeError> {
    match grade_submission(pool, scorer, kind, assessment_id, student_id, lease).await {
        Ok(record) => {
            tracing::info!(
                kind = kind.as_str(),
                assessment_id,
                student_id,
                grade_id = record.id,
                score = record.score,
                "Grade calculated"
            );
            metrics::counter!("grades_calculated_total", "kind" => kind.as_str()).increment(1);
            Ok(record)
        }
        Err(err) => {
            record_failure(kind, assessment_id, student_id, &err);
            Err(err)
        }
    }
}

fn record_failure(kind: AssessmentKind, assessment_id: i64, student_id: i64, err: &GradeError) {
    match err {
        GradeError::Storage { stage, source } => tracing::error!(
            kind = kind.as_str(),
            assessment_id,
            student_id,
            stage,
            error = %source,
            "Grading failed"
        ),
        GradeError::Evaluation(source) => tracing::error!(
            kind = kind.as_str(),
            assessment_id,
            student_id,
            error = %source,
            "Essay evaluation failed"
        ),
        other => tracing::warn!(
            kind = kind.as_str(),
            assessment_id,
            student_id,
            error = %other,
            "Grading rejected"
        ),
    }
    metrics::counter!(
        "grading_failures_total",
        "kind" => kind.as_str(),
        "reason" => err.reason()
    )
    .increment(1);
}

async fn grade_submission(
    pool: &PgPool,
    scorer: &dyn EssayScorer,
    kind: AssessmentKind,
    assessment_id: i64,
    student_id: i64,
    lease: Option<&GradingLease<'_>>,
) -> Result<GradeRecord, GradeError> {
    let submission =
        repositories::answers::find_for_student(pool, kind, assessment_id, student_id)
            .await
            .map_err(storage("load answers"))?
            .ok_or(GradeError::SubmissionNotFound)?;

    if kind.consumes_submission() && submission.status == SubmissionStatus::Inactive {
        return Err(GradeError::AlreadyGraded);
    }

    let source = repositories::assessments::find_grading_source(pool, kind, assessment_id)
        .await
        .map_err(storage("load assessment"))?
        .ok_or(GradeError::AssessmentNotFound { kind })?;

    let answer_key = AssessmentContent::from_json(&source.content.0)?.answer_key();
    let student_answers = decode_document("answers", &submission.answers.0)?;
    let marks = marks_per_question(source.total_marks, answer_key.question_count())?;

    let mut detail = GradeDetail::new();
    let mut total = score_objective(&answer_key.correct_answers, &student_answers, marks, &mut detail);

    for essay in &answer_key.essay_questions {
        if let Some(lease) = lease {
            lease.renew().await?;
        }
        let answer = student_answers.get(essay.number.as_str()).map(String::as_str).unwrap_or("");
        let earned = evaluate_essay(scorer, &essay.prompt, answer, marks).await?;
        total += earned;
        detail.insert(essay.number.clone(), QuestionOutcome::essay(earned, marks));
    }

    if let Some(lease) = lease {
        lease.renew().await?;
    }

    let score = total.min(f64::from(source.total_marks));
    let now = primitive_now_utc();

    let mut tx = pool.begin().await.map_err(storage("start grade transaction"))?;

    let record = repositories::grades::insert(
        &mut tx,
        kind,
        assessment_id,
        student_id,
        score,
        detail_document(&detail),
        now,
    )
    .await
    .map_err(storage("save grade"))?;

    if kind.consumes_submission() {
        let deactivated = repositories::answers::deactivate(&mut tx, kind, submission.id, now)
            .await
            .map_err(storage("deactivate submission"))?;
        if !deactivated {
            tx.rollback().await.map_err(storage("roll back grade"))?;
            return Err(GradeError::AlreadyGraded);
        }
    }

    tx.commit().await.map_err(storage("commit grade"))?;

    Ok(record)
}
