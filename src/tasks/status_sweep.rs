use anyhow::{Context, Result};
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::repositories;
use crate::services::status_clock::assessment_status;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SweepReport {
    pub(crate) scanned: usize,
    pub(crate) updated: usize,
    pub(crate) failed: usize,
}

/// Brings every stored exam status in line with the clock at `now`.
/// A failed row is logged and skipped; only a failed listing aborts the sweep.
pub(crate) async fn sweep_exam_statuses(pool: &PgPool, now: PrimitiveDateTime) -> Result<SweepReport> {
    let windows = repositories::assessments::list_exam_windows(pool)
        .await
        .context("Failed to list exam windows")?;

    let mut report = SweepReport { scanned: windows.len(), ..SweepReport::default() };

    for window in windows {
        let status = assessment_status(now, window.start_time, window.end_time);
        if status == window.status {
            continue;
        }

        match repositories::assessments::set_exam_status(pool, window.id, window.status, status, now)
            .await
        {
            Ok(true) => {
                report.updated += 1;
                tracing::debug!(
                    exam_id = window.id,
                    from = window.status.as_str(),
                    to = status.as_str(),
                    "Exam status changed"
                );
            }
            Ok(false) => {
                tracing::debug!(exam_id = window.id, "Exam changed during sweep; skipped");
            }
            Err(err) => {
                report.failed += 1;
                tracing::error!(exam_id = window.id, error = %err, "Failed to update exam status");
            }
        }
    }

    if report.updated > 0 || report.failed > 0 {
        tracing::info!(
            scanned = report.scanned,
            updated = report.updated,
            failed = report.failed,
            "Swept exam statuses"
        );
    }
    metrics::counter!("exam_status_updates_total").increment(report.updated as u64);
    metrics::counter!("exam_status_sweep_failures_total").increment(report.failed as u64);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::Duration;

    use crate::core::time::primitive_now_utc;
    use crate::db::types::{AssessmentKind, AssessmentStatus};
    use crate::repositories::assessments::{AssessmentChanges, NewAssessment, Placement, Schedule};
    use crate::test_support;

    async fn create_exam(
        pool: &PgPool,
        start_time: PrimitiveDateTime,
        end_time: PrimitiveDateTime,
        status: AssessmentStatus,
    ) -> i64 {
        repositories::assessments::create(
            pool,
            NewAssessment {
                placement: Placement::Exam {
                    class_id: 2,
                    schedule: Schedule { start_time, end_time, status },
                },
                title: "Quiz",
                content: json!({"1_answer": "A"}),
                total_marks: 10,
                teacher_id: 4,
                now: primitive_now_utc(),
            },
        )
        .await
        .expect("exam")
        .id
    }

    async fn stored_status(pool: &PgPool, id: i64) -> Option<AssessmentStatus> {
        repositories::assessments::find(pool, AssessmentKind::Exam, id)
            .await
            .expect("find")
            .expect("exam")
            .status
    }

    #[tokio::test]
    async fn sweep_moves_exam_through_its_window() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let now = primitive_now_utc();

        let exam = create_exam(
            pool,
            now - Duration::minutes(30),
            now + Duration::minutes(30),
            AssessmentStatus::Scheduled,
        )
        .await;

        let report = sweep_exam_statuses(pool, now).await.expect("sweep");
        assert_eq!(report, SweepReport { scanned: 1, updated: 1, failed: 0 });
        assert_eq!(stored_status(pool, exam).await, Some(AssessmentStatus::Active));

        repositories::assessments::update(
            pool,
            AssessmentKind::Exam,
            exam,
            AssessmentChanges {
                schedule: Some(Schedule {
                    start_time: now - Duration::minutes(30),
                    end_time: now - Duration::minutes(1),
                    status: AssessmentStatus::Active,
                }),
                ..AssessmentChanges::default()
            },
            now,
        )
        .await
        .expect("update")
        .expect("exam");

        let report = sweep_exam_statuses(pool, now).await.expect("sweep");
        assert_eq!(report.updated, 1);
        assert_eq!(stored_status(pool, exam).await, Some(AssessmentStatus::Completed));
    }

    #[tokio::test]
    async fn sweep_leaves_current_statuses_alone() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let now = primitive_now_utc();

        let scheduled = create_exam(
            pool,
            now + Duration::hours(1),
            now + Duration::hours(2),
            AssessmentStatus::Scheduled,
        )
        .await;
        let completed = create_exam(
            pool,
            now - Duration::hours(2),
            now - Duration::hours(1),
            AssessmentStatus::Completed,
        )
        .await;

        let report = sweep_exam_statuses(pool, now).await.expect("sweep");

        assert_eq!(report, SweepReport { scanned: 2, updated: 0, failed: 0 });
        assert_eq!(stored_status(pool, scheduled).await, Some(AssessmentStatus::Scheduled));
        assert_eq!(stored_status(pool, completed).await, Some(AssessmentStatus::Completed));
    }

    #[tokio::test]
    async fn sweep_of_empty_table_is_a_no_op() {
        let ctx = test_support::setup_test_context().await;

        let report = sweep_exam_statuses(ctx.state.db(), primitive_now_utc()).await.expect("sweep");

        assert_eq!(report, SweepReport::default());
    }
}
