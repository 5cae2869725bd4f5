use time::PrimitiveDateTime;

use crate::db::types::AssessmentStatus;

/// Status of an exam window `[start, end]` at `now`. Both bounds are inclusive.
pub(crate) fn assessment_status(
    now: PrimitiveDateTime,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
) -> AssessmentStatus {
    if now < start {
        AssessmentStatus::Scheduled
    } else if now > end {
        AssessmentStatus::Completed
    } else {
        AssessmentStatus::Active
    }
}
