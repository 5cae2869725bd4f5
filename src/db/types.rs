use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "assessmentstatus")]
pub(crate) enum AssessmentStatus {
    Scheduled,
    Active,
    Completed,
}

impl AssessmentStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "submissionstatus")]
pub(crate) enum SubmissionStatus {
    Active,
    Inactive,
}

/// Exams and exercises share grading semantics but live in separate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AssessmentKind {
    Exam,
    Exercise,
}

impl AssessmentKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Exam => "exam",
            Self::Exercise => "exercise",
        }
    }

    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Exam => "exams",
            Self::Exercise => "exercises",
        }
    }

    pub(crate) fn owner_column(self) -> &'static str {
        match self {
            Self::Exam => "class_id",
            Self::Exercise => "material_id",
        }
    }

    pub(crate) fn answers_table(self) -> &'static str {
        match self {
            Self::Exam => "exam_answers",
            Self::Exercise => "exercise_answers",
        }
    }

    pub(crate) fn scores_table(self) -> &'static str {
        match self {
            Self::Exam => "exam_scores",
            Self::Exercise => "exercise_scores",
        }
    }

    /// Foreign-key column used by the answers and scores tables.
    pub(crate) fn reference_column(self) -> &'static str {
        match self {
            Self::Exam => "exam_id",
            Self::Exercise => "exercise_id",
        }
    }

    pub(crate) fn has_time_window(self) -> bool {
        matches!(self, Self::Exam)
    }

    /// Exercise submissions are one-shot: grading deactivates them.
    pub(crate) fn consumes_submission(self) -> bool {
        matches!(self, Self::Exercise)
    }
}
