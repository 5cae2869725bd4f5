use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::services::answer_key::QuestionNumber;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("assessment has no gradable questions")]
pub(crate) struct NoQuestions;

/// Per-question entry of a grade's `detail` document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QuestionOutcome {
    Objective(bool),
    Essay(String),
}

impl QuestionOutcome {
    pub(crate) fn essay(earned: f64, possible: f64) -> Self {
        Self::Essay(format!("{earned:.2}/{possible:.2}"))
    }
}

impl From<&QuestionOutcome> for Value {
    fn from(outcome: &QuestionOutcome) -> Self {
        match outcome {
            QuestionOutcome::Objective(correct) => Value::Bool(*correct),
            QuestionOutcome::Essay(fraction) => Value::String(fraction.clone()),
        }
    }
}

pub(crate) type GradeDetail = BTreeMap<QuestionNumber, QuestionOutcome>;

/// `{"1": true, "2": "20.00/30.00"}` as stored in the grade row.
pub(crate) fn detail_document(detail: &GradeDetail) -> Value {
    detail
        .iter()
        .map(|(number, outcome)| (number.to_string(), Value::from(outcome)))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

pub(crate) fn marks_per_question(total_marks: i32, question_count: usize) -> Result<f64, NoQuestions> {
    if question_count == 0 {
        return Err(NoQuestions);
    }
    Ok(f64::from(total_marks) / question_count as f64)
}

/// Exact string comparison against the answer key. A missing answer earns nothing.
pub(crate) fn score_objective(
    correct_answers: &BTreeMap<QuestionNumber, String>,
    student_answers: &BTreeMap<String, String>,
    marks_per_question: f64,
    detail: &mut GradeDetail,
) -> f64 {
    let mut total = 0.0;

    for (number, expected) in correct_answers {
        let correct = student_answers
            .get(number.as_str())
            .is_some_and(|answer| answer == expected);
        if correct {
            total += marks_per_question;
        }
        detail.insert(number.clone(), QuestionOutcome::Objective(correct));
    }

    total
}
