pub(crate) mod answer_key;
pub(crate) mod essay_evaluation;
pub(crate) mod grading;
pub(crate) mod objective_scoring;
pub(crate) mod status_clock;
