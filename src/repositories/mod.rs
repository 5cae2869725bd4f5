pub(crate) mod answers;
pub(crate) mod assessments;
pub(crate) mod grades;
pub(crate) mod health;
