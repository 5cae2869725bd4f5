//! Typed view over the flat `content` document of an assessment.
//!
//! The wire document maps string keys to strings:
//! `"N"` is the prompt of question `N`, `"N_<part>"` a sub-part or option,
//! `"N_answer"` the correct answer of an objective question and `"N_essay"`
//! the prompt of an essay question. The suffix convention is only understood
//! here; the rest of the crate works with [`AssessmentContent`] and [`AnswerKey`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ANSWER_SUFFIX: &str = "_answer";
const ESSAY_SUFFIX: &str = "_essay";

#[derive(Debug, Error)]
#[error("{document} document is not a flat object of strings: {source}")]
pub(crate) struct ContentError {
    pub(crate) document: &'static str,
    #[source]
    pub(crate) source: serde_json::Error,
}

/// Decodes a stored JSON document into `key -> string`.
pub(crate) fn decode_document(
    document: &'static str,
    value: &serde_json::Value,
) -> Result<BTreeMap<String, String>, ContentError> {
    BTreeMap::<String, String>::deserialize(value).map_err(|source| ContentError { document, source })
}

/// Question identifier. Numeric identifiers order numerically (`"2" < "10"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct QuestionNumber(String);

impl QuestionNumber {
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for QuestionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u64>(), other.0.parse::<u64>()) {
            (Ok(left), Ok(right)) => left.cmp(&right).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for QuestionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Prompt,
    AnswerKey,
    EssayPrompt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentEntry {
    key: String,
    question: QuestionNumber,
    kind: EntryKind,
    text: String,
}

impl ContentEntry {
    fn parse(key: String, text: String) -> Self {
        let (question, kind) = if let Some(number) = key.strip_suffix(ANSWER_SUFFIX) {
            (number.to_string(), EntryKind::AnswerKey)
        } else if let Some(number) = key.strip_suffix(ESSAY_SUFFIX) {
            (number.to_string(), EntryKind::EssayPrompt)
        } else {
            let number = key.split('_').next().unwrap_or_default();
            (number.to_string(), EntryKind::Prompt)
        };

        Self { key, question: QuestionNumber(question), kind, text }
    }

    pub(crate) fn kind(&self) -> EntryKind {
        self.kind
    }

    pub(crate) fn question(&self) -> &QuestionNumber {
        &self.question
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EssayQuestion {
    pub(crate) number: QuestionNumber,
    pub(crate) prompt: String,
}

/// Grading view of the content: objective answer keys and essay prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AnswerKey {
    pub(crate) correct_answers: BTreeMap<QuestionNumber, String>,
    pub(crate) essay_questions: Vec<EssayQuestion>,
}

impl AnswerKey {
    pub(crate) fn question_count(&self) -> usize {
        self.correct_answers.len() + self.essay_questions.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.question_count() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AssessmentContent {
    entries: Vec<ContentEntry>,
}

impl AssessmentContent {
    pub(crate) fn from_json(value: &serde_json::Value) -> Result<Self, ContentError> {
        decode_document("content", value).map(Self::from_document)
    }

    pub(crate) fn from_document(document: BTreeMap<String, String>) -> Self {
        let entries =
            document.into_iter().map(|(key, text)| ContentEntry::parse(key, text)).collect();
        Self { entries }
    }

    /// Wire form of the content, with the original keys.
    pub(crate) fn to_document(&self) -> BTreeMap<String, String> {
        self.entries.iter().map(|entry| (entry.key.clone(), entry.text.clone())).collect()
    }

    pub(crate) fn entries(&self) -> &[ContentEntry] {
        &self.entries
    }

    /// Objective keys and essay prompts. A question carrying both an answer key
    /// and an essay marker is graded as objective.
    pub(crate) fn answer_key(&self) -> AnswerKey {
        let mut correct_answers = BTreeMap::new();
        let mut essays = BTreeMap::new();

        for entry in &self.entries {
            match entry.kind {
                EntryKind::AnswerKey => {
                    correct_answers.insert(entry.question.clone(), entry.text.clone());
                }
                EntryKind::EssayPrompt => {
                    essays.insert(entry.question.clone(), entry.text.clone());
                }
                EntryKind::Prompt => {}
            }
        }

        let essay_questions = essays
            .into_iter()
            .filter(|(number, _)| !correct_answers.contains_key(number))
            .map(|(number, prompt)| EssayQuestion { number, prompt })
            .collect();

        AnswerKey { correct_answers, essay_questions }
    }

    /// Student-facing slice for one question: the key `number` and every
    /// `number_*` key, never an answer key.
    pub(crate) fn page(&self, number: &str) -> BTreeMap<String, String> {
        let prefix = format!("{number}_");

        self.entries
            .iter()
            .filter(|entry| entry.kind != EntryKind::AnswerKey)
            .filter(|entry| entry.key == number || entry.key.starts_with(&prefix))
            .map(|entry| (entry.key.clone(), entry.text.clone()))
            .collect()
    }
}
