use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::SelectedAnswer;
use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors raised while constructing a question.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be blank")]
    BlankText,

    #[error("question category cannot be blank")]
    BlankCategory,

    #[error("a question needs at least two choices, got {0}")]
    NotEnoughChoices(usize),

    #[error("true/false questions must have exactly two choices, got {0}")]
    InvalidTrueFalseChoices(usize),

    #[error("answer key index {index} is out of range for {len} choices")]
    KeyOutOfRange { index: usize, len: usize },

    #[error("answer key shape does not match the question kind")]
    KeyKindMismatch,

    #[error("multi-select answer key cannot be empty")]
    EmptyKey,
}

//
// ─── QUESTION KIND ────────────────────────────────────────────────────────────
//

/// Tag distinguishing how a question is answered and scored.
///
/// `TrueFalse` and `MultipleChoice` expect exactly one selected index;
/// `MultiSelect` expects a set of indices compared by set equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    TrueFalse,
    MultipleChoice,
    MultiSelect,
}

impl QuestionKind {
    /// True when answers to this kind are sets rather than single indices.
    #[must_use]
    pub fn expects_multiple(self) -> bool {
        matches!(self, Self::MultiSelect)
    }

    /// Wire name for this kind, as used by question files and storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TrueFalse => "true-false",
            Self::MultipleChoice => "multiple-choice",
            Self::MultiSelect => "multi-select",
        }
    }
}

//
// ─── ANSWER KEY ───────────────────────────────────────────────────────────────
//

/// The correctness key for a question.
///
/// Untagged on the wire: a bare index for single-key questions, an array of
/// indices for multi-select ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerKey {
    Single(usize),
    Multiple(BTreeSet<usize>),
}

impl AnswerKey {
    /// Builds a multi-select key from any iterator of indices.
    #[must_use]
    pub fn multiple(indices: impl IntoIterator<Item = usize>) -> Self {
        Self::Multiple(indices.into_iter().collect())
    }

    fn max_index(&self) -> Option<usize> {
        match self {
            Self::Single(index) => Some(*index),
            Self::Multiple(set) => set.iter().next_back().copied(),
        }
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// One immutable quiz question.
///
/// Construction validates every invariant the scoring path relies on, so a
/// `Question` in hand never needs re-checking: at least two choices, every
/// key index in range, and a key shape that matches the kind tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    choices: Vec<String>,
    key: AnswerKey,
    kind: QuestionKind,
    category: String,
}

impl Question {
    /// Validates and builds a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the text or category is blank, the choice
    /// list is too short, the key references an out-of-range choice, or the
    /// key shape does not match `kind`.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        choices: Vec<String>,
        key: AnswerKey,
        kind: QuestionKind,
        category: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::BlankText);
        }
        let category = category.into();
        if category.trim().is_empty() {
            return Err(QuestionError::BlankCategory);
        }

        if choices.len() < 2 {
            return Err(QuestionError::NotEnoughChoices(choices.len()));
        }
        if kind == QuestionKind::TrueFalse && choices.len() != 2 {
            return Err(QuestionError::InvalidTrueFalseChoices(choices.len()));
        }

        match (&key, kind.expects_multiple()) {
            (AnswerKey::Single(_), false) | (AnswerKey::Multiple(_), true) => {}
            _ => return Err(QuestionError::KeyKindMismatch),
        }
        if matches!(&key, AnswerKey::Multiple(set) if set.is_empty()) {
            return Err(QuestionError::EmptyKey);
        }
        if let Some(max) = key.max_index() {
            if max >= choices.len() {
                return Err(QuestionError::KeyOutOfRange {
                    index: max,
                    len: choices.len(),
                });
            }
        }

        Ok(Self {
            id,
            text,
            choices,
            key,
            kind,
            category,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn key(&self) -> &AnswerKey {
        &self.key
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Applies the matching rule to a recorded answer.
    ///
    /// Dispatches on the kind tag: single-key kinds require the exact index,
    /// multi-select requires set equality. An unanswered position is never
    /// correct.
    #[must_use]
    pub fn is_correct(&self, answer: Option<&SelectedAnswer>) -> bool {
        let Some(answer) = answer else {
            return false;
        };

        match self.kind {
            QuestionKind::TrueFalse | QuestionKind::MultipleChoice => {
                matches!(
                    (&self.key, answer),
                    (AnswerKey::Single(expected), SelectedAnswer::Single(picked))
                        if picked == expected
                )
            }
            QuestionKind::MultiSelect => {
                matches!(
                    (&self.key, answer),
                    (AnswerKey::Multiple(expected), SelectedAnswer::Multiple(picked))
                        if picked == expected
                )
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
