use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question must have exactly {expected} options, got {actual}")]
    WrongOptionCount { expected: usize, actual: usize },

    #[error("correct option index {index} is out of range")]
    CorrectOptionOutOfRange { index: usize },
}

//
// ─── OPTION INDEX ──────────────────────────────────────────────────────────────
//

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Zero-based position of an option within a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionIndex(u8);

impl OptionIndex {
    /// Returns `None` when `index` does not address one of the question's options.
    #[must_use]
    pub fn new(index: usize) -> Option<Self> {
        if index < OPTION_COUNT {
            u8::try_from(index).ok().map(Self)
        } else {
            None
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question inside a quiz.
///
/// The correct option set may be empty: servers are free to withhold it, in
/// which case the post-submission review only shows the user's own choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: [String; OPTION_COUNT],
    correct: BTreeSet<OptionIndex>,
}

impl Question {
    /// Validate and build a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` for blank text,
    /// `QuestionError::WrongOptionCount` unless exactly four options are given, and
    /// `QuestionError::CorrectOptionOutOfRange` for a correct index past the last option.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct: impl IntoIterator<Item = usize>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }

        let actual = options.len();
        let options: [String; OPTION_COUNT] =
            options
                .try_into()
                .map_err(|_| QuestionError::WrongOptionCount {
                    expected: OPTION_COUNT,
                    actual,
                })?;

        let correct = correct
            .into_iter()
            .map(|index| {
                OptionIndex::new(index).ok_or(QuestionError::CorrectOptionOutOfRange { index })
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Self {
            id,
            text,
            options,
            correct,
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
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, index: OptionIndex) -> &str {
        &self.options[index.as_usize()]
    }

    #[must_use]
    pub fn correct_options(&self) -> &BTreeSet<OptionIndex> {
        &self.correct
    }

    #[must_use]
    pub fn is_correct(&self, index: OptionIndex) -> bool {
        self.correct.contains(&index)
    }
}
