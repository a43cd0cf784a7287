//! Parsing of the serialized question set handed to an exam session.
//!
//! The set arrives as a JSON array, one object per question:
//!
//! ```json
//! [{ "id": 1, "text": "2 + 2?", "options": ["1", "2", "3", "4"], "correctOptionIndexes": [3] }]
//! ```
//!
//! `question` is accepted in place of `text`, and `correctOptions` in place of
//! `correctOptionIndexes`. The correct set may be omitted entirely.

use serde::Deserialize;
use thiserror::Error;

use crate::model::{Question, QuestionError, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PayloadError {
    #[error("question payload is missing")]
    Missing,

    #[error("question payload is empty")]
    Blank,

    #[error("question payload is not valid JSON: {0}")]
    Malformed(String),

    #[error("question payload contains no questions")]
    NoQuestions,

    #[error("question #{position} (id {id}) is invalid: {source}")]
    InvalidQuestion {
        position: usize,
        id: QuestionId,
        #[source]
        source: QuestionError,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionDto {
    id: QuestionId,
    #[serde(alias = "question")]
    text: String,
    options: Vec<String>,
    #[serde(default, alias = "correctOptions")]
    correct_option_indexes: Vec<usize>,
}

/// Parse the caller-supplied question set.
///
/// # Errors
///
/// Returns `PayloadError` when the payload is absent, blank, malformed, empty,
/// or contains a question that fails validation.
pub fn parse_question_set(raw: Option<&str>) -> Result<Vec<Question>, PayloadError> {
    let raw = raw.ok_or(PayloadError::Missing)?;
    if raw.trim().is_empty() {
        return Err(PayloadError::Blank);
    }

    let dtos: Vec<QuestionDto> =
        serde_json::from_str(raw).map_err(|e| PayloadError::Malformed(e.to_string()))?;
    if dtos.is_empty() {
        return Err(PayloadError::NoQuestions);
    }

    dtos.into_iter()
        .enumerate()
        .map(|(position, dto)| {
            let id = dto.id;
            Question::new(id, dto.text, dto.options, dto.correct_option_indexes).map_err(
                |source| PayloadError::InvalidQuestion {
                    position: position + 1,
                    id,
                    source,
                },
            )
        })
        .collect()
}
