use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, QuizId};

/// What caused a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitTrigger {
    /// The user asked to submit.
    Manual,
    /// The countdown reached zero.
    Automatic,
}

impl SubmitTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitTrigger::Manual => "manual",
            SubmitTrigger::Automatic => "automatic",
        }
    }
}

impl fmt::Display for SubmitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One answered question in the submission body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub question_id: QuestionId,
    pub selected_option_indexes: Vec<u8>,
}

/// Request body for the scoring endpoint.
///
/// Sparse: unanswered questions are simply absent from `answers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub quiz_id: QuizId,
    pub answers: Vec<AnswerEntry>,
}

/// Scoring service verdict for a submitted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub obtained_marks: f64,
    pub total_marks: f64,
    pub passed: bool,
}

impl ExamResult {
    /// Score as a percentage of the total.
    ///
    /// `Percentage::Unavailable` when the total is zero or either mark is not finite.
    #[must_use]
    pub fn percentage(&self) -> Percentage {
        Percentage::of(self.obtained_marks, self.total_marks)
    }
}

/// A display-safe percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percentage {
    Value(f64),
    Unavailable,
}

impl Percentage {
    #[must_use]
    pub fn of(obtained: f64, total: f64) -> Self {
        if !obtained.is_finite() || !total.is_finite() || total == 0.0 {
            return Self::Unavailable;
        }
        let value = obtained / total * 100.0;
        if value.is_finite() {
            Self::Value(value)
        } else {
            Self::Unavailable
        }
    }

    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Percentage::Value(v) => Some(v),
            Percentage::Unavailable => None,
        }
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percentage::Value(v) => write!(f, "{v:.2}%"),
            Percentage::Unavailable => f.write_str("N/A"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_camel_case_wire_names() {
        let payload = SubmissionPayload {
            quiz_id: QuizId::new(12),
            answers: vec![AnswerEntry {
                question_id: QuestionId::new(5),
                selected_option_indexes: vec![2],
            }],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "quizId": 12,
                "answers": [{ "questionId": 5, "selectedOptionIndexes": [2] }]
            })
        );
    }

    #[test]
    fn result_decodes_from_service_shape() {
        let result: ExamResult = serde_json::from_str(
            r#"{ "obtainedMarks": 17, "totalMarks": 20, "passed": true }"#,
        )
        .unwrap();
        assert!(result.passed);
        assert_eq!(result.percentage(), Percentage::Value(85.0));
        assert_eq!(result.percentage().to_string(), "85.00%");
    }

    #[test]
    fn zero_total_is_unavailable() {
        let result = ExamResult {
            obtained_marks: 0.0,
            total_marks: 0.0,
            passed: false,
        };
        let shown = result.percentage().to_string();
        assert_eq!(shown, "N/A");
        assert!(!shown.contains("NaN"));
        assert!(!shown.contains("inf"));
    }

    #[test]
    fn non_finite_marks_are_unavailable() {
        assert_eq!(Percentage::of(f64::NAN, 10.0), Percentage::Unavailable);
        assert_eq!(Percentage::of(5.0, f64::INFINITY), Percentage::Unavailable);
        assert_eq!(Percentage::of(f64::MAX, f64::MIN_POSITIVE), Percentage::Unavailable);
    }
}
