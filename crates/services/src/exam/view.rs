use exam_core::model::{
    ExamProgress, ExamResult, ExamSession, ExamStatus, OptionIndex, OptionMark, QuestionId,
    QuizId, QuizKind,
};
use exam_core::time::format_countdown;

/// Render-ready snapshot of an exam attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamView {
    pub quiz_id: QuizId,
    pub kind: QuizKind,
    pub status: ExamStatus,
    pub remaining: String,
    pub progress: ExamProgress,
    pub question: Option<QuestionView>,
    pub result: Option<ResultView>,
    pub can_submit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub index: usize,
    pub id: QuestionId,
    /// "Question 2 of 10"
    pub heading: String,
    pub text: String,
    pub options: Vec<OptionView>,
    pub read_only: bool,
    pub can_go_previous: bool,
    pub can_go_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub index: usize,
    pub text: String,
    pub selected: bool,
    /// Only set once the attempt is submitted.
    pub mark: Option<OptionMark>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub obtained_marks: f64,
    pub total_marks: f64,
    pub passed: bool,
    /// `"85.00%"`, or `"N/A"` when there is nothing to divide by.
    pub percentage: String,
    pub verdict: &'static str,
}

impl ResultView {
    #[must_use]
    pub fn from_result(result: &ExamResult) -> Self {
        Self {
            obtained_marks: result.obtained_marks,
            total_marks: result.total_marks,
            passed: result.passed,
            percentage: result.percentage().to_string(),
            verdict: if result.passed { "Passed" } else { "Failed" },
        }
    }

    #[must_use]
    pub fn score_line(&self) -> String {
        format!(
            "{}/{} ({}) {}",
            self.obtained_marks, self.total_marks, self.percentage, self.verdict
        )
    }
}

impl ExamView {
    #[must_use]
    pub fn from_session(session: &ExamSession) -> Self {
        Self {
            quiz_id: session.quiz_id(),
            kind: session.kind(),
            status: session.status(),
            remaining: format_countdown(session.remaining_secs()),
            progress: session.progress(),
            question: question_view(session),
            result: session.result().map(ResultView::from_result),
            can_submit: session.status() == ExamStatus::InProgress,
        }
    }
}

fn question_view(session: &ExamSession) -> Option<QuestionView> {
    let index = session.current_index();
    let question = session.current_question()?;
    let total = session.question_count();
    let selected = session.selection(index);
    let review = session.review(index);

    let options = question
        .options()
        .iter()
        .enumerate()
        .map(|(i, text)| OptionView {
            index: i,
            text: text.clone(),
            selected: selected.is_some() && selected == OptionIndex::new(i),
            mark: review.as_ref().map(|r| r.marks[i]),
        })
        .collect();

    Some(QuestionView {
        index,
        id: question.id(),
        heading: format!("Question {} of {}", index + 1, total),
        text: question.text().to_string(),
        options,
        read_only: session.status() != ExamStatus::InProgress,
        can_go_previous: index > 0,
        can_go_next: index + 1 < total,
    })
}
