use crate::model::ids::QuestionId;
use crate::model::question::{OPTION_COUNT, OptionIndex, Question};

/// How a single option is highlighted once the attempt is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    /// A correct option the user did not pick.
    Correct,
    /// The user's pick, and it is correct.
    SelectedCorrect,
    /// The user's pick, and it is wrong.
    SelectedIncorrect,
    /// The user's pick, with no answer key to judge it against.
    Selected,
    Neutral,
}

impl OptionMark {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, OptionMark::Correct | OptionMark::SelectedCorrect)
    }

    #[must_use]
    pub fn is_selected(self) -> bool {
        matches!(
            self,
            OptionMark::SelectedCorrect | OptionMark::SelectedIncorrect | OptionMark::Selected
        )
    }
}

/// Read-only view of one question after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub question_index: usize,
    pub question_id: QuestionId,
    pub selected: Option<OptionIndex>,
    pub marks: [OptionMark; OPTION_COUNT],
}

impl QuestionReview {
    pub(crate) fn build(
        question_index: usize,
        question: &Question,
        selected: Option<OptionIndex>,
    ) -> Self {
        let has_key = !question.correct_options().is_empty();
        let marks = std::array::from_fn(|i| {
            let Some(index) = OptionIndex::new(i) else {
                return OptionMark::Neutral;
            };
            let correct = question.is_correct(index);
            let chosen = selected == Some(index);
            if chosen && !has_key {
                return OptionMark::Selected;
            }
            match (chosen, correct) {
                (true, true) => OptionMark::SelectedCorrect,
                (true, false) => OptionMark::SelectedIncorrect,
                (false, true) => OptionMark::Correct,
                (false, false) => OptionMark::Neutral,
            }
        });

        Self {
            question_index,
            question_id: question.id(),
            selected,
            marks,
        }
    }

    /// `None` when the question was skipped or the server withheld the correct set.
    #[must_use]
    pub fn answered_correctly(&self) -> Option<bool> {
        let selected = self.selected?;
        if !self.marks.iter().any(|mark| mark.is_correct()) {
            return None;
        }
        Some(self.marks[selected.as_usize()] == OptionMark::SelectedCorrect)
    }
}
