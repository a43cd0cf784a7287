mod ids;
mod question;
mod quiz;
mod review;
mod session;
mod submission;

pub use ids::{AttemptId, QuestionId, QuizId};
pub use question::{OPTION_COUNT, OptionIndex, Question, QuestionError};
pub use quiz::{Quiz, QuizError, QuizKind};
pub use review::{OptionMark, QuestionReview};
pub use session::{
    DEFAULT_EXAM_DURATION_SECS, ExamProgress, ExamSession, ExamSettings, ExamStatus, TickOutcome,
};
pub use submission::{AnswerEntry, ExamResult, Percentage, SubmissionPayload, SubmitTrigger};
