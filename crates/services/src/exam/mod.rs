mod controller;
mod timer;
mod view;

// Public API of the exam subsystem.
pub use crate::error::ExamError;
pub use controller::{ExamController, ExamDeps, ExamRequest, SubmitOutcome};
pub use timer::{COUNTDOWN_PERIOD, CountdownHandle};
pub use view::{ExamView, OptionView, QuestionView, ResultView};
