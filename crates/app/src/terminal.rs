use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use exam_core::model::{ExamResult, OptionMark, QuestionReview, SubmitTrigger};
use services::exam::{ExamView, OptionView, ResultView};
use services::{ExamError, ExamNotifier};
use tokio::sync::{Mutex, mpsc};

/// Lines typed by the user, shared between the command loop and prompts.
pub type LineSource = Arc<Mutex<mpsc::UnboundedReceiver<String>>>;

/// One parsed command from the exam prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Next,
    Previous,
    /// Zero-based question index.
    GoTo(usize),
    /// Zero-based option index on the current question.
    Pick(usize),
    Clear,
    Submit,
    /// Zero-based question index.
    Review(usize),
    Help,
    Quit,
}

/// Parse a prompt line. Numbers typed by the user are one-based.
#[must_use]
pub fn parse_command(line: &str) -> Option<UserCommand> {
    let mut parts = line.split_whitespace();
    let head = parts.next()?.to_ascii_lowercase();
    let arg = match parts.next() {
        Some(raw) => Some(raw.parse::<usize>().ok()?),
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }

    match (head.as_str(), arg) {
        ("n" | "next", None) => Some(UserCommand::Next),
        ("p" | "prev" | "previous", None) => Some(UserCommand::Previous),
        ("g" | "goto", Some(n)) if n > 0 => Some(UserCommand::GoTo(n - 1)),
        ("c" | "clear", None) => Some(UserCommand::Clear),
        ("s" | "submit", None) => Some(UserCommand::Submit),
        ("r" | "review", Some(n)) if n > 0 => Some(UserCommand::Review(n - 1)),
        ("h" | "help" | "?", None) => Some(UserCommand::Help),
        ("q" | "quit", None) => Some(UserCommand::Quit),
        (digit, None) => match digit.parse::<usize>() {
            Ok(n) if n > 0 => Some(UserCommand::Pick(n - 1)),
            _ => None,
        },
        _ => None,
    }
}

pub const HELP: &str = "\
commands:
  1-4        pick an option on the current question
  n / p      next / previous question
  g <n>      go to question n
  c          clear the current answer
  s          submit
  r <n>      review question n (after submission)
  q          quit without submitting";

/// Terminal front-end for exam notices.
pub struct TerminalNotifier {
    lines: LineSource,
}

impl TerminalNotifier {
    #[must_use]
    pub fn new(lines: LineSource) -> Self {
        Self { lines }
    }
}

#[async_trait]
impl ExamNotifier for TerminalNotifier {
    async fn confirm_submission(&self, unanswered: usize) -> bool {
        if unanswered > 0 {
            println!("{unanswered} question(s) unanswered. Submit anyway? [y/N]");
        } else {
            println!("Submit your answers? [y/N]");
        }
        let reply = self.lines.lock().await.recv().await;
        is_yes(reply.as_deref())
    }

    fn time_expired(&self) {
        println!("\nTime is up. Submitting your answers...");
    }

    fn submission_failed(&self, error: &ExamError) {
        println!("Submission failed: {error}. Your answers are kept; type `s` to retry.");
    }

    fn submitted(&self, result: &ExamResult, trigger: SubmitTrigger) {
        let how = match trigger {
            SubmitTrigger::Manual => "Submitted",
            SubmitTrigger::Automatic => "Auto-submitted",
        };
        println!("{how}: {}", ResultView::from_result(result).score_line());
    }
}

fn is_yes(reply: Option<&str>) -> bool {
    matches!(
        reply.map(|r| r.trim().to_ascii_lowercase()).as_deref(),
        Some("y" | "yes")
    )
}

/// Render the current exam screen.
#[must_use]
pub fn render(view: &ExamView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[{} quiz {}] {} left | {}/{} answered | {}",
        view.kind, view.quiz_id, view.remaining, view.progress.answered, view.progress.total,
        view.status
    );

    if let Some(question) = &view.question {
        let _ = writeln!(out, "{}", question.heading);
        let _ = writeln!(out, "{}", question.text);
        for option in &question.options {
            let _ = writeln!(out, "  {}", render_option(option));
        }
    }

    if let Some(result) = &view.result {
        let _ = writeln!(out, "Result: {}", result.score_line());
    }
    out
}

fn render_option(option: &OptionView) -> String {
    let tag = match option.mark {
        Some(OptionMark::Correct) => " (correct)",
        Some(OptionMark::SelectedCorrect) => " [x] (correct)",
        Some(OptionMark::SelectedIncorrect) => " [x] (wrong)",
        Some(OptionMark::Selected) => " [x]",
        Some(OptionMark::Neutral) => "",
        None if option.selected => " [x]",
        None => "",
    };
    format!("{}) {}{tag}", option.index + 1, option.text)
}

/// One-line summary of a reviewed question.
#[must_use]
pub fn render_review_line(review: &QuestionReview) -> String {
    let verdict = match (review.selected, review.answered_correctly()) {
        (None, _) => "skipped",
        (Some(_), Some(true)) => "correct",
        (Some(_), Some(false)) => "wrong",
        (Some(_), None) => "answered",
    };
    format!("Q{}: {verdict}", review.question_index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{ExamSession, ExamSettings, QuizId, QuizKind};
    use exam_core::time::fixed_now;

    #[test]
    fn commands_are_one_based() {
        assert_eq!(parse_command("1"), Some(UserCommand::Pick(0)));
        assert_eq!(parse_command("4"), Some(UserCommand::Pick(3)));
        assert_eq!(parse_command("g 3"), Some(UserCommand::GoTo(2)));
        assert_eq!(parse_command("review 1"), Some(UserCommand::Review(0)));
        assert_eq!(parse_command(" N "), Some(UserCommand::Next));
        assert_eq!(parse_command("submit"), Some(UserCommand::Submit));
    }

    #[test]
    fn malformed_commands_are_rejected() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("0"), None);
        assert_eq!(parse_command("g"), None);
        assert_eq!(parse_command("g 0"), None);
        assert_eq!(parse_command("n 2"), None);
        assert_eq!(parse_command("jump"), None);
        assert_eq!(parse_command("g 1 2"), None);
        assert_eq!(parse_command("g x"), None);
        assert_eq!(parse_command("n x"), None);
    }

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes(Some("y")));
        assert!(is_yes(Some(" YES ")));
        assert!(!is_yes(Some("")));
        assert!(!is_yes(Some("no")));
        assert!(!is_yes(None));
    }

    #[test]
    fn render_marks_selection() {
        let mut session = ExamSession::start(
            QuizId::new(3),
            QuizKind::Lecture,
            ExamSettings::new(75).unwrap(),
            Some(r#"[{ "id": 1, "text": "Pick b", "options": ["a", "b", "c", "d"] }]"#),
            fixed_now(),
        )
        .unwrap();
        session.select_option(0, 1);

        let screen = render(&ExamView::from_session(&session));
        assert!(screen.starts_with("[LECTURE quiz 3] 01:15 left | 1/1 answered | in-progress"));
        assert!(screen.contains("Question 1 of 1"));
        assert!(screen.contains("  2) b [x]"));
        assert!(screen.contains("  1) a\n"));
    }

    #[tokio::test]
    async fn confirmation_reads_next_line() {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = TerminalNotifier::new(Arc::new(Mutex::new(rx)));
        tx.send("y".to_string()).unwrap();
        assert!(notifier.confirm_submission(2).await);
        tx.send("n".to_string()).unwrap();
        assert!(!notifier.confirm_submission(0).await);
        drop(tx);
        assert!(!notifier.confirm_submission(0).await);
    }
}
