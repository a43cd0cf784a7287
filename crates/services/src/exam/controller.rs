use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use exam_core::Clock;
use exam_core::model::{
    AttemptId, ExamProgress, ExamResult, ExamSession, ExamSettings, ExamStatus, QuestionReview,
    QuizId, QuizKind, SubmitTrigger, TickOutcome,
};

use super::timer::{COUNTDOWN_PERIOD, CountdownHandle};
use super::view::ExamView;
use crate::config::ExamConfig;
use crate::error::{ExamError, ScoringError};
use crate::notify::ExamNotifier;
use crate::scoring::ScoringClient;

/// What the caller hands over when opening an exam.
#[derive(Debug, Clone)]
pub struct ExamRequest {
    pub quiz_id: QuizId,
    pub kind: QuizKind,
    /// Serialized question set, exactly as received from the browsing screen.
    pub questions: Option<String>,
}

/// Collaborators injected into an `ExamController`.
#[derive(Clone)]
pub struct ExamDeps {
    pub scoring: Arc<dyn ScoringClient>,
    pub notifier: Arc<dyn ExamNotifier>,
    pub clock: Clock,
    pub settings: ExamSettings,
    pub submit_timeout: Duration,
    pub tick_period: Duration,
}

impl ExamDeps {
    #[must_use]
    pub fn new(scoring: Arc<dyn ScoringClient>, notifier: Arc<dyn ExamNotifier>) -> Self {
        let config = ExamConfig::default();
        Self {
            scoring,
            notifier,
            clock: Clock::default_clock(),
            settings: config.settings,
            submit_timeout: config.submit_timeout,
            tick_period: COUNTDOWN_PERIOD,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: &ExamConfig) -> Self {
        self.settings = config.settings;
        self.submit_timeout = config.submit_timeout;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ExamSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_submit_timeout(mut self, submit_timeout: Duration) -> Self {
        self.submit_timeout = submit_timeout;
        self
    }
}

/// Result of a `submit` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmitOutcome {
    Submitted(ExamResult),
    /// Another submission is in flight, the exam is already submitted, or it
    /// is still loading.
    Ignored,
    /// The user declined the confirmation prompt.
    Declined,
}

//
// ─── SHARED STATE ──────────────────────────────────────────────────────────────
//

/// State shared between the controller and its countdown task.
///
/// The session mutex is never held across an await.
pub(crate) struct ExamShared {
    session: Mutex<ExamSession>,
    scoring: Arc<dyn ScoringClient>,
    notifier: Arc<dyn ExamNotifier>,
    clock: Clock,
    submit_timeout: Duration,
}

impl ExamShared {
    fn lock(&self) -> MutexGuard<'_, ExamSession> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn tick(&self) -> TickOutcome {
        self.lock().tick()
    }

    pub(crate) fn is_submitted(&self) -> bool {
        self.lock().is_submitted()
    }

    pub(crate) fn notify_time_expired(&self) {
        let attempt_id = self.lock().attempt_id();
        tracing::info!(attempt = %attempt_id, "exam time expired");
        self.notifier.time_expired();
    }

    pub(crate) async fn submit(&self, trigger: SubmitTrigger) -> Result<SubmitOutcome, ExamError> {
        if trigger == SubmitTrigger::Manual {
            let (status, unanswered) = {
                let session = self.lock();
                (session.status(), session.progress().unanswered)
            };
            if status != ExamStatus::InProgress {
                return Ok(SubmitOutcome::Ignored);
            }
            if !self.notifier.confirm_submission(unanswered).await {
                tracing::debug!("manual submission declined");
                return Ok(SubmitOutcome::Declined);
            }
        }

        // Check-and-set in one critical section: the single-flight guard.
        let claimed = {
            let mut session = self.lock();
            let attempt_id = session.attempt_id();
            let quiz_id = session.quiz_id();
            session
                .begin_submission(trigger)
                .map(|payload| (payload, attempt_id, quiz_id))
        };
        let Some((payload, attempt_id, quiz_id)) = claimed else {
            tracing::debug!(trigger = %trigger, "submission ignored");
            return Ok(SubmitOutcome::Ignored);
        };

        tracing::info!(
            attempt = %attempt_id,
            quiz_id = %quiz_id,
            trigger = %trigger,
            answered = payload.answers.len(),
            "submitting exam"
        );

        let mut in_flight = InFlight::new(self);
        let outcome =
            match tokio::time::timeout(self.submit_timeout, self.scoring.submit(&payload)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ScoringError::Timeout(self.submit_timeout)),
            };

        match outcome {
            Ok(result) => {
                in_flight.settle(|session| session.complete_submission(result, self.clock.now()));
                tracing::info!(
                    attempt = %attempt_id,
                    percentage = %result.percentage(),
                    passed = result.passed,
                    "exam graded"
                );
                self.notifier.submitted(&result, trigger);
                Ok(SubmitOutcome::Submitted(result))
            }
            Err(error) => {
                in_flight.settle(ExamSession::fail_submission);
                tracing::warn!(attempt = %attempt_id, error = %error, "exam submission failed");
                let error = ExamError::from(error);
                self.notifier.submission_failed(&error);
                Err(error)
            }
        }
    }
}

/// Releases the submission slot if the request future is dropped mid-flight.
struct InFlight<'a> {
    shared: &'a ExamShared,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(shared: &'a ExamShared) -> Self {
        Self {
            shared,
            settled: false,
        }
    }

    fn settle(&mut self, apply: impl FnOnce(&mut ExamSession) -> bool) {
        self.settled = true;
        apply(&mut *self.shared.lock());
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.shared.lock().fail_submission();
        }
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives one exam attempt: countdown, answers, single-flight submission.
///
/// Must be created inside a tokio runtime. Dropping the controller stops the
/// countdown.
pub struct ExamController {
    shared: Arc<ExamShared>,
    countdown: CountdownHandle,
}

impl ExamController {
    /// Load the question set and start the countdown.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Load` when the question payload is missing or invalid;
    /// the caller should leave the exam screen.
    pub fn start(request: ExamRequest, deps: ExamDeps) -> Result<Self, ExamError> {
        let session = ExamSession::start(
            request.quiz_id,
            request.kind,
            deps.settings,
            request.questions.as_deref(),
            deps.clock.now(),
        )
        .map_err(|error| {
            tracing::warn!(quiz_id = %request.quiz_id, error = %error, "exam payload rejected");
            ExamError::Load(error)
        })?;

        tracing::info!(
            attempt = %session.attempt_id(),
            quiz_id = %session.quiz_id(),
            kind = %session.kind(),
            questions = session.question_count(),
            duration_secs = session.remaining_secs(),
            "exam started"
        );

        let shared = Arc::new(ExamShared {
            session: Mutex::new(session),
            scoring: deps.scoring,
            notifier: deps.notifier,
            clock: deps.clock,
            submit_timeout: deps.submit_timeout,
        });
        let countdown = CountdownHandle::spawn(Arc::downgrade(&shared), deps.tick_period);

        Ok(Self { shared, countdown })
    }

    /// Submit the current answers.
    ///
    /// Manual submissions ask the notifier for confirmation first. At most one
    /// request is ever in flight; overlapping calls return `Ignored`.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Scoring` when the request fails or times out. The
    /// session is back in progress with every answer intact.
    pub async fn submit(&self, trigger: SubmitTrigger) -> Result<SubmitOutcome, ExamError> {
        self.shared.submit(trigger).await
    }

    pub fn select_option(&self, question_index: usize, option_index: usize) -> bool {
        self.shared.lock().select_option(question_index, option_index)
    }

    /// Select an option on the question currently displayed.
    pub fn select_current(&self, option_index: usize) -> bool {
        let mut session = self.shared.lock();
        let current = session.current_index();
        session.select_option(current, option_index)
    }

    pub fn clear_selection(&self, question_index: usize) -> bool {
        self.shared.lock().clear_selection(question_index)
    }

    pub fn go_to_next(&self) -> bool {
        self.shared.lock().go_to_next()
    }

    pub fn go_to_previous(&self) -> bool {
        self.shared.lock().go_to_previous()
    }

    pub fn go_to(&self, index: usize) -> bool {
        self.shared.lock().go_to(index)
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.shared.lock().attempt_id()
    }

    #[must_use]
    pub fn status(&self) -> ExamStatus {
        self.shared.lock().status()
    }

    #[must_use]
    pub fn result(&self) -> Option<ExamResult> {
        self.shared.lock().result().copied()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.shared.lock().remaining_secs()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.shared.lock().current_index()
    }

    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        self.shared.lock().progress()
    }

    #[must_use]
    pub fn review(&self, question_index: usize) -> Option<QuestionReview> {
        self.shared.lock().review(question_index)
    }

    /// Snapshot for rendering.
    #[must_use]
    pub fn view(&self) -> ExamView {
        ExamView::from_session(&self.shared.lock())
    }

    /// Stop the countdown, e.g. when the exam screen goes away.
    pub fn stop_timer(&self) {
        self.countdown.cancel();
    }

    #[must_use]
    pub fn is_timer_running(&self) -> bool {
        self.countdown.is_running()
    }
}

impl fmt::Debug for ExamController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamController")
            .field("session", &*self.shared.lock())
            .field("timer_running", &self.countdown.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Notice, RecordingNotifier};
    use crate::scoring::{InMemoryScoringClient, ScriptedResponse};
    use exam_core::time::fixed_now;

    const TWO_QUESTIONS: &str = r#"[
        { "id": 1, "text": "Q1", "options": ["a", "b", "c", "d"], "correctOptionIndexes": [0] },
        { "id": 2, "text": "Q2", "options": ["a", "b", "c", "d"], "correctOptionIndexes": [1] }
    ]"#;

    fn graded() -> ExamResult {
        ExamResult {
            obtained_marks: 1.0,
            total_marks: 2.0,
            passed: true,
        }
    }

    fn start(
        scoring: Arc<InMemoryScoringClient>,
        notifier: RecordingNotifier,
    ) -> ExamController {
        let deps = ExamDeps::new(scoring, Arc::new(notifier)).with_clock(Clock::fixed(fixed_now()));
        ExamController::start(
            ExamRequest {
                quiz_id: QuizId::new(5),
                kind: QuizKind::Lecture,
                questions: Some(TWO_QUESTIONS.to_string()),
            },
            deps,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn declined_confirmation_sends_nothing() {
        let scoring = Arc::new(InMemoryScoringClient::grading(graded()));
        let notifier = RecordingNotifier::declining();
        let controller = start(Arc::clone(&scoring), notifier.clone());
        controller.select_option(0, 0);

        let outcome = controller.submit(SubmitTrigger::Manual).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Declined);
        assert_eq!(scoring.call_count(), 0);
        assert_eq!(controller.status(), ExamStatus::InProgress);
        assert_eq!(
            notifier.notices(),
            vec![Notice::ConfirmRequested { unanswered: 1 }]
        );
    }

    #[tokio::test]
    async fn automatic_submission_skips_confirmation() {
        let scoring = Arc::new(InMemoryScoringClient::grading(graded()));
        let notifier = RecordingNotifier::declining();
        let controller = start(Arc::clone(&scoring), notifier.clone());

        let outcome = controller.submit(SubmitTrigger::Automatic).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Submitted(graded()));
        assert_eq!(
            notifier.notices(),
            vec![Notice::Submitted {
                result: graded(),
                trigger: SubmitTrigger::Automatic
            }]
        );
    }

    #[tokio::test]
    async fn failure_is_reported_and_reverts() {
        let scoring = Arc::new(
            InMemoryScoringClient::grading(graded())
                .with_script([ScriptedResponse::Unavailable("boom".into())]),
        );
        let notifier = RecordingNotifier::confirming();
        let controller = start(Arc::clone(&scoring), notifier.clone());

        let err = controller.submit(SubmitTrigger::Manual).await.unwrap_err();
        assert!(!err.is_contract_violation());
        assert_eq!(controller.status(), ExamStatus::InProgress);
        assert!(matches!(notifier.notices().last(), Some(Notice::Failed(_))));
    }

    #[tokio::test]
    async fn bad_payload_is_a_contract_violation() {
        let scoring = Arc::new(InMemoryScoringClient::grading(graded()));
        let deps = ExamDeps::new(scoring, Arc::new(RecordingNotifier::confirming()));
        let err = ExamController::start(
            ExamRequest {
                quiz_id: QuizId::new(5),
                kind: QuizKind::Grand,
                questions: Some("[oops".into()),
            },
            deps,
        )
        .unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[tokio::test]
    async fn select_current_targets_displayed_question() {
        let scoring = Arc::new(InMemoryScoringClient::grading(graded()));
        let controller = start(scoring, RecordingNotifier::confirming());
        assert!(controller.go_to_next());
        assert!(controller.select_current(3));
        assert_eq!(controller.progress().answered, 1);
        assert!(controller.view().question.unwrap().options[3].selected);
    }

    #[tokio::test]
    async fn stop_timer_is_idempotent() {
        let scoring = Arc::new(InMemoryScoringClient::grading(graded()));
        let controller = start(scoring, RecordingNotifier::confirming());
        assert!(controller.is_timer_running());
        controller.stop_timer();
        controller.stop_timer();
        assert!(!controller.is_timer_running());
    }
}
