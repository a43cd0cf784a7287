use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{LoadError, SettingsError};
use crate::model::ids::{QuizId, AttemptId};
use crate::model::question::{OptionIndex, Question};
use crate::model::quiz::{Quiz, QuizKind};
use crate::model::review::QuestionReview;
use crate::model::submission::{AnswerEntry, ExamResult, SubmissionPayload, SubmitTrigger};
use crate::payload::parse_question_set;

/// Thirty minutes.
pub const DEFAULT_EXAM_DURATION_SECS: u32 = 1800;

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamSettings {
    duration_secs: u32,
}

impl ExamSettings {
    /// # Errors
    ///
    /// Returns `SettingsError::ZeroDuration` for a zero-length exam.
    pub fn new(duration_secs: u32) -> Result<Self, SettingsError> {
        if duration_secs == 0 {
            return Err(SettingsError::ZeroDuration);
        }
        Ok(Self { duration_secs })
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_EXAM_DURATION_SECS,
        }
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of an exam attempt.
///
/// `Loading → InProgress → Submitting → Submitted`, with
/// `Submitting → InProgress` when the scoring call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExamStatus {
    Loading,
    InProgress,
    Submitting,
    Submitted,
}

impl ExamStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExamStatus::Loading => "loading",
            ExamStatus::InProgress => "in-progress",
            ExamStatus::Submitting => "submitting",
            ExamStatus::Submitted => "submitted",
        }
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single countdown tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One second was taken off the clock.
    Running { remaining_secs: u32 },
    /// This tick reached zero. Reported once per session.
    Expired,
    /// Nothing changed: the session is not in progress or time already ran out.
    Idle,
}

/// Aggregated answer counts, useful for confirmation prompts and headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub current: usize,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One user's attempt at a quiz.
///
/// Pure state machine: no timers, no I/O. Callers drive the clock with
/// [`ExamSession::tick`] and perform the network call between
/// [`ExamSession::begin_submission`] and
/// [`ExamSession::complete_submission`] / [`ExamSession::fail_submission`].
/// Rejected transitions return `false`/`None` instead of an error.
pub struct ExamSession {
    attempt_id: AttemptId,
    quiz_id: QuizId,
    kind: QuizKind,
    settings: ExamSettings,
    quiz: Option<Quiz>,
    status: ExamStatus,
    current: usize,
    selections: BTreeMap<usize, OptionIndex>,
    remaining_secs: u32,
    expiry_fired: bool,
    submission_attempts: u32,
    last_trigger: Option<SubmitTrigger>,
    started_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
    result: Option<ExamResult>,
}

impl ExamSession {
    /// A session waiting for its question payload.
    #[must_use]
    pub fn pending(quiz_id: QuizId, kind: QuizKind, settings: ExamSettings) -> Self {
        Self {
            attempt_id: AttemptId::generate(),
            quiz_id,
            kind,
            settings,
            quiz: None,
            status: ExamStatus::Loading,
            current: 0,
            selections: BTreeMap::new(),
            remaining_secs: settings.duration_secs(),
            expiry_fired: false,
            submission_attempts: 0,
            last_trigger: None,
            started_at: None,
            submitted_at: None,
            result: None,
        }
    }

    /// Parse the serialized question set and start the attempt.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` when the payload is absent or invalid. The session stays
    /// in `Loading`; callers are expected to abandon it.
    pub fn start(
        quiz_id: QuizId,
        kind: QuizKind,
        settings: ExamSettings,
        raw_questions: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, LoadError> {
        let mut session = Self::pending(quiz_id, kind, settings);
        session.load(raw_questions, now)?;
        Ok(session)
    }

    /// Move from `Loading` to `InProgress`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NotLoading` if the session already started, or the
    /// payload/quiz validation error otherwise.
    pub fn load(&mut self, raw_questions: Option<&str>, now: DateTime<Utc>) -> Result<(), LoadError> {
        if self.status != ExamStatus::Loading {
            return Err(LoadError::NotLoading);
        }
        let questions = parse_question_set(raw_questions)?;
        let quiz = Quiz::new(self.quiz_id, self.kind, questions)?;

        self.quiz = Some(quiz);
        self.status = ExamStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn kind(&self) -> QuizKind {
        self.kind
    }

    #[must_use]
    pub fn settings(&self) -> ExamSettings {
        self.settings
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> ExamStatus {
        self.status
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status == ExamStatus::Submitted
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.quiz.as_ref().map_or(0, Quiz::len)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.as_ref().and_then(|quiz| quiz.question(self.current))
    }

    #[must_use]
    pub fn selection(&self, question_index: usize) -> Option<OptionIndex> {
        self.selections.get(&question_index).copied()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn submission_attempts(&self) -> u32 {
        self.submission_attempts
    }

    #[must_use]
    pub fn last_trigger(&self) -> Option<SubmitTrigger> {
        self.last_trigger
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[must_use]
    pub fn result(&self) -> Option<&ExamResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        let total = self.question_count();
        let answered = self.selections.len();
        ExamProgress {
            total,
            answered,
            unanswered: total.saturating_sub(answered),
            current: self.current,
        }
    }

    // ─── Timer ────────────────────────────────────────────────────────────────

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != ExamStatus::InProgress || self.remaining_secs == 0 {
            return TickOutcome::Idle;
        }

        self.remaining_secs -= 1;
        if self.remaining_secs > 0 {
            return TickOutcome::Running {
                remaining_secs: self.remaining_secs,
            };
        }

        if self.expiry_fired {
            TickOutcome::Idle
        } else {
            self.expiry_fired = true;
            TickOutcome::Expired
        }
    }

    // ─── Navigation ───────────────────────────────────────────────────────────

    pub fn go_to_next(&mut self) -> bool {
        self.go_to(self.current.saturating_add(1))
    }

    pub fn go_to_previous(&mut self) -> bool {
        match self.current.checked_sub(1) {
            Some(index) => self.go_to(index),
            None => false,
        }
    }

    /// Jump to a question. Allowed after submission so the review can be browsed.
    pub fn go_to(&mut self, index: usize) -> bool {
        if self.status == ExamStatus::Loading || index >= self.question_count() {
            return false;
        }
        self.current = index;
        true
    }

    // ─── Answers ──────────────────────────────────────────────────────────────

    /// Record (or overwrite) the choice for a question.
    ///
    /// Rejected unless the session is in progress and both indexes are in range.
    pub fn select_option(&mut self, question_index: usize, option_index: usize) -> bool {
        if !self.accepts_answers() || question_index >= self.question_count() {
            return false;
        }
        let Some(option) = OptionIndex::new(option_index) else {
            return false;
        };
        self.selections.insert(question_index, option);
        true
    }

    pub fn clear_selection(&mut self, question_index: usize) -> bool {
        if !self.accepts_answers() {
            return false;
        }
        self.selections.remove(&question_index).is_some()
    }

    fn accepts_answers(&self) -> bool {
        self.status == ExamStatus::InProgress
    }

    // ─── Submission ───────────────────────────────────────────────────────────

    /// Claim the single submission slot and build the request body.
    ///
    /// Returns `None` unless the session is in progress, so a second caller
    /// (double click, timer racing a click) never gets a payload while a
    /// request is in flight or after it landed.
    pub fn begin_submission(&mut self, trigger: SubmitTrigger) -> Option<SubmissionPayload> {
        if self.status != ExamStatus::InProgress {
            return None;
        }
        let payload = self.build_payload()?;
        self.status = ExamStatus::Submitting;
        self.submission_attempts = self.submission_attempts.saturating_add(1);
        self.last_trigger = Some(trigger);
        Some(payload)
    }

    /// Store the scoring result and freeze the session.
    pub fn complete_submission(&mut self, result: ExamResult, now: DateTime<Utc>) -> bool {
        if self.status != ExamStatus::Submitting {
            return false;
        }
        self.result = Some(result);
        self.submitted_at = Some(now);
        self.status = ExamStatus::Submitted;
        true
    }

    /// Release the submission slot after a failed request; answers are kept.
    pub fn fail_submission(&mut self) -> bool {
        if self.status != ExamStatus::Submitting {
            return false;
        }
        self.status = ExamStatus::InProgress;
        true
    }

    fn build_payload(&self) -> Option<SubmissionPayload> {
        let quiz = self.quiz.as_ref()?;
        let answers = self
            .selections
            .iter()
            .filter_map(|(&index, option)| {
                quiz.question(index).map(|question| AnswerEntry {
                    question_id: question.id(),
                    selected_option_indexes: vec![option.value()],
                })
            })
            .collect();

        Some(SubmissionPayload {
            quiz_id: quiz.id(),
            answers,
        })
    }

    // ─── Review ───────────────────────────────────────────────────────────────

    /// Highlighting for a question once the attempt has been scored.
    #[must_use]
    pub fn review(&self, question_index: usize) -> Option<QuestionReview> {
        if !self.is_submitted() {
            return None;
        }
        let question = self.quiz.as_ref()?.question(question_index)?;
        Some(QuestionReview::build(
            question_index,
            question,
            self.selection(question_index),
        ))
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("attempt_id", &self.attempt_id)
            .field("quiz_id", &self.quiz_id)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("questions_len", &self.question_count())
            .field("current", &self.current)
            .field("answered", &self.selections.len())
            .field("remaining_secs", &self.remaining_secs)
            .field("submission_attempts", &self.submission_attempts)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
