use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use exam_core::model::{ExamResult, SubmitTrigger};

use crate::error::ExamError;

/// Platform seam for dialogs and notices raised by an exam attempt.
///
/// The controller never decides *how* to ask or tell the user; desktop, web and
/// terminal front-ends each plug in their own implementation.
#[async_trait]
pub trait ExamNotifier: Send + Sync {
    /// Ask before a manual submission. Returning `false` aborts it.
    async fn confirm_submission(&self, unanswered: usize) -> bool;

    /// The countdown reached zero; an automatic submission follows.
    fn time_expired(&self);

    fn submission_failed(&self, error: &ExamError);

    fn submitted(&self, result: &ExamResult, trigger: SubmitTrigger);
}

/// Confirms everything and reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl ExamNotifier for TracingNotifier {
    async fn confirm_submission(&self, unanswered: usize) -> bool {
        if unanswered > 0 {
            tracing::info!(unanswered, "submitting with unanswered questions");
        }
        true
    }

    fn time_expired(&self) {
        tracing::info!("time is up, submitting automatically");
    }

    fn submission_failed(&self, error: &ExamError) {
        tracing::warn!(error = %error, "submission failed, answers kept for retry");
    }

    fn submitted(&self, result: &ExamResult, trigger: SubmitTrigger) {
        tracing::info!(
            obtained = result.obtained_marks,
            total = result.total_marks,
            passed = result.passed,
            percentage = %result.percentage(),
            trigger = %trigger,
            "exam submitted"
        );
    }
}

/// Notice captured by `RecordingNotifier`.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    ConfirmRequested { unanswered: usize },
    TimeExpired,
    Failed(String),
    Submitted { result: ExamResult, trigger: SubmitTrigger },
}

/// Records every notice and answers confirmations with a fixed reply.
#[derive(Debug, Clone)]
pub struct RecordingNotifier {
    confirm: bool,
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn confirming() -> Self {
        Self::new(true)
    }

    #[must_use]
    pub fn declining() -> Self {
        Self::new(false)
    }

    fn new(confirm: bool) -> Self {
        Self {
            confirm,
            notices: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, notice: Notice) {
        let mut guard = match self.notices.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(notice);
    }
}

#[async_trait]
impl ExamNotifier for RecordingNotifier {
    async fn confirm_submission(&self, unanswered: usize) -> bool {
        self.push(Notice::ConfirmRequested { unanswered });
        self.confirm
    }

    fn time_expired(&self) {
        self.push(Notice::TimeExpired);
    }

    fn submission_failed(&self, error: &ExamError) {
        self.push(Notice::Failed(error.to_string()));
    }

    fn submitted(&self, result: &ExamResult, trigger: SubmitTrigger) {
        self.push(Notice::Submitted {
            result: *result,
            trigger,
        });
    }
}
