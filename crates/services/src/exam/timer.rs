use std::sync::{Mutex, Weak};
use std::time::Duration;

use exam_core::model::{SubmitTrigger, TickOutcome};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::controller::ExamShared;

/// One countdown step.
pub const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// Owner of the background countdown task.
///
/// The task is aborted on [`CountdownHandle::cancel`] and on drop.
#[derive(Debug)]
pub struct CountdownHandle {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CountdownHandle {
    /// Start ticking once per `period`.
    ///
    /// The task only holds a weak reference: once the controller is gone the
    /// next tick ends the loop without touching any state.
    pub(crate) fn spawn(shared: Weak<ExamShared>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(shared) = shared.upgrade() else {
                    break;
                };

                match shared.tick() {
                    TickOutcome::Running { remaining_secs } => {
                        tracing::trace!(remaining_secs, "countdown tick");
                    }
                    TickOutcome::Expired => {
                        shared.notify_time_expired();
                        if let Err(error) = shared.submit(SubmitTrigger::Automatic).await {
                            tracing::debug!(error = %error, "automatic submission did not land");
                        }
                    }
                    TickOutcome::Idle => {}
                }

                if shared.is_submitted() {
                    tracing::debug!("countdown stopped: exam submitted");
                    break;
                }
            }
        });

        Self {
            task: Mutex::new(Some(task)),
        }
    }

    /// Stop the countdown. Safe to call more than once.
    pub fn cancel(&self) {
        let task = match self.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            task.abort();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        let guard = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
