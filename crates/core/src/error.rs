use thiserror::Error;

use crate::model::QuizError;
use crate::payload::PayloadError;

/// Why an exam session could not leave the loading state.
///
/// Every variant is a caller-contract violation: the caller should abort the
/// attempt rather than retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LoadError {
    #[error("exam session is not waiting for a question payload")]
    NotLoading,
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("exam duration must be > 0 seconds")]
    ZeroDuration,
}
