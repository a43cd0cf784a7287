//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use exam_core::{LoadError, SettingsError};

/// Errors emitted by scoring clients.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("scoring service rejected the credentials")]
    Unauthorized,
    #[error("scoring request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("scoring request timed out after {0:?}")]
    Timeout(Duration),
    #[error("scoring response could not be decoded: {0}")]
    Decode(String),
    #[error("scoring service unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `ExamController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl ExamError {
    /// Input-contract violations: the attempt should be abandoned, not retried.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ExamError::Load(_))
    }
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("invalid quiz service url: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
