#![forbid(unsafe_code)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod exam;
pub mod notify;
pub mod scoring;

pub use exam_core::Clock;

pub use config::ExamConfig;
pub use credentials::{CredentialProvider, StaticCredentials};
pub use error::{ConfigError, ExamError, ScoringError};
pub use exam::{ExamController, ExamDeps, ExamRequest, ExamView, SubmitOutcome};
pub use notify::{ExamNotifier, Notice, RecordingNotifier, TracingNotifier};
pub use scoring::{HttpScoringClient, InMemoryScoringClient, ScoringClient, ScriptedResponse};
