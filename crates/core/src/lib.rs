#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod payload;
pub mod time;

pub use error::{LoadError, SettingsError};
pub use payload::{PayloadError, parse_question_set};
pub use time::Clock;
