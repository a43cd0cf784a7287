use std::env;
use std::str::FromStr;
use std::time::Duration;

use exam_core::model::ExamSettings;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_QUIZ_BASE_URL: &str = "http://localhost:8082/api";
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 30;

pub const ENV_QUIZ_BASE_URL: &str = "LMS_QUIZ_BASE_URL";
pub const ENV_API_TOKEN: &str = "LMS_API_TOKEN";
pub const ENV_EXAM_DURATION_SECS: &str = "LMS_EXAM_DURATION_SECS";
pub const ENV_SUBMIT_TIMEOUT_SECS: &str = "LMS_SUBMIT_TIMEOUT_SECS";

/// Runtime settings for an exam attempt and its scoring backend.
#[derive(Clone, Debug)]
pub struct ExamConfig {
    pub quiz_base_url: Url,
    pub api_token: Option<String>,
    pub settings: ExamSettings,
    pub submit_timeout: Duration,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            quiz_base_url: default_quiz_base_url(),
            api_token: None,
            settings: ExamSettings::default(),
            submit_timeout: Duration::from_secs(DEFAULT_SUBMIT_TIMEOUT_SECS),
        }
    }
}

impl ExamConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is present but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read configuration through an arbitrary lookup, falling back to defaults
    /// for unset or blank values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a value is present but unusable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(ENV_QUIZ_BASE_URL) {
            config = config.with_quiz_base_url(&raw)?;
        }
        config.api_token = get(ENV_API_TOKEN).map(|token| token.trim().to_string());
        if let Some(raw) = get(ENV_EXAM_DURATION_SECS) {
            config = config.with_duration_secs(parse_value(ENV_EXAM_DURATION_SECS, &raw)?)?;
        }
        if let Some(raw) = get(ENV_SUBMIT_TIMEOUT_SECS) {
            config = config.with_submit_timeout_secs(parse_value(ENV_SUBMIT_TIMEOUT_SECS, &raw)?)?;
        }

        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::BaseUrl` if the value is not an absolute URL.
    pub fn with_quiz_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.quiz_base_url = Url::parse(raw.trim())?;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Settings` for a zero duration.
    pub fn with_duration_secs(mut self, duration_secs: u32) -> Result<Self, ConfigError> {
        self.settings = ExamSettings::new(duration_secs)?;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a zero timeout.
    pub fn with_submit_timeout_secs(mut self, secs: u64) -> Result<Self, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::Invalid {
                name: ENV_SUBMIT_TIMEOUT_SECS,
                reason: "must be > 0".into(),
            });
        }
        self.submit_timeout = Duration::from_secs(secs);
        Ok(self)
    }

    #[must_use]
    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token;
        self
    }
}

fn default_quiz_base_url() -> Url {
    match Url::parse(DEFAULT_QUIZ_BASE_URL) {
        Ok(url) => url,
        Err(_) => unreachable!("default quiz base url is a valid literal"),
    }
}

fn parse_value<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ExamConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.quiz_base_url.as_str(), "http://localhost:8082/api");
        assert_eq!(config.settings.duration_secs(), 1800);
        assert_eq!(config.submit_timeout, Duration::from_secs(30));
        assert!(config.api_token.is_none());
    }

    #[test]
    fn values_override_defaults() {
        let config = ExamConfig::from_lookup(lookup(&[
            (ENV_QUIZ_BASE_URL, "https://quiz.example.com/v1"),
            (ENV_API_TOKEN, " secret "),
            (ENV_EXAM_DURATION_SECS, "600"),
            (ENV_SUBMIT_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.quiz_base_url.host_str(), Some("quiz.example.com"));
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.settings.duration_secs(), 600);
        assert_eq!(config.submit_timeout, Duration::from_secs(5));
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let config = ExamConfig::from_lookup(lookup(&[(ENV_API_TOKEN, "   ")])).unwrap();
        assert!(config.api_token.is_none());
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = ExamConfig::from_lookup(lookup(&[(ENV_EXAM_DURATION_SECS, "soon")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: ENV_EXAM_DURATION_SECS,
                ..
            }
        ));

        let err = ExamConfig::from_lookup(lookup(&[(ENV_EXAM_DURATION_SECS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Settings(_)));

        let err = ExamConfig::from_lookup(lookup(&[(ENV_QUIZ_BASE_URL, "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::BaseUrl(_)));

        let err =
            ExamConfig::from_lookup(lookup(&[(ENV_SUBMIT_TIMEOUT_SECS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
